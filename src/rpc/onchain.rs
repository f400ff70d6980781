// LNP Node: node running lightning network protocol and generalized lightning
// channels.
// Written in 2020-2022 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

use lnp_ctl::payloads::{FundsInfo, NoParams};
use lnp_ctl::Failure;

use super::Command;
use crate::node::Node;

/// Reports on-chain balance together with funds locked in open channels
pub struct ListFunds;

impl Command for ListFunds {
    const NAME: &'static str = "listfunds";
    type Params = NoParams;
    type Output = FundsInfo;

    fn run(&self, node: &Node, _: NoParams) -> Result<FundsInfo, Failure> { Ok(node.funds()) }
}
