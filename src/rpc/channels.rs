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

use lnp_ctl::payloads::{self, ChannelInfo, NoParams};
use lnp_ctl::Failure;

use super::Command;
use crate::node::Node;

/// Opens channel with a connected peer funded from the node wallet
pub struct FundChannel;

impl Command for FundChannel {
    const NAME: &'static str = "fundchannel";
    type Params = payloads::FundChannel;
    type Output = ChannelInfo;

    fn run(&self, node: &Node, params: payloads::FundChannel) -> Result<ChannelInfo, Failure> {
        node.fund_channel(params.node_id, params.amount_sat, params.push_msat)
    }
}

pub struct ListChannels;

impl Command for ListChannels {
    const NAME: &'static str = "listchannels";
    type Params = NoParams;
    type Output = Vec<ChannelInfo>;

    fn run(&self, node: &Node, _: NoParams) -> Result<Vec<ChannelInfo>, Failure> {
        Ok(node.channels().list())
    }
}

pub struct CloseChannel;

impl Command for CloseChannel {
    const NAME: &'static str = "closechannel";
    type Params = payloads::CloseChannel;
    type Output = ChannelInfo;

    fn run(&self, node: &Node, params: payloads::CloseChannel) -> Result<ChannelInfo, Failure> {
        node.close_channel(params.channel_id)
    }
}
