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

use lnp_ctl::payloads::NodeInfo;
use lnp_ctl::{Client, Error};
use serde_json::{json, Value};

use crate::opts::Command;

/// Command which can be run against a node
pub trait Exec {
    type Client;
    type Error: std::error::Error;

    fn exec(self, client: &mut Self::Client) -> Result<(), Self::Error>;
}

impl Exec for Command {
    type Client = Client;
    type Error = Error;

    fn exec(self, client: &mut Self::Client) -> Result<(), Self::Error> {
        debug!("Performing {:?}: {}", self, self);
        match self {
            Command::Ping => client.report_response("ping", Value::Null)?,

            Command::Info => {
                let value = client.call("getinfo", Value::Null)?;
                let info: NodeInfo = serde_json::from_value(value)?;
                println!("{}", info);
            }

            Command::Connect { peer } => {
                let (node_id, addr) = peer.split_once('@').ok_or_else(|| {
                    Error::Other(s!("peer address must be in '<node_id>@<host>:<port>' form"))
                })?;
                client.report_response("connect", json!({ "node_id": node_id, "addr": addr }))?;
            }

            Command::Disconnect { node_id } => {
                client.report_response("disconnect", json!({ "node_id": node_id }))?
            }

            Command::Peers => client.report_response("listpeers", Value::Null)?,

            Command::Open { node_id, amount_sat, push_msat } => client.report_response(
                "fundchannel",
                json!({
                    "node_id": node_id,
                    "amount_sat": amount_sat,
                    "push_msat": push_msat.unwrap_or_default()
                }),
            )?,

            Command::Channels => client.report_response("listchannels", Value::Null)?,

            Command::Close { channel_id } => client
                .report_response("closechannel", json!({ "channel_id": channel_id.to_string() }))?,

            Command::Funds => client.report_response("listfunds", Value::Null)?,

            Command::Stop => client.report_response("stop", Value::Null)?,

            Command::Call { method, params } => {
                let params = match params {
                    Some(params) => serde_json::from_str(&params)?,
                    None => Value::Null,
                };
                client.report_response(&method, params)?;
            }
        }
        Ok(())
    }
}
