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

//! Typed payloads of the built-in control methods.
//!
//! Methods receive and return opaque JSON on the wire; these types are the
//! shared schema used by the node handlers and by client tools.

use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;
use std::str::FromStr;

use amplify::ToYamlString;
use bitcoin::hashes::hex::{self, FromHex, ToHex};
use bitcoin::secp256k1::PublicKey;
use bitcoin::Network;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::DisplayFromStr;

/// Identifier of a channel, displayed as 64-character hex string
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ChannelId([u8; 32]);

impl From<[u8; 32]> for ChannelId {
    fn from(bytes: [u8; 32]) -> Self { ChannelId(bytes) }
}

impl ChannelId {
    pub fn as_bytes(&self) -> &[u8; 32] { &self.0 }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { f.write_str(&self.0.to_hex()) }
}

impl FromStr for ChannelId {
    type Err = hex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> { <[u8; 32]>::from_hex(s).map(ChannelId) }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "lowercase")]
pub enum PeerDirection {
    #[display("inbound")]
    Inbound,

    #[display("outbound")]
    Outbound,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", rename_all = "lowercase")]
pub enum ChannelState {
    #[display("open")]
    Open,

    #[display("closed")]
    Closed,
}

/// Parameters of the methods which do not take any
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct NoParams {}

#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct Pong {
    pub pong: bool,
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
#[display(NodeInfo::to_yaml_string)]
pub struct NodeInfo {
    #[serde_as(as = "DisplayFromStr")]
    pub node_id: PublicKey,
    pub alias: String,
    #[serde_as(as = "DisplayFromStr")]
    pub network: Network,
    /// Address the peer network listener is bound to, if started
    pub listening: Option<SocketAddr>,
    pub since: DateTime<Utc>,
    pub uptime_sec: u64,
    pub peers: usize,
    pub channels: usize,
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
#[display(PeerInfo::to_yaml_string)]
pub struct PeerInfo {
    #[serde_as(as = "DisplayFromStr")]
    pub node_id: PublicKey,
    pub addr: SocketAddr,
    pub direction: PeerDirection,
    pub connected_since: DateTime<Utc>,
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
#[display(ChannelInfo::to_yaml_string)]
pub struct ChannelInfo {
    #[serde_as(as = "DisplayFromStr")]
    pub channel_id: ChannelId,
    #[serde_as(as = "DisplayFromStr")]
    pub peer_id: PublicKey,
    pub capacity_sat: u64,
    pub local_balance_msat: u64,
    pub push_msat: u64,
    pub state: ChannelState,
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
#[display(FundsInfo::to_yaml_string)]
pub struct FundsInfo {
    pub onchain_sat: u64,
    /// Local balance locked in open channels
    pub channel_sat: u64,
    pub total_sat: u64,
}

/// Parameters of `connect`
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct Connect {
    #[serde_as(as = "DisplayFromStr")]
    pub node_id: PublicKey,
    /// Remote address in `<host>:<port>` form
    pub addr: String,
}

/// Parameters of `disconnect`
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct Disconnect {
    #[serde_as(as = "DisplayFromStr")]
    pub node_id: PublicKey,
}

/// Parameters of `fundchannel`
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct FundChannel {
    #[serde_as(as = "DisplayFromStr")]
    pub node_id: PublicKey,
    pub amount_sat: u64,
    #[serde(default)]
    pub push_msat: u64,
}

/// Parameters of `closechannel`
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct CloseChannel {
    #[serde_as(as = "DisplayFromStr")]
    pub channel_id: ChannelId,
}

impl ToYamlString for NodeInfo {}
impl ToYamlString for PeerInfo {}
impl ToYamlString for ChannelInfo {}
impl ToYamlString for FundsInfo {}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn channel_id_hex() {
        let hex = "01".repeat(32);
        let id = ChannelId::from_str(&hex).unwrap();
        assert_eq!(id.to_string(), hex);
        assert!(ChannelId::from_str("0102").is_err());
    }

    #[test]
    fn fund_channel_push_defaults_to_zero() {
        let node_id = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
        let params: FundChannel =
            serde_json::from_value(json!({ "node_id": node_id, "amount_sat": 100_000 })).unwrap();
        assert_eq!(params.push_msat, 0);
        assert_eq!(params.node_id.to_string(), node_id);
    }

    #[test]
    fn malformed_node_id_is_rejected() {
        let res = serde_json::from_value::<Disconnect>(json!({ "node_id": "zz" }));
        assert!(res.is_err());
    }
}
