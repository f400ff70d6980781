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

use lnp_ctl::payloads::{NoParams, NodeInfo, Pong};
use lnp_ctl::Failure;

use super::Command;
use crate::node::Node;

/// Liveness check
pub struct Ping;

impl Command for Ping {
    const NAME: &'static str = "ping";
    type Params = NoParams;
    type Output = Pong;

    fn run(&self, _: &Node, _: NoParams) -> Result<Pong, Failure> { Ok(Pong { pong: true }) }
}

pub struct GetInfo;

impl Command for GetInfo {
    const NAME: &'static str = "getinfo";
    type Params = NoParams;
    type Output = NodeInfo;

    fn run(&self, node: &Node, _: NoParams) -> Result<NodeInfo, Failure> { Ok(node.info()) }
}

/// Requests node shutdown. The response is sent before the node stops.
pub struct Stop;

impl Command for Stop {
    const NAME: &'static str = "stop";
    type Params = NoParams;
    type Output = NoParams;

    fn run(&self, node: &Node, _: NoParams) -> Result<NoParams, Failure> {
        node.request_stop();
        Ok(NoParams {})
    }
}

#[cfg(test)]
mod test {
    use serde_json::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::node::sample_node;
    use crate::rpc::RpcDispatcher;

    #[test]
    fn getinfo() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let value = RpcDispatcher::with_builtins()
            .dispatch(&node, "getinfo", Value::Null)
            .into_result()
            .unwrap();
        let info: NodeInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.node_id, node.node_id());
        assert_eq!(info.network, bitcoin::Network::Regtest);
        assert_eq!(info.channels, 0);
    }

    #[test]
    fn stop() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let value = RpcDispatcher::with_builtins()
            .dispatch(&node, "stop", Value::Null)
            .into_result()
            .unwrap();
        assert_eq!(value, serde_json::json!({}));
        assert!(node.is_stop_requested());
    }
}
