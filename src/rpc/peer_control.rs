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

use lnp_ctl::payloads::{self, NoParams, PeerInfo};
use lnp_ctl::Failure;

use super::Command;
use crate::node::Node;

pub struct Connect;

impl Command for Connect {
    const NAME: &'static str = "connect";
    type Params = payloads::Connect;
    type Output = PeerInfo;

    fn run(&self, node: &Node, params: payloads::Connect) -> Result<PeerInfo, Failure> {
        node.peers().connect(params.node_id, &params.addr)
    }
}

pub struct Disconnect;

impl Command for Disconnect {
    const NAME: &'static str = "disconnect";
    type Params = payloads::Disconnect;
    type Output = NoParams;

    fn run(&self, node: &Node, params: payloads::Disconnect) -> Result<NoParams, Failure> {
        node.peers().disconnect(&params.node_id).map(|_| NoParams {})
    }
}

pub struct ListPeers;

impl Command for ListPeers {
    const NAME: &'static str = "listpeers";
    type Params = NoParams;
    type Output = Vec<PeerInfo>;

    fn run(&self, node: &Node, _: NoParams) -> Result<Vec<PeerInfo>, Failure> {
        Ok(node.peers().list())
    }
}

#[cfg(test)]
mod test {
    use lnp_ctl::FailureCode;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use crate::node::sample_node;
    use crate::rpc::RpcDispatcher;

    #[test]
    fn disconnect_unknown_peer() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let failure = RpcDispatcher::with_builtins()
            .dispatch(
                &node,
                "disconnect",
                json!({
                    "node_id": "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
                }),
            )
            .into_result()
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::UnknownPeer);
    }

    #[test]
    fn no_peers() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let peers = RpcDispatcher::with_builtins()
            .dispatch(&node, "listpeers", Value::Null)
            .into_result()
            .unwrap();
        assert_eq!(peers, json!([]));
    }
}
