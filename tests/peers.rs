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

mod common;

use lnp_ctl::payloads::{ChannelInfo, ChannelState, FundsInfo, PeerDirection, PeerInfo};
use lnp_ctl::FailureCode;
use lnp_embed::NodeHandle;
use serde_json::{json, Value};

use common::{eventually, node_dir};

fn peers(handle: &NodeHandle) -> Vec<PeerInfo> {
    serde_json::from_value(handle.call("listpeers", Value::Null).into_result().unwrap()).unwrap()
}

fn funds(handle: &NodeHandle) -> FundsInfo {
    serde_json::from_value(handle.call("listfunds", Value::Null).into_result().unwrap()).unwrap()
}

#[test]
fn connect_fund_close() {
    let (alice_dir, bob_dir) = (node_dir(1_000_000), node_dir(0));
    let alice = NodeHandle::create(alice_dir.path()).unwrap();
    let bob = NodeHandle::create(bob_dir.path()).unwrap();
    alice.start_listening().unwrap();
    let bob_addr = bob.start_listening().unwrap();

    let peer = alice
        .call("connect", json!({
            "node_id": bob.node_id().to_string(),
            "addr": bob_addr.to_string(),
        }))
        .into_result()
        .unwrap();
    let peer: PeerInfo = serde_json::from_value(peer).unwrap();
    assert_eq!(peer.node_id, bob.node_id());
    assert_eq!(peer.direction, PeerDirection::Outbound);
    assert!(eventually(|| peers(&bob).iter().any(|peer| peer.node_id == alice.node_id())));
    assert_eq!(peers(&bob)[0].direction, PeerDirection::Inbound);

    let channel = alice
        .call(
            "fundchannel",
            json!({
                "node_id": bob.node_id().to_string(),
                "amount_sat": 100_000,
                "push_msat": 5_000_000,
            }),
        )
        .into_result()
        .unwrap();
    let channel: ChannelInfo = serde_json::from_value(channel).unwrap();
    assert_eq!(channel.state, ChannelState::Open);
    assert_eq!(channel.capacity_sat, 100_000);
    assert_eq!(channel.local_balance_msat, 95_000_000);

    let balance = funds(&alice);
    assert_eq!(balance.onchain_sat, 900_000);
    assert_eq!(balance.channel_sat, 95_000);
    assert_eq!(balance.total_sat, 995_000);

    let info = alice.call("getinfo", Value::Null).into_result().unwrap();
    assert_eq!(info["peers"], json!(1));
    assert_eq!(info["channels"], json!(1));

    let failure = alice
        .call("fundchannel", json!({"node_id": bob.node_id().to_string(), "amount_sat": 2_000_000}))
        .into_result()
        .unwrap_err();
    assert_eq!(failure.code, FailureCode::InsufficientFunds);

    let closed = alice
        .call("closechannel", json!({"channel_id": channel.channel_id.to_string()}))
        .into_result()
        .unwrap();
    let closed: ChannelInfo = serde_json::from_value(closed).unwrap();
    assert_eq!(closed.state, ChannelState::Closed);
    assert_eq!(funds(&alice).onchain_sat, 995_000);

    alice
        .call("disconnect", json!({"node_id": bob.node_id().to_string()}))
        .into_result()
        .unwrap();
    assert!(peers(&alice).is_empty());

    alice.release().unwrap();
    bob.release().unwrap();

    // channel book and wallet survive restart
    let alice = NodeHandle::create(alice_dir.path()).unwrap();
    let channels: Vec<ChannelInfo> = serde_json::from_value(
        alice.call("listchannels", Value::Null).into_result().unwrap(),
    )
    .unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].state, ChannelState::Closed);
    assert_eq!(funds(&alice).onchain_sat, 995_000);
    alice.release().unwrap();
}

#[test]
fn connect_to_wrong_identity() {
    let (alice_dir, bob_dir, carol_dir) = (node_dir(0), node_dir(0), node_dir(0));
    let alice = NodeHandle::create(alice_dir.path()).unwrap();
    let bob = NodeHandle::create(bob_dir.path()).unwrap();
    let carol = NodeHandle::create(carol_dir.path()).unwrap();
    let bob_addr = bob.start_listening().unwrap();

    let failure = alice
        .call("connect", json!({
            "node_id": carol.node_id().to_string(),
            "addr": bob_addr.to_string(),
        }))
        .into_result()
        .unwrap_err();
    assert_eq!(failure.code, FailureCode::PeerConnection);
    assert!(peers(&alice).is_empty());

    for handle in [alice, bob, carol] {
        handle.release().unwrap();
    }
}
