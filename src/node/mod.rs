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

//! Minimal in-process node wrapped by the facade: identity, wallet, peers
//! and channel book.

mod channels;
mod keys;
mod network;
mod peers;
mod persistence;
mod wallet;

use std::net::SocketAddr;
use std::time::Duration;

use bitcoin::secp256k1::PublicKey;
use chrono::{DateTime, Utc};
use lnp_ctl::payloads::{ChannelId, ChannelInfo, FundsInfo, NodeInfo};
use lnp_ctl::Failure;
use parking_lot::{Condvar, Mutex, RwLock};

pub use channels::{ChannelManager, MIN_FUNDING_SAT};
pub use keys::NodeKeys;
pub use network::NetworkListener;
pub use peers::PeerManager;
pub use persistence::Persistence;
pub use wallet::Wallet;

use crate::{Config, Error};

/// Node state shared between the network thread and control sessions.
///
/// There is no global lock over the node: each subsystem serializes its own
/// mutations.
#[derive(Debug)]
pub struct Node {
    config: Config,
    keys: NodeKeys,
    persister: Persistence,
    wallet: Wallet,
    peers: PeerManager,
    channels: ChannelManager,
    started_at: DateTime<Utc>,
    listening: RwLock<Option<SocketAddr>>,
    stop_requested: Mutex<bool>,
    stop_signal: Condvar,
}

/// Wires node subsystems from a loaded configuration
pub struct NodeBuilder {
    config: Config,
}

impl NodeBuilder {
    pub fn with(config: Config) -> NodeBuilder { NodeBuilder { config } }

    pub fn build(self) -> Result<Node, Error> {
        let config = self.config;
        debug!("Opening node storage in {}", config.data_dir.display());
        let persister = Persistence::open(&config.data_dir)?;
        let keys = NodeKeys::load_or_create(&config, &persister)?;
        let node_id = keys.node_id();
        let wallet = Wallet::open(config.wallet_file(), &persister, config.funds_sat)?;
        let channels = ChannelManager::open(node_id, config.channels_file(), &persister)?;
        info!("Node {} ({}) is set up for {}", node_id, config.alias, config.network);
        Ok(Node {
            peers: PeerManager::new(node_id),
            config,
            keys,
            persister,
            wallet,
            channels,
            started_at: Utc::now(),
            listening: empty!(),
            stop_requested: Mutex::new(false),
            stop_signal: Condvar::new(),
        })
    }
}

impl Node {
    pub fn config(&self) -> &Config { &self.config }

    pub fn node_id(&self) -> PublicKey { self.keys.node_id() }

    pub fn peers(&self) -> &PeerManager { &self.peers }

    pub fn channels(&self) -> &ChannelManager { &self.channels }

    pub fn wallet(&self) -> &Wallet { &self.wallet }

    pub(crate) fn set_listening(&self, addr: Option<SocketAddr>) { *self.listening.write() = addr; }

    pub fn listening(&self) -> Option<SocketAddr> { *self.listening.read() }

    pub fn info(&self) -> NodeInfo {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        NodeInfo {
            node_id: self.node_id(),
            alias: self.config.alias.clone(),
            network: self.config.network,
            listening: self.listening(),
            since: self.started_at,
            uptime_sec: uptime.num_seconds().max(0) as u64,
            peers: self.peers.count(),
            channels: self.channels.count(),
        }
    }

    pub fn funds(&self) -> FundsInfo {
        let onchain_sat = self.wallet.balance();
        let channel_sat = self.channels.open_balance_sat();
        FundsInfo { onchain_sat, channel_sat, total_sat: onchain_sat.saturating_add(channel_sat) }
    }

    pub fn fund_channel(
        &self,
        peer_id: PublicKey,
        amount_sat: u64,
        push_msat: u64,
    ) -> Result<ChannelInfo, Failure> {
        self.channels.fund(
            peer_id,
            amount_sat,
            push_msat,
            &self.peers,
            &self.wallet,
            &self.persister,
        )
    }

    pub fn close_channel(&self, channel_id: ChannelId) -> Result<ChannelInfo, Failure> {
        self.channels.close(channel_id, &self.wallet, &self.persister)
    }

    /// Persists wallet and channel book
    pub fn flush(&self) -> Result<(), Error> {
        self.wallet.flush(&self.persister)?;
        self.channels.flush(&self.persister)
    }

    /// Closes peer connections and persists the state
    pub fn shutdown(&self) -> Result<(), Error> {
        debug!("Disconnecting {} peer(s)", self.peers.count());
        self.peers.disconnect_all();
        self.flush()
    }

    pub fn request_stop(&self) {
        let mut requested = self.stop_requested.lock();
        if !*requested {
            info!("Node stop is requested");
            *requested = true;
        }
        self.stop_signal.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool { *self.stop_requested.lock() }

    /// Blocks until a stop is requested or `timeout` passes; returns whether
    /// the stop was requested.
    pub fn wait_stop(&self, timeout: Option<Duration>) -> bool {
        let mut requested = self.stop_requested.lock();
        match timeout {
            None => {
                while !*requested {
                    self.stop_signal.wait(&mut requested);
                }
            }
            Some(timeout) => {
                if !*requested {
                    let _ = self.stop_signal.wait_for(&mut requested, timeout);
                }
            }
        }
        *requested
    }
}

#[cfg(test)]
pub(crate) fn sample_node(dir: &std::path::Path) -> Node {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(crate::config::LNP_NODE_CONFIG),
        "network = \"regtest\"\nfunds_sat = 1000000\nlisten_port = 0\n",
    )
    .unwrap();
    NodeBuilder::with(Config::load(dir).unwrap()).build().unwrap()
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn identity_is_kept_between_starts() {
        let dir = TempDir::new().unwrap();
        let first = sample_node(dir.path()).node_id();
        assert_eq!(sample_node(dir.path()).node_id(), first);
    }

    #[test]
    fn info_and_funds() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let info = node.info();
        assert_eq!(info.alias, "lnp-node");
        assert_eq!(info.listening, None);
        assert_eq!(info.peers, 0);
        let funds = node.funds();
        assert_eq!(funds.onchain_sat, 1_000_000);
        assert_eq!(funds.total_sat, 1_000_000);
    }

    #[test]
    fn stop_wakes_waiter() {
        let dir = TempDir::new().unwrap();
        let node = Arc::new(sample_node(dir.path()));
        assert!(!node.wait_stop(Some(Duration::from_millis(10))));
        let waiter = {
            let node = node.clone();
            thread::spawn(move || node.wait_stop(None))
        };
        node.request_stop();
        assert!(waiter.join().unwrap());
        assert!(node.is_stop_requested());
    }
}
