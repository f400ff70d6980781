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

use std::collections::BTreeMap;
use std::path::PathBuf;

use bitcoin::hashes::{sha256, Hash, HashEngine};
use bitcoin::secp256k1::PublicKey;
use chrono::Utc;
use lnp_ctl::payloads::{ChannelId, ChannelInfo, ChannelState};
use lnp_ctl::{Failure, FailureCode};
use parking_lot::Mutex;

use super::{PeerManager, Persistence, Wallet};
use crate::Error;

/// Smallest channel the node agrees to fund
pub const MIN_FUNDING_SAT: u64 = 20_000;

#[derive(Debug)]
struct ChannelBook {
    channels: BTreeMap<ChannelId, ChannelInfo>,
    counter: u64,
}

/// Book of channels funded by the node, both open and closed
#[derive(Debug)]
pub struct ChannelManager {
    local_id: PublicKey,
    file: PathBuf,
    book: Mutex<ChannelBook>,
}

impl ChannelManager {
    pub fn open(
        local_id: PublicKey,
        file: PathBuf,
        persister: &Persistence,
    ) -> Result<ChannelManager, Error> {
        let list = persister.load::<Vec<ChannelInfo>>(&file)?.unwrap_or_default();
        debug!("Loaded {} channel(s) from {}", list.len(), file.display());
        let counter = list.len() as u64;
        let channels = list.into_iter().map(|info| (info.channel_id, info)).collect();
        Ok(ChannelManager { local_id, file, book: Mutex::new(ChannelBook { channels, counter }) })
    }

    /// Funds new channel with a connected peer from the on-chain wallet.
    ///
    /// Wallet and channel book are both persisted before the channel is
    /// reported; on a storage failure the funds return to the wallet.
    pub fn fund(
        &self,
        peer_id: PublicKey,
        amount_sat: u64,
        push_msat: u64,
        peers: &PeerManager,
        wallet: &Wallet,
        persister: &Persistence,
    ) -> Result<ChannelInfo, Failure> {
        if amount_sat < MIN_FUNDING_SAT {
            return Err(Failure::with(
                FailureCode::InvalidAmount,
                format!("channel amount must be at least {} sat", MIN_FUNDING_SAT),
            ));
        }
        let capacity_msat = amount_sat.checked_mul(1000).ok_or_else(|| {
            Failure::with(FailureCode::InvalidAmount, "channel amount is too large")
        })?;
        if push_msat > capacity_msat {
            return Err(Failure::with(
                FailureCode::InvalidAmount,
                format!("push amount {} msat exceeds channel capacity", push_msat),
            ));
        }
        if !peers.is_connected(&peer_id) {
            return Err(Failure::with(
                FailureCode::UnknownPeer,
                format!("peer {} is not connected", peer_id),
            ));
        }

        let mut book = self.book.lock();
        wallet.withdraw(amount_sat)?;

        book.counter += 1;
        let channel_id = self.channel_id(&peer_id, amount_sat, book.counter);
        let info = ChannelInfo {
            channel_id,
            peer_id,
            capacity_sat: amount_sat,
            local_balance_msat: capacity_msat - push_msat,
            push_msat,
            state: ChannelState::Open,
            opened_at: Utc::now(),
            closed_at: None,
        };
        book.channels.insert(channel_id, info.clone());

        if let Err(err) = self.persist(&book, wallet, persister) {
            error!("Unable to persist channel {}: {}", channel_id, err);
            book.channels.remove(&channel_id);
            wallet.deposit(amount_sat);
            return Err(Failure::with(FailureCode::Storage, err));
        }

        info!("Opened channel {} with {} for {} sat", channel_id, peer_id, amount_sat);
        Ok(info)
    }

    /// Closes open channel returning local balance to the on-chain wallet
    pub fn close(
        &self,
        channel_id: ChannelId,
        wallet: &Wallet,
        persister: &Persistence,
    ) -> Result<ChannelInfo, Failure> {
        let mut book = self.book.lock();
        let channel = book.channels.get_mut(&channel_id).ok_or_else(|| {
            Failure::with(FailureCode::UnknownChannel, format!("unknown channel {}", channel_id))
        })?;
        if channel.state != ChannelState::Open {
            return Err(Failure::with(
                FailureCode::ChannelNotOpen,
                format!("channel {} is already closed", channel_id),
            ));
        }
        channel.state = ChannelState::Closed;
        channel.closed_at = Some(Utc::now());
        let refund_sat = channel.local_balance_msat / 1000;
        let info = channel.clone();
        wallet.deposit(refund_sat);

        if let Err(err) = self.persist(&book, wallet, persister) {
            error!("Unable to persist closing of channel {}: {}", channel_id, err);
            let _ = wallet.withdraw(refund_sat);
            if let Some(channel) = book.channels.get_mut(&channel_id) {
                channel.state = ChannelState::Open;
                channel.closed_at = None;
            }
            return Err(Failure::with(FailureCode::Storage, err));
        }

        info!("Closed channel {}, {} sat returned to the wallet", channel_id, refund_sat);
        Ok(info)
    }

    fn channel_id(&self, peer_id: &PublicKey, amount_sat: u64, counter: u64) -> ChannelId {
        let mut engine = sha256::Hash::engine();
        engine.input(&self.local_id.serialize());
        engine.input(&peer_id.serialize());
        engine.input(&amount_sat.to_be_bytes());
        engine.input(&counter.to_be_bytes());
        let now = Utc::now();
        engine.input(&now.timestamp().to_be_bytes());
        engine.input(&now.timestamp_subsec_nanos().to_be_bytes());
        ChannelId::from(sha256::Hash::from_engine(engine).into_inner())
    }

    fn persist(
        &self,
        book: &ChannelBook,
        wallet: &Wallet,
        persister: &Persistence,
    ) -> Result<(), Error> {
        wallet.flush(persister)?;
        let list = book.channels.values().collect::<Vec<_>>();
        persister.store(&self.file, &list)
    }

    pub fn list(&self) -> Vec<ChannelInfo> {
        let mut list: Vec<_> = self.book.lock().channels.values().cloned().collect();
        list.sort_by_key(|info| info.opened_at);
        list
    }

    /// Number of channels in the open state
    pub fn count(&self) -> usize {
        self.book.lock().channels.values().filter(|info| info.state == ChannelState::Open).count()
    }

    /// Local balance of all open channels, in satoshis
    pub fn open_balance_sat(&self) -> u64 {
        self.book
            .lock()
            .channels
            .values()
            .filter(|info| info.state == ChannelState::Open)
            .map(|info| info.local_balance_msat / 1000)
            .sum()
    }

    pub fn flush(&self, persister: &Persistence) -> Result<(), Error> {
        let book = self.book.lock();
        let list = book.channels.values().collect::<Vec<_>>();
        persister.store(&self.file, &list)
    }
}

#[cfg(test)]
mod test {
    use std::net::TcpListener;
    use std::thread;

    use bitcoin::secp256k1::{Secp256k1, SecretKey};
    use tempfile::TempDir;

    use super::*;

    fn node_id(byte: u8) -> PublicKey {
        let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
        PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret)
    }

    fn connected_peers() -> (PeerManager, PeerManager) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let acceptor = thread::spawn(move || {
            let remote = PeerManager::new(node_id(2));
            let (stream, from) = listener.accept().unwrap();
            remote.accept(stream, from).unwrap();
            remote
        });
        let local = PeerManager::new(node_id(1));
        local.connect(node_id(2), &addr.to_string()).unwrap();
        (local, acceptor.join().unwrap())
    }

    #[test]
    fn fund_and_close() {
        let dir = TempDir::new().unwrap();
        let store = Persistence::open(dir.path()).unwrap();
        let wallet = Wallet::open(dir.path().join("wallet.json"), &store, 100_000).unwrap();
        let file = dir.path().join("channels.json");
        let manager = ChannelManager::open(node_id(1), file.clone(), &store).unwrap();
        let (peers, _remote) = connected_peers();

        let channel = manager.fund(node_id(2), 30_000, 1_000_000, &peers, &wallet, &store).unwrap();
        assert_eq!(channel.state, ChannelState::Open);
        assert_eq!(channel.local_balance_msat, 29_000_000);
        assert_eq!(wallet.balance(), 70_000);
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.open_balance_sat(), 29_000);

        let closed = manager.close(channel.channel_id, &wallet, &store).unwrap();
        assert_eq!(closed.state, ChannelState::Closed);
        assert!(closed.closed_at.is_some());
        assert_eq!(wallet.balance(), 99_000);
        assert_eq!(manager.count(), 0);

        let failure = manager.close(channel.channel_id, &wallet, &store).unwrap_err();
        assert_eq!(failure.code, FailureCode::ChannelNotOpen);

        let reopened = ChannelManager::open(node_id(1), file, &store).unwrap();
        assert_eq!(reopened.list(), vec![closed]);
    }

    #[test]
    fn funding_failures() {
        let dir = TempDir::new().unwrap();
        let store = Persistence::open(dir.path()).unwrap();
        let wallet = Wallet::open(dir.path().join("wallet.json"), &store, 50_000).unwrap();
        let manager =
            ChannelManager::open(node_id(1), dir.path().join("channels.json"), &store).unwrap();
        let (peers, _remote) = connected_peers();

        let fund = |peer, amount, push| manager.fund(peer, amount, push, &peers, &wallet, &store);
        assert_eq!(fund(node_id(2), 1_000, 0).unwrap_err().code, FailureCode::InvalidAmount);
        assert_eq!(
            fund(node_id(2), 30_000, 30_000_001).unwrap_err().code,
            FailureCode::InvalidAmount
        );
        assert_eq!(fund(node_id(3), 30_000, 0).unwrap_err().code, FailureCode::UnknownPeer);
        assert_eq!(
            fund(node_id(2), 60_000, 0).unwrap_err().code,
            FailureCode::InsufficientFunds
        );
        assert_eq!(wallet.balance(), 50_000);
        assert!(manager.list().is_empty());
    }

    #[test]
    fn unknown_channel() {
        let dir = TempDir::new().unwrap();
        let store = Persistence::open(dir.path()).unwrap();
        let wallet = Wallet::open(dir.path().join("wallet.json"), &store, 0).unwrap();
        let manager =
            ChannelManager::open(node_id(1), dir.path().join("channels.json"), &store).unwrap();
        let failure = manager.close(ChannelId::from([7u8; 32]), &wallet, &store).unwrap_err();
        assert_eq!(failure.code, FailureCode::UnknownChannel);
    }
}
