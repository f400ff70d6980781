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

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::str::FromStr;
use std::time::Duration;

use bitcoin::secp256k1::PublicKey;
use chrono::Utc;
use lnp_ctl::payloads::{PeerDirection, PeerInfo};
use lnp_ctl::{Failure, FailureCode};
use parking_lot::RwLock;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Peer {
    info: PeerInfo,
    stream: TcpStream,
}

/// Registry of connected peers, keyed by remote node id.
///
/// Connections start with an identity exchange where each side writes its
/// node id as a hex line and reads the one of the remote.
#[derive(Debug)]
pub struct PeerManager {
    local_id: PublicKey,
    peers: RwLock<HashMap<PublicKey, Peer>>,
}

impl PeerManager {
    pub fn new(local_id: PublicKey) -> PeerManager {
        PeerManager { local_id, peers: empty!() }
    }

    /// Connects remote peer at `addr`, which must identify itself as `node_id`.
    /// Connecting already connected peer returns its current information.
    pub fn connect(&self, node_id: PublicKey, addr: &str) -> Result<PeerInfo, Failure> {
        if node_id == self.local_id {
            return Err(Failure::with(FailureCode::PeerConnection, "can't connect to self"));
        }
        if let Some(peer) = self.peers.read().get(&node_id) {
            debug!("Peer {} is already connected", node_id);
            return Ok(peer.info.clone());
        }

        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|err| {
                let msg = format!("invalid address `{}`: {}", addr, err);
                Failure::with(FailureCode::PeerConnection, msg)
            })?
            .next()
            .ok_or_else(|| {
                let msg = format!("address `{}` is not resolvable", addr);
                Failure::with(FailureCode::PeerConnection, msg)
            })?;

        debug!("Connecting peer {}@{}", node_id, socket_addr);
        let connection_failure = |err: io::Error| {
            Failure::with(
                FailureCode::PeerConnection,
                format!("unable to connect {}@{}: {}", node_id, socket_addr, err),
            )
        };
        let mut stream =
            TcpStream::connect_timeout(&socket_addr, CONNECT_TIMEOUT).map_err(connection_failure)?;
        let remote_id = self.exchange_ids(&mut stream).map_err(connection_failure)?;
        if remote_id != node_id {
            let _ = stream.shutdown(Shutdown::Both);
            return Err(Failure::with(
                FailureCode::PeerConnection,
                format!("peer at {} has identified itself as {}", socket_addr, remote_id),
            ));
        }

        let info = self.register(remote_id, socket_addr, PeerDirection::Outbound, stream);
        info!("Connected peer {}", node_id);
        Ok(info)
    }

    /// Completes inbound connection accepted by the network listener
    pub fn accept(&self, mut stream: TcpStream, addr: SocketAddr) -> io::Result<PeerInfo> {
        let remote_id = self.exchange_ids(&mut stream)?;
        if let Some(peer) = self.peers.read().get(&remote_id) {
            debug!("Peer {} is already connected, dropping new connection", remote_id);
            let _ = stream.shutdown(Shutdown::Both);
            return Ok(peer.info.clone());
        }
        let info = self.register(remote_id, addr, PeerDirection::Inbound, stream);
        info!("Accepted peer {} from {}", remote_id, addr);
        Ok(info)
    }

    fn register(
        &self,
        node_id: PublicKey,
        addr: SocketAddr,
        direction: PeerDirection,
        stream: TcpStream,
    ) -> PeerInfo {
        let info = PeerInfo { node_id, addr, direction, connected_since: Utc::now() };
        self.peers.write().insert(node_id, Peer { info: info.clone(), stream });
        info
    }

    fn exchange_ids(&self, stream: &mut TcpStream) -> io::Result<PublicKey> {
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;
        stream.write_all(format!("{}\n", self.local_id).as_bytes())?;
        stream.flush()?;

        let mut line = s!("");
        BufReader::new(stream.try_clone()?).read_line(&mut line)?;
        stream.set_read_timeout(None)?;

        let remote_id = PublicKey::from_str(line.trim()).map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, format!("invalid remote node id: {}", err))
        })?;
        if remote_id == self.local_id {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "connection to self"));
        }
        Ok(remote_id)
    }

    pub fn disconnect(&self, node_id: &PublicKey) -> Result<PeerInfo, Failure> {
        let peer = self.peers.write().remove(node_id).ok_or_else(|| {
            Failure::with(FailureCode::UnknownPeer, format!("peer {} is not connected", node_id))
        })?;
        if let Err(err) = peer.stream.shutdown(Shutdown::Both) {
            debug!("Peer {} connection was already closed: {}", node_id, err);
        }
        info!("Disconnected peer {}", node_id);
        Ok(peer.info)
    }

    pub fn disconnect_all(&self) {
        for (node_id, peer) in self.peers.write().drain() {
            trace!("Closing connection with {}", node_id);
            let _ = peer.stream.shutdown(Shutdown::Both);
        }
    }

    pub fn is_connected(&self, node_id: &PublicKey) -> bool {
        self.peers.read().contains_key(node_id)
    }

    pub fn count(&self) -> usize { self.peers.read().len() }

    pub fn list(&self) -> Vec<PeerInfo> {
        let mut list: Vec<_> = self.peers.read().values().map(|peer| peer.info.clone()).collect();
        list.sort_by_key(|info| info.node_id.serialize());
        list
    }
}
