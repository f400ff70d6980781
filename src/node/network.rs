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

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::Node;
use crate::worker::{Worker, POLL_INTERVAL};
use crate::Error;

/// Period of persisting node state from the network thread
const FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Accepts inbound peer connections and periodically flushes node state
#[derive(Debug)]
pub struct NetworkListener {
    local_addr: SocketAddr,
    worker: Worker,
}

impl NetworkListener {
    pub fn start(node: Arc<Node>) -> Result<NetworkListener, Error> {
        let addr = node.config().listen_addr;
        let listener = TcpListener::bind(addr).map_err(|err| Error::NetworkBind(addr, err.into()))?;
        listener.set_nonblocking(true).map_err(|err| Error::NetworkBind(addr, err.into()))?;
        let local_addr = listener.local_addr()?;
        info!("Listening for peer connections on {}", local_addr);

        let worker = Worker::spawn("lnp-network", move |stop| {
            let mut last_flush = Instant::now();
            let mut handshakes: Vec<JoinHandle<()>> = vec![];
            while !stop.is_set() {
                match listener.accept() {
                    Ok((stream, remote)) => {
                        debug!("Incoming connection from {}", remote);
                        let node = node.clone();
                        // handshake may block, so it is completed off the accept loop
                        let spawned = thread::Builder::new()
                            .name(format!("lnp-peer-{}", remote))
                            .spawn(move || accept_peer(&node, stream, remote));
                        match spawned {
                            Ok(handshake) => handshakes.push(handshake),
                            Err(err) => {
                                error!("Unable to process connection from {}: {}", remote, err)
                            }
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(POLL_INTERVAL)
                    }
                    Err(err) => {
                        warn!("Failed to accept peer connection: {}", err);
                        thread::sleep(POLL_INTERVAL)
                    }
                }
                handshakes.retain(|handshake| !handshake.is_finished());
                if last_flush.elapsed() >= FLUSH_INTERVAL {
                    if let Err(err) = node.flush() {
                        error!("Unable to persist node state: {}", err);
                    }
                    last_flush = Instant::now();
                }
            }
            // pending handshakes end within the peer handshake timeout
            for handshake in handshakes {
                if handshake.join().is_err() {
                    error!("Peer handshake thread has panicked");
                }
            }
            debug!("Peer listener on {} is stopped", local_addr);
        })?;

        Ok(NetworkListener { local_addr, worker })
    }

    pub fn local_addr(&self) -> SocketAddr { self.local_addr }

    pub fn stop(self, timeout: Duration) -> Result<(), Error> { self.worker.stop(timeout) }
}

fn accept_peer(node: &Node, stream: TcpStream, remote: SocketAddr) {
    let res = stream.set_nonblocking(false);
    if let Err(err) = res.and_then(|_| node.peers().accept(stream, remote)) {
        warn!("Handshake with {} has failed: {}", remote, err);
    }
}
