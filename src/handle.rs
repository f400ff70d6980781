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

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bitcoin::secp256k1::PublicKey;
use lnp_ctl::Response;
use parking_lot::Mutex;
use serde_json::Value;

use crate::ctl::ControlServer;
use crate::node::{NetworkListener, Node, NodeBuilder};
use crate::rpc::{Method, RpcDispatcher};
use crate::{Config, Error};

/// Time given to the network thread to finish on release
pub const NETWORK_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Exclusively owned node instance.
///
/// The handle is created idle: the peer network is started with
/// [`NodeHandle::start_listening`] and a control socket is attached with
/// [`NodeHandle::bind_unix_socket`]. All other methods take `&self` and can
/// be used concurrently. [`NodeHandle::release`] consumes the handle, so it
/// can't be used after teardown; dropping the handle performs the same
/// teardown and logs its failures.
#[derive(Debug)]
pub struct NodeHandle {
    node: Arc<Node>,
    dispatcher: Arc<RpcDispatcher>,
    network: Mutex<Option<NetworkListener>>,
    control: Mutex<Option<ControlServer>>,
    bound: AtomicBool,
    released: bool,
}

impl NodeHandle {
    /// Loads configuration from `path` and constructs the node
    pub fn create(path: impl AsRef<Path>) -> Result<NodeHandle, Error> {
        let config = Config::load(path)?;
        NodeHandle::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<NodeHandle, Error> {
        let node = NodeBuilder::with(config).build()?;
        Ok(NodeHandle {
            node: Arc::new(node),
            dispatcher: Arc::new(RpcDispatcher::with_builtins()),
            network: empty!(),
            control: empty!(),
            bound: AtomicBool::new(false),
            released: false,
        })
    }

    pub fn config(&self) -> &Config { self.node.config() }

    pub fn node_id(&self) -> PublicKey { self.node.node_id() }

    /// Starts the peer network thread; returns the address it listens on.
    /// Calling it on a listening node is an error.
    pub fn start_listening(&self) -> Result<SocketAddr, Error> {
        let mut network = self.network.lock();
        if let Some(ref listener) = *network {
            return Err(Error::AlreadyListening(listener.local_addr()));
        }
        let listener = NetworkListener::start(self.node.clone())?;
        let addr = listener.local_addr();
        self.node.set_listening(Some(addr));
        *network = Some(listener);
        Ok(addr)
    }

    pub fn listening_addr(&self) -> Option<SocketAddr> { self.node.listening() }

    /// Binds control socket at `path`. Only one control socket may be bound
    /// per handle; a second attempt fails and keeps the first one intact.
    pub fn bind_unix_socket(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        if self.bound.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(Error::AlreadyBound);
        }
        match ControlServer::bind(path, self.node.clone(), self.dispatcher.clone()) {
            Ok(server) => {
                *self.control.lock() = Some(server);
                Ok(())
            }
            Err(err) => {
                self.bound.store(false, Ordering::Release);
                Err(err)
            }
        }
    }

    /// Path of the bound control socket
    pub fn socket_path(&self) -> Option<PathBuf> {
        self.control.lock().as_ref().map(|server| server.path().to_path_buf())
    }

    /// Adds custom control method
    pub fn register_method(&self, method: Arc<dyn Method>) -> Result<(), Error> {
        self.dispatcher.register(method)
    }

    /// Runs control method with a JSON payload and returns the JSON response
    /// envelope. Failures of the method are reported inside the response.
    pub fn dispatch(&self, method: &str, payload: &str) -> String {
        self.dispatcher.dispatch_str(&self.node, method, payload).to_line()
    }

    pub fn call(&self, method: &str, params: Value) -> Response {
        self.dispatcher.dispatch(&self.node, method, params)
    }

    /// Blocks until `stop` is requested or `timeout` passes
    pub fn wait_stop_request(&self, timeout: Option<Duration>) -> bool {
        self.node.wait_stop(timeout)
    }

    pub fn request_stop(&self) { self.node.request_stop() }

    /// Stops control socket and peer network, closes peer connections and
    /// persists node state. All steps run even if some of them fail; the
    /// first failure is returned.
    pub fn release(mut self) -> Result<(), Error> { self.teardown() }

    fn teardown(&mut self) -> Result<(), Error> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        debug!("Releasing node {}", self.node.node_id());
        let mut result = Ok(());

        if let Some(server) = self.control.lock().take() {
            if let Err(err) = server.shutdown() {
                error!("Control socket shutdown has failed: {}", err);
                result = result.and(Err(err));
            }
            self.bound.store(false, Ordering::Release);
        }

        if let Some(listener) = self.network.lock().take() {
            if let Err(err) = listener.stop(NETWORK_STOP_TIMEOUT) {
                error!("Peer network shutdown has failed: {}", err);
                result = result.and(Err(err));
            }
            self.node.set_listening(None);
        }

        if let Err(err) = self.node.shutdown() {
            error!("Unable to persist node state: {}", err);
            result = result.and(Err(err));
        }
        info!("Node {} is released", self.node.node_id());
        result
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!("Node teardown has failed: {}", err);
        }
    }
}
