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

//! Control server accepting command requests over a unix-domain socket

mod session;

use std::fs;
use std::io;
use std::net::Shutdown;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::node::Node;
use crate::rpc::RpcDispatcher;
use crate::worker::{Worker, POLL_INTERVAL};
use crate::Error;

/// Time given to each control thread to finish during shutdown
pub const CTL_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Session {
    stream: UnixStream,
    worker: Worker,
}

type Sessions = Arc<Mutex<Vec<Session>>>;

/// Control socket bound to a node.
///
/// Connections are served by independent session threads, so a slow request
/// never blocks other clients. The socket file is removed on shutdown.
#[derive(Debug)]
pub struct ControlServer {
    path: PathBuf,
    acceptor: Option<Worker>,
    sessions: Sessions,
}

impl ControlServer {
    /// Binds socket at `path` and starts accepting connections.
    ///
    /// A socket file left by a process which is not running anymore is
    /// replaced; a socket served by a live process is never touched.
    pub fn bind(
        path: impl AsRef<Path>,
        node: Arc<Node>,
        dispatcher: Arc<RpcDispatcher>,
    ) -> Result<ControlServer, Error> {
        let path = path.as_ref().to_path_buf();
        prepare_socket_path(&path)?;

        let listener =
            UnixListener::bind(&path).map_err(|err| Error::SocketBind(path.clone(), err.into()))?;
        let setup = listener
            .set_nonblocking(true)
            .and_then(|_| fs::set_permissions(&path, fs::Permissions::from_mode(0o600)));
        if let Err(err) = setup {
            let _ = fs::remove_file(&path);
            return Err(Error::SocketBind(path, err.into()));
        }
        info!("Control socket is bound to {}", path.display());

        let sessions = Sessions::default();
        let registry = sessions.clone();
        let acceptor = Worker::spawn("lnp-ctl", move |stop| {
            let mut counter = 0usize;
            while !stop.is_set() {
                match listener.accept() {
                    Ok((stream, _)) => {
                        counter += 1;
                        match start_session(counter, stream, &node, &dispatcher) {
                            Ok(session) => registry.lock().push(session),
                            Err(err) => error!("Unable to start control session: {}", err),
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(POLL_INTERVAL)
                    }
                    Err(err) => {
                        warn!("Failed to accept control connection: {}", err);
                        thread::sleep(POLL_INTERVAL)
                    }
                }
                reap_finished(&registry);
            }
        });
        let acceptor = match acceptor {
            Ok(acceptor) => acceptor,
            Err(err) => {
                let _ = fs::remove_file(&path);
                return Err(err);
            }
        };

        Ok(ControlServer { path, acceptor: Some(acceptor), sessions })
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Number of connected control clients
    pub fn session_count(&self) -> usize {
        self.sessions.lock().iter().filter(|session| !session.worker.is_finished()).count()
    }

    /// Stops accepting, closes sessions and removes the socket file. Every
    /// step is attempted even if a previous one fails; the first failure is
    /// returned.
    pub fn shutdown(mut self) -> Result<(), Error> { self.teardown() }

    fn teardown(&mut self) -> Result<(), Error> {
        let acceptor = match self.acceptor.take() {
            Some(acceptor) => acceptor,
            None => return Ok(()),
        };
        debug!("Shutting down control socket {}", self.path.display());
        let mut result = acceptor.stop(CTL_STOP_TIMEOUT);

        let sessions = std::mem::take(&mut *self.sessions.lock());
        for session in &sessions {
            session.worker.signal();
            let _ = session.stream.shutdown(Shutdown::Both);
        }
        for session in sessions {
            let name = session.worker.name().to_owned();
            if let Err(err) = session.worker.stop(CTL_STOP_TIMEOUT) {
                error!("Control session {} is not closed properly: {}", name, err);
                result = result.and(Err(err));
            }
        }

        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Unable to remove control socket {}: {}", self.path.display(), err);
                result = result.and(Err(Error::SocketBind(self.path.clone(), err.into())));
            }
        }
        info!("Control socket {} is closed", self.path.display());
        result
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!("Control server shutdown has failed: {}", err);
        }
    }
}

fn prepare_socket_path(path: &Path) -> Result<(), Error> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(Error::SocketBind(path.to_path_buf(), err.into())),
    };
    if !metadata.file_type().is_socket() {
        return Err(Error::NotASocket(path.to_path_buf()));
    }
    ensure_stale(path, UnixStream::connect(path))?;
    warn!("Removing stale control socket {}", path.display());
    fs::remove_file(path).map_err(|err| Error::SocketBind(path.to_path_buf(), err.into()))
}

/// Only a refused connection proves that nobody serves the socket
fn ensure_stale(path: &Path, connection: io::Result<UnixStream>) -> Result<(), Error> {
    match connection {
        Ok(_) => Err(Error::SocketInUse(path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::ConnectionRefused => Ok(()),
        Err(err) => Err(Error::SocketBind(path.to_path_buf(), err.into())),
    }
}

fn start_session(
    no: usize,
    stream: UnixStream,
    node: &Arc<Node>,
    dispatcher: &Arc<RpcDispatcher>,
) -> Result<Session, Error> {
    stream.set_nonblocking(false)?;
    let handle = stream.try_clone()?;
    let node = node.clone();
    let dispatcher = dispatcher.clone();
    let name = format!("lnp-ctl-session-{}", no);
    debug!("Starting control session {}", name);
    let worker = Worker::spawn(name, move |stop| {
        if let Err(err) = session::serve(stream, node, dispatcher, stop) {
            debug!("Control session has ended with error: {}", err);
        }
    })?;
    Ok(Session { stream: handle, worker })
}

fn reap_finished(sessions: &Sessions) {
    let mut sessions = sessions.lock();
    if sessions.iter().all(|session| !session.worker.is_finished()) {
        return;
    }
    let (finished, active): (Vec<_>, Vec<_>) =
        sessions.drain(..).partition(|session| session.worker.is_finished());
    *sessions = active;
    drop(sessions);
    for session in finished {
        if let Err(err) = session.worker.stop(CTL_STOP_TIMEOUT) {
            error!("Control session has failed: {}", err);
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::{BufRead, BufReader, Read, Write};

    use lnp_ctl::Response;
    use tempfile::TempDir;

    use super::*;
    use crate::node::sample_node;

    fn server(dir: &TempDir, path: &Path) -> ControlServer {
        let node = Arc::new(sample_node(&dir.path().join("node")));
        ControlServer::bind(path, node, Arc::new(RpcDispatcher::with_builtins())).unwrap()
    }

    fn exchange(stream: &mut UnixStream, line: &str) -> Response {
        stream.write_all(line.as_bytes()).unwrap();
        stream.write_all(b"\n").unwrap();
        let mut reply = String::new();
        BufReader::new(stream.try_clone().unwrap()).read_line(&mut reply).unwrap();
        serde_json::from_str(&reply).unwrap()
    }

    #[test]
    fn serves_requests_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ctl.sock");
        let server = server(&dir, &path);
        assert_eq!(server.path(), path);

        let mut client = UnixStream::connect(&path).unwrap();
        let response = exchange(&mut client, "{\"id\":1,\"method\":\"ping\"}");
        assert!(response.is_success());
        let response = exchange(&mut client, "garbage");
        assert!(!response.is_success());
        let response = exchange(&mut client, "{\"id\":2,\"method\":\"ping\"}");
        assert_eq!(response.id, Some(2u64.into()));

        server.shutdown().unwrap();
        assert!(!path.exists());
        let mut rest = Vec::new();
        assert_eq!(client.read_to_end(&mut rest).unwrap(), 0);
        assert!(UnixStream::connect(&path).is_err());
    }

    #[test]
    fn replaces_stale_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stale.sock");
        drop(UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let server = server(&dir, &path);
        let mut client = UnixStream::connect(&path).unwrap();
        assert!(exchange(&mut client, "{\"method\":\"ping\"}").is_success());
        server.shutdown().unwrap();
    }

    #[test]
    fn refuses_live_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live.sock");
        let _listener = UnixListener::bind(&path).unwrap();
        let node = Arc::new(sample_node(dir.path()));
        let err = ControlServer::bind(&path, node, Arc::new(RpcDispatcher::new())).unwrap_err();
        assert!(matches!(err, Error::SocketInUse(_)));
        assert!(path.exists());
    }

    #[test]
    fn stale_only_when_refused() {
        let path = Path::new("ctl.sock");
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert!(ensure_stale(path, Err(refused)).is_ok());
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(ensure_stale(path, Err(denied)), Err(Error::SocketBind(..))));
        let (live, _) = UnixStream::pair().unwrap();
        assert!(matches!(ensure_stale(path, Ok(live)), Err(Error::SocketInUse(_))));
    }

    #[test]
    fn refuses_regular_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.sock");
        fs::write(&path, b"data").unwrap();
        let node = Arc::new(sample_node(dir.path()));
        let err = ControlServer::bind(&path, node, Arc::new(RpcDispatcher::new())).unwrap_err();
        assert!(matches!(err, Error::NotASocket(_)));
        assert_eq!(fs::read(&path).unwrap(), b"data");
    }

    #[test]
    fn sessions_are_independent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ctl.sock");
        let server = server(&dir, &path);

        let mut idle = UnixStream::connect(&path).unwrap();
        let mut active = UnixStream::connect(&path).unwrap();
        // unfinished request on one connection does not stall the other
        idle.write_all(b"{\"method\":").unwrap();
        for id in 0..5u64 {
            let response = exchange(&mut active, &format!("{{\"id\":{},\"method\":\"ping\"}}", id));
            assert_eq!(response.id, Some(id.into()));
        }
        let mut attempts = 0;
        while server.session_count() < 2 && attempts < 100 {
            thread::sleep(POLL_INTERVAL);
            attempts += 1;
        }
        assert_eq!(server.session_count(), 2);

        drop(active);
        drop(idle);
        server.shutdown().unwrap();
    }
}
