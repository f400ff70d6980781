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
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use amplify::IoError;

/// Failures of the facade lifecycle: node construction, listening, control
/// socket binding and teardown.
///
/// Business failures of control methods are not represented here; they are
/// returned inside control responses as [`lnp_ctl::Failure`].
#[derive(Debug, Display, From, Error)]
#[display(doc_comments)]
#[non_exhaustive]
pub enum Error {
    /// I/O error: {0}
    #[from(io::Error)]
    Io(IoError),

    /// unable to read configuration from {0:?}: {1}
    ConfigRead(PathBuf, String),

    /// malformed configuration in {0:?}: {1}
    ConfigMalformed(PathBuf, String),

    /// unable to prepare data directory {0:?}: {1}
    DataDir(PathBuf, IoError),

    /// storage {0:?} can't be used: {1}
    Storage(PathBuf, String),

    /// invalid node key material: {0}
    Keys(String),

    /// node is already listening for peer connections on {0}
    AlreadyListening(SocketAddr),

    /// unable to start peer network listener on {0}: {1}
    NetworkBind(SocketAddr, IoError),

    /// control socket is already bound for this node
    AlreadyBound,

    /// control socket {0:?} is served by a running process
    SocketInUse(PathBuf),

    /// path {0:?} already exists and is not a socket
    NotASocket(PathBuf),

    /// unable to bind control socket {0:?}: {1}
    SocketBind(PathBuf, IoError),

    /// method {0:?} is already registered
    DuplicateMethod(String),

    /// {0} has not stopped within {1:?}
    StopTimeout(String, Duration),

    /// {0} has terminated abnormally
    WorkerPanic(String),

    /// node handle is null
    NullHandle,

    /// argument {0:?} is not a valid UTF-8 C string
    InvalidString(&'static str),

    /// unrecoverable error "{0}"
    Terminate(String),
}

impl Error {
    /// Status code reported through the C ABI; always negative.
    pub fn status_code(&self) -> i64 {
        match self {
            Error::NullHandle | Error::InvalidString(_) => -1,
            Error::AlreadyBound => -2,
            Error::SocketInUse(_) => -3,
            Error::NotASocket(_) => -4,
            Error::SocketBind(..) => -5,
            Error::AlreadyListening(_) => -6,
            Error::NetworkBind(..) => -7,
            Error::Terminate(_) => -99,
            _ => -10,
        }
    }
}
