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

//! Single test in its own binary: it counts threads of the whole process.

mod common;

use std::fs;
use std::net::TcpStream;

use lnp_embed::NodeHandle;

use common::{eventually, node_dir};

fn thread_count() -> usize { fs::read_dir("/proc/self/task").unwrap().count() }

#[test]
fn release_stops_background_threads() {
    let dir = node_dir(0);
    let socket = dir.path().join("ctl.sock");
    let before = thread_count();

    let handle = NodeHandle::create(dir.path()).unwrap();
    let addr = handle.start_listening().unwrap();
    handle.bind_unix_socket(&socket).unwrap();
    assert!(thread_count() > before);
    assert!(TcpStream::connect(addr).is_ok());

    handle.release().unwrap();
    assert!(TcpStream::connect(addr).is_err());
    assert!(!socket.exists());
    assert!(eventually(|| thread_count() == before), "threads left: {}", thread_count() - before);
}
