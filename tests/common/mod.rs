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

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Creates node directory with a regtest configuration listening on an
/// ephemeral port
pub fn node_dir(funds_sat: u64) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_config(dir.path(), funds_sat);
    dir
}

pub fn write_config(dir: &Path, funds_sat: u64) -> PathBuf {
    let file = dir.join("lnp_node.toml");
    fs::write(
        &file,
        format!(
            "network = \"regtest\"\nalias = \"test-node\"\nlisten_port = 0\nfunds_sat = {}\n",
            funds_sat
        ),
    )
    .unwrap();
    file
}

/// Polls `check` until it holds or five seconds pass
pub fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    check()
}
