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

use std::path::PathBuf;

use clap::{Parser, ValueHint};
use log::LevelFilter;

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
pub const LNP_NODE_DATA_DIR: &str = "~/.lnp_node";
#[cfg(target_os = "macos")]
pub const LNP_NODE_DATA_DIR: &str = "~/Library/Application Support/LNP Node";
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos"
)))]
pub const LNP_NODE_DATA_DIR: &str = "./lnp_node";

/// Lightning node daemon serving control requests over a unix socket
#[derive(Parser, Clone, PartialEq, Eq, Debug)]
#[clap(name = "lnpd", bin_name = "lnpd", author, version)]
pub struct Opts {
    /// Set verbosity level.
    ///
    /// Can be used multiple times to increase verbosity. Without it the level
    /// from the configuration file is used.
    #[clap(short, long, global = true, parse(from_occurrences))]
    pub verbose: u8,

    /// Node directory or path to the configuration file.
    ///
    /// Node directory must contain `lnp_node.toml`; it also becomes the data
    /// directory unless the configuration says otherwise.
    #[clap(
        short,
        long,
        default_value = LNP_NODE_DATA_DIR,
        env = "LNP_NODE_CONFIG",
        value_hint = ValueHint::AnyPath
    )]
    pub config: String,

    /// Control socket path overriding the one from the configuration
    #[clap(short = 'x', long, env = "LNP_NODE_CTL_SOCKET", value_hint = ValueHint::FilePath)]
    pub ctl_socket: Option<PathBuf>,

    /// Do not accept peer connections
    #[clap(long)]
    pub no_listen: bool,
}

impl Opts {
    pub fn process(&mut self) { self.config = shellexpand::tilde(&self.config).to_string(); }

    /// Log level requested from the command line, if any
    pub fn log_level(&self) -> Option<LevelFilter> {
        match self.verbose {
            0 => None,
            1 => Some(LevelFilter::Debug),
            _ => Some(LevelFilter::Trace),
        }
    }
}
