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

use clap::ValueHint;
use lnp_ctl::payloads::ChannelId;

#[cfg(any(target_os = "linux", target_os = "freebsd", target_os = "openbsd", target_os = "netbsd"))]
pub const LNP_NODE_CTL_PATH: &str = "~/.lnp_node/lnpd.sock";
#[cfg(target_os = "macos")]
pub const LNP_NODE_CTL_PATH: &str = "~/Library/Application Support/LNP Node/lnpd.sock";
#[cfg(not(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "macos"
)))]
pub const LNP_NODE_CTL_PATH: &str = "./lnp_node/lnpd.sock";

/// Command-line tool for working with LNP node
#[derive(Parser, Clone, PartialEq, Eq, Debug)]
#[clap(name = "lnp-cli", bin_name = "lnp-cli", author, version)]
pub struct Opts {
    /// Control socket of the running node.
    #[clap(
        short = 'S',
        long,
        global = true,
        default_value = LNP_NODE_CTL_PATH,
        env = "LNP_NODE_CTL_SOCKET",
        value_hint = ValueHint::FilePath
    )]
    pub socket: PathBuf,

    /// Set verbosity level.
    ///
    /// Can be used multiple times to increase verbosity.
    #[clap(short, long, global = true, parse(from_occurrences))]
    pub verbose: u8,

    /// Command to execute
    #[clap(subcommand)]
    pub command: Command,
}

impl Opts {
    pub fn process(&mut self) {
        self.socket = PathBuf::from(shellexpand::tilde(&self.socket.to_string_lossy()).as_ref());
    }
}

/// Command-line commands:
#[derive(Subcommand, Clone, PartialEq, Eq, Debug, Display)]
pub enum Command {
    /// Checks that the node is responding
    #[display("ping")]
    Ping,

    /// General information about the running node
    #[display("info")]
    Info,

    /// Connect to the remote lightning network peer
    #[display("connect<{peer}>")]
    Connect {
        /// Address of the remote node, in '<node_id>@<host>:<port>' format
        peer: String,
    },

    /// Drops connection with a peer
    #[display("disconnect<{node_id}>")]
    Disconnect {
        /// Node id of the connected peer
        node_id: String,
    },

    /// Lists existing peer connections
    #[display("peers")]
    Peers,

    /// Opens a new channel with a remote peer, which must be already
    /// connected.
    #[display("open<{node_id}, {amount_sat}>")]
    Open {
        /// Node id of the connected peer
        node_id: String,

        /// Amount of satoshis to allocate to the channel
        amount_sat: u64,

        /// Amount of millisatoshis to pay to the remote peer at channel opening
        #[clap(long = "pay")]
        push_msat: Option<u64>,
    },

    /// Lists existing channels
    #[display("channels")]
    Channels,

    /// Closes the channel returning local balance to the node wallet
    #[display("close<{channel_id}>")]
    Close {
        /// Channel id as a hex string
        channel_id: ChannelId,
    },

    /// Lists funds available for channel creation and funds in channels
    #[display("funds")]
    Funds,

    /// Stops the node
    #[display("stop")]
    Stop,

    /// Calls arbitrary control method
    #[display("call<{method}>")]
    Call {
        /// Method name
        method: String,

        /// Method parameters as JSON
        params: Option<String>,
    },
}
