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

#![recursion_limit = "256"]
// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code,
    missing_docs
)]

//! Main executable for lnpd: lightning node with a unix-socket control
//! interface.

#[macro_use]
extern crate log;

use clap::Parser;
use lnp_embed::opts::Opts;
use lnp_embed::{Config, Error, NodeHandle};

fn main() -> Result<(), Error> {
    let mut opts = Opts::parse();
    opts.process();

    let config = Config::load(&opts.config)?;
    env_logger::Builder::new()
        .filter_level(opts.log_level().unwrap_or(config.log_level))
        .parse_env("RUST_LOG")
        .init();
    trace!("Command-line arguments: {:?}", &opts);
    trace!("Daemon configuration: {:?}", &config);

    let ctl_socket = opts.ctl_socket.clone().unwrap_or_else(|| config.ctl_socket.clone());
    let handle = NodeHandle::with_config(config)?;
    info!("Local node id: {}", handle.node_id());

    handle.bind_unix_socket(&ctl_socket)?;
    if !opts.no_listen {
        handle.start_listening()?;
    }

    debug!("Waiting for stop request");
    handle.wait_stop_request(None);
    handle.release()
}
