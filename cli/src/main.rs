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
    dead_code
    // missing_docs,
)]

//! Command-line interface to LNP node

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate log;
#[macro_use]
extern crate clap;

mod command;
mod opts;

use std::process::exit;

use clap::Parser;
use lnp_ctl::Client;
use log::LevelFilter;

use crate::command::Exec;
pub use crate::opts::{Command, Opts};

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() {
    let mut opts = Opts::parse();
    opts.process();
    env_logger::Builder::new().filter_level(log_level(opts.verbose)).parse_env("RUST_LOG").init();

    trace!("Command-line arguments: {:?}", opts);

    let mut client = match Client::with(&opts.socket) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Unable to connect {}: {}", opts.socket.display(), err);
            exit(1);
        }
    };

    trace!("Executing command: {:?}", opts.command);
    if let Err(err) = opts.command.exec(&mut client) {
        eprintln!("{}", err);
        exit(1);
    }
}
