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
    // unused_imports,
    // dead_code
)]

//! Control protocol of the embedded LNP node: newline-delimited JSON request
//! and response envelopes, failure codes and typed payloads of the built-in
//! methods, plus a blocking client for the unix control socket.

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_with;
extern crate serde_crate as serde;

mod client;
mod error;
mod messages;
pub mod payloads;

pub use client::Client;
pub use error::{Error, Failure, FailureCode};
pub use messages::{Id, Request, Response, JSONRPC_VERSION};

/// Default name of the control socket file inside the node data directory
pub const LNP_NODE_CTL_SOCKET: &str = "lnpd.sock";
