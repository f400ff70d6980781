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

//! Embeddable LNP node: a node handle with explicit lifecycle, a unix-socket
//! control server, a control method dispatcher and a C ABI over them.

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

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate log;

extern crate serde_crate as serde;
#[macro_use]
extern crate serde_with;

pub mod config;
pub mod ctl;
mod error;
pub mod ffi;
mod handle;
mod last_error;
pub mod node;
#[cfg(feature = "server")]
pub mod opts;
pub mod rpc;
mod worker;

pub use config::Config;
pub use error::Error;
pub use handle::{NodeHandle, NETWORK_STOP_TIMEOUT};
pub use last_error::{clear_last_error, last_error, set_last_error};
pub use lnp_ctl::{Failure, FailureCode, Response};
pub use rpc::{Command, Method, RpcDispatcher};
