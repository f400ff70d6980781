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

use amplify::IoError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Id;

/// Stable codes of failures reported inside control responses.
///
/// Negative codes follow JSON-RPC 2.0 conventions; positive codes are node
/// business-logic failures.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", from = "i32", into = "i32")]
pub enum FailureCode {
    /// request line is not a valid JSON document
    #[display("parse error")]
    Parse,

    /// request is not a valid control request envelope
    #[display("invalid request")]
    InvalidRequest,

    /// method is not registered in the node command table
    #[display("unknown method")]
    UnknownMethod,

    /// payload does not match the method schema
    #[display("bad request")]
    BadRequest,

    /// unexpected internal failure
    #[display("internal error")]
    Internal,

    #[display("unknown peer")]
    UnknownPeer,

    #[display("unknown channel")]
    UnknownChannel,

    #[display("insufficient funds")]
    InsufficientFunds,

    #[display("peer connection failure")]
    PeerConnection,

    #[display("invalid amount")]
    InvalidAmount,

    #[display("storage failure")]
    Storage,

    #[display("channel is not open")]
    ChannelNotOpen,

    /// code not known to this version of the protocol
    #[display("failure #{0}")]
    Other(i32),
}

impl From<FailureCode> for i32 {
    fn from(code: FailureCode) -> Self {
        match code {
            FailureCode::Parse => -32700,
            FailureCode::InvalidRequest => -32600,
            FailureCode::UnknownMethod => -32601,
            FailureCode::BadRequest => -32602,
            FailureCode::Internal => -32603,
            FailureCode::UnknownPeer => 1001,
            FailureCode::UnknownChannel => 1002,
            FailureCode::InsufficientFunds => 1003,
            FailureCode::PeerConnection => 1004,
            FailureCode::InvalidAmount => 1005,
            FailureCode::Storage => 1006,
            FailureCode::ChannelNotOpen => 1007,
            FailureCode::Other(code) => code,
        }
    }
}

impl From<i32> for FailureCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => FailureCode::Parse,
            -32600 => FailureCode::InvalidRequest,
            -32601 => FailureCode::UnknownMethod,
            -32602 => FailureCode::BadRequest,
            -32603 => FailureCode::Internal,
            1001 => FailureCode::UnknownPeer,
            1002 => FailureCode::UnknownChannel,
            1003 => FailureCode::InsufficientFunds,
            1004 => FailureCode::PeerConnection,
            1005 => FailureCode::InvalidAmount,
            1006 => FailureCode::Storage,
            1007 => FailureCode::ChannelNotOpen,
            other => FailureCode::Other(other),
        }
    }
}

/// Structured failure returned inside a control response
#[derive(Clone, PartialEq, Debug, Display, Error)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
#[display("{message}", alt = "Server returned failure #{code}: {message}")]
pub struct Failure {
    /// Failure code
    pub code: FailureCode,

    /// Human-readable explanation
    pub message: String,

    /// Additional failure details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Failure {
    pub fn with(code: FailureCode, message: impl ToString) -> Failure {
        Failure { code, message: message.to_string(), data: None }
    }

    pub fn unknown_method(method: &str) -> Failure {
        Failure {
            code: FailureCode::UnknownMethod,
            message: format!("method `{}` is not known to the node", method),
            data: Some(json!({ "method": method })),
        }
    }

    pub fn bad_request(method: &str, reason: impl ToString) -> Failure {
        Failure {
            code: FailureCode::BadRequest,
            message: format!("bad request for `{}`: {}", method, reason.to_string()),
            data: Some(json!({ "method": method })),
        }
    }

    pub fn parse(reason: impl ToString) -> Failure {
        Failure::with(FailureCode::Parse, reason)
    }

    pub fn internal(reason: impl ToString) -> Failure {
        Failure::with(FailureCode::Internal, reason)
    }

    /// Returns method name attached to the failure, if any
    pub fn method(&self) -> Option<&str> {
        self.data.as_ref().and_then(|data| data.get("method")).and_then(Value::as_str)
    }
}

/// Errors happening on the client side of the control socket
#[derive(Debug, Display, From, Error)]
#[display(doc_comments)]
#[non_exhaustive]
pub enum Error {
    /// I/O error on the control socket: {0}
    #[from(io::Error)]
    Io(IoError),

    /// malformed response from the node: {0}
    #[from]
    Json(serde_json::Error),

    /// node has closed the control connection
    ConnectionClosed,

    /// response id {1} does not match request id {0}
    IdMismatch(Id, Id),

    /// node returned failure: {0:#}
    #[from]
    Failure(Failure),

    /// other error type with string explanation
    #[display(inner)]
    Other(String),
}
