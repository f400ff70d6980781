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

use std::io::{self, BufRead, BufReader, Read, Write};
use std::os::unix::net::UnixStream;
use std::sync::Arc;

use lnp_ctl::{Failure, FailureCode, Id, Request, Response, JSONRPC_VERSION};
use serde_json::Value;

use crate::node::Node;
use crate::rpc::RpcDispatcher;
use crate::worker::StopFlag;

/// Longest accepted request line, in bytes
pub const MAX_REQUEST_LEN: u64 = 1024 * 1024;

/// Serves one control connection: reads newline-delimited requests and
/// writes a response line for each of them, in order.
pub(super) fn serve(
    stream: UnixStream,
    node: Arc<Node>,
    dispatcher: Arc<RpcDispatcher>,
    stop: StopFlag,
) -> io::Result<()> {
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    while !stop.is_set() {
        line.clear();
        if (&mut reader).take(MAX_REQUEST_LEN + 1).read_until(b'\n', &mut line)? == 0 {
            trace!("Control client has closed the connection");
            break;
        }
        if line.len() as u64 > MAX_REQUEST_LEN {
            warn!("Control request exceeds {} bytes, closing the connection", MAX_REQUEST_LEN);
            let failure =
                Failure::parse(format!("request is longer than {} bytes", MAX_REQUEST_LEN));
            writer.write_all(Response::failure(failure).to_line().as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            break;
        }
        let response = match String::from_utf8(line.clone()) {
            Ok(text) if text.trim().is_empty() => continue,
            Ok(text) => process(&text, &node, &dispatcher),
            Err(_) => Response::failure(Failure::parse("request is not a valid UTF-8 string")),
        };
        writer.write_all(response.to_line().as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    Ok(())
}

fn process(text: &str, node: &Node, dispatcher: &RpcDispatcher) -> Response {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(err) => {
            debug!("Unparsable control request: {}", err);
            return Response::failure(Failure::parse(err));
        }
    };
    // the id is echoed even when the rest of the envelope is invalid
    let id = value.get("id").cloned().and_then(|id| serde_json::from_value::<Id>(id).ok());
    let request = match serde_json::from_value::<Request>(value) {
        Ok(request) => request,
        Err(err) => {
            return Response::failure(Failure::with(FailureCode::InvalidRequest, err)).with_id(id)
        }
    };
    if let Some(ref version) = request.jsonrpc {
        if version != JSONRPC_VERSION {
            return Response::failure(Failure::with(
                FailureCode::InvalidRequest,
                format!("unsupported protocol version `{}`", version),
            ))
            .with_id(id);
        }
    }
    trace!("Control request {}", request);
    dispatcher.dispatch_request(node, request)
}
