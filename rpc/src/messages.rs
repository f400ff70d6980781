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

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Failure;

pub const JSONRPC_VERSION: &str = "2.0";

/// Request identifier echoed back by the node in the response
#[derive(Clone, PartialEq, Eq, Hash, Debug, From)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate", untagged)]
pub enum Id {
    #[from]
    Num(u64),

    #[from]
    #[from(&str)]
    Str(String),
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(num) => Display::fmt(num, f),
            Id::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Single control request, encoded as one line of JSON on the control socket
#[derive(Clone, PartialEq, Debug, Display)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
#[display("{method}({params})")]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,

    pub method: String,

    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn with(id: impl Into<Id>, method: impl ToString, params: Value) -> Request {
        Request {
            jsonrpc: Some(JSONRPC_VERSION.to_owned()),
            id: Some(id.into()),
            method: method.to_string(),
            params,
        }
    }
}

/// Control response: either a result payload or a structured failure.
///
/// Serialized form always contains `jsonrpc`, and exactly one of `result`
/// and `error`; `id` is present for responses delivered over the socket.
#[derive(Clone, PartialEq, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(crate = "serde_crate")]
pub struct Response {
    pub jsonrpc: String,

    /// Id of the request; null if it had none or could not be parsed
    #[serde(default)]
    pub id: Option<Id>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl Response {
    pub fn success(result: Value) -> Response {
        Response {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: None,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(failure: Failure) -> Response {
        Response {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: None,
            result: None,
            error: Some(failure),
        }
    }

    pub fn with_id(mut self, id: Option<Id>) -> Response {
        self.id = id;
        self
    }

    pub fn is_success(&self) -> bool { self.error.is_none() }

    /// Converts response into a result, treating absent result as JSON null
    pub fn into_result(self) -> Result<Value, Failure> {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }

    /// Serializes response into a single line of JSON
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            // Only `Value` contents may fail here and those are produced by serde itself
            format!(
                "{{\"jsonrpc\":\"{}\",\"error\":{{\"code\":-32603,\"message\":\"{}\"}}}}",
                JSONRPC_VERSION,
                err.to_string().replace('"', "'")
            )
        })
    }
}

impl From<Result<Value, Failure>> for Response {
    fn from(res: Result<Value, Failure>) -> Self {
        match res {
            Ok(value) => Response::success(value),
            Err(failure) => Response::failure(failure),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::FailureCode;

    #[test]
    fn request_without_params_and_id() {
        let req: Request = serde_json::from_str(r#"{"method":"ping"}"#).unwrap();
        assert_eq!(req.method, "ping");
        assert_eq!(req.params, Value::Null);
        assert_eq!(req.id, None);
    }

    #[test]
    fn id_keeps_its_json_type() {
        let req: Request = serde_json::from_str(r#"{"id":7,"method":"a"}"#).unwrap();
        assert_eq!(req.id, Some(Id::Num(7)));
        let req: Request = serde_json::from_str(r#"{"id":"x","method":"a"}"#).unwrap();
        assert_eq!(req.id, Some(Id::Str(s!("x"))));
    }

    #[test]
    fn failure_response_layout() {
        let resp = Response::failure(Failure::unknown_method("nope")).with_id(Some(Id::Num(3)));
        let value: Value = serde_json::from_str(&resp.to_line()).unwrap();
        assert_eq!(value["jsonrpc"], json!("2.0"));
        assert_eq!(value["id"], json!(3));
        assert_eq!(value["error"]["code"], json!(-32601));
        assert_eq!(value["error"]["data"]["method"], json!("nope"));
        assert!(value.get("result").is_none());
    }

    #[test]
    fn unknown_codes_survive_decoding() {
        let failure: Failure =
            serde_json::from_str(r#"{"code":4242,"message":"custom"}"#).unwrap();
        assert_eq!(failure.code, FailureCode::Other(4242));
        assert_eq!(i32::from(failure.code), 4242);
        assert_eq!(failure.method(), None);
    }
}
