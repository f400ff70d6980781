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

//! Control method table and dispatch of `(method, payload)` requests.
//!
//! Every method is a [`Method`] object registered under its name. Most
//! methods are written as typed [`Command`]s, for which payload decoding and
//! result encoding are provided by a blanket implementation.

mod channels;
mod info;
mod onchain;
mod peer_control;

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use lnp_ctl::{Failure, Request, Response};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use self::channels::{CloseChannel, FundChannel, ListChannels};
pub use self::info::{GetInfo, Ping, Stop};
pub use self::onchain::ListFunds;
pub use self::peer_control::{Connect, Disconnect, ListPeers};
use crate::node::Node;
use crate::Error;

/// Handler of a single control method.
///
/// Handlers may run concurrently with each other and with the network
/// thread; any shared state they touch must be synchronized by its owner.
pub trait Method: Send + Sync {
    fn name(&self) -> &'static str;

    /// Checks that `params` match the method schema
    fn validate(&self, params: &Value) -> Result<(), Failure>;

    fn execute(&self, node: &Node, params: Value) -> Result<Value, Failure>;
}

/// Control method with typed parameters and result
pub trait Command: Send + Sync {
    const NAME: &'static str;

    type Params: DeserializeOwned;
    type Output: Serialize;

    fn run(&self, node: &Node, params: Self::Params) -> Result<Self::Output, Failure>;
}

impl<C> Method for C
where
    C: Command,
{
    fn name(&self) -> &'static str { C::NAME }

    fn validate(&self, params: &Value) -> Result<(), Failure> {
        C::Params::deserialize(params)
            .map(|_| ())
            .map_err(|err| Failure::bad_request(C::NAME, err))
    }

    fn execute(&self, node: &Node, params: Value) -> Result<Value, Failure> {
        let params =
            serde_json::from_value(params).map_err(|err| Failure::bad_request(C::NAME, err))?;
        let output = self.run(node, params)?;
        serde_json::to_value(output).map_err(|err| {
            Failure::internal(format!("unable to encode result of `{}`: {}", C::NAME, err))
        })
    }
}

/// Table of control methods
#[derive(Default)]
pub struct RpcDispatcher {
    methods: RwLock<BTreeMap<&'static str, Arc<dyn Method>>>,
}

impl Debug for RpcDispatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcDispatcher").field("methods", &self.methods()).finish()
    }
}

impl RpcDispatcher {
    pub fn new() -> RpcDispatcher { RpcDispatcher::default() }

    /// Creates dispatcher with all methods supported by the node
    pub fn with_builtins() -> RpcDispatcher {
        let builtins: Vec<Arc<dyn Method>> = vec![
            Arc::new(Ping),
            Arc::new(GetInfo),
            Arc::new(Stop),
            Arc::new(Connect),
            Arc::new(Disconnect),
            Arc::new(ListPeers),
            Arc::new(FundChannel),
            Arc::new(ListChannels),
            Arc::new(CloseChannel),
            Arc::new(ListFunds),
        ];
        let methods = builtins.into_iter().map(|method| (method.name(), method)).collect();
        RpcDispatcher { methods: RwLock::new(methods) }
    }

    /// Adds method to the table; an already taken name is an error.
    pub fn register(&self, method: Arc<dyn Method>) -> Result<(), Error> {
        let mut methods = self.methods.write();
        let name = method.name();
        if methods.contains_key(name) {
            return Err(Error::DuplicateMethod(name.to_owned()));
        }
        debug!("Registering control method `{}`", name);
        methods.insert(name, method);
        Ok(())
    }

    /// Names of registered methods, sorted
    pub fn methods(&self) -> Vec<&'static str> { self.methods.read().keys().copied().collect() }

    fn method(&self, name: &str) -> Option<Arc<dyn Method>> {
        self.methods.read().get(name).cloned()
    }

    /// Runs `method` with already decoded `params`. Null params stand for no
    /// parameters.
    pub fn dispatch(&self, node: &Node, method: &str, params: Value) -> Response {
        let handler = match self.method(method) {
            Some(handler) => handler,
            None => {
                debug!("Request for unknown method `{}`", method);
                return Response::failure(Failure::unknown_method(method));
            }
        };
        let params = match params {
            Value::Null => Value::Object(serde_json::Map::new()),
            params => params,
        };
        trace!("Dispatching {}({})", method, params);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.validate(&params)?;
            handler.execute(node, params)
        }))
        .unwrap_or_else(|_| {
            error!("Handler of `{}` has panicked", method);
            Err(Failure::internal(format!("handler of `{}` has failed", method)))
        });

        if let Err(ref failure) = outcome {
            debug!("Method `{}` has failed: {:#}", method, failure);
        }
        Response::from(outcome)
    }

    /// Runs `method` with a textual JSON payload. An empty payload stands for
    /// no parameters; a payload which is not JSON is a bad request for a
    /// known method.
    pub fn dispatch_str(&self, node: &Node, method: &str, payload: &str) -> Response {
        if self.method(method).is_none() {
            debug!("Request for unknown method `{}`", method);
            return Response::failure(Failure::unknown_method(method));
        }
        let payload = payload.trim();
        let params = if payload.is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(payload) {
                Ok(params) => params,
                Err(err) => return Response::failure(Failure::bad_request(method, err)),
            }
        };
        self.dispatch(node, method, params)
    }

    /// Runs request received from a control session, echoing its id
    pub fn dispatch_request(&self, node: &Node, request: Request) -> Response {
        self.dispatch(node, &request.method, request.params).with_id(request.id)
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use lnp_ctl::payloads::NoParams;
    use lnp_ctl::FailureCode;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::node::sample_node;

    struct Echo;

    impl Command for Echo {
        const NAME: &'static str = "echo";
        type Params = Value;
        type Output = Value;

        fn run(&self, _: &Node, params: Value) -> Result<Value, Failure> { Ok(params) }
    }

    struct Faulty;

    impl Command for Faulty {
        const NAME: &'static str = "faulty";
        type Params = NoParams;
        type Output = NoParams;

        fn run(&self, _: &Node, _: NoParams) -> Result<NoParams, Failure> {
            panic!("broken handler")
        }
    }

    #[test]
    fn builtin_table() {
        let dispatcher = RpcDispatcher::with_builtins();
        assert_eq!(dispatcher.methods(), vec![
            "closechannel",
            "connect",
            "disconnect",
            "fundchannel",
            "getinfo",
            "listchannels",
            "listfunds",
            "listpeers",
            "ping",
            "stop"
        ]);
    }

    #[test]
    fn unknown_method() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::with_builtins();
        for payload in ["", "{}", "not json", "[1, 2]"] {
            let failure = dispatcher.dispatch_str(&node, "fly", payload).into_result().unwrap_err();
            assert_eq!(failure.code, FailureCode::UnknownMethod);
            assert_eq!(failure.method(), Some("fly"));
        }
    }

    #[test]
    fn bad_request_keeps_method() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::with_builtins();

        let failure =
            dispatcher.dispatch_str(&node, "connect", "{\"node_id\":").into_result().unwrap_err();
        assert_eq!(failure.code, FailureCode::BadRequest);
        assert_eq!(failure.method(), Some("connect"));

        let failure = dispatcher
            .dispatch(&node, "fundchannel", json!({"node_id": "zz", "amount_sat": 1}))
            .into_result()
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::BadRequest);
        assert_eq!(failure.method(), Some("fundchannel"));
    }

    #[test]
    fn empty_payload_is_no_params() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::with_builtins();
        let pong = dispatcher.dispatch_str(&node, "ping", "").into_result().unwrap();
        assert_eq!(pong, json!({"pong": true}));
        let pong = dispatcher.dispatch(&node, "ping", Value::Null).into_result().unwrap();
        assert_eq!(pong, json!({"pong": true}));
    }

    #[test]
    fn registration() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::with_builtins();
        dispatcher.register(Arc::new(Echo)).unwrap();
        let err = dispatcher.register(Arc::new(Echo)).unwrap_err();
        assert!(matches!(err, Error::DuplicateMethod(ref name) if name == "echo"));
        assert!(matches!(dispatcher.register(Arc::new(Ping)), Err(Error::DuplicateMethod(_))));

        let echoed = dispatcher.dispatch(&node, "echo", json!([1, "a"])).into_result().unwrap();
        assert_eq!(echoed, json!([1, "a"]));
    }

    #[test]
    fn handler_panic_is_internal_failure() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::new();
        dispatcher.register(Arc::new(Faulty)).unwrap();
        let failure = dispatcher.dispatch(&node, "faulty", Value::Null).into_result().unwrap_err();
        assert_eq!(failure.code, FailureCode::Internal);
    }

    #[test]
    fn request_id_is_echoed() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::with_builtins();
        let response = dispatcher.dispatch_request(&node, Request::with(7u64, "ping", Value::Null));
        assert!(response.is_success());
        assert_eq!(response.id, Some(7u64.into()));
    }

    #[test]
    fn concurrent_dispatch() {
        let dir = TempDir::new().unwrap();
        let node = sample_node(dir.path());
        let dispatcher = RpcDispatcher::with_builtins();
        dispatcher.register(Arc::new(Echo)).unwrap();
        thread::scope(|scope| {
            for no in 0..8u64 {
                let (node, dispatcher) = (&node, &dispatcher);
                scope.spawn(move || {
                    for round in 0..50u64 {
                        let value = json!({"session": no, "round": round});
                        let echoed =
                            dispatcher.dispatch(node, "echo", value.clone()).into_result().unwrap();
                        assert_eq!(echoed, value);
                    }
                });
            }
        });
    }
}
