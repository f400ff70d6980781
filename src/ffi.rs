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

//! C ABI of the node handle.
//!
//! Functions never unwind across the boundary: lifecycle failures are
//! reported as null pointers or negative statuses with the message kept in
//! the per-thread last error slot, see [`lnp_last_error`].

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::thread::{self, ThreadId};

use libc::c_char;
use log::LevelFilter;
use parking_lot::Mutex;

use crate::last_error::{clear_last_error, last_error_ptr, set_last_error};
use crate::{Config, Error, NodeHandle};

static LOGGER: Once = Once::new();

/// Opaque node handle given out to foreign callers
pub struct LnpNode {
    handle: NodeHandle,
    /// Last response given to each calling thread
    responses: Mutex<HashMap<ThreadId, CString>>,
}

fn init_logger(level: LevelFilter) {
    LOGGER.call_once(|| {
        let res = env_logger::Builder::new().filter_level(level).parse_env("RUST_LOG").try_init();
        if res.is_err() {
            debug!("Logger is already set by the host application");
        }
    });
}

unsafe fn str_arg<'a>(ptr: *const c_char, name: &'static str) -> Result<&'a str, Error> {
    if ptr.is_null() {
        return Err(Error::InvalidString(name));
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| Error::InvalidString(name))
}

unsafe fn node_arg<'a>(node: *const LnpNode) -> Result<&'a LnpNode, Error> {
    node.as_ref().ok_or(Error::NullHandle)
}

fn guarded<T>(call: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| s!("unknown panic"));
        Err(Error::Terminate(reason))
    })
}

/// Creates node from configuration at `conf_path`, which is either a node
/// directory or a configuration file. Returns null on failure.
///
/// # Safety
///
/// `conf_path` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn lnp_node_new(conf_path: *const c_char) -> *mut LnpNode {
    let res = guarded(|| {
        let path = str_arg(conf_path, "conf_path")?;
        let config = Config::load(path)?;
        init_logger(config.log_level);
        let handle = NodeHandle::with_config(config)?;
        Ok(LnpNode { handle, responses: empty!() })
    });
    match res {
        Ok(node) => Box::into_raw(Box::new(node)),
        Err(err) => {
            set_last_error(&err);
            std::ptr::null_mut()
        }
    }
}

/// Tears the node down and frees the handle. Failures during teardown are
/// reported through the last error, but the handle is freed anyway.
///
/// # Safety
///
/// `node` must be null or a handle returned by [`lnp_node_new`] which was not
/// freed yet. The handle must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn lnp_node_free(node: *mut LnpNode) {
    if node.is_null() {
        set_last_error(Error::NullHandle);
        return;
    }
    let node = Box::from_raw(node);
    if let Err(err) = guarded(move || node.handle.release()) {
        set_last_error(&err);
    }
}

/// Starts the peer network. Failure is reported only through the last error.
///
/// # Safety
///
/// `node` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn lnp_node_listen(node: *const LnpNode) {
    let res = guarded(|| node_arg(node)?.handle.start_listening());
    if let Err(err) = res {
        set_last_error(&err);
    }
}

/// Binds control socket at `path`, or at the socket path from configuration
/// when `path` is null. Returns zero on success and a negative status on
/// failure.
///
/// # Safety
///
/// `node` must be null or a live handle; `path` must be null or point to a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn lnp_node_bind_unix_socket(
    node: *const LnpNode,
    path: *const c_char,
) -> i64 {
    let res = guarded(|| {
        let node = node_arg(node)?;
        if path.is_null() {
            let path = node.handle.config().ctl_socket.clone();
            node.handle.bind_unix_socket(path)
        } else {
            node.handle.bind_unix_socket(str_arg(path, "path")?)
        }
    });
    match res {
        Ok(()) => 0,
        Err(err) => {
            let code = err.status_code();
            set_last_error(&err);
            code
        }
    }
}

/// Runs control `method` with JSON `payload` (null or empty for no
/// parameters) and returns JSON response. The string is owned by the handle
/// and stays valid until the calling thread makes its next call on the same
/// handle, or the handle is freed. Returns null only when the handle or
/// arguments are invalid.
///
/// # Safety
///
/// `node` must be null or a live handle; `method` and `payload` must be null
/// or point to NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn lnp_node_call(
    node: *const LnpNode,
    method: *const c_char,
    payload: *const c_char,
) -> *const c_char {
    let res = guarded(|| {
        let node = node_arg(node)?;
        let method = str_arg(method, "method")?;
        let payload = if payload.is_null() { "" } else { str_arg(payload, "payload")? };
        let response = node.handle.dispatch(method, payload);
        // serialized JSON escapes NUL characters
        let response = CString::new(response).map_err(|_| Error::InvalidString("response"))?;
        // moving the string into the map keeps its heap buffer in place
        let ptr = response.as_ptr();
        node.responses.lock().insert(thread::current().id(), response);
        Ok(ptr)
    });
    match res {
        Ok(ptr) => ptr,
        Err(err) => {
            set_last_error(&err);
            std::ptr::null()
        }
    }
}

/// Returns the last failure recorded on the calling thread, or an empty
/// string. The string is owned by the library.
#[no_mangle]
pub extern "C" fn lnp_last_error() -> *const c_char { last_error_ptr() }

#[no_mangle]
pub extern "C" fn lnp_clear_last_error() { clear_last_error() }
