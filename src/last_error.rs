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

//! Per-thread slot with the last facade failure.
//!
//! Operations which can't return a structured error through their signature
//! (all C ABI calls) record the failure here before returning. The slot is
//! thread-local: failures on one thread are never observed by another.

use std::cell::RefCell;
use std::ffi::CString;
use std::fmt::Display;

use libc::c_char;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

static EMPTY: &[u8] = b"\0";

/// Records `message` as the most recent failure of the calling thread
pub fn set_last_error(message: impl Display) {
    let message = message.to_string();
    debug!("Recording last error: {}", message);
    let message = CString::new(message.replace('\0', "\u{FFFD}"))
        .unwrap_or_else(|_| CString::default());
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Returns the most recent failure of the calling thread, if any
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map(|msg| msg.to_string_lossy().into_owned()))
}

/// Forgets the failure recorded for the calling thread
pub fn clear_last_error() { LAST_ERROR.with(|slot| *slot.borrow_mut() = None); }

/// Pointer to the calling thread's message, or to an empty string if there
/// is none. The memory stays owned by the slot and is valid until the next
/// failure or clear on the same thread.
pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|slot| match *slot.borrow() {
        Some(ref msg) => msg.as_ptr(),
        None => EMPTY.as_ptr() as *const c_char,
    })
}

#[cfg(test)]
mod test {
    use std::ffi::CStr;
    use std::thread;

    use super::*;

    #[test]
    fn empty_before_first_failure() {
        clear_last_error();
        assert_eq!(last_error(), None);
        let msg = unsafe { CStr::from_ptr(last_error_ptr()) };
        assert_eq!(msg.to_bytes(), b"");
    }

    #[test]
    fn overwritten_by_next_failure() {
        set_last_error("first");
        set_last_error("second");
        assert_eq!(last_error().as_deref(), Some("second"));
        let msg = unsafe { CStr::from_ptr(last_error_ptr()) };
        assert_eq!(msg.to_str().unwrap(), "second");
        clear_last_error();
        assert_eq!(last_error(), None);
    }

    #[test]
    fn slots_are_per_thread() {
        set_last_error("failure on the main thread");
        let other = thread::spawn(last_error).join().unwrap();
        assert_eq!(other, None);
        assert_eq!(last_error().as_deref(), Some("failure on the main thread"));
    }

    #[test]
    fn interior_nul_is_kept_visible() {
        set_last_error("bad\0message");
        assert_eq!(last_error().as_deref(), Some("bad\u{FFFD}message"));
    }
}
