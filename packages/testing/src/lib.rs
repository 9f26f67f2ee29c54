#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for testing and benchmarks in `layered_vec` packages.
//!
//! The centerpiece is [`Specimen`], an element type that reports every construction, clone and
//! drop to a per-thread [`Census`] and that can be told to panic on a chosen clone or default
//! construction. Container tests use it to prove that partial failures neither leak nor
//! double-drop elements.

mod specimen;

pub use specimen::*;

use std::panic::{self, AssertUnwindSafe};

/// Runs `f`, expecting it to panic, and returns the panic payload's message.
///
/// The closure is treated as unwind safe. Tests use this to inspect container state after an
/// injected panic, which is exactly the situation unwind safety markers try to discourage.
///
/// # Panics
///
/// Panics if `f` returns without panicking.
pub fn expect_panic<R>(f: impl FnOnce() -> R) -> String {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("expected the operation to panic but it completed normally"),
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn expect_panic_returns_static_message() {
        let message = expect_panic(|| panic!("boom"));
        assert_eq!(message, "boom");
    }

    #[test]
    fn expect_panic_returns_formatted_message() {
        let value = 7;
        let message = expect_panic(|| panic!("boom {value}"));
        assert_eq!(message, "boom 7");
    }

    #[test]
    #[should_panic]
    fn expect_panic_rejects_normal_completion() {
        expect_panic(|| 42);
    }
}
