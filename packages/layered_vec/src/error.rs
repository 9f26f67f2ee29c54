use std::alloc::Layout;

use thiserror::Error;

/// Errors that can occur when acquiring storage through the fallible allocation methods.
///
/// The infallible methods (e.g. [`Vector::reserve()`][crate::Vector::reserve]) never return
/// this type. They panic on capacity overflow and report allocator failure via
/// [`std::alloc::handle_alloc_error`] instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The byte size of the requested capacity does not fit in the address space.
    #[error("capacity of {requested} elements exceeds the maximum size of a single allocation")]
    CapacityOverflow {
        /// The number of elements that was requested.
        requested: usize,
    },

    /// The memory allocator could not satisfy the request.
    #[error(
        "memory allocator failed to provide {} bytes aligned to {}",
        layout.size(),
        layout.align()
    )]
    AllocationFailed {
        /// The layout of the allocation that failed.
        layout: Layout,
    },
}

/// A specialized `Result` type for storage operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn capacity_overflow_names_requested_count() {
        let error = Error::CapacityOverflow { requested: 12345 };

        assert!(error.to_string().contains("12345"));
    }

    #[test]
    fn allocation_failed_names_layout() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let error = Error::AllocationFailed { layout };

        let message = error.to_string();
        assert!(message.contains("64 bytes"));
        assert!(message.contains("aligned to 8"));
    }
}
