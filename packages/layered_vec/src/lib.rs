#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A growable contiguous array built from two layers with separate responsibilities.
//!
//! This crate provides [`Vector`], a dynamic array in the style of [`Vec`], assembled from:
//!
//! - **[`RawBuffer<T>`]** - owns a block of uninitialized memory sized for a number of `T`
//!   values. It allocates and releases memory and hands out slot addresses, but never
//!   constructs, reads or drops a value.
//! - **[`Vector<T>`]** - owns one buffer plus the count of live values at its start. It
//!   constructs values in place, drops them, and relocates them into a larger buffer when the
//!   vector runs out of room.
//!
//! Keeping memory ownership out of the value layer means every value-level operation can be
//! written as "prepare a new buffer, then swap it in": if anything fails before the swap, the
//! new buffer is released on unwind and the vector is untouched.
//!
//! # Key Features
//!
//! - **Amortized `O(1)` appends**: a full vector grows to `max(1, 2 × len)`
//! - **Strong panic safety**: a panicking constructor leaves the vector as it was, even when
//!   the insertion needed to grow the storage
//! - **Move-only relocation**: growth moves values bitwise and never calls [`Clone`]
//! - **Slice access**: [`Vector`] dereferences to `[T]`, so all slice methods are available
//! - **Fallible growth**: [`Vector::try_reserve()`] reports allocation failure as an [`Error`]
//!
//! # Examples
//!
//! ```rust
//! use layered_vec::Vector;
//!
//! let mut numbers = Vector::new();
//!
//! for value in 1..=5 {
//!     numbers.push_back(value);
//! }
//! assert_eq!(numbers.capacity(), 8);
//!
//! let next = numbers.erase(2);
//! assert_eq!(numbers[next], 4);
//!
//! numbers.insert(1, 99);
//! assert_eq!(numbers.as_slice(), &[1, 99, 2, 4, 5]);
//!
//! numbers.resize(2);
//! assert_eq!(numbers.as_slice(), &[1, 99]);
//! ```
//!
//! ## Copying and moving
//!
//! ```rust
//! use layered_vec::Vector;
//!
//! let mut original = Vector::from([String::from("a"), String::from("b")]);
//!
//! // A clone has exactly as much capacity as it has values.
//! let copy = original.clone();
//! assert_eq!(copy.capacity(), 2);
//!
//! // Taking the storage leaves the source empty.
//! let taken = Vector::take_from(&mut original);
//! assert!(original.is_empty());
//! assert_eq!(taken, copy);
//! ```

mod error;
mod into_iter;
mod raw_buffer;
mod vector;

pub use error::*;
pub use into_iter::IntoIter;
pub use raw_buffer::RawBuffer;
pub use vector::Vector;
