use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use std::any::type_name;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::{fmt, mem};

use crate::{Error, Result};

/// Owns an uninitialized block of memory with room for `capacity` values of type `T`.
///
/// This is the lower of the two layers of a [`Vector`][crate::Vector]: it knows how many bytes
/// it owns and nothing about which of them hold live values. It never writes, reads or drops a
/// `T` - constructing values in the slots and dropping them again is entirely the owner's job,
/// and the owner must have dropped every value it placed in the buffer before the buffer itself
/// is dropped (or must accept that those values are leaked).
///
/// No memory is allocated for a capacity of zero or for a zero-sized `T`. The buffer still
/// reports the requested capacity in the latter case.
///
/// The buffer is move-only. It does not implement [`Clone`] because duplicating raw memory says
/// nothing about how to duplicate the values that may live in it. Ownership can be transferred
/// out of a `&mut RawBuffer` via [`take()`][Self::take] and exchanged via [`swap()`][Self::swap].
///
/// # Examples
///
/// ```
/// use layered_vec::RawBuffer;
///
/// let mut buffer = RawBuffer::<u64>::with_capacity(4);
/// assert_eq!(buffer.capacity(), 4);
///
/// // SAFETY: 2 is within the capacity and u64 needs no drop, so we may simply overwrite it.
/// unsafe {
///     buffer.slot(2).write(42);
///     assert_eq!(buffer.slot(2).read(), 42);
/// }
///
/// let moved = buffer.take();
/// assert_eq!(moved.capacity(), 4);
/// assert_eq!(buffer.capacity(), 0);
/// ```
pub struct RawBuffer<T> {
    /// Start of the owned block. Dangling if no block was allocated.
    ptr: NonNull<T>,

    capacity: usize,

    _owns: PhantomData<T>,
}

impl<T> RawBuffer<T> {
    /// Creates an empty buffer. This does not allocate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            _owns: PhantomData,
        }
    }

    /// Allocates an uninitialized block with room for `capacity` values of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if the byte size of the block overflows the address space. If the allocator fails,
    /// the failure is reported through [`handle_alloc_error`], which by default aborts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity(capacity) {
            Ok(buffer) => buffer,
            Err(Error::AllocationFailed { layout }) => handle_alloc_error(layout),
            Err(error) => panic!("{error}"),
        }
    }

    /// Allocates an uninitialized block with room for `capacity` values of type `T`, reporting
    /// failure to the caller instead of panicking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityOverflow`] if the byte size of the block overflows the address
    /// space and [`Error::AllocationFailed`] if the allocator cannot provide the block.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        let Some(layout) = Self::layout(capacity)? else {
            return Ok(Self {
                ptr: NonNull::dangling(),
                capacity,
                _owns: PhantomData,
            });
        };

        // SAFETY: layout() only returns layouts of non-zero size.
        let ptr = unsafe { alloc(layout) }.cast::<T>();

        let ptr = NonNull::new(ptr).ok_or(Error::AllocationFailed { layout })?;

        Ok(Self {
            ptr,
            capacity,
            _owns: PhantomData,
        })
    }

    /// The layout of the block backing `capacity` slots, or `None` if no block is needed.
    fn layout(capacity: usize) -> Result<Option<Layout>> {
        let layout = Layout::array::<T>(capacity).map_err(|_overflow| Error::CapacityOverflow {
            requested: capacity,
        })?;

        Ok((layout.size() != 0).then_some(layout))
    }

    /// The number of values the buffer has room for.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pointer to the first slot. Dangling (but aligned) if nothing was allocated.
    #[must_use]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Mutable pointer to the first slot. Dangling (but aligned) if nothing was allocated.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns the address of the slot at `index`.
    ///
    /// The buffer does not know whether the slot holds a live value. The pointer may be used to
    /// write a value into a vacant slot or to access a value the caller previously wrote there.
    ///
    /// # Safety
    ///
    /// `index` must not exceed the capacity. An `index` equal to the capacity yields the
    /// one-past-the-end address, which may be used for pointer arithmetic but must not be
    /// read from or written to.
    ///
    /// This is only checked by a debug assertion.
    #[must_use]
    pub unsafe fn slot(&self, index: usize) -> NonNull<T> {
        debug_assert!(
            index <= self.capacity,
            "slot {index} is out of bounds in {} of capacity {}",
            type_name::<Self>(),
            self.capacity
        );

        // SAFETY: The caller guarantees index <= capacity, so the result stays within our block
        // or one past its end. Without a block, the offset is zero bytes: either the capacity is
        // zero (so index is zero) or T is zero-sized.
        unsafe { self.ptr.add(index) }
    }

    /// Exchanges the blocks owned by `self` and `other`. This never allocates or panics.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Transfers the block out of `self`, leaving `self` empty (capacity zero, no allocation).
    #[must_use]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }
}

impl<T> Default for RawBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RawBuffer<T> {
    fn drop(&mut self) {
        let layout = Self::layout(self.capacity)
            .expect("the layout was already validated when the block was allocated");

        if let Some(layout) = layout {
            // SAFETY: A layout is only returned when we allocated a block for this capacity,
            // using this exact layout. The block has not been deallocated yet because only
            // drop() does that. Any values the owner left in the block are simply forgotten.
            unsafe {
                dealloc(self.ptr.as_ptr().cast(), layout);
            }
        }
    }
}

impl<T> fmt::Debug for RawBuffer<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

// SAFETY: The buffer owns its block exclusively, in the same way a `Box<[MaybeUninit<T>]>`
// does. Sending it to another thread sends whatever `T` values its owner placed in it, which is
// fine exactly when `T: Send`.
unsafe impl<T: Send> Send for RawBuffer<T> {}

// SAFETY: Shared access only yields raw pointers. Any reference created from them is subject to
// the usual aliasing rules for `T`, so sharing the buffer is fine exactly when `T: Sync`.
unsafe impl<T: Sync> Sync for RawBuffer<T> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::{Census, Specimen};

    use super::*;

    assert_not_impl_any!(RawBuffer<u32>: Clone, Copy);
    assert_impl_all!(RawBuffer<u32>: Send, Sync, Default);
    assert_not_impl_any!(RawBuffer<Rc<u32>>: Send, Sync);

    #[test]
    fn new_does_not_allocate() {
        let buffer = RawBuffer::<u64>::new();

        assert_eq!(buffer.capacity(), 0);
        assert_eq!(buffer.as_ptr(), NonNull::<u64>::dangling().as_ptr().cast_const());
    }

    #[test]
    fn zero_capacity_does_not_allocate() {
        let buffer = RawBuffer::<u64>::with_capacity(0);

        assert_eq!(buffer.capacity(), 0);
        assert_eq!(buffer.as_ptr(), NonNull::<u64>::dangling().as_ptr().cast_const());
    }

    #[test]
    fn zero_sized_type_keeps_capacity_without_allocating() {
        let buffer = RawBuffer::<()>::with_capacity(1000);

        assert_eq!(buffer.capacity(), 1000);
        assert_eq!(buffer.as_ptr(), NonNull::<()>::dangling().as_ptr().cast_const());
    }

    #[test]
    fn slots_are_contiguous() {
        let buffer = RawBuffer::<u32>::with_capacity(3);

        let first = unsafe { buffer.slot(0) };
        let third = unsafe { buffer.slot(2) };
        let end = unsafe { buffer.slot(3) };

        assert_eq!(first.as_ptr().cast_const(), buffer.as_ptr());
        assert_eq!(third.addr().get() - first.addr().get(), 2 * size_of::<u32>());
        assert_eq!(end.addr().get() - first.addr().get(), 3 * size_of::<u32>());
    }

    #[test]
    fn slots_hold_written_values() {
        let mut buffer = RawBuffer::<u64>::with_capacity(8);

        for index in 0..8 {
            unsafe {
                buffer.slot(index).write(index as u64 * 10);
            }
        }

        for index in 0..8 {
            assert_eq!(unsafe { buffer.slot(index).read() }, index as u64 * 10);
        }

        // Writing through the base pointer lands in slot zero.
        unsafe {
            buffer.as_mut_ptr().write(7);
            assert_eq!(buffer.slot(0).read(), 7);
        }
    }

    #[test]
    fn take_transfers_block_and_empties_source() {
        let mut source = RawBuffer::<u16>::with_capacity(5);
        let original_ptr = source.as_ptr();

        let target = source.take();

        assert_eq!(target.capacity(), 5);
        assert_eq!(target.as_ptr(), original_ptr);
        assert_eq!(source.capacity(), 0);
        assert_eq!(source.as_ptr(), NonNull::<u16>::dangling().as_ptr().cast_const());
    }

    #[test]
    fn swap_exchanges_blocks() {
        let mut a = RawBuffer::<u8>::with_capacity(2);
        let mut b = RawBuffer::<u8>::with_capacity(9);
        let a_ptr = a.as_ptr();
        let b_ptr = b.as_ptr();

        a.swap(&mut b);

        assert_eq!(a.capacity(), 9);
        assert_eq!(a.as_ptr(), b_ptr);
        assert_eq!(b.capacity(), 2);
        assert_eq!(b.as_ptr(), a_ptr);
    }

    #[test]
    fn drop_never_touches_contents() {
        Census::reset();

        let buffer = RawBuffer::<Specimen>::with_capacity(2);

        unsafe {
            buffer.slot(0).write(Specimen::new(1));
            buffer.slot(1).write(Specimen::new(2));
        }

        drop(buffer);

        // Both specimens were forgotten along with the block. They own no memory, so this
        // leaks nothing real, but it proves the buffer did not drop them.
        let census = Census::snapshot();
        assert_eq!(census.created(), 2);
        assert_eq!(census.dropped(), 0);
    }

    #[test]
    fn try_with_capacity_reports_overflow() {
        let result = RawBuffer::<u64>::try_with_capacity(usize::MAX);

        assert!(matches!(
            result,
            Err(Error::CapacityOverflow {
                requested: usize::MAX
            })
        ));
    }

    #[test]
    fn try_with_capacity_allocates() {
        let buffer = RawBuffer::<u64>::try_with_capacity(16).unwrap();

        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    #[should_panic]
    fn with_capacity_panics_on_overflow() {
        drop(RawBuffer::<u64>::with_capacity(usize::MAX));
    }
}
