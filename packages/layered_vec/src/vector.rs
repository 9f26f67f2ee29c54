use std::any::type_name;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::ptr;
use std::{cmp, fmt, iter, mem, slice};

use scopeguard::ScopeGuard;
use tracing::trace;

use crate::{IntoIter, RawBuffer, Result};

/// A growable array of `T` values stored contiguously on the heap.
///
/// `Vector` is the upper of two layers. The lower layer, a [`RawBuffer`], owns a block of
/// uninitialized memory and never looks inside it. The `Vector` owns exactly one such buffer
/// plus a count of live values and takes care of everything that concerns the values
/// themselves: constructing them in place, dropping them, and relocating them when the
/// storage grows.
///
/// Slots `[0, len)` of the buffer always hold live values and slots `[len, capacity)` are always
/// vacant. Capacity only grows when explicitly asked to via [`reserve()`](Self::reserve) or
/// [`resize()`](Self::resize), or implicitly when inserting into a full vector; removing values
/// never gives memory back.
///
/// # Growth
///
/// When an insertion finds the vector full, the capacity becomes `max(1, 2 × len)`, so `n`
/// appends to an empty vector cost `O(log n)` reallocations and amortized `O(1)` each.
///
/// Values are relocated into the new block by moving them, never by cloning. A move is a bitwise
/// copy that cannot panic, so relocation can never fail half-way and leave values stranded.
///
/// # Panic safety
///
/// Most operations give the strong guarantee: if a value constructor (a `make` closure,
/// [`Clone`] or [`Default`]) panics, the vector is left exactly as it was and every value the
/// operation had already constructed is dropped. When an insertion needs to grow the storage,
/// the new value is constructed directly in its final slot of the new block before any existing
/// value is touched, which is what makes this possible without extra copies.
///
/// [`clone_from()`](Clone::clone_from) into a vector with sufficient capacity is the exception:
/// it overwrites values in place and a panic part-way through leaves a mix of old and new
/// values. See its documentation for details.
///
/// # Examples
///
/// ```
/// use layered_vec::Vector;
///
/// let mut numbers = Vector::new();
/// numbers.push_back(1);
/// numbers.push_back(2);
/// numbers.push_back(4);
///
/// numbers.insert(2, 3);
/// assert_eq!(numbers.as_slice(), &[1, 2, 3, 4]);
///
/// let next = numbers.erase(0);
/// assert_eq!(numbers[next], 2);
/// assert_eq!(numbers.as_slice(), &[2, 3, 4]);
/// ```
pub struct Vector<T> {
    buffer: RawBuffer<T>,

    /// Number of live values, all located at the start of the buffer.
    len: usize,
}

impl<T> Vector<T> {
    /// Creates an empty vector. This does not allocate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: RawBuffer::new(),
            len: 0,
        }
    }

    /// Creates an empty vector with room for `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if the byte size of the storage overflows the address space.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: RawBuffer::with_capacity(capacity),
            len: 0,
        }
    }

    /// Creates a vector of `len` default values, with a capacity of exactly `len`.
    ///
    /// If a [`Default::default()`] call panics, the values created so far are dropped and the
    /// storage is released before the panic continues.
    ///
    /// # Examples
    ///
    /// ```
    /// use layered_vec::Vector;
    ///
    /// let zeros = Vector::<u32>::with_len(3);
    /// assert_eq!(zeros.as_slice(), &[0, 0, 0]);
    /// assert_eq!(zeros.capacity(), 3);
    /// ```
    #[must_use]
    pub fn with_len(len: usize) -> Self
    where
        T: Default,
    {
        let mut vector = Self::with_capacity(len);
        vector.construct_tail(iter::repeat_with(T::default).take(len));
        vector
    }

    /// Takes the storage of `source` without touching any of its values, leaving `source`
    /// empty with no capacity.
    ///
    /// # Examples
    ///
    /// ```
    /// use layered_vec::Vector;
    ///
    /// let mut source = Vector::from([1, 2, 3]);
    /// let taken = Vector::take_from(&mut source);
    ///
    /// assert_eq!(taken.as_slice(), &[1, 2, 3]);
    /// assert!(source.is_empty());
    /// assert_eq!(source.capacity(), 0);
    /// ```
    #[must_use]
    pub fn take_from(source: &mut Self) -> Self {
        Self {
            buffer: source.buffer.take(),
            len: mem::take(&mut source.len),
        }
    }

    /// Replaces the contents of `self` with those of `source` by swapping the two vectors.
    ///
    /// **`source` is not left empty.** It receives the previous contents of `self`. Callers that
    /// need an empty source afterwards must clear it themselves or use
    /// [`take_from()`](Self::take_from) instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use layered_vec::Vector;
    ///
    /// let mut target = Vector::from([1, 2]);
    /// let mut source = Vector::from([7, 8, 9]);
    ///
    /// target.move_assign(&mut source);
    ///
    /// assert_eq!(target.as_slice(), &[7, 8, 9]);
    /// assert_eq!(source.as_slice(), &[1, 2]);
    /// ```
    pub fn move_assign(&mut self, source: &mut Self) {
        self.swap(source);
    }

    /// Exchanges the contents of two vectors. This never allocates, moves values or panics.
    pub fn swap(&mut self, other: &mut Self) {
        self.buffer.swap(&mut other.buffer);
        mem::swap(&mut self.len, &mut other.len);
    }

    /// The number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the vector holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of values the vector can hold without reallocating.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The live values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: Slots [0, len) hold live values. The pointer is non-null and aligned even when
        // nothing is allocated, which is all an empty slice requires.
        unsafe { slice::from_raw_parts(self.buffer.as_ptr(), self.len) }
    }

    /// The live values as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: As in as_slice(), plus we hold an exclusive reference to the vector.
        unsafe { slice::from_raw_parts_mut(self.buffer.as_mut_ptr(), self.len) }
    }

    /// Returns a reference to the value at `index` without bounds checking.
    ///
    /// Indexing (`vector[index]`) checks bounds and panics when out of range. This method is
    /// the zero-overhead alternative for hot paths where the caller already knows the index is
    /// valid.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len()`](Self::len). This is only checked by a debug assertion.
    #[must_use]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(
            index < self.len,
            "index {index} is out of bounds for {} of length {}",
            type_name::<Self>(),
            self.len
        );

        // SAFETY: The caller guarantees index < len <= capacity.
        let slot = unsafe { self.buffer.slot(index) };

        // SAFETY: The slot is in the live range, so it holds an initialized value.
        unsafe { slot.as_ref() }
    }

    /// Returns an exclusive reference to the value at `index` without bounds checking.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len()`](Self::len). This is only checked by a debug assertion.
    #[must_use]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(
            index < self.len,
            "index {index} is out of bounds for {} of length {}",
            type_name::<Self>(),
            self.len
        );

        // SAFETY: The caller guarantees index < len <= capacity.
        let mut slot = unsafe { self.buffer.slot(index) };

        // SAFETY: The slot is in the live range, so it holds an initialized value, and we hold
        // an exclusive reference to the vector.
        unsafe { slot.as_mut() }
    }

    /// Ensures the vector has room for at least `capacity` values in total.
    ///
    /// Does nothing if the capacity is already sufficient. Otherwise allocates storage for
    /// exactly `capacity` values and relocates the live values into it.
    ///
    /// # Panics
    ///
    /// Panics if the byte size of the storage overflows the address space.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity <= self.capacity() {
            return;
        }

        self.adopt(RawBuffer::with_capacity(capacity), None);
    }

    /// Ensures the vector has room for at least `capacity` values in total, reporting allocation
    /// failure to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage could not be allocated. The vector is unchanged.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.capacity() {
            return Ok(());
        }

        self.adopt(RawBuffer::try_with_capacity(capacity)?, None);
        Ok(())
    }

    /// Changes the length to `len`, appending default values or dropping values from the end.
    ///
    /// Growing reserves storage for exactly `len` values if the current capacity is not enough.
    /// Shrinking never releases storage. If a [`Default::default()`] call panics, the values
    /// appended so far are dropped again, so the contents are unchanged (the capacity may have
    /// grown).
    ///
    /// # Examples
    ///
    /// ```
    /// use layered_vec::Vector;
    ///
    /// let mut numbers = Vector::from([5, 6, 7]);
    ///
    /// numbers.resize(1);
    /// assert_eq!(numbers.as_slice(), &[5]);
    ///
    /// numbers.resize(3);
    /// assert_eq!(numbers.as_slice(), &[5, 0, 0]);
    /// ```
    pub fn resize(&mut self, len: usize)
    where
        T: Default,
    {
        if len <= self.len {
            self.truncate(len);
            return;
        }

        self.reserve(len);

        // Cannot underflow because we returned above if len <= self.len.
        let missing = len.wrapping_sub(self.len);
        self.construct_tail(iter::repeat_with(T::default).take(missing));
    }

    /// Drops the values from index `len` onward. Does nothing if `len` is not less than the
    /// current length. The capacity is unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }

        // Cannot underflow because we returned above if len >= self.len.
        let surplus = self.len.wrapping_sub(len);

        // Shrink the live range first. If a drop panics, the remaining surplus values are
        // still dropped during unwinding and none of them is dropped twice.
        self.len = len;

        // SAFETY: len < previous length <= capacity.
        let first = unsafe { self.buffer.slot(len) };

        // SAFETY: The surplus slots held live values and are no longer part of the live range,
        // so nothing else will drop them.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first.as_ptr(), surplus));
        }
    }

    /// Drops all values. The capacity is unchanged.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Appends `value` to the end of the vector.
    pub fn push_back(&mut self, value: T) {
        self.emplace_back(move || value);
    }

    /// Appends the value returned by `make` to the end of the vector and returns a reference
    /// to it.
    ///
    /// If the vector is full, the storage grows to `max(1, 2 × len)`. The new value is
    /// constructed directly in its final slot of the new storage before the existing values are
    /// relocated, so if `make` panics the vector is left exactly as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use layered_vec::Vector;
    ///
    /// let mut names = Vector::new();
    /// let name = names.emplace_back(|| String::from("ferris"));
    /// name.push_str("!");
    ///
    /// assert_eq!(names[0], "ferris!");
    /// ```
    pub fn emplace_back(&mut self, make: impl FnOnce() -> T) -> &mut T {
        let index = self.len;

        if index == self.capacity() {
            let grown = RawBuffer::with_capacity(self.grown_capacity());

            // SAFETY: The grown capacity is at least len + 1.
            let slot = unsafe { grown.slot(index) };

            // If this panics, `grown` is released during unwinding and nothing else has changed.
            let value = make();

            // SAFETY: The slot is in bounds and vacant.
            unsafe {
                slot.write(value);
            }

            self.adopt(grown, None);
        } else {
            let value = make();

            // SAFETY: index == len < capacity.
            let slot = unsafe { self.buffer.slot(index) };

            // SAFETY: The slot is in bounds and vacant.
            unsafe {
                slot.write(value);
            }
        }

        // Cannot overflow because the new value fit in the buffer.
        self.len = index.wrapping_add(1);

        // SAFETY: We just made the slot at `index` live.
        unsafe { self.get_unchecked_mut(index) }
    }

    /// Removes the last value and returns it, or returns `None` if the vector is empty.
    ///
    /// Discarding the returned value drops it.
    pub fn pop_back(&mut self) -> Option<T> {
        let index = self.len.checked_sub(1)?;

        // Shrink the live range first, so the value we move out is not dropped again.
        self.len = index;

        // SAFETY: index < previous length <= capacity.
        let slot = unsafe { self.buffer.slot(index) };

        // SAFETY: The slot held the last live value, which is now outside the live range and
        // therefore ours to move out.
        Some(unsafe { slot.read() })
    }

    /// Inserts the value returned by `make` at `index`, shifting the values from `index`
    /// onward one position to the right, and returns a reference to the new value.
    ///
    /// Inserting at `len()` is the same as [`emplace_back()`](Self::emplace_back).
    ///
    /// If the vector is full, the storage grows to `max(1, 2 × len)`: the new value is
    /// constructed in its final slot of the new storage first, then the values before `index`
    /// and the values from `index` onward are relocated around it. Otherwise the new value is
    /// constructed first and the tail is shifted in place. Either way, if `make` panics the
    /// vector is left exactly as it was.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn emplace(&mut self, index: usize, make: impl FnOnce() -> T) -> &mut T {
        assert!(
            index <= self.len,
            "insertion index {index} is out of bounds for {} of length {}",
            type_name::<Self>(),
            self.len
        );

        if index == self.len {
            return self.emplace_back(make);
        }

        if self.len == self.capacity() {
            let grown = RawBuffer::with_capacity(self.grown_capacity());

            // SAFETY: index < len < grown capacity.
            let slot = unsafe { grown.slot(index) };

            // If this panics, `grown` is released during unwinding and nothing else has changed.
            let value = make();

            // SAFETY: The slot is in bounds and vacant.
            unsafe {
                slot.write(value);
            }

            self.adopt(grown, Some(index));
        } else {
            // Produce the value before shifting anything, so a panic leaves us untouched.
            let value = make();

            // SAFETY: index < len < capacity.
            let hole = unsafe { self.buffer.slot(index) };

            // SAFETY: index + 1 <= len < capacity.
            let after_hole = unsafe { hole.add(1) };

            // Cannot underflow because index < len.
            let shifted = self.len.wrapping_sub(index);

            // SAFETY: [index, len) is live and [index + 1, len + 1) is in bounds because the
            // vector is not full. ptr::copy permits the ranges to overlap.
            unsafe {
                ptr::copy(hole.as_ptr(), after_hole.as_ptr(), shifted);
            }

            // SAFETY: The value that was in the hole now lives one slot to the right, so we
            // overwrite the hole without dropping what was there.
            unsafe {
                hole.write(value);
            }
        }

        // Cannot overflow because the new value fit in the buffer.
        self.len = self.len.wrapping_add(1);

        // SAFETY: index < len after the insertion.
        unsafe { self.get_unchecked_mut(index) }
    }

    /// Inserts `value` at `index`, shifting the values from `index` onward one position to
    /// the right, and returns a reference to it.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&mut self, index: usize, value: T) -> &mut T {
        self.emplace(index, move || value)
    }

    /// Drops the value at `index` and shifts the values after it one position to the left.
    ///
    /// Returns `index`, which afterwards refers to the value that followed the erased one, or
    /// equals [`len()`](Self::len) if the erased value was the last one. Takes time
    /// proportional to the number of values after `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn erase(&mut self, index: usize) -> usize {
        assert!(
            index < self.len,
            "erase index {index} is out of bounds for {} of length {}",
            type_name::<Self>(),
            self.len
        );

        // SAFETY: index < len <= capacity.
        let hole = unsafe { self.buffer.slot(index) };

        // SAFETY: The slot holds a live value. The slot is overwritten or leaves the live range
        // below, so the value is not dropped in place.
        let erased = unsafe { hole.read() };

        // SAFETY: index + 1 <= len <= capacity.
        let after_hole = unsafe { hole.add(1) };

        // Cannot underflow because index < len.
        let following = self.len.wrapping_sub(index).wrapping_sub(1);

        // SAFETY: [index + 1, len) is live and moves down by one slot into [index, len - 1).
        // ptr::copy permits the ranges to overlap.
        unsafe {
            ptr::copy(after_hole.as_ptr(), hole.as_ptr(), following);
        }

        // Cannot underflow because index < len.
        self.len = self.len.wrapping_sub(1);

        // Dropped only once the live range is consistent again, in case the drop panics.
        drop(erased);

        index
    }

    /// The capacity to grow to when an insertion finds the vector full.
    #[cfg_attr(test, mutants::skip)] // Mutations that do not grow cause out-of-bounds writes.
    fn grown_capacity(&self) -> usize {
        let doubled = self
            .len
            .checked_mul(2)
            .expect("vector length cannot exceed half the address space");

        cmp::max(1, doubled)
    }

    /// Relocates every live value into `grown` and makes `grown` the storage of the vector.
    ///
    /// If `gap` is given, the values from that index onward land one slot further right,
    /// leaving the slot at `gap` to whatever the caller put there. The length is unchanged;
    /// accounting for a value placed in the gap is up to the caller.
    ///
    /// The previous block is released without dropping anything because every value has
    /// moved out of it.
    fn adopt(&mut self, mut grown: RawBuffer<T>, gap: Option<usize>) {
        let split = gap.unwrap_or(self.len);
        let shift = usize::from(gap.is_some());

        assert!(
            split <= self.len,
            "gap {split} is out of bounds for {} of length {}",
            type_name::<Self>(),
            self.len
        );
        assert!(
            self.len
                .checked_add(shift)
                .is_some_and(|required| required <= grown.capacity()),
            "new storage of capacity {} cannot hold {} values",
            grown.capacity(),
            self.len
        );

        // Cannot underflow because split <= len, as asserted above.
        let tail = self.len.wrapping_sub(split);

        // SAFETY: [0, split) is live in our buffer. The same range is in bounds in `grown` and
        // vacant because the caller may only have filled the gap slot.
        unsafe {
            relocate(&self.buffer, 0, &grown, 0, split);
        }

        // SAFETY: [split, len) is live in our buffer. [split + shift, len + shift) is in bounds
        // in `grown`, as asserted above, and vacant because it starts after the gap slot.
        unsafe {
            relocate(&self.buffer, split, &grown, split.wrapping_add(shift), tail);
        }

        trace!(
            old_capacity = self.buffer.capacity(),
            new_capacity = grown.capacity(),
            len = self.len,
            "relocated vector storage"
        );

        self.buffer.swap(&mut grown);

        // `grown` now holds the old block, whose values have all moved out. Dropping it only
        // releases memory.
    }

    /// Constructs the values yielded by `values` into the vacant slots after the live range.
    ///
    /// If producing a value panics, the values constructed by this call are dropped again before
    /// the panic continues, so the live values are the same as before the call.
    ///
    /// # Panics
    ///
    /// Panics if `values` yields more values than there is spare capacity for.
    fn construct_tail(&mut self, values: impl IntoIterator<Item = T>) {
        let original_len = self.len;

        let mut vector = scopeguard::guard(self, move |vector| vector.truncate(original_len));

        for value in values {
            let index = vector.len;

            assert!(
                index < vector.capacity(),
                "more values than spare capacity in {} of capacity {}",
                type_name::<Self>(),
                vector.capacity()
            );

            // SAFETY: index == len < capacity.
            let slot = unsafe { vector.buffer.slot(index) };

            // SAFETY: The slot is in bounds and vacant.
            unsafe {
                slot.write(value);
            }

            // Cannot overflow because index < capacity.
            vector.len = index.wrapping_add(1);
        }

        // Everything was constructed, so the values stay.
        ScopeGuard::into_inner(vector);
    }
}

/// Moves `count` values from the slots of `source` starting at `from` into the slots of
/// `target` starting at `to`.
///
/// Relocation always moves. Moving a value cannot panic and leaves nothing behind that needs
/// dropping, so cloning (which would keep the source intact in case of failure) is never
/// needed to make relocation safe, even for types that implement [`Clone`].
///
/// # Safety
///
/// Both ranges must be in bounds, the source range must hold live values and the target range
/// must be vacant. Afterwards the source range is vacant: the caller must not drop the moved
/// values there.
unsafe fn relocate<T>(
    source: &RawBuffer<T>,
    from: usize,
    target: &RawBuffer<T>,
    to: usize,
    count: usize,
) {
    // SAFETY: Forwarding the bounds requirement to the caller.
    let source = unsafe { source.slot(from) };

    // SAFETY: Forwarding the bounds requirement to the caller.
    let target = unsafe { target.slot(to) };

    // SAFETY: Distinct buffers never overlap. The caller guarantees the source values are live
    // and the target slots are vacant, so this hands each value over without duplicating it.
    unsafe {
        ptr::copy_nonoverlapping(source.as_ptr(), target.as_ptr(), count);
    }
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Vector<T> {
    fn drop(&mut self) {
        // The buffer releases the memory afterwards.
        self.clear();
    }
}

impl<T: Clone> Clone for Vector<T> {
    /// Clones every value into new storage with a capacity of exactly `len()`.
    ///
    /// If a clone panics, the clones made so far are dropped and the new storage is released.
    fn clone(&self) -> Self {
        let mut copy = Self::with_capacity(self.len);
        copy.construct_tail(self.iter().cloned());
        copy
    }

    /// Makes `self` a copy of `source`, reusing the existing storage when it is large enough.
    ///
    /// If `source` has more values than `self` has capacity for, a complete clone of `source`
    /// is built first and then swapped in. A panic during cloning leaves `self` untouched.
    ///
    /// Otherwise the storage is reused: the values both vectors have in common are updated via
    /// [`Clone::clone_from()`], then either the surplus values of `self` are dropped or the
    /// extra values of `source` are cloned onto the end. This avoids allocating but only offers
    /// a weaker guarantee: if a clone panics, `self` remains a valid vector whose values may be
    /// a mix of its previous values and values cloned from `source`.
    fn clone_from(&mut self, source: &Self) {
        if source.len > self.capacity() {
            let mut copy = source.clone();
            self.swap(&mut copy);
            return;
        }

        let common = cmp::min(self.len, source.len);
        let (source_common, source_extra) = source.split_at(common);

        for (target, value) in self.iter_mut().zip(source_common) {
            target.clone_from(value);
        }

        if source.len < self.len {
            self.truncate(source.len);
        } else {
            self.construct_tail(source_extra.iter().cloned());
        }
    }
}

impl<T> Deref for Vector<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for Vector<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Vector<T> {}

impl<T: Hash> Hash for Vector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl<T> Extend<T> for Vector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, values: I) {
        let values = values.into_iter();

        // Growing to fit the size hint must not undercut the doubling rule, otherwise a series
        // of small extends would reallocate on every call.
        let (expected, _) = values.size_hint();
        let required = self.len.saturating_add(expected);

        if required > self.capacity() {
            self.reserve(cmp::max(required, self.grown_capacity()));
        }

        for value in values {
            self.push_back(value);
        }
    }
}

impl<T> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(values: I) -> Self {
        let mut vector = Self::new();
        vector.extend(values);
        vector
    }
}

impl<T, const N: usize> From<[T; N]> for Vector<T> {
    fn from(values: [T; N]) -> Self {
        let mut vector = Self::with_capacity(N);
        vector.construct_tail(values);
        vector
    }
}

impl<T> IntoIterator for Vector<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> IntoIter<T> {
        let len = mem::take(&mut self.len);

        // SAFETY: Slots [0, len) of the buffer hold live values. We stopped counting them as
        // ours above, so the iterator becomes their only owner. `self` is left with no values
        // and no storage, so dropping it does nothing.
        unsafe { IntoIter::new(self.buffer.take(), len) }
    }
}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut Vector<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::indexing_slicing,
    reason = "test code doesn't need the same safety rigor as production code"
)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;
    use std::hash::{BuildHasher, RandomState};
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::{Census, Specimen, expect_panic, values};

    use super::*;

    assert_impl_all!(Vector<u32>: Send, Sync, Clone, Default);
    assert_impl_all!(Vector<RefCell<u32>>: Send);
    assert_not_impl_any!(Vector<RefCell<u32>>: Sync);
    assert_not_impl_any!(Vector<Rc<u32>>: Send, Sync);

    fn specimens(payloads: impl IntoIterator<Item = i64>) -> Vector<Specimen> {
        payloads.into_iter().map(Specimen::new).collect()
    }

    fn assert_live_range_consistent<T>(vector: &Vector<T>) {
        assert!(
            vector.len() <= vector.capacity(),
            "length {} exceeds capacity {}",
            vector.len(),
            vector.capacity()
        );
    }

    #[test]
    fn new_is_empty_without_capacity() {
        let vector = Vector::<u32>::new();

        assert_eq!(vector.len(), 0);
        assert!(vector.is_empty());
        assert_eq!(vector.capacity(), 0);
        assert!(vector.as_slice().is_empty());
    }

    #[test]
    fn with_capacity_is_empty() {
        let vector = Vector::<u32>::with_capacity(10);

        assert!(vector.is_empty());
        assert_eq!(vector.capacity(), 10);
    }

    #[test]
    fn with_len_default_constructs_exactly() {
        Census::reset();

        let vector = Vector::<Specimen>::with_len(4);

        assert_eq!(vector.len(), 4);
        assert_eq!(vector.capacity(), 4);
        assert_eq!(values(&vector), vec![0, 0, 0, 0]);
        assert_eq!(Census::snapshot().created(), 4);
    }

    #[test]
    fn with_len_zero_does_not_allocate() {
        let vector = Vector::<u64>::with_len(0);

        assert!(vector.is_empty());
        assert_eq!(vector.capacity(), 0);
    }

    #[test]
    fn push_back_grows_by_doubling() {
        let mut vector = Vector::new();
        let mut observed_capacities = Vec::new();

        for value in 0..9_u32 {
            vector.push_back(value);
            assert_live_range_consistent(&vector);

            if observed_capacities.last() != Some(&vector.capacity()) {
                observed_capacities.push(vector.capacity());
            }
        }

        assert_eq!(observed_capacities, vec![1, 2, 4, 8, 16]);
        assert_eq!(vector.as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn appends_reallocate_logarithmically() {
        let mut vector = Vector::new();
        let mut reallocations = 0;

        for value in 0..1000_u32 {
            let before = vector.capacity();
            vector.push_back(value);
            let after = vector.capacity();

            if after != before {
                reallocations += 1;
                assert!(after >= 2 * before, "capacity grew from {before} to {after}");
            }
        }

        // 1, 2, 4, ..., 1024
        assert_eq!(reallocations, 11);
    }

    #[test]
    fn emplace_back_returns_new_value() {
        let mut vector = Vector::new();
        vector.push_back(String::from("a"));

        let value = vector.emplace_back(|| String::from("b"));
        value.push('!');

        assert_eq!(vector.as_slice(), &["a", "b!"]);
    }

    #[test]
    fn emplace_back_panic_with_spare_capacity_changes_nothing() {
        Census::reset();

        let mut vector = specimens([1, 2]);
        vector.reserve(4);

        expect_panic(|| {
            vector.emplace_back(|| panic!("constructor failed"));
        });

        assert_eq!(values(&vector), vec![1, 2]);
        assert_eq!(vector.capacity(), 4);
        assert_eq!(Census::snapshot().live(), 2);
    }

    #[test]
    fn emplace_back_panic_while_growing_changes_nothing() {
        Census::reset();

        let mut vector = specimens([1, 2]);
        assert_eq!(vector.capacity(), 2);
        let original_ptr = vector.as_ptr();

        expect_panic(|| {
            vector.emplace_back(|| panic!("constructor failed"));
        });

        assert_eq!(values(&vector), vec![1, 2]);
        assert_eq!(vector.capacity(), 2);
        assert_eq!(vector.as_ptr(), original_ptr);
        assert_eq!(Census::snapshot().live(), 2);
    }

    #[test]
    fn growth_never_clones() {
        Census::reset();

        let mut vector = Vector::new();
        for payload in 0..33 {
            vector.push_back(Specimen::new(payload));
        }
        vector.reserve(100);
        vector.insert(5, Specimen::new(-1));

        assert_eq!(Census::snapshot().cloned(), 0);
        assert_eq!(Census::snapshot().dropped(), 0);
        assert_eq!(vector.len(), 34);
    }

    #[test]
    fn pop_back_removes_last() {
        Census::reset();

        let mut vector = specimens([1, 2, 3]);

        let popped = vector.pop_back().unwrap();
        assert_eq!(popped.value(), 3);
        assert_eq!(values(&vector), vec![1, 2]);

        drop(popped);
        vector.pop_back();

        assert_eq!(values(&vector), vec![1]);
        assert_eq!(vector.capacity(), 3);
        assert_eq!(Census::snapshot().live(), 1);
    }

    #[test]
    fn pop_back_on_empty_is_noop() {
        let mut vector = Vector::<u8>::new();

        assert!(vector.pop_back().is_none());
        assert!(vector.is_empty());
        assert_eq!(vector.capacity(), 0);
    }

    #[test]
    fn reserve_below_capacity_is_noop() {
        let mut vector = Vector::from([1, 2, 3]);
        let original_ptr = vector.as_ptr();

        vector.reserve(2);
        vector.reserve(3);

        assert_eq!(vector.capacity(), 3);
        assert_eq!(vector.as_ptr(), original_ptr);
    }

    #[test]
    fn reserve_allocates_exact_capacity_and_keeps_values() {
        Census::reset();

        let mut vector = specimens([4, 5, 6]);
        vector.reserve(17);

        assert_eq!(vector.capacity(), 17);
        assert_eq!(values(&vector), vec![4, 5, 6]);
        assert_eq!(Census::snapshot().live(), 3);
    }

    #[test]
    fn try_reserve_reports_overflow_and_keeps_vector() {
        let mut vector = Vector::from([1_u64, 2]);

        let result = vector.try_reserve(usize::MAX);

        assert!(matches!(result, Err(crate::Error::CapacityOverflow { .. })));
        assert_eq!(vector.as_slice(), &[1, 2]);
        assert_eq!(vector.capacity(), 2);
    }

    #[test]
    fn try_reserve_grows() {
        let mut vector = Vector::from([1_u64, 2]);

        vector.try_reserve(10).unwrap();

        assert_eq!(vector.capacity(), 10);
        assert_eq!(vector.as_slice(), &[1, 2]);
    }

    #[test]
    fn resize_down_keeps_capacity() {
        Census::reset();

        let mut vector = specimens([1, 2, 3, 4]);
        vector.resize(1);

        assert_eq!(values(&vector), vec![1]);
        assert_eq!(vector.capacity(), 4);
        assert_eq!(Census::snapshot().live(), 1);
    }

    #[test]
    fn resize_up_within_capacity_does_not_reallocate() {
        let mut vector = Vector::<u32>::with_capacity(8);
        vector.push_back(9);
        let original_ptr = vector.as_ptr();

        vector.resize(5);

        assert_eq!(vector.as_slice(), &[9, 0, 0, 0, 0]);
        assert_eq!(vector.capacity(), 8);
        assert_eq!(vector.as_ptr(), original_ptr);
    }

    #[test]
    fn resize_up_beyond_capacity_reserves_exactly() {
        let mut vector = Vector::from([1_u32]);

        vector.resize(6);

        assert_eq!(vector.as_slice(), &[1, 0, 0, 0, 0, 0]);
        assert_eq!(vector.capacity(), 6);
    }

    #[test]
    fn resize_panic_keeps_contents() {
        Census::reset();

        let mut vector = specimens([1, 2]);
        Census::panic_on_default_after(2);

        expect_panic(|| vector.resize(10));

        assert_eq!(values(&vector), vec![1, 2]);
        assert_live_range_consistent(&vector);
        assert_eq!(Census::snapshot().live(), 2);
    }

    #[test]
    fn truncate_beyond_len_is_noop() {
        let mut vector = Vector::from([1, 2]);

        vector.truncate(2);
        vector.truncate(100);

        assert_eq!(vector.as_slice(), &[1, 2]);
    }

    #[test]
    fn clear_drops_everything_and_keeps_capacity() {
        Census::reset();

        let mut vector = specimens([1, 2, 3]);
        vector.clear();

        assert!(vector.is_empty());
        assert_eq!(vector.capacity(), 3);
        assert_eq!(Census::snapshot().live(), 0);
    }

    #[test]
    fn insert_into_empty() {
        let mut vector = Vector::new();

        vector.insert(0, 'x');

        assert_eq!(vector.as_slice(), &['x']);
        assert_eq!(vector.capacity(), 1);
    }

    #[test]
    fn insert_at_end_appends() {
        let mut vector = Vector::from([1, 2]);

        let inserted = vector.insert(2, 3);
        *inserted *= 10;

        assert_eq!(vector.as_slice(), &[1, 2, 30]);
    }

    #[test]
    fn insert_with_spare_capacity_shifts_in_place() {
        let mut vector = Vector::with_capacity(8);
        vector.extend([1, 2, 3, 4]);
        let original_ptr = vector.as_ptr();

        vector.insert(1, 99);

        assert_eq!(vector.as_slice(), &[1, 99, 2, 3, 4]);
        assert_eq!(vector.as_ptr(), original_ptr);
        assert_eq!(vector.capacity(), 8);
    }

    #[test]
    fn insert_when_full_relocates_around_new_value() {
        let mut vector = Vector::from([1, 2, 3, 4]);
        assert_eq!(vector.capacity(), 4);

        vector.insert(2, 99);

        assert_eq!(vector.as_slice(), &[1, 2, 99, 3, 4]);
        assert_eq!(vector.capacity(), 8);
    }

    #[test]
    fn insert_at_front_when_full() {
        let mut vector = Vector::from(["b", "c"]);

        vector.insert(0, "a");

        assert_eq!(vector.as_slice(), &["a", "b", "c"]);
        assert_eq!(vector.capacity(), 4);
    }

    #[test]
    fn emplace_panic_when_full_changes_nothing() {
        Census::reset();

        let mut vector = specimens([1, 2, 3]);
        assert_eq!(vector.len(), vector.capacity());

        expect_panic(|| {
            vector.emplace(1, || panic!("constructor failed"));
        });

        assert_eq!(values(&vector), vec![1, 2, 3]);
        assert_eq!(vector.capacity(), 3);
        assert_eq!(Census::snapshot().live(), 3);
    }

    #[test]
    fn emplace_panic_with_spare_capacity_changes_nothing() {
        Census::reset();

        let mut vector = specimens([1, 2, 3]);
        vector.reserve(10);

        expect_panic(|| {
            vector.emplace(0, || panic!("constructor failed"));
        });

        assert_eq!(values(&vector), vec![1, 2, 3]);
        assert_eq!(Census::snapshot().live(), 3);
    }

    #[test]
    #[should_panic]
    fn insert_past_end_panics() {
        let mut vector = Vector::from([1, 2]);
        vector.insert(3, 0);
    }

    #[test]
    fn erase_returns_position_of_follower() {
        Census::reset();

        let mut vector = specimens([10, 20, 30, 40]);

        let next = vector.erase(1);

        assert_eq!(next, 1);
        assert_eq!(vector[next].value(), 30);
        assert_eq!(values(&vector), vec![10, 30, 40]);
        assert_eq!(vector.capacity(), 4);
        assert_eq!(Census::snapshot().live(), 3);
    }

    #[test]
    fn erase_last_returns_end() {
        let mut vector = Vector::from([1, 2, 3]);

        let next = vector.erase(2);

        assert_eq!(next, vector.len());
        assert_eq!(vector.as_slice(), &[1, 2]);
    }

    #[test]
    #[should_panic]
    fn erase_out_of_bounds_panics() {
        let mut vector = Vector::from([1, 2]);
        vector.erase(2);
    }

    #[test]
    fn take_from_moves_storage_without_touching_values() {
        Census::reset();

        let mut source = specimens([1, 2, 3]);
        let original_ptr = source.as_ptr();
        let before = Census::snapshot();

        let taken = Vector::take_from(&mut source);

        assert_eq!(Census::snapshot(), before);
        assert_eq!(taken.as_ptr(), original_ptr);
        assert_eq!(values(&taken), vec![1, 2, 3]);
        assert_eq!(source.len(), 0);
        assert_eq!(source.capacity(), 0);
    }

    #[test]
    fn move_assign_swaps_instead_of_emptying_source() {
        Census::reset();

        let mut target = specimens([1, 2]);
        let mut source = specimens([7, 8, 9]);
        let before = Census::snapshot();

        target.move_assign(&mut source);

        // The source receives the previous contents of the target. It is not empty.
        assert_eq!(values(&target), vec![7, 8, 9]);
        assert_eq!(values(&source), vec![1, 2]);
        assert!(!source.is_empty());
        assert_eq!(Census::snapshot(), before);
    }

    #[test]
    fn clone_has_exact_capacity_and_is_independent() {
        let mut original = Vector::with_capacity(10);
        original.extend([String::from("a"), String::from("b")]);

        let mut copy = original.clone();
        assert_eq!(copy.capacity(), 2);
        assert_eq!(copy, original);

        copy[0].push('!');
        copy.push_back(String::from("c"));

        assert_eq!(original.as_slice(), &["a", "b"]);
        assert_eq!(copy.as_slice(), &["a!", "b", "c"]);
    }

    #[test]
    fn clone_panic_drops_partial_copy() {
        Census::reset();

        let original = specimens([1, 2, 3, 4]);
        Census::panic_on_clone_after(2);

        expect_panic(|| original.clone());

        assert_eq!(values(&original), vec![1, 2, 3, 4]);
        let census = Census::snapshot();
        assert_eq!(census.cloned(), 2);
        assert_eq!(census.live(), 4);
    }

    #[test]
    fn clone_from_larger_source_replaces_storage() {
        let mut target = Vector::from([1, 2]);
        let source = Vector::from([5, 6, 7]);

        target.clone_from(&source);

        assert_eq!(target.as_slice(), &[5, 6, 7]);
        assert_eq!(target.capacity(), 3);
    }

    #[test]
    fn clone_from_larger_source_panic_leaves_target_untouched() {
        Census::reset();

        let mut target = specimens([1, 2]);
        let source = specimens([5, 6, 7]);
        Census::panic_on_clone_after(1);

        expect_panic(|| target.clone_from(&source));

        assert_eq!(values(&target), vec![1, 2]);
        assert_eq!(target.capacity(), 2);
        assert_eq!(Census::snapshot().live(), 5);
    }

    #[test]
    fn clone_from_shorter_source_reuses_storage() {
        Census::reset();

        let mut target = specimens([1, 2, 3, 4]);
        let source = specimens([8, 9]);
        let original_ptr = target.as_ptr();

        target.clone_from(&source);

        assert_eq!(values(&target), vec![8, 9]);
        assert_eq!(target.capacity(), 4);
        assert_eq!(target.as_ptr(), original_ptr);
        assert_eq!(Census::snapshot().live(), 4);
    }

    #[test]
    fn clone_from_longer_source_within_capacity_reuses_storage() {
        let mut target = Vector::with_capacity(6);
        target.extend([1, 2]);
        let original_ptr = target.as_ptr();
        let source = Vector::from([5, 6, 7, 8]);

        target.clone_from(&source);

        assert_eq!(target.as_slice(), &[5, 6, 7, 8]);
        assert_eq!(target.capacity(), 6);
        assert_eq!(target.as_ptr(), original_ptr);
    }

    #[test]
    fn clone_from_reuse_panic_leaves_valid_mix() {
        Census::reset();

        let mut target = Vector::with_capacity(8);
        target.extend([1, 2, 3].map(Specimen::new));
        let source = specimens([5, 6, 7, 8, 9]);

        // The prefix of three is updated successfully, then cloning the fourth value panics.
        Census::panic_on_clone_after(3);

        expect_panic(|| target.clone_from(&source));

        // The overwritten prefix stays, the partially cloned tail is rolled back.
        assert_eq!(values(&target), vec![5, 6, 7]);
        assert_live_range_consistent(&target);

        drop(target);
        drop(source);
        assert_eq!(Census::snapshot().live(), 0);
    }

    #[test]
    fn swap_exchanges_everything() {
        let mut a = Vector::from([1]);
        let mut b = Vector::with_capacity(5);
        b.extend([2, 3]);

        a.swap(&mut b);

        assert_eq!(a.as_slice(), &[2, 3]);
        assert_eq!(a.capacity(), 5);
        assert_eq!(b.as_slice(), &[1]);
        assert_eq!(b.capacity(), 1);
    }

    #[test]
    fn get_unchecked_reads_and_writes() {
        let mut vector = Vector::from([1, 2, 3]);

        unsafe {
            *vector.get_unchecked_mut(1) = 20;
        }

        assert_eq!(unsafe { *vector.get_unchecked(1) }, 20);
        assert_eq!(vector.as_slice(), &[1, 20, 3]);
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds_panics() {
        let vector = Vector::from([1, 2, 3]);
        _ = vector[3];
    }

    #[test]
    fn iteration_visits_live_values_in_order() {
        let mut vector = Vector::with_capacity(10);
        vector.extend([1, 2, 3]);

        for value in &mut vector {
            *value *= 2;
        }

        let collected: Vec<i32> = (&vector).into_iter().copied().collect();
        assert_eq!(collected, vec![2, 4, 6]);
        assert_eq!(vector.iter().rev().copied().collect::<Vec<_>>(), vec![6, 4, 2]);
    }

    #[test]
    fn drop_drops_every_value_once() {
        Census::reset();

        let vector = specimens(0..20);
        drop(vector);

        let census = Census::snapshot();
        assert_eq!(census.created(), 20);
        assert_eq!(census.dropped(), 20);
    }

    #[test]
    fn zero_sized_values() {
        let mut vector = Vector::new();

        for _ in 0..10 {
            vector.push_back(());
        }
        vector.insert(3, ());
        vector.erase(0);

        assert_eq!(vector.len(), 10);
        assert_eq!(vector.capacity(), 16);
        assert_eq!(vector.iter().count(), 10);
    }

    #[test]
    fn debug_lists_values() {
        let vector = Vector::from([1, 2]);

        assert_eq!(format!("{vector:?}"), "[1, 2]");
    }

    #[test]
    fn equal_contents_are_equal_regardless_of_capacity() {
        let mut a = Vector::with_capacity(10);
        a.extend([1, 2, 3]);
        let b = Vector::from([1, 2, 3]);

        assert_eq!(a, b);
        assert_ne!(a, Vector::from([1, 2]));
    }

    #[test]
    fn equal_contents_hash_equally_regardless_of_capacity() {
        let hasher = RandomState::new();

        let mut a = Vector::with_capacity(10);
        a.extend([1, 2, 3]);
        let b = Vector::from([1, 2, 3]);

        assert_eq!(hasher.hash_one(&a), hasher.hash_one(&b));
        assert_eq!(hasher.hash_one(&a), hasher.hash_one([1, 2, 3].as_slice()));
    }

    #[test]
    fn from_iterator_collects_with_exact_capacity() {
        let vector: Vector<u32> = (1..=5).collect();

        assert_eq!(vector.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(vector.capacity(), 5);
    }

    #[test]
    fn from_iterator_without_size_hint_grows_by_doubling() {
        let vector: Vector<u32> = (1..=5).filter(|value| value % 2 == 1).collect();

        assert_eq!(vector.as_slice(), &[1, 3, 5]);
        assert_eq!(vector.capacity(), 4);
    }

    #[test]
    fn from_array_has_exact_capacity() {
        let vector = Vector::from(["a", "b", "c"]);

        assert_eq!(vector.as_slice(), &["a", "b", "c"]);
        assert_eq!(vector.capacity(), 3);
    }

    #[test]
    fn extend_within_capacity_does_not_reallocate() {
        let mut vector = Vector::with_capacity(8);
        vector.push_back(1);
        let original_ptr = vector.as_ptr();

        vector.extend([2, 3, 4]);

        assert_eq!(vector.as_slice(), &[1, 2, 3, 4]);
        assert_eq!(vector.capacity(), 8);
        assert_eq!(vector.as_ptr(), original_ptr);
    }

    #[test]
    fn extend_on_full_vector_at_least_doubles() {
        let mut vector = Vector::from([1, 2, 3, 4]);

        vector.extend([5]);

        assert_eq!(vector.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(vector.capacity(), 8);
    }

    #[test]
    fn extend_beyond_doubling_reserves_for_size_hint() {
        let mut vector = Vector::from([1, 2]);

        vector.extend(3..=12);

        assert_eq!(vector.len(), 12);
        assert_eq!(vector.capacity(), 12);
    }

    #[test]
    fn repeated_single_extends_reallocate_logarithmically() {
        let mut vector = Vector::new();
        let mut reallocations = 0;

        for value in 0..1000_u32 {
            let before = vector.capacity();
            vector.extend([value]);
            let after = vector.capacity();

            if after != before {
                reallocations += 1;
                assert!(after >= 2 * before, "capacity grew from {before} to {after}");
            }
        }

        // 1, 2, 4, ..., 1024
        assert_eq!(reallocations, 11);
        assert_eq!(vector.len(), 1000);
        assert!(vector.iter().copied().eq(0..1000));
    }
}
