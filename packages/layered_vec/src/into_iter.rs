use std::iter::FusedIterator;
use std::{fmt, ptr, slice};

use crate::RawBuffer;

/// An iterator that moves the values out of a [`Vector`][crate::Vector].
///
/// Values not consumed by the time the iterator is dropped are dropped along with it, and the
/// storage is released.
///
/// # Examples
///
/// ```
/// use layered_vec::Vector;
///
/// let words = Vector::from([String::from("a"), String::from("b"), String::from("c")]);
///
/// let mut iter = words.into_iter();
/// assert_eq!(iter.next().as_deref(), Some("a"));
/// assert_eq!(iter.next_back().as_deref(), Some("c"));
/// assert_eq!(iter.as_slice(), &["b"]);
/// ```
pub struct IntoIter<T> {
    buffer: RawBuffer<T>,

    // Slots [front, back) hold the values not yet yielded.
    front: usize,
    back: usize,
}

impl<T> IntoIter<T> {
    /// # Safety
    ///
    /// Slots `[0, len)` of `buffer` must hold live values, which the iterator takes ownership of.
    pub(crate) unsafe fn new(buffer: RawBuffer<T>, len: usize) -> Self {
        debug_assert!(len <= buffer.capacity());

        Self {
            buffer,
            front: 0,
            back: len,
        }
    }

    /// The values not yet yielded, as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: front <= back <= capacity.
        let first = unsafe { self.buffer.slot(self.front) };

        // SAFETY: Slots [front, back) hold live values owned by the iterator.
        unsafe { slice::from_raw_parts(first.as_ptr(), self.remaining()) }
    }

    fn remaining(&self) -> usize {
        // Cannot underflow because front never passes back.
        self.back.wrapping_sub(self.front)
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }

        // SAFETY: front < back <= capacity.
        let slot = unsafe { self.buffer.slot(self.front) };

        // Cannot overflow because front < back.
        self.front = self.front.wrapping_add(1);

        // SAFETY: The slot held a live value, which we just excluded from the remaining range.
        Some(unsafe { slot.read() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        if self.front == self.back {
            return None;
        }

        // Cannot underflow because back > front.
        self.back = self.back.wrapping_sub(1);

        // SAFETY: back < previous back <= capacity.
        let slot = unsafe { self.buffer.slot(self.back) };

        // SAFETY: The slot held a live value, which we just excluded from the remaining range.
        Some(unsafe { slot.read() })
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> Drop for IntoIter<T> {
    fn drop(&mut self) {
        let remaining = self.remaining();

        // SAFETY: front <= back <= capacity.
        let first = unsafe { self.buffer.slot(self.front) };

        // Forget the values before dropping them, so a panicking drop cannot drop any twice.
        self.front = self.back;

        // SAFETY: The slots held live values that are no longer part of the remaining range.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(first.as_ptr(), remaining));
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for IntoIter<T> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use testing::{Census, Specimen, expect_panic};

    use crate::Vector;

    use super::*;

    assert_impl_all!(IntoIter<u32>: Send, Sync, ExactSizeIterator, DoubleEndedIterator);
    assert_not_impl_any!(IntoIter<Rc<u32>>: Send, Sync);

    #[test]
    fn yields_values_in_order() {
        let vector = Vector::from([1, 2, 3]);

        let collected: Vec<i32> = vector.into_iter().collect();

        assert_eq!(collected, vec![1, 2, 3]);
    }

    #[test]
    fn yields_from_both_ends() {
        let mut iter = Vector::from([1, 2, 3, 4]).into_iter();

        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next_back(), Some(4));
        assert_eq!(iter.next(), Some(1));
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.as_slice(), &[2, 3]);
        assert_eq!(iter.next_back(), Some(3));
        assert_eq!(iter.next_back(), Some(2));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn dropping_part_way_drops_the_rest() {
        Census::reset();

        let vector: Vector<Specimen> = (0..5).map(Specimen::new).collect();
        let mut iter = vector.into_iter();

        let first = iter.next().unwrap();
        assert_eq!(first.value(), 0);
        drop(iter);

        // Only the value we took out is still alive.
        assert_eq!(Census::snapshot().live(), 1);
        drop(first);
        assert_eq!(Census::snapshot().live(), 0);
    }

    #[test]
    fn moves_without_cloning() {
        Census::reset();

        let vector: Vector<Specimen> = (0..3).map(Specimen::new).collect();

        let taken: Vec<Specimen> = vector.into_iter().collect();

        assert_eq!(taken.len(), 3);
        assert_eq!(Census::snapshot().cloned(), 0);
        assert_eq!(Census::snapshot().dropped(), 0);
    }

    #[test]
    fn empty_vector_yields_nothing() {
        let mut iter = Vector::<String>::new().into_iter();

        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
    }

    #[test]
    fn zero_sized_values() {
        let mut vector = Vector::new();
        vector.resize(7);

        let iter: IntoIter<()> = vector.into_iter();

        assert_eq!(iter.count(), 7);
    }

    #[test]
    fn debug_shows_remaining() {
        let mut iter = Vector::from([1, 2, 3]).into_iter();
        iter.next();

        assert_eq!(format!("{iter:?}"), "IntoIter([2, 3])");
    }

    #[test]
    fn panicking_drop_still_drops_the_rest() {
        struct Grenade(Rc<Cell<usize>>, bool);

        impl Drop for Grenade {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
                assert!(!self.1, "grenade went off");
            }
        }

        let drops = Rc::new(Cell::new(0));
        let vector = Vector::from([
            Grenade(Rc::clone(&drops), false),
            Grenade(Rc::clone(&drops), true),
            Grenade(Rc::clone(&drops), false),
        ]);
        let iter = vector.into_iter();

        expect_panic(move || drop(iter));

        assert_eq!(drops.get(), 3);
    }
}
