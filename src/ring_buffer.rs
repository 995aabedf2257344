//! Fixed-capacity circular buffer with overwrite-oldest semantics.
//!
//! [`CircularBuffer`] keeps the `len` most recently pushed elements in
//! insertion order.  Storage is allocated once at construction and never
//! grows: pushing into a full buffer overwrites the oldest slot in place and
//! advances the logical start by one.
//!
//! | Operation | Cost |
//! |---|---|
//! | [`CircularBuffer::push`] | O(1), no reallocation |
//! | [`CircularBuffer::get`] | O(1) |
//! | `Display` | O(len) |
//!
//! ```
//! # use emg_ble::ring_buffer::CircularBuffer;
//! let mut buf = CircularBuffer::new(3);
//! for v in [10, 20, 30, 40] {
//!     buf.push(v);
//! }
//! assert_eq!(buf.to_string(), "[20, 30, 40]");
//! assert_eq!(buf.get(0), Ok(&20));
//! assert!(buf.get(3).is_err());
//! ```

use std::fmt;
use std::ops::Index;

use thiserror::Error;

/// Errors reported by [`CircularBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingBufferError {
    /// Logical index outside `[0, len)`.
    #[error("index {index} out of range for circular buffer of length {len}")]
    OutOfRange { index: usize, len: usize },
    /// A buffer must hold at least one element.
    #[error("circular buffer capacity must be greater than zero")]
    ZeroCapacity,
}

/// A fixed-capacity ring buffer that overwrites its oldest element when full.
///
/// Logical index `0` is the oldest retained element and `len() - 1` the
/// newest.  The physical slot for logical index `i` is
/// `(start + i) % capacity`.
///
/// Not internally synchronised; share behind a `Mutex` if several tasks
/// need to push.
#[derive(Clone)]
pub struct CircularBuffer<T> {
    slots: Box<[Option<T>]>,
    start: usize,
    len: usize,
}

impl<T> CircularBuffer<T> {
    /// Create an empty buffer able to hold exactly `capacity` elements.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.  Use [`CircularBuffer::try_new`] when the
    /// capacity comes from user input.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "circular buffer capacity must be greater than zero");
        Self::allocate(capacity)
    }

    /// Fallible counterpart of [`CircularBuffer::new`].
    pub fn try_new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            return Err(RingBufferError::ZeroCapacity);
        }
        Ok(Self::allocate(capacity))
    }

    fn allocate(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            start: 0,
            len: 0,
        }
    }

    /// Append `element`.  Never fails: when the buffer is full the oldest
    /// element is dropped and its slot reused.
    pub fn push(&mut self, element: T) {
        let cap = self.capacity();
        let slot = (self.start + self.len) % cap;
        self.slots[slot] = Some(element);
        if self.len == cap {
            self.start = (self.start + 1) % cap;
        } else {
            self.len += 1;
        }
    }

    /// Element at logical position `index` (0 = oldest).
    ///
    /// Returns [`RingBufferError::OutOfRange`] for `index >= len()`, including
    /// any index on an empty buffer.
    pub fn get(&self, index: usize) -> Result<&T, RingBufferError> {
        if index >= self.len {
            return Err(RingBufferError::OutOfRange {
                index,
                len: self.len,
            });
        }
        let slot = (self.start + index) % self.capacity();
        self.slots[slot]
            .as_ref()
            .ok_or(RingBufferError::OutOfRange {
                index,
                len: self.len,
            })
    }

    /// Newest element, if any.
    pub fn latest(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i).ok())
    }

    /// Number of elements currently retained.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` once the next push will overwrite the oldest element.
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Fixed capacity chosen at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Drop every element.  Capacity is unchanged.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.start = 0;
        self.len = 0;
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            buf: self,
            front: 0,
            back: self.len,
        }
    }
}

impl<T: Clone> CircularBuffer<T> {
    /// Copy the retained elements out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Index<usize> for CircularBuffer<T> {
    type Output = T;

    /// # Panics
    /// Panics when `index >= len()`.
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for CircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity())
            .field("items", &DebugItems(self))
            .finish()
    }
}

struct DebugItems<'a, T>(&'a CircularBuffer<T>);

impl<T: fmt::Debug> fmt::Debug for DebugItems<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Oldest-to-newest iterator returned by [`CircularBuffer::iter`].
pub struct Iter<'a, T> {
    buf: &'a CircularBuffer<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front >= self.back {
            return None;
        }
        let item = self.buf.get(self.front).ok();
        self.front += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        self.buf.get(self.back).ok()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a CircularBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_newest_three() {
        let mut buf = CircularBuffer::new(3);
        for v in [10, 20, 30, 40] {
            buf.push(v);
        }
        assert_eq!(buf.to_vec(), vec![20, 30, 40]);
        assert_eq!(buf.get(0), Ok(&20));
        assert_eq!(buf.get(2), Ok(&40));
        assert_eq!(
            buf.get(3),
            Err(RingBufferError::OutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn capacity_one_holds_last_push() {
        let mut buf = CircularBuffer::new(1);
        buf.push(5);
        buf.push(6);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.get(0), Ok(&6));
        assert_eq!(buf.to_string(), "[6]");
    }

    #[test]
    fn renders_partial_buffer() {
        let mut buf = CircularBuffer::new(3);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.to_string(), "[1, 2]");
    }

    #[test]
    fn empty_buffer_renders_brackets_and_rejects_reads() {
        let buf: CircularBuffer<u8> = CircularBuffer::new(4);
        assert_eq!(buf.to_string(), "[]");
        assert!(buf.is_empty());
        assert!(buf.get(0).is_err());
        assert_eq!(buf.latest(), None);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(
            CircularBuffer::<u8>::try_new(0).err(),
            Some(RingBufferError::ZeroCapacity)
        );
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than zero")]
    fn new_panics_on_zero_capacity() {
        let _ = CircularBuffer::<u8>::new(0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_operator_panics_past_len() {
        let mut buf = CircularBuffer::new(2);
        buf.push('a');
        let _ = buf[1];
    }

    #[test]
    fn latest_and_full_track_pushes() {
        let mut buf = CircularBuffer::new(2);
        assert!(!buf.is_full());
        buf.push(1);
        buf.push(2);
        assert!(buf.is_full());
        buf.push(3);
        assert_eq!(buf.latest(), Some(&3));
        assert_eq!(buf[0], 2);
        assert_eq!(buf.capacity(), 2);
    }

    #[test]
    fn clear_resets_but_keeps_capacity() {
        let mut buf = CircularBuffer::new(3);
        for v in 0..5 {
            buf.push(v);
        }
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 3);
        buf.push(9);
        assert_eq!(buf.to_vec(), vec![9]);
    }

    #[test]
    fn iter_is_double_ended_and_exact() {
        let mut buf = CircularBuffer::new(4);
        for v in 1..=6 {
            buf.push(v);
        }
        let it = buf.iter();
        assert_eq!(it.len(), 4);
        let rev: Vec<_> = buf.iter().rev().copied().collect();
        assert_eq!(rev, vec![6, 5, 4, 3]);
    }

    #[test]
    fn holds_non_copy_elements() {
        let mut buf = CircularBuffer::new(2);
        buf.push(String::from("a"));
        buf.push(String::from("b"));
        buf.push(String::from("c"));
        assert_eq!(buf.to_string(), "[b, c]");
        assert_eq!(format!("{buf:?}"), r#"CircularBuffer { capacity: 2, items: ["b", "c"] }"#);
    }
}
