//! Line ring: fixed-capacity store for the most recent lines.
//!
//! The ring keeps at most `capacity` lines, evicting the oldest on every
//! push past capacity. Index 0 is always the oldest retained line.

use std::collections::VecDeque;

/// Ring buffer holding the last `capacity` raw lines.
///
/// Lines are stored as owned byte slices exactly as received (terminator
/// included); sanitizing for display happens at render time.
#[derive(Debug)]
pub struct LineRing {
    /// Retained lines, oldest at the front.
    lines: VecDeque<Box<[u8]>>,
    /// Maximum number of lines to retain.
    capacity: usize,
}

impl LineRing {
    /// Create a ring that retains up to `capacity` lines.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "line ring capacity must be at least 1");
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of retained lines.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lines currently retained.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if no line has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Check if the ring is at capacity.
    pub fn is_full(&self) -> bool {
        self.lines.len() == self.capacity
    }

    /// Push a copy of `line`, evicting the oldest line when full.
    ///
    /// The caller's buffer may be reused as soon as this returns.
    pub fn push(&mut self, line: &[u8]) {
        self.push_owned(line.into());
    }

    /// Push an owned line, evicting the oldest line when full.
    pub fn push_owned(&mut self, line: Box<[u8]>) {
        if self.is_full() {
            // Dropping the evicted slot releases its allocation.
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Get the line at `index`, counted from the oldest retained line.
    ///
    /// Reading past the end yields an empty line rather than an error.
    pub fn get(&self, index: usize) -> &[u8] {
        self.lines.get(index).map_or(&[][..], |line| &line[..])
    }

    /// Iterate over the last `count` lines, oldest first.
    ///
    /// Yields fewer than `count` lines if the ring holds fewer.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &[u8]> {
        let start = self.lines.len().saturating_sub(count);
        self.lines.range(start..).map(|line| &line[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(ring: &mut LineRing, lines: &[&str]) {
        for line in lines {
            ring.push(line.as_bytes());
        }
    }

    #[test]
    fn test_ring_new_is_empty() {
        let ring = LineRing::new(3);
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.capacity(), 3);
        assert!(ring.is_empty());
        assert_eq!(ring.tail(3).count(), 0);
    }

    #[test]
    fn test_ring_push_and_get() {
        let mut ring = LineRing::new(3);
        push_all(&mut ring, &["one", "two"]);

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.get(0), b"one");
        assert_eq!(ring.get(1), b"two");
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut ring = LineRing::new(3);
        push_all(&mut ring, &["a", "b", "c", "d", "e"]);

        assert_eq!(ring.len(), 3);
        assert!(ring.is_full());
        let lines: Vec<&[u8]> = ring.tail(3).collect();
        assert_eq!(lines, vec![&b"c"[..], &b"d"[..], &b"e"[..]]);
    }

    #[test]
    fn test_ring_get_past_end_is_empty() {
        let mut ring = LineRing::new(4);
        push_all(&mut ring, &["x"]);

        assert_eq!(ring.get(1), b"");
        assert_eq!(ring.get(100), b"");
        assert!(LineRing::new(1).get(0).is_empty());
    }

    #[test]
    fn test_ring_capacity_one_replaces() {
        let mut ring = LineRing::new(1);
        for line in ["first", "second", "third"] {
            ring.push(line.as_bytes());
            assert_eq!(ring.len(), 1);
            assert_eq!(ring.get(0), line.as_bytes());
        }
    }

    #[test]
    fn test_ring_retains_last_pushes_in_order() {
        // For every capacity and push count, index i holds push (k - min(k, c) + i).
        for capacity in 1..=5 {
            for pushes in 0..=12 {
                let mut ring = LineRing::new(capacity);
                for n in 0..pushes {
                    ring.push(format!("line {n}").as_bytes());
                }

                let retained = pushes.min(capacity);
                assert_eq!(ring.len(), retained);
                for i in 0..retained {
                    let expected = format!("line {}", pushes - retained + i);
                    assert_eq!(ring.get(i), expected.as_bytes());
                }
                assert!(ring.get(retained).is_empty());
            }
        }
    }

    #[test]
    fn test_ring_caller_buffer_reusable() {
        let mut ring = LineRing::new(2);
        let mut scratch = b"hello\n".to_vec();
        ring.push(&scratch);
        scratch.clear();
        scratch.extend_from_slice(b"world\n");

        assert_eq!(ring.get(0), b"hello\n");
    }

    #[test]
    fn test_ring_tail() {
        let mut ring = LineRing::new(5);
        push_all(&mut ring, &["1", "2", "3", "4"]);

        let tail: Vec<&[u8]> = ring.tail(2).collect();
        assert_eq!(tail, vec![&b"3"[..], &b"4"[..]]);
        assert_eq!(ring.tail(10).count(), 4);
    }
}
