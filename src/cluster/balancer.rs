use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin cursor over a fixed number of workers.
///
/// Selection ignores load entirely: request `k` goes to worker `k mod n`, in
/// spawn order, starting at index 0. The cursor is atomic so concurrent
/// requests on a multi-threaded coordinator never share a turn.
#[derive(Debug)]
pub struct RoundRobin {
    cursor: AtomicUsize,
    len: usize,
}

impl RoundRobin {
    /// Create a cursor over `len` workers.
    pub fn new(len: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(0),
            len,
        }
    }

    /// Get the next worker index, or `None` if there are no workers.
    pub fn next_index(&self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }

        let len = self.len;
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor + 1) % len)
            })
            .unwrap_or_else(|current| current);
        Some(previous)
    }

    /// Get the number of workers in the rotation
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
