//! Deferred reclamation keyed by submission serial.

use std::collections::VecDeque;

/// Items waiting for the GPU to finish the work submitted before they were released.
///
/// Serials must be pushed in non-decreasing order.
#[derive(Debug)]
pub struct ReleaseQueue<T> {
    pending: VecDeque<(u64, T)>,
}

impl<T> ReleaseQueue<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Hold `item` until `serial` has completed.
    pub fn push(&mut self, serial: u64, item: T) {
        debug_assert!(
            self.pending.back().is_none_or(|(last, _)| *last <= serial),
            "release serials must not go backwards"
        );
        self.pending.push_back((serial, item));
    }

    /// Remove every item whose serial is `<= completed`.
    pub fn drain_completed(&mut self, completed: u64) -> Vec<T> {
        let ready = self
            .pending
            .iter()
            .take_while(|(serial, _)| *serial <= completed)
            .count();
        self.pending.drain(..ready).map(|(_, item)| item).collect()
    }

    /// Remove everything; only valid once the device is idle.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.pending.drain(..).map(|(_, item)| item).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for ReleaseQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_only_completed_serials() {
        let mut q = ReleaseQueue::new();
        q.push(1, "a");
        q.push(1, "b");
        q.push(3, "c");

        assert!(q.drain_completed(0).is_empty());
        assert_eq!(q.drain_completed(2), vec!["a", "b"]);
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain_completed(3), vec!["c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn drain_all_empties_queue() {
        let mut q = ReleaseQueue::default();
        q.push(5, 1);
        q.push(9, 2);
        assert_eq!(q.drain_all(), vec![1, 2]);
        assert!(q.is_empty());
    }
}
