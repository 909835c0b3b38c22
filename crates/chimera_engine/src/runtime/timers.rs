use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

#[derive(Debug)]
struct Scheduled<T> {
    due: Duration,
    id: TimerId,
    payload: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.id == other.id
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    // Reversed so the max-heap pops the earliest due time; ties fire in
    // scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Deferred callbacks keyed by simulated due time, checked once per tick.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Scheduled<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.heap.push(Scheduled { due, id, payload });
        id
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.heap.peek().map(|scheduled| scheduled.due)
    }

    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, T)> {
        if self.next_due()? > now {
            return None;
        }
        self.heap
            .pop()
            .map(|scheduled| (scheduled.due, scheduled.payload))
    }

    pub fn drain_due(&mut self, now: Duration) -> Vec<T> {
        let mut fired = Vec::new();
        while let Some((_, payload)) = self.pop_due(now) {
            fired.push(payload);
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order_then_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_secs(3), "c");
        timers.schedule(Duration::from_secs(1), "a");
        timers.schedule(Duration::from_secs(3), "d");
        timers.schedule(Duration::from_secs(2), "b");

        assert_eq!(
            timers.drain_due(Duration::from_secs(3)),
            vec!["a", "b", "c", "d"]
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn nothing_fires_before_due() {
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_millis(500), 1u32);
        assert!(timers.drain_due(Duration::from_millis(499)).is_empty());
        assert_eq!(timers.next_due(), Some(Duration::from_millis(500)));
        assert_eq!(timers.drain_due(Duration::from_millis(500)), vec![1]);
    }

    #[test]
    fn pop_due_reports_scheduled_time() {
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_secs(1), ());
        let (due, ()) = timers.pop_due(Duration::from_secs(5)).expect("due");
        assert_eq!(due, Duration::from_secs(1));
        assert!(timers.pop_due(Duration::from_secs(5)).is_none());
    }
}
