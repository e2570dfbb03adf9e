//! Time-ordered queue for scheduled callbacks.

use std::collections::VecDeque;

/// Handle returned by the scheduler. `SchedId::NONE` is never issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchedId(u64);

impl SchedId {
    /// Sentinel for "nothing scheduled".
    pub const NONE: SchedId = SchedId(0);

    /// Whether this is the "nothing scheduled" id.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The raw id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Issues scheduling ids for one context. Ids start at 1 and are never reused.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    next: u64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdGenerator {
    /// Create a generator whose first id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id. Never returns [`SchedId::NONE`].
    pub fn next_id(&mut self) -> SchedId {
        let id = SchedId(self.next);
        self.next += 1;
        id
    }
}

/// A queued payload with its firing time.
#[derive(Debug)]
pub struct ScheduledEvent<T> {
    pub id: SchedId,
    pub time: f64,
    pub payload: T,
}

/// Events sorted by time, ties kept in insertion order.
///
/// Most callers schedule in non-decreasing time, so insertion scans from
/// the tail and the common case is a plain append.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: VecDeque<ScheduledEvent<T>>,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
        }
    }
}

impl<T> EventQueue<T> {
    /// Create a new empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event after every queued event with time `<= event.time`.
    pub fn push(&mut self, event: ScheduledEvent<T>) {
        let pos = self
            .events
            .iter()
            .rposition(|e| e.time <= event.time)
            .map_or(0, |i| i + 1);
        self.events.insert(pos, event);
    }

    /// Remove the event with `id`. Returns whether it was queued.
    pub fn cancel(&mut self, id: SchedId) -> bool {
        if id.is_none() {
            return false;
        }
        match self.events.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.events.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Pop the earliest event if it is due at or before `end`.
    pub fn pop_due(&mut self, end: f64) -> Option<ScheduledEvent<T>> {
        match self.events.front() {
            Some(e) if e.time <= end => self.events.pop_front(),
            _ => None,
        }
    }

    /// The earliest event, if any.
    pub fn peek(&self) -> Option<&ScheduledEvent<T>> {
        self.events.front()
    }

    /// Whether an event with `id` is still queued.
    pub fn contains(&self, id: SchedId) -> bool {
        self.events.iter().any(|e| e.id == id)
    }

    /// Drop every queued event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Firing times in queue order.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.events.iter().map(|e| e.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(times: &[f64]) -> (EventQueue<usize>, Vec<SchedId>) {
        let mut ids = IdGenerator::new();
        let mut queue = EventQueue::new();
        let mut issued = Vec::new();
        for (i, &time) in times.iter().enumerate() {
            let id = ids.next_id();
            issued.push(id);
            queue.push(ScheduledEvent {
                id,
                time,
                payload: i,
            });
        }
        (queue, issued)
    }

    fn drain(queue: &mut EventQueue<usize>) -> Vec<usize> {
        let mut out = Vec::new();
        while let Some(e) = queue.pop_due(f64::INFINITY) {
            out.push(e.payload);
        }
        out
    }

    #[test]
    fn ids_start_at_one() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_id().get(), 1);
        assert_eq!(ids.next_id().get(), 2);
        assert!(SchedId::NONE.is_none());
    }

    #[test]
    fn out_of_order_pushes_sort_by_time() {
        let (mut queue, _) = queue_with(&[3.0, 1.0, 2.0, 0.5]);
        assert_eq!(drain(&mut queue), vec![3, 1, 2, 0]);
    }

    #[test]
    fn equal_times_fire_in_push_order() {
        let (mut queue, _) = queue_with(&[1.0, 0.0, 1.0, 1.0, 0.0]);
        assert_eq!(drain(&mut queue), vec![1, 4, 0, 2, 3]);
    }

    #[test]
    fn pop_due_respects_boundary() {
        let (mut queue, _) = queue_with(&[0.1, 0.2, 0.3]);
        assert_eq!(queue.pop_due(0.2).map(|e| e.payload), Some(0));
        assert_eq!(queue.pop_due(0.2).map(|e| e.payload), Some(1));
        assert!(queue.pop_due(0.2).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn cancel_is_idempotent() {
        let (mut queue, ids) = queue_with(&[1.0, 2.0]);
        assert!(queue.cancel(ids[0]));
        assert!(!queue.cancel(ids[0]));
        assert!(!queue.cancel(SchedId::NONE));
        assert_eq!(drain(&mut queue), vec![1]);
    }
}
