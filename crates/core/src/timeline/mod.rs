use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::pulse::Arrival;
use crate::retrigger::StepEvent;

/// Slack used when comparing logical times.
pub const TIME_EPSILON: f64 = 1e-9;

/// The single clock every subsystem reads: propagation, sources, retrigger
/// steps and the audio binding all agree on this time base.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    /// Moves the clock to `time`. The clock never runs backwards.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.time_seconds {
            self.time_seconds = time;
        }
    }
}

/// Handle returned by [`Scheduler::schedule`], used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(u64);

/// Deferred continuation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledAction {
    /// A pulse reaches its target node.
    Arrive(Arrival),
    /// A later step of a retrigger sequence.
    RetriggerStep(StepEvent),
}

#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub time_seconds: f64,
    pub handle: EventHandle,
    pub action: ScheduledAction,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed so the max-heap pops the earliest event first; equal times pop in
    // scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time_seconds
            .total_cmp(&self.time_seconds)
            .then_with(|| other.handle.cmp(&self.handle))
    }
}

/// Priority queue of continuations keyed by absolute fire time.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<ScheduledEvent>,
    pending: HashSet<EventHandle>,
    next_handle: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, time_seconds: f64, action: ScheduledAction) -> EventHandle {
        let handle = EventHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.insert(handle);
        self.queue.push(ScheduledEvent {
            time_seconds,
            handle,
            action,
        });
        handle
    }

    /// Cancels a pending event. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.pending.remove(&handle)
    }

    /// Pops the earliest live event due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<ScheduledEvent> {
        self.discard_cancelled();
        if self.queue.peek()?.time_seconds > now + TIME_EPSILON {
            return None;
        }
        self.pop_next()
    }

    /// Pops the earliest live event regardless of its time.
    pub fn pop_next(&mut self) -> Option<ScheduledEvent> {
        while let Some(event) = self.queue.pop() {
            if self.pending.remove(&event.handle) {
                return Some(event);
            }
        }
        None
    }

    /// Fire time of the earliest live event.
    pub fn next_time(&mut self) -> Option<f64> {
        self.discard_cancelled();
        self.queue.peek().map(|event| event.time_seconds)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn discard_cancelled(&mut self) {
        while let Some(event) = self.queue.peek() {
            if self.pending.contains(&event.handle) {
                break;
            }
            self.queue.pop();
        }
    }
}
