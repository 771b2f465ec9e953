//! Single-threaded event queue with an injectable clock.
//!
//! Everything that changes session state goes through this queue, so events
//! are processed one at a time in the order they were posted. Delayed posts
//! are held as timers until [`Dispatcher::release_due`] is called with the
//! clock past their deadline.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::events::Event;

/// Monotonic time since the session started.
pub trait Clock {
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

struct Timer {
    deadline: Duration,
    event: Event,
}

pub struct Dispatcher {
    clock: Box<dyn Clock>,
    queue: VecDeque<Event>,
    // Sorted by deadline; equal deadlines keep posting order.
    timers: Vec<Timer>,
}

impl Dispatcher {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            queue: VecDeque::new(),
            timers: Vec::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn post(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn post_after(&mut self, delay: Duration, event: Event) {
        let deadline = self.clock.now() + delay;
        let index = self.timers.partition_point(|t| t.deadline <= deadline);
        self.timers.insert(index, Timer { deadline, event });
    }

    /// Move every timer whose deadline has passed into the queue.
    pub fn release_due(&mut self) -> usize {
        let now = self.clock.now();
        let due = self.timers.partition_point(|t| t.deadline <= now);
        self.queue
            .extend(self.timers.drain(..due).map(|timer| timer.event));
        due
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Time left until the earliest timer fires, zero if already due.
    pub fn until_next_timer(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.timers
            .first()
            .map(|timer| timer.deadline.saturating_sub(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::DeviceSignal;

    fn dispatcher() -> (Dispatcher, ManualClock) {
        let clock = ManualClock::new();
        (Dispatcher::new(Box::new(clock.clone())), clock)
    }

    #[test]
    fn posts_are_fifo() {
        let (mut dispatcher, _) = dispatcher();
        dispatcher.post(Event::Advance);
        dispatcher.post(Event::Retreat);
        assert_eq!(dispatcher.pop(), Some(Event::Advance));
        assert_eq!(dispatcher.pop(), Some(Event::Retreat));
        assert_eq!(dispatcher.pop(), None);
    }

    #[test]
    fn timers_wait_for_the_clock() {
        let (mut dispatcher, clock) = dispatcher();
        dispatcher.post_after(
            Duration::from_millis(100),
            Event::Device(DeviceSignal::NotFound),
        );

        assert_eq!(dispatcher.release_due(), 0);
        assert_eq!(dispatcher.until_next_timer(), Some(Duration::from_millis(100)));

        clock.advance(Duration::from_millis(100));
        assert_eq!(dispatcher.release_due(), 1);
        assert_eq!(dispatcher.pop(), Some(Event::Device(DeviceSignal::NotFound)));
        assert_eq!(dispatcher.pending_timers(), 0);
    }

    #[test]
    fn due_timers_release_in_deadline_then_posting_order() {
        let (mut dispatcher, clock) = dispatcher();
        dispatcher.post_after(Duration::from_millis(50), Event::Retreat);
        dispatcher.post_after(Duration::from_millis(10), Event::Advance);
        dispatcher.post_after(Duration::from_millis(50), Event::Restart);

        clock.advance(Duration::from_secs(1));
        assert_eq!(dispatcher.release_due(), 3);
        assert_eq!(dispatcher.pop(), Some(Event::Advance));
        assert_eq!(dispatcher.pop(), Some(Event::Retreat));
        assert_eq!(dispatcher.pop(), Some(Event::Restart));
    }
}
