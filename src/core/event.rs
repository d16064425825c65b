//! Backend events and the queue the input poller waits on.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// An input event produced by a backend.
///
/// Input is split into complete sequences but not interpreted: a key press
/// arrives as the bytes the terminal sent for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// One complete input sequence (a character, or an escape sequence).
    Input(String),
    /// Bracketed paste content, without the paste markers.
    Paste(String),
    /// A sequence previously registered with `register_raw_seq`.
    RawSeq(String),
    /// The terminal was resized.
    Resize { columns: usize, rows: usize },
}

/// Outcome of waiting on an [`EventQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    Event(Event),
    Timeout,
    /// The owning backend was finalized; no more events will arrive.
    Closed,
}

#[derive(Debug, Default)]
struct EventQueueState {
    events: VecDeque<Event>,
    closed: bool,
}

/// Multi-producer event queue shared between a backend's input threads and
/// the poller. Closing it wakes every waiter.
#[derive(Debug, Default)]
pub struct EventQueue {
    state: Mutex<EventQueueState>,
    cvar: Condvar,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, EventQueueState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queues an event. Events pushed after `close` are dropped.
    pub fn push(&self, event: Event) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        state.events.push_back(event);
        self.cvar.notify_one();
    }

    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        self.cvar.notify_all();
    }

    /// Re-opens a closed queue and drops anything left from the previous run.
    pub fn reset(&self) {
        let mut state = self.state();
        state.closed = false;
        state.events.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn try_pop(&self) -> Option<Event> {
        self.state().events.pop_front()
    }

    /// Blocks until an event is queued, the queue is closed, or `timeout`
    /// elapses. Queued events are still handed out after close; `Closed` is
    /// only reported once the queue is empty.
    pub fn wait_timeout(&self, timeout: Duration) -> Poll {
        let deadline = Instant::now() + timeout;
        let mut state = self.state();
        loop {
            if let Some(event) = state.events.pop_front() {
                return Poll::Event(event);
            }
            if state.closed {
                return Poll::Closed;
            }
            let now = Instant::now();
            if now >= deadline {
                return Poll::Timeout;
            }
            state = match self.cvar.wait_timeout(state, deadline - now) {
                Ok((state, _)) => state,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }
}
