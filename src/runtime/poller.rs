//! Background input polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::core::event::{Event, Poll};
use crate::logging;
use crate::runtime::screen::{LifecycleState, Screen};

/// Longest time one poll holds the screen lock while waiting for input.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pause after the backend went away, so a suspend can take the lock.
const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// Thread forwarding backend events to a channel.
///
/// Each round takes the screen lock, waits briefly on the active backend's
/// queue, releases the lock, then forwards what it got. While the screen is
/// suspended the lock is held by the suspender, so the poller simply waits.
pub struct EventPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventPoller {
    pub fn spawn(screen: Arc<Screen>, sink: Sender<Event>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                if screen.state() == LifecycleState::Finalized {
                    break;
                }

                screen.lock();
                let poll = match screen.with_backend(|backend| backend.events()) {
                    Some(queue) => queue.wait_timeout(POLL_INTERVAL),
                    None => Poll::Closed,
                };
                screen.unlock();

                match poll {
                    Poll::Event(event) => {
                        if sink.send(event).is_err() {
                            log::debug!(target: logging::INPUT, "event sink dropped; poller exiting");
                            break;
                        }
                    }
                    Poll::Timeout => {}
                    Poll::Closed => thread::sleep(IDLE_BACKOFF),
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for EventPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
