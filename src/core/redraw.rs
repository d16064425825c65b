//! Coalesced, non-blocking redraw signals.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pending redraw signals beyond this are dropped.
pub const REDRAW_QUEUE_DEPTH: usize = 8;

/// Producer side. `request` never blocks; a full queue already guarantees a
/// redraw is pending, so the extra request is dropped.
#[derive(Debug)]
pub struct RedrawScheduler {
    tx: SyncSender<()>,
    rx: RedrawReceiver,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::sync_channel(REDRAW_QUEUE_DEPTH);
        Self {
            tx,
            rx: RedrawReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        }
    }

    pub fn request(&self) {
        // Full means a redraw is already pending.
        let _ = self.tx.try_send(());
    }

    pub fn receiver(&self) -> RedrawReceiver {
        self.rx.clone()
    }
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side, cloneable so the event loop can hold it across screen
/// re-initialization.
#[derive(Debug, Clone)]
pub struct RedrawReceiver {
    rx: Arc<Mutex<Receiver<()>>>,
}

impl RedrawReceiver {
    fn with_rx<R>(&self, f: impl FnOnce(&Receiver<()>) -> R) -> R {
        let rx = match self.rx.lock() {
            Ok(rx) => rx,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&rx)
    }

    /// Blocks until a signal arrives. Returns false once the screen is gone.
    pub fn recv(&self) -> bool {
        self.with_rx(|rx| rx.recv().is_ok())
    }

    /// Consumes one pending signal without blocking.
    pub fn try_recv(&self) -> bool {
        self.with_rx(|rx| rx.try_recv().is_ok())
    }

    /// Waits up to `timeout` for a signal.
    pub fn recv_timeout(&self, timeout: Duration) -> bool {
        self.with_rx(|rx| rx.recv_timeout(timeout).is_ok())
    }

    /// Consumes every pending signal. Returns whether there was at least one.
    pub fn drain(&self) -> bool {
        self.with_rx(|rx| {
            let mut any = false;
            while rx.try_recv().is_ok() {
                any = true;
            }
            any
        })
    }
}
