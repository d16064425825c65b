//! Explicit screen lock.
//!
//! Unlike a `MutexGuard`, the lock is not tied to a scope: `lock` and
//! `unlock` are separate calls and may happen in different functions, as
//! `Screen::temp_fini` and `Screen::temp_start` do.
//!
//! Waiters are served in arrival order, so a thread that unlocks and locks
//! again in a loop (the event poller) cannot keep others out.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::logging;

/// `serving` is the ticket allowed to hold the lock; the lock is held while
/// `next != serving`.
#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

#[derive(Debug, Default)]
pub struct ScreenLock {
    tickets: Mutex<Tickets>,
    cvar: Condvar,
}

impl ScreenLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Tickets> {
        match self.tickets.lock() {
            Ok(tickets) => tickets,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Blocks until every earlier caller has had its turn, then takes the lock.
    pub fn lock(&self) {
        let mut tickets = self.state();
        let ticket = tickets.next;
        tickets.next += 1;
        while tickets.serving != ticket {
            tickets = self
                .cvar
                .wait(tickets)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Takes the lock if it is free and nobody is queued for it.
    pub fn try_lock(&self) -> bool {
        let mut tickets = self.state();
        if tickets.next != tickets.serving {
            return false;
        }
        tickets.next += 1;
        true
    }

    /// Releases the lock, handing it to the longest waiter if there is one.
    pub fn unlock(&self) {
        let mut tickets = self.state();
        if tickets.next == tickets.serving {
            log::warn!(target: logging::SCREEN, "unlock called on an unlocked screen");
            return;
        }
        tickets.serving += 1;
        self.cvar.notify_all();
    }

    pub fn is_locked(&self) -> bool {
        let tickets = self.state();
        tickets.next != tickets.serving
    }
}

#[cfg(test)]
mod tests {
    use super::ScreenLock;
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn unlock_may_happen_in_another_call() {
        let lock = ScreenLock::new();
        lock.lock();
        assert!(lock.is_locked());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(!lock.is_locked());
        assert!(lock.try_lock());
    }

    #[test]
    fn unbalanced_unlock_is_ignored() {
        let lock = ScreenLock::new();
        lock.unlock();
        assert!(!lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
    }

    #[test]
    fn lock_blocks_until_released_from_another_thread() {
        let lock = Arc::new(ScreenLock::new());
        lock.lock();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let lock = Arc::clone(&lock);
            thread::spawn(move || {
                lock.lock();
                tx.send(()).expect("send");
                lock.unlock();
            })
        };

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        lock.unlock();
        rx.recv_timeout(Duration::from_secs(5))
            .expect("waiter should acquire the lock");
        waiter.join().expect("join");
    }

    #[test]
    fn relocking_waits_behind_a_queued_waiter() {
        let lock = Arc::new(ScreenLock::new());
        let order = Arc::new(Mutex::new(Vec::new()));
        lock.lock();

        let waiter = {
            let lock = Arc::clone(&lock);
            let order = Arc::clone(&order);
            thread::spawn(move || {
                lock.lock();
                order.lock().expect("order").push("waiter");
                lock.unlock();
            })
        };
        // Give the waiter time to queue up.
        thread::sleep(Duration::from_millis(50));

        lock.unlock();
        lock.lock();
        order.lock().expect("order").push("relocker");
        lock.unlock();
        waiter.join().expect("join");

        assert_eq!(*order.lock().expect("order"), vec!["waiter", "relocker"]);
        assert!(!lock.is_locked());
    }
}
