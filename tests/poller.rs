
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use fixture::harness;
use pretty_assertions::assert_eq;
use termscreen::runtime::POLL_INTERVAL;
use termscreen::{Event, EventPoller};

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn events_flow_across_suspend_and_resume() {
    let h = harness();
    h.screen.init().expect("init");
    let (tx, rx) = mpsc::channel();
    let _poller = EventPoller::spawn(Arc::clone(&h.screen), tx);

    h.sim().inject(Event::RawSeq("\x1b[1;5A".to_string()));
    assert_eq!(rx.recv_timeout(WAIT).expect("event"), Event::RawSeq("\x1b[1;5A".to_string()));

    // Suspending must not deadlock with a poller waiting under the lock.
    let was_absent = h.screen.temp_fini();
    assert!(!was_absent);
    thread::sleep(Duration::from_millis(100));
    assert!(rx.try_recv().is_err());
    h.screen.temp_start(was_absent).expect("resume");

    h.sim().set_size(100, 30);
    assert_eq!(
        rx.recv_timeout(WAIT).expect("event"),
        Event::Resize {
            columns: 100,
            rows: 30
        }
    );
}

#[test]
fn poller_exits_after_fini() {
    let h = harness();
    h.screen.init().expect("init");
    let (tx, _rx) = mpsc::channel();
    let poller = EventPoller::spawn(Arc::clone(&h.screen), tx);
    h.screen.fini();

    for _ in 0..100 {
        if !poller.is_running() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!poller.is_running());
}

#[test]
fn poller_exits_when_sink_is_dropped() {
    let h = harness();
    h.screen.init().expect("init");
    let (tx, rx) = mpsc::channel();
    let poller = EventPoller::spawn(Arc::clone(&h.screen), tx);
    drop(rx);
    h.sim().inject(Event::Input("a".to_string()));

    for _ in 0..100 {
        if !poller.is_running() {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!poller.is_running());
}

#[test]
fn idle_poller_lets_other_callers_take_the_lock() {
    let h = harness();
    h.screen.init().expect("init");
    let (tx, _rx) = mpsc::channel();
    let _poller = EventPoller::spawn(Arc::clone(&h.screen), tx);
    thread::sleep(POLL_INTERVAL);

    let screen = Arc::clone(&h.screen);
    let waits = thread::spawn(move || {
        (0..10)
            .map(|_| {
                let started = Instant::now();
                screen.lock();
                let waited = started.elapsed();
                screen.unlock();
                waited
            })
            .collect::<Vec<_>>()
    })
    .join()
    .expect("join");

    for waited in waits {
        assert!(
            waited <= POLL_INTERVAL * 3,
            "lock took {waited:?} while the poller was idle"
        );
    }
}
