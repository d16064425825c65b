//! Shared screen, explicit lock, cursor emulation, and input polling.

pub mod cursor;
pub mod lock;
pub mod poller;
pub mod screen;

pub use cursor::{ScreenCell, REPLACEMENT_CHAR};
pub use lock::ScreenLock;
pub use poller::{EventPoller, POLL_INTERVAL};
pub use screen::{LifecycleState, Screen};
