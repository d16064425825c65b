//! Terminal screen coordination.
//!
//! A [`Screen`] owns the one terminal backend an application draws to and
//! coordinates it between an input-polling thread and the main thread.
//!
//! # Public API Overview
//! - Lifecycle: [`Screen::init`], [`Screen::temp_fini`] / [`Screen::temp_start`]
//!   around spawning another program, [`Screen::init_simulation`] for tests,
//!   and [`Screen::fini`].
//! - Locking: [`Screen::lock`] / [`Screen::unlock`] are explicit calls, not a
//!   guard. A suspended screen keeps the lock held until it resumes.
//! - Redraws: [`Screen::redraw`] never blocks; consume them on
//!   [`Screen::draw_chan`].
//! - Cursors: [`Screen::show_cursor`] draws a native or a fake (reverse-video)
//!   cursor; [`Screen::show_fake_cursor_multi`] adds untracked extra cursors.
//! - Raw sequences: [`Screen::register_raw_seq`] makes the backend report a
//!   sequence as [`Event::RawSeq`]. Registrations survive suspend/resume.
//! - Input: [`EventPoller`] forwards backend [`Event`]s to a channel.
//!
//! Invariant: a backend writes to the terminal only through
//! `core::output::OutputGate::flush(..)`.

pub mod config;
pub mod error;
pub(crate) mod logging;

pub mod core;
pub mod platform;
pub mod runtime;

/// Backend capability.
pub use crate::core::backend::{Backend, BackendFactory, BackendOptions, XTERM_FALLBACK};
/// Cell and style model.
pub use crate::core::cell::{Cell, CellBuffer};
pub use crate::core::style::{Attrs, Color, Style};
/// Input events.
pub use crate::core::event::{Event, EventQueue, Poll};
/// Redraw signalling.
pub use crate::core::redraw::{RedrawReceiver, REDRAW_QUEUE_DEPTH};

/// Options and environment.
pub use crate::config::{EnvConfig, GlobalOptions, OptionStore, OptionValue, TrueColorPolicy};
/// Errors.
pub use crate::error::{BackendError, ScreenError};

/// Backends.
#[cfg(unix)]
pub use crate::platform::ProcessBackend;
pub use crate::platform::{ProcessFactory, SimulationBackend, SimulationFactory};

/// Screen runtime.
pub use crate::runtime::{EventPoller, LifecycleState, Screen, ScreenCell, REPLACEMENT_CHAR};
