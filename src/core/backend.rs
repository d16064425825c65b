//! Terminal backend capability.
//!
//! Everything above this module talks to the terminal only through
//! [`Backend`]. Two implementations exist: `platform::ProcessBackend` for a
//! real terminal and `platform::SimulationBackend` for tests.

use std::io;
use std::sync::Arc;

use crate::core::cell::Cell;
use crate::core::event::EventQueue;
use crate::core::style::Style;
use crate::error::BackendError;

/// Terminal type used when the configured one cannot be driven.
pub const XTERM_FALLBACK: &str = "xterm-256color";

/// Settings resolved before a backend is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// `Some(true)`/`Some(false)` force 24-bit color on/off; `None` lets the
    /// backend detect it.
    pub truecolor: Option<bool>,
    /// Terminal type to use instead of `$TERM`, for this construction only.
    pub term: Option<String>,
}

/// Low-level terminal control.
pub trait Backend: Send {
    /// Enter raw mode / start input processing.
    fn init(&mut self) -> io::Result<()>;

    /// Restore the terminal. Closes the event queue.
    fn fini(&mut self);

    /// Columns and rows.
    fn size(&self) -> (usize, usize);

    /// Content at (x, y); a blank cell when out of range.
    fn get_content(&self, x: usize, y: usize) -> Cell;

    fn set_content(&mut self, x: usize, y: usize, ch: char, combining: &[char], style: Style);

    fn show_cursor(&mut self, x: usize, y: usize);
    fn hide_cursor(&mut self);

    /// Flush pending cell changes to the terminal.
    fn show(&mut self) -> io::Result<()>;

    /// Blank every cell with the given style.
    fn clear(&mut self, style: Style);

    fn enable_mouse(&mut self);
    fn disable_mouse(&mut self);
    fn set_paste(&mut self, enabled: bool);

    /// Report `seq` as [`crate::Event::RawSeq`] instead of splitting it.
    fn register_raw_seq(&mut self, seq: &str);
    fn unregister_raw_seq(&mut self, seq: &str);

    /// Whether `ch` can be drawn. With `check_fallbacks`, a character the
    /// backend can approximate also counts.
    fn can_display(&self, ch: char, check_fallbacks: bool) -> bool;

    /// The queue this backend's input is delivered on.
    fn events(&self) -> Arc<EventQueue>;
}

/// Constructs backends; called once (or twice, with the xterm fallback) per
/// screen initialization.
pub trait BackendFactory: Send + Sync {
    fn create(&self, options: &BackendOptions) -> Result<Box<dyn Backend>, BackendError>;
}
