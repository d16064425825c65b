//! `log` targets used across the crate.
//!
//! The library only emits records; the application installs the logger.

/// Lifecycle transitions and lock discipline.
pub(crate) const SCREEN: &str = "termscreen::screen";

/// Backend construction and terminal I/O.
pub(crate) const BACKEND: &str = "termscreen::backend";

/// Input splitting and event polling.
pub(crate) const INPUT: &str = "termscreen::input";
