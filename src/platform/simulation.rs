//! In-memory backend for tests and headless use.
//!
//! Handles are cheap clones sharing one state, so a test can keep a
//! `SimulationBackend` while the screen owns another copy of it.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::backend::{Backend, BackendFactory, BackendOptions};
use crate::core::cell::{Cell, CellBuffer};
use crate::core::event::{Event, EventQueue};
use crate::core::raw_seq::RawSequenceSet;
use crate::core::style::Style;
use crate::error::BackendError;

pub const SIM_COLUMNS: usize = 80;
pub const SIM_ROWS: usize = 24;

#[derive(Debug)]
struct SimState {
    cells: CellBuffer,
    initialized: bool,
    init_count: usize,
    fini_count: usize,
    cursor: Option<(usize, usize)>,
    mouse: bool,
    paste: bool,
    unicode: bool,
    raw_seqs: RawSequenceSet,
    raw_seq_log: Vec<String>,
    shows: usize,
}

#[derive(Debug, Clone)]
pub struct SimulationBackend {
    state: Arc<Mutex<SimState>>,
    events: Arc<EventQueue>,
}

impl SimulationBackend {
    /// A blank `columns x rows` screen. Both dimensions must be non-zero.
    pub fn new(columns: usize, rows: usize) -> Result<Self, BackendError> {
        if columns == 0 || rows == 0 {
            return Err(BackendError::InvalidSize { columns, rows });
        }
        Ok(Self {
            state: Arc::new(Mutex::new(SimState {
                cells: CellBuffer::new(columns, rows),
                initialized: false,
                init_count: 0,
                fini_count: 0,
                cursor: None,
                mouse: false,
                paste: false,
                unicode: true,
                raw_seqs: RawSequenceSet::new(),
                raw_seq_log: Vec::new(),
                shows: 0,
            })),
            events: Arc::new(EventQueue::new()),
        })
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_size(&self, columns: usize, rows: usize) {
        self.state().cells.resize(columns, rows);
        self.events.push(Event::Resize { columns, rows });
    }

    /// With unicode off only ASCII is displayable, like a terminal in a
    /// non-UTF-8 locale.
    pub fn set_unicode(&self, unicode: bool) {
        self.state().unicode = unicode;
    }

    /// Feed an event as if the terminal produced it.
    pub fn inject(&self, event: Event) {
        self.events.push(event);
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    pub fn init_count(&self) -> usize {
        self.state().init_count
    }

    pub fn fini_count(&self) -> usize {
        self.state().fini_count
    }

    pub fn mouse_enabled(&self) -> bool {
        self.state().mouse
    }

    pub fn paste_enabled(&self) -> bool {
        self.state().paste
    }

    /// Native cursor position, `None` when hidden.
    pub fn cursor(&self) -> Option<(usize, usize)> {
        self.state().cursor
    }

    pub fn show_count(&self) -> usize {
        self.state().shows
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.state().cells.get(x, y).cloned().unwrap_or_default()
    }

    pub fn row_text(&self, y: usize) -> String {
        self.state().cells.row_text(y)
    }

    /// Sequences currently registered with this backend.
    pub fn raw_seqs(&self) -> Vec<String> {
        self.state().raw_seqs.to_vec()
    }

    /// Every `register_raw_seq` call since the last `init`, duplicates included.
    pub fn raw_seq_registrations(&self) -> Vec<String> {
        self.state().raw_seq_log.clone()
    }
}

impl Backend for SimulationBackend {
    fn init(&mut self) -> io::Result<()> {
        let mut state = self.state();
        let (columns, rows) = state.cells.size();
        // A fresh terminal: nothing carried over from a previous session.
        state.cells = CellBuffer::new(columns, rows);
        state.cursor = None;
        state.mouse = false;
        state.paste = false;
        state.raw_seqs = RawSequenceSet::new();
        state.raw_seq_log.clear();
        state.initialized = true;
        state.init_count += 1;
        self.events.reset();
        Ok(())
    }

    fn fini(&mut self) {
        let mut state = self.state();
        state.initialized = false;
        state.fini_count += 1;
        state.raw_seqs = RawSequenceSet::new();
        state.mouse = false;
        state.paste = false;
        self.events.close();
    }

    fn size(&self) -> (usize, usize) {
        self.state().cells.size()
    }

    fn get_content(&self, x: usize, y: usize) -> Cell {
        self.cell(x, y)
    }

    fn set_content(&mut self, x: usize, y: usize, ch: char, combining: &[char], style: Style) {
        self.state().cells.set(x, y, Cell::new(ch, combining, style));
    }

    fn show_cursor(&mut self, x: usize, y: usize) {
        self.state().cursor = Some((x, y));
    }

    fn hide_cursor(&mut self) {
        self.state().cursor = None;
    }

    fn show(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.cells.take_dirty();
        state.shows += 1;
        Ok(())
    }

    fn clear(&mut self, style: Style) {
        self.state().cells.fill(Cell::new(' ', &[], style));
    }

    fn enable_mouse(&mut self) {
        self.state().mouse = true;
    }

    fn disable_mouse(&mut self) {
        self.state().mouse = false;
    }

    fn set_paste(&mut self, enabled: bool) {
        self.state().paste = enabled;
    }

    fn register_raw_seq(&mut self, seq: &str) {
        let mut state = self.state();
        state.raw_seqs.insert(seq);
        state.raw_seq_log.push(seq.to_string());
    }

    fn unregister_raw_seq(&mut self, seq: &str) {
        self.state().raw_seqs.remove(seq);
    }

    fn can_display(&self, ch: char, _check_fallbacks: bool) -> bool {
        self.state().unicode || ch.is_ascii()
    }

    fn events(&self) -> Arc<EventQueue> {
        Arc::clone(&self.events)
    }
}

#[derive(Debug, Default)]
struct FactoryState {
    attempts: Vec<BackendOptions>,
    failures_left: usize,
}

/// [`BackendFactory`] handing out clones of one [`SimulationBackend`].
#[derive(Debug, Clone)]
pub struct SimulationFactory {
    backend: SimulationBackend,
    state: Arc<Mutex<FactoryState>>,
}

impl SimulationFactory {
    pub fn new(backend: SimulationBackend) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(FactoryState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, FactoryState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn backend(&self) -> &SimulationBackend {
        &self.backend
    }

    /// Make the next `count` constructions fail.
    pub fn fail_next(&self, count: usize) {
        self.state().failures_left = count;
    }

    /// Options of every construction attempt, failed ones included.
    pub fn attempts(&self) -> Vec<BackendOptions> {
        self.state().attempts.clone()
    }
}

impl BackendFactory for SimulationFactory {
    fn create(&self, options: &BackendOptions) -> Result<Box<dyn Backend>, BackendError> {
        let mut state = self.state();
        state.attempts.push(options.clone());
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(BackendError::UnsupportedTerminal {
                term: options.term.clone().unwrap_or_default(),
            });
        }
        Ok(Box::new(self.backend.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::{SimulationBackend, SimulationFactory};
    use crate::core::backend::{Backend, BackendFactory, BackendOptions};
    use crate::core::event::{Event, Poll};
    use crate::core::style::Style;
    use crate::error::BackendError;
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[test]
    fn zero_size_is_rejected() {
        assert_matches!(
            SimulationBackend::new(0, 24),
            Err(BackendError::InvalidSize { columns: 0, rows: 24 })
        );
    }

    #[test]
    fn clones_share_cells() {
        let sim = SimulationBackend::new(10, 2).expect("sim");
        let mut owned = sim.clone();
        owned.set_content(3, 1, 'q', &[], Style::default());
        assert_eq!(sim.cell(3, 1).ch, 'q');
        assert_eq!(sim.row_text(1), "   q      ");
    }

    #[test]
    fn init_starts_from_a_clean_terminal() {
        let sim = SimulationBackend::new(4, 1).expect("sim");
        let mut owned = sim.clone();
        owned.init().expect("init");
        owned.register_raw_seq("\x1b[1;5A");
        owned.enable_mouse();
        owned.set_content(0, 0, 'x', &[], Style::default());
        owned.fini();
        assert!(!sim.is_initialized());

        owned.init().expect("init");
        assert!(sim.raw_seqs().is_empty());
        assert!(sim.raw_seq_registrations().is_empty());
        assert!(!sim.mouse_enabled());
        assert_eq!(sim.cell(0, 0).ch, ' ');
        assert_eq!(sim.init_count(), 2);
        assert_eq!(sim.fini_count(), 1);
    }

    #[test]
    fn fini_closes_the_event_queue() {
        let sim = SimulationBackend::new(4, 1).expect("sim");
        let mut owned = sim.clone();
        owned.init().expect("init");
        let queue = owned.events();
        sim.inject(Event::Input("a".to_string()));
        assert_eq!(
            queue.wait_timeout(Duration::ZERO),
            Poll::Event(Event::Input("a".to_string()))
        );
        owned.fini();
        assert_eq!(queue.wait_timeout(Duration::from_secs(1)), Poll::Closed);
    }

    #[test]
    fn non_unicode_mode_only_displays_ascii() {
        let sim = SimulationBackend::new(4, 1).expect("sim");
        assert!(sim.can_display('€', true));
        sim.set_unicode(false);
        assert!(!sim.can_display('€', true));
        assert!(sim.can_display('a', false));
    }

    #[test]
    fn factory_fails_on_request_and_records_attempts() {
        let factory = SimulationFactory::new(SimulationBackend::new(4, 1).expect("sim"));
        factory.fail_next(1);
        let first = BackendOptions::default();
        assert!(factory.create(&first).is_err());
        let second = BackendOptions {
            term: Some("xterm-256color".to_string()),
            truecolor: None,
        };
        assert!(factory.create(&second).is_ok());
        assert_eq!(factory.attempts(), vec![first, second]);
    }
}
