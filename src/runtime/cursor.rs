//! Cursor display and cell writes.
//!
//! On terminals whose native cursor is unreliable the cursor is drawn by
//! restyling the cell under it in reverse video. One primary fake cursor is
//! tracked so its cell can be restored when it moves; multi-cursor marks are
//! not tracked and disappear only when the caller repaints.

use std::sync::atomic::Ordering;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::core::cell::Cell;
use crate::core::style::Style;
use crate::runtime::screen::Screen;

/// Drawn instead of characters the terminal cannot display.
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// A cell's content at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenCell {
    pub x: usize,
    pub y: usize,
    pub cell: Cell,
}

impl Screen {
    /// Whether cursors are drawn as reverse-video cells.
    pub fn use_fake_cursor(&self) -> bool {
        self.force_fake_cursor.load(Ordering::Relaxed)
            || self.options.bool_option("fakecursor").unwrap_or(false)
    }

    /// Forces fake cursors regardless of the `fakecursor` option. On by
    /// default on Windows.
    pub fn set_force_fake_cursor(&self, force: bool) {
        self.force_fake_cursor.store(force, Ordering::Relaxed);
    }

    /// Shows the cursor at (x, y), faked or native depending on
    /// [`Screen::use_fake_cursor`].
    pub fn show_cursor(&self, x: usize, y: usize) {
        if self.use_fake_cursor() {
            self.show_fake_cursor(x, y);
        } else {
            self.with_backend(|backend| backend.show_cursor(x, y));
        }
    }

    /// Hides the native cursor.
    pub fn hide_cursor(&self) {
        self.with_backend(|backend| backend.hide_cursor());
    }

    /// Moves the primary fake cursor to (x, y), restoring the cell it was on.
    pub fn show_fake_cursor(&self, x: usize, y: usize) {
        let mut slot = self.slot();
        let Some(backend) = slot.as_mut() else {
            return;
        };
        let mut last = self.last_cursor();

        if let Some(previous) = last.take() {
            let cell = previous.cell;
            backend.set_content(previous.x, previous.y, cell.ch, &cell.combining, cell.style);
        }

        // Restore first, then read: the reverse of a read-then-restore order.
        // A cursor redrawn in place must not remember its own reverse-video cell.
        let under = backend.get_content(x, y);
        let style = self.options.default_style().reverse(true);
        backend.set_content(x, y, under.ch, &under.combining, style);
        *last = Some(ScreenCell { x, y, cell: under });
    }

    /// Draws an extra, untracked fake cursor at (x, y).
    ///
    /// Combining characters are dropped and nothing restores the cell later;
    /// callers repaint the whole frame every cycle.
    pub fn show_fake_cursor_multi(&self, x: usize, y: usize) {
        let style = self.options.default_style().reverse(true);
        self.with_backend(|backend| {
            let under = backend.get_content(x, y);
            backend.set_content(x, y, under.ch, &[], style);
        });
    }

    /// Writes one cell. Characters the backend cannot display become
    /// [`REPLACEMENT_CHAR`].
    pub fn set_content(&self, x: usize, y: usize, ch: char, combining: &[char], style: Style) {
        let mut slot = self.slot();
        let Some(backend) = slot.as_mut() else {
            return;
        };
        let ch = if backend.can_display(ch, true) {
            ch
        } else {
            REPLACEMENT_CHAR
        };
        backend.set_content(x, y, ch, combining, style);

        if self.use_fake_cursor() {
            let mut last = self.last_cursor();
            if let Some(tracked) = last.as_mut().filter(|tracked| tracked.x == x && tracked.y == y) {
                tracked.cell = Cell::new(ch, combining, style);
            }
        }
    }

    /// Writes `text` starting at (x, y), one grapheme cluster per cell.
    /// Returns the number of columns used.
    pub fn set_str(&self, x: usize, y: usize, text: &str, style: Style) -> usize {
        let mut columns = 0;
        for grapheme in text.graphemes(true) {
            let width = grapheme.width();
            if width == 0 {
                continue;
            }
            let mut chars = grapheme.chars();
            let Some(base) = chars.next() else {
                continue;
            };
            let combining: Vec<char> = chars.collect();
            self.set_content(x + columns, y, base, &combining, style);
            columns += width;
        }
        columns
    }

    /// The tracked primary fake cursor, if one has been drawn.
    pub fn last_fake_cursor(&self) -> Option<ScreenCell> {
        self.last_cursor().clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{EnvConfig, GlobalOptions, OptionStore};
    use crate::core::style::{Color, Style};
    use crate::platform::simulation::{SimulationBackend, SimulationFactory};
    use crate::runtime::screen::Screen;
    use std::sync::Arc;

    fn active_screen(options: OptionStore) -> (Screen, SimulationBackend) {
        let sim = SimulationBackend::new(10, 3).expect("sim");
        let options: Arc<dyn GlobalOptions> = Arc::new(options);
        let screen = Screen::with_env(SimulationFactory::new(sim.clone()), options, EnvConfig::default());
        screen.init().expect("init");
        (screen, sim)
    }

    #[test]
    fn cursor_in_place_twice_restores_original_style() {
        let (screen, sim) = active_screen(OptionStore::new());
        let plain = Style::default().foreground(Color::Indexed(3));
        screen.set_content(0, 0, 'a', &[], plain);
        screen.show_fake_cursor(0, 0);
        screen.show_fake_cursor(0, 0);
        screen.show_fake_cursor(1, 0);
        assert_eq!(sim.cell(0, 0).style, plain);
        assert!(sim.cell(1, 0).style.is_reverse());
    }

    #[test]
    fn cursor_uses_default_style() {
        let options = OptionStore::new();
        let default_style = Style::default().background(Color::Indexed(4));
        options.set_default_style(default_style);
        let (screen, sim) = active_screen(options);
        screen.set_content(2, 1, 'x', &['\u{301}'], Style::default().bold(true));
        screen.show_fake_cursor(2, 1);
        let cell = sim.cell(2, 1);
        assert_eq!(cell.ch, 'x');
        assert_eq!(cell.combining, vec!['\u{301}']);
        assert_eq!(cell.style, default_style.reverse(true));
    }

    #[test]
    fn set_str_advances_by_display_width() {
        let (screen, sim) = active_screen(OptionStore::new());
        let used = screen.set_str(0, 0, "e\u{301}界!", Style::default());
        assert_eq!(used, 4);
        assert_eq!(sim.cell(0, 0).ch, 'e');
        assert_eq!(sim.cell(0, 0).combining, vec!['\u{301}']);
        assert_eq!(sim.cell(1, 0).ch, '界');
        assert_eq!(sim.cell(3, 0).ch, '!');
    }

    #[test]
    fn force_flag_overrides_option() {
        let options = OptionStore::new();
        options.set_bool("fakecursor", false);
        let (screen, _) = active_screen(options);
        screen.set_force_fake_cursor(false);
        assert!(!screen.use_fake_cursor());
        screen.set_force_fake_cursor(true);
        assert!(screen.use_fake_cursor());
    }

    #[test]
    fn cell_writes_without_backend_are_ignored() {
        let options: Arc<dyn GlobalOptions> = Arc::new(OptionStore::new());
        let sim = SimulationBackend::new(4, 1).expect("sim");
        let screen = Screen::with_env(SimulationFactory::new(sim), options, EnvConfig::default());
        screen.set_content(0, 0, 'a', &[], Style::default());
        screen.show_fake_cursor(0, 0);
        screen.show_fake_cursor_multi(0, 0);
        assert!(screen.last_fake_cursor().is_none());
    }
}
