//! Cell content and the grid backends draw into.

use unicode_width::UnicodeWidthChar;

use crate::core::style::Style;

/// Content of one terminal cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Primary (base) character.
    pub ch: char,
    /// Combining characters drawn on top of `ch`, in order.
    pub combining: Vec<char>,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            combining: Vec::new(),
            style: Style::default(),
        }
    }
}

impl Cell {
    pub fn new(ch: char, combining: &[char], style: Style) -> Self {
        Self {
            ch,
            combining: combining.to_vec(),
            style,
        }
    }

    /// Display width in columns: 2 for wide characters, 1 otherwise.
    pub fn width(&self) -> usize {
        match self.ch.width() {
            Some(2) => 2,
            _ => 1,
        }
    }

    /// The grapheme as written to the terminal. Control characters render blank.
    pub fn symbol(&self) -> String {
        let mut out = String::with_capacity(1 + self.combining.len());
        if self.ch.is_control() {
            out.push(' ');
            return out;
        }
        out.push(self.ch);
        out.extend(self.combining.iter().copied());
        out
    }
}

/// A `width x height` grid of cells plus the content last flushed to the
/// terminal, so a flush only emits cells that changed.
#[derive(Debug, Clone)]
pub struct CellBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    front: Vec<Option<Cell>>,
}

impl CellBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            front: vec![None; width * height],
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index(x, y).map(|index| &self.cells[index])
    }

    /// Writes a cell. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(index) = self.index(x, y) {
            self.cells[index] = cell;
        }
    }

    /// Resizes the grid, keeping the overlapping region. Forces a full flush.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        let mut cells = vec![Cell::default(); width * height];
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                cells[y * width + x] = self.cells[y * self.width + x].clone();
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
        self.front = vec![None; width * height];
    }

    pub fn fill(&mut self, cell: Cell) {
        for slot in &mut self.cells {
            *slot = cell.clone();
        }
    }

    /// Forgets what the terminal shows so the next flush repaints everything.
    pub fn invalidate(&mut self) {
        for slot in &mut self.front {
            *slot = None;
        }
    }

    /// Returns the cells that differ from the last flush, in row-major order,
    /// and records them as flushed. The column after a wide character is
    /// covered by it and never reported.
    pub fn take_dirty(&mut self) -> Vec<(usize, usize, Cell)> {
        let mut dirty = Vec::new();
        for y in 0..self.height {
            let mut x = 0;
            while x < self.width {
                let index = y * self.width + x;
                let cell = &self.cells[index];
                let width = cell.width();
                if self.front[index].as_ref() != Some(cell) {
                    self.front[index] = Some(cell.clone());
                    dirty.push((x, y, cell.clone()));
                    if width == 2 && x + 1 < self.width {
                        // Whatever sits under the right half is hidden until
                        // the wide cell changes.
                        self.front[index + 1] = None;
                    }
                }
                x += width;
            }
        }
        dirty
    }

    /// Text of one row with styling dropped. Wide characters occupy their
    /// first column only.
    pub fn row_text(&self, y: usize) -> String {
        let mut out = String::new();
        if y >= self.height {
            return out;
        }
        let mut x = 0;
        while x < self.width {
            let cell = &self.cells[y * self.width + x];
            out.push_str(&cell.symbol());
            x += cell.width();
        }
        out
    }
}
