//! Typed terminal output commands and a single output gate.
//!
//! Invariant: a backend encodes everything it writes through
//! `OutputGate::flush(..)`.

use crate::core::style::{Attrs, Color, Style};

/// How many colors the terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    Ansi16,
    Palette256,
    TrueColor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCmd {
    /// Raw bytes/control sequences (UTF-8 string) to be written to the terminal.
    Bytes(String),

    /// Cursor visibility and position (0-based).
    HideCursor,
    ShowCursor,
    MoveTo { x: usize, y: usize },

    /// Reset attributes, then apply `Style`.
    SetStyle(Style),
    ResetStyle,
    ClearScreen,

    /// Protocol toggles.
    AltScreenEnter,
    AltScreenLeave,
    BracketedPasteEnable,
    BracketedPasteDisable,
    MouseEnable,
    MouseDisable,
}

impl TerminalCmd {
    pub fn bytes(data: impl Into<String>) -> Self {
        Self::Bytes(data.into())
    }
}

#[derive(Debug)]
pub struct OutputGate {
    cmds: Vec<TerminalCmd>,
    depth: ColorDepth,
}

impl OutputGate {
    pub fn new(depth: ColorDepth) -> Self {
        Self {
            cmds: Vec::new(),
            depth,
        }
    }

    pub fn depth(&self) -> ColorDepth {
        self.depth
    }

    pub fn push(&mut self, cmd: TerminalCmd) {
        self.cmds.push(cmd);
    }

    pub fn extend<I>(&mut self, cmds: I)
    where
        I: IntoIterator<Item = TerminalCmd>,
    {
        self.cmds.extend(cmds);
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    /// Encode buffered commands into `out` and empty the buffer.
    pub fn flush(&mut self, out: &mut String) {
        for cmd in self.cmds.drain(..) {
            match cmd {
                TerminalCmd::Bytes(data) => out.push_str(&data),
                TerminalCmd::HideCursor => out.push_str("\x1b[?25l"),
                TerminalCmd::ShowCursor => out.push_str("\x1b[?25h"),
                TerminalCmd::MoveTo { x, y } => {
                    out.push_str(&format!("\x1b[{};{}H", y + 1, x + 1));
                }
                TerminalCmd::SetStyle(style) => out.push_str(&sgr(style, self.depth)),
                TerminalCmd::ResetStyle => out.push_str("\x1b[0m"),
                TerminalCmd::ClearScreen => out.push_str("\x1b[2J"),
                TerminalCmd::AltScreenEnter => out.push_str("\x1b[?1049h"),
                TerminalCmd::AltScreenLeave => out.push_str("\x1b[?1049l"),
                TerminalCmd::BracketedPasteEnable => out.push_str("\x1b[?2004h"),
                TerminalCmd::BracketedPasteDisable => out.push_str("\x1b[?2004l"),
                // Button events, drag tracking, SGR coordinates.
                TerminalCmd::MouseEnable => out.push_str("\x1b[?1000h\x1b[?1002h\x1b[?1006h"),
                TerminalCmd::MouseDisable => out.push_str("\x1b[?1006l\x1b[?1002l\x1b[?1000l"),
            }
        }
    }
}

const ATTR_CODES: [(Attrs, u8); 7] = [
    (Attrs::BOLD, 1),
    (Attrs::DIM, 2),
    (Attrs::ITALIC, 3),
    (Attrs::UNDERLINE, 4),
    (Attrs::BLINK, 5),
    (Attrs::REVERSE, 7),
    (Attrs::STRIKETHROUGH, 9),
];

/// SGR sequence for `style`, starting from a reset.
pub fn sgr(style: Style, depth: ColorDepth) -> String {
    let mut params: Vec<String> = vec!["0".to_string()];
    for (attr, code) in ATTR_CODES {
        if style.attrs.contains(attr) {
            params.push(code.to_string());
        }
    }
    push_color(&mut params, style.fg, depth, false);
    push_color(&mut params, style.bg, depth, true);
    format!("\x1b[{}m", params.join(";"))
}

fn push_color(params: &mut Vec<String>, color: Color, depth: ColorDepth, background: bool) {
    let color = match (color, depth) {
        (Color::Rgb(..), ColorDepth::TrueColor) => color,
        (Color::Rgb(..), _) => color.to_indexed(),
        _ => color,
    };
    let color = match (color, depth) {
        (Color::Indexed(index), ColorDepth::Ansi16) if index >= 16 => Color::Indexed(index % 16),
        _ => color,
    };
    match color {
        Color::Default => {}
        Color::Indexed(index) if index < 8 => {
            params.push((if background { 40 } else { 30 } + index).to_string());
        }
        Color::Indexed(index) if index < 16 => {
            params.push((if background { 100 } else { 90 } + index - 8).to_string());
        }
        Color::Indexed(index) => {
            params.push(format!("{};5;{}", if background { 48 } else { 38 }, index));
        }
        Color::Rgb(r, g, b) => {
            params.push(format!("{};2;{};{};{}", if background { 48 } else { 38 }, r, g, b));
        }
    }
}
