//! Cell styling: colors and text attributes.

/// A cell color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's own default foreground/background.
    #[default]
    Default,
    /// One of the 256 palette entries (0-15 are the ANSI colors).
    Indexed(u8),
    /// 24-bit color. Downgraded to the palette when truecolor is off.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Nearest entry in the xterm 256-color cube/grayscale ramp.
    pub fn to_indexed(self) -> Color {
        match self {
            Color::Rgb(r, g, b) => Color::Indexed(rgb_to_ansi256(r, g, b)),
            other => other,
        }
    }
}

fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + ((r as u16 - 8) * 24 / 247) as u8;
    }
    let scale = |v: u8| -> u8 { ((v as u16) * 5 / 255) as u8 };
    16 + 36 * scale(r) + 6 * scale(g) + scale(b)
}

/// Text attributes as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attrs(u8);

impl Attrs {
    pub const NONE: Attrs = Attrs(0);
    pub const BOLD: Attrs = Attrs(1 << 0);
    pub const DIM: Attrs = Attrs(1 << 1);
    pub const ITALIC: Attrs = Attrs(1 << 2);
    pub const UNDERLINE: Attrs = Attrs(1 << 3);
    pub const BLINK: Attrs = Attrs(1 << 4);
    pub const REVERSE: Attrs = Attrs(1 << 5);
    pub const STRIKETHROUGH: Attrs = Attrs(1 << 6);

    pub fn contains(self, other: Attrs) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn with(self, other: Attrs, on: bool) -> Attrs {
        if on {
            Attrs(self.0 | other.0)
        } else {
            Attrs(self.0 & !other.0)
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Foreground, background and attributes of one cell.
///
/// Builder methods consume and return the style so they chain:
/// `Style::default().foreground(Color::Indexed(1)).reverse(true)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attrs,
}

impl Style {
    pub fn foreground(mut self, color: Color) -> Self {
        self.fg = color;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.bg = color;
        self
    }

    pub fn bold(self, on: bool) -> Self {
        self.attr(Attrs::BOLD, on)
    }

    pub fn italic(self, on: bool) -> Self {
        self.attr(Attrs::ITALIC, on)
    }

    pub fn underline(self, on: bool) -> Self {
        self.attr(Attrs::UNDERLINE, on)
    }

    pub fn reverse(self, on: bool) -> Self {
        self.attr(Attrs::REVERSE, on)
    }

    pub fn attr(mut self, attr: Attrs, on: bool) -> Self {
        self.attrs = self.attrs.with(attr, on);
        self
    }

    pub fn is_reverse(&self) -> bool {
        self.attrs.contains(Attrs::REVERSE)
    }
}

#[cfg(test)]
mod tests {
    use super::{Attrs, Color, Style};

    #[test]
    fn reverse_toggles_only_its_bit() {
        let style = Style::default().bold(true).reverse(true);
        assert!(style.is_reverse());
        assert!(style.attrs.contains(Attrs::BOLD));

        let cleared = style.reverse(false);
        assert!(!cleared.is_reverse());
        assert!(cleared.attrs.contains(Attrs::BOLD));
    }

    #[test]
    fn empty_attr_is_never_contained() {
        assert!(!Attrs::BOLD.contains(Attrs::NONE));
        assert!(Attrs::NONE.is_empty());
    }

    #[test]
    fn rgb_downgrades_into_palette() {
        assert_eq!(Color::Rgb(0, 0, 0).to_indexed(), Color::Indexed(16));
        assert_eq!(Color::Rgb(255, 255, 255).to_indexed(), Color::Indexed(231));
        assert_eq!(Color::Rgb(255, 0, 0).to_indexed(), Color::Indexed(196));
        assert_eq!(Color::Indexed(3).to_indexed(), Color::Indexed(3));
        assert_eq!(Color::Default.to_indexed(), Color::Default);
    }
}
