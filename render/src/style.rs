//! The compact style grammar for template scopes.
//!
//! A style segment is written before a `[` and packs alignment, decorations,
//! colors and a case transform into a few symbols:
//!
//! - `&` inherit the previous scope's style, `@` reset to plain
//! - optional width digits followed by `<` / `=` / `>` alignment
//! - decorations: `*` bold, `/` italic, `_` underline, `~` strikethrough,
//!   `.` dim, `^` overline
//! - up to two color letters (`xbcdkgmrwyBCDKGMRWY`, lowercase bright,
//!   `x` none): first foreground, second background. A color clause always
//!   re-resolves both, so inherited backgrounds do not leak through.
//! - transform: `!` capitalize, `#` title-case, `+` upper, `-` lower
//!
//! The whole segment must match; any stray symbol fails the parse and the
//! segment is treated as ordinary text by the template parser.

use std::sync::LazyLock;

use colored::{Color, Colorize, control};
use regex::Regex;
use unicode_width::UnicodeWidthStr;

static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([&@])?(\d*)([<=>]?)([*/~_.^]*)([xbcdkgmrwyBCDKGMRWY]{0,2})([!#+-]?)$")
        .expect("valid style regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Capitalize,
    Title,
    Upper,
    Lower,
}

impl Transform {
    fn apply(self, text: &str) -> String {
        match self {
            Transform::Upper => text.to_uppercase(),
            Transform::Lower => text.to_lowercase(),
            Transform::Capitalize => capitalize(text),
            Transform::Title => text
                .split_inclusive(char::is_whitespace)
                .map(capitalize)
                .collect(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Resolved style of one template scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub alignment: Option<Alignment>,
    pub width: Option<usize>,
    pub bold: bool,
    pub italic: bool,
    pub dim: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub overline: bool,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub transform: Option<Transform>,
}

fn color_for(symbol: char) -> Option<Color> {
    match symbol {
        'b' => Some(Color::BrightBlue),
        'c' => Some(Color::BrightCyan),
        'd' => Some(Color::White),
        'k' => Some(Color::Black),
        'g' => Some(Color::BrightGreen),
        'm' => Some(Color::BrightMagenta),
        'r' => Some(Color::BrightRed),
        'w' => Some(Color::BrightWhite),
        'y' => Some(Color::BrightYellow),
        'B' => Some(Color::Blue),
        'C' => Some(Color::Cyan),
        'D' => Some(Color::BrightBlack),
        'K' => Some(Color::Black),
        'G' => Some(Color::Green),
        'M' => Some(Color::Magenta),
        'R' => Some(Color::Red),
        'W' => Some(Color::White),
        'Y' => Some(Color::Yellow),
        _ => None,
    }
}

impl Style {
    /// Parses one style segment; `base` is the previous scope's style for
    /// `&` inheritance. Empty, whitespace-only, and non-matching segments
    /// yield `None`.
    pub fn parse(segment: &str, base: Option<&Style>) -> Option<Style> {
        let segment = segment.trim();
        if segment.is_empty() {
            return None;
        }
        let captures = STYLE_RE.captures(segment)?;

        let inherit = captures.get(1).map(|m| m.as_str()) == Some("&");
        let mut style = match (inherit, base) {
            (true, Some(base)) => base.clone(),
            _ => Style::default(),
        };

        let width = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        let align = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
        if !align.is_empty() {
            style.alignment = Some(match align {
                "<" => Alignment::Left,
                "=" => Alignment::Center,
                _ => Alignment::Right,
            });
            // No digits means realign to the full terminal width, even when
            // inheriting a fixed one.
            style.width = width.parse().ok();
        }

        for symbol in captures.get(4).map(|m| m.as_str()).unwrap_or_default().chars() {
            match symbol {
                '*' => style.bold = true,
                '/' => style.italic = true,
                '.' => style.dim = true,
                '_' => style.underline = true,
                '~' => style.strikethrough = true,
                '^' => style.overline = true,
                _ => {}
            }
        }

        let colors = captures.get(5).map(|m| m.as_str()).unwrap_or_default();
        if !colors.is_empty() {
            let mut symbols = colors.chars();
            style.fg = symbols.next().and_then(color_for);
            style.bg = symbols.next().and_then(color_for);
        }

        if let Some(transform) = captures.get(6).filter(|m| !m.as_str().is_empty()) {
            style.transform = Some(match transform.as_str() {
                "!" => Transform::Capitalize,
                "#" => Transform::Title,
                "+" => Transform::Upper,
                _ => Transform::Lower,
            });
        }
        Some(style)
    }

    /// Applies the style: transform, then alignment padding, then terminal
    /// decorations.
    pub fn apply(&self, text: &str) -> String {
        let text = match self.transform {
            Some(transform) => transform.apply(text),
            None => text.to_string(),
        };
        let text = match self.alignment {
            Some(alignment) => {
                pad(&text, alignment, self.width.unwrap_or_else(terminal_width))
            }
            None => text,
        };
        self.decorate(&text)
    }

    fn decorate(&self, text: &str) -> String {
        let undecorated = !self.bold
            && !self.italic
            && !self.dim
            && !self.underline
            && !self.strikethrough
            && !self.overline
            && self.fg.is_none()
            && self.bg.is_none();
        if undecorated {
            return text.to_string();
        }

        let mut styled = text.normal();
        if self.bold {
            styled = styled.bold();
        }
        if self.italic {
            styled = styled.italic();
        }
        if self.dim {
            styled = styled.dimmed();
        }
        if self.underline {
            styled = styled.underline();
        }
        if self.strikethrough {
            styled = styled.strikethrough();
        }
        if let Some(fg) = self.fg {
            styled = styled.color(fg);
        }
        if let Some(bg) = self.bg {
            styled = styled.on_color(bg);
        }
        // `colored` has no overline; emit the SGR pair directly, but only
        // when colorization is on at all.
        if self.overline && control::SHOULD_COLORIZE.should_colorize() {
            format!("\x1b[53m{styled}\x1b[55m")
        } else {
            styled.to_string()
        }
    }
}

/// Pads `text` with spaces to `width` display cells. Wider text is returned
/// unchanged.
fn pad(text: &str, alignment: Alignment, width: usize) -> String {
    let current = UnicodeWidthStr::width(text);
    if current >= width {
        return text.to_string();
    }
    let missing = width - current;
    match alignment {
        Alignment::Left => format!("{text}{}", " ".repeat(missing)),
        Alignment::Right => format!("{}{text}", " ".repeat(missing)),
        Alignment::Center => {
            let left = missing / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(missing - left))
        }
    }
}

/// Detected terminal width in columns, defaulting to 80.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.parse().ok())
        .unwrap_or(80)
}
