use clap::ValueEnum;
use crossterm::style::{Color, Stylize};
use rand::Rng;

/// How dead and alive cells are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CellStyle {
    Alpha,
    Binary,
    Block,
    Emoji,
    Legacy,
    /// A full block in one randomly picked terminal color.
    Palette,
}

const EMOJI_DEAD: [&str; 25] = [
    "😅", "😇", "🤪", "🤗", "🤭", "😴", "🤕", "🤢", "🤮", "🤧", "🥶", "😵", "🤯", "😨", "😰", "😭",
    "😱", "😖", "😡", "😠", "🤬", "😈", "👿", "🤡", "👻",
];
const EMOJI_ALIVE: [&str; 15] = [
    "😄", "😁", "😆", "🤣", "😊", "🥰", "😍", "😘", "😚", "😋", "🤤", "🥵", "🥳", "😳", "😤",
];
const PALETTE: [Color; 7] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::White,
];

/// The two strings a frame is drawn with. Fixed for the whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlyphPair {
    dead: String,
    alive: String,
}

impl GlyphPair {
    pub fn new(dead: impl Into<String>, alive: impl Into<String>) -> Self {
        Self {
            dead: dead.into(),
            alive: alive.into(),
        }
    }

    /// Picks the glyphs for `style`. Styles with several candidates draw one
    /// of them from `rng`, once.
    pub fn resolve<R: Rng + ?Sized>(style: CellStyle, rng: &mut R) -> Self {
        match style {
            CellStyle::Alpha => Self::new("D", "A"),
            CellStyle::Binary => Self::new("0", "1"),
            CellStyle::Block => Self::new(" ", "█"),
            CellStyle::Emoji => Self::new(*pick(&EMOJI_DEAD, rng), *pick(&EMOJI_ALIVE, rng)),
            CellStyle::Legacy => Self::new("⬜", "⬛"),
            CellStyle::Palette => {
                let color = *pick(&PALETTE, rng);
                Self::new(" ", "█".with(color).to_string())
            }
        }
    }

    #[cfg(test)]
    pub fn dead(&self) -> &str {
        &self.dead
    }
    #[cfg(test)]
    pub fn alive(&self) -> &str {
        &self.alive
    }
    pub fn glyph(&self, alive: bool) -> &str {
        if alive {
            &self.alive
        } else {
            &self.dead
        }
    }
}

fn pick<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}
