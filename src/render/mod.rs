use anyhow::Result;
use itertools::Itertools;

use crate::{glyphs::GlyphPair, gol::Frame};

pub mod term;

/// Blank lines above the grid and spaces to the left of each row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Padding {
    pub top: usize,
    pub left: usize,
}

/// Something that can put a rendered frame in front of the user.
pub trait Presenter {
    /// Shows `text` in place of whatever was shown before.
    fn present(&mut self, text: &str) -> Result<()>;
}

/// Draws `frame` as text: `padding.top` newlines, then one line per row made
/// of `padding.left` spaces followed by a glyph per cell. No trailing newline.
pub fn render(frame: Frame, glyphs: &GlyphPair, padding: Padding) -> String {
    let indent = " ".repeat(padding.left);
    let body = (0..frame.rows())
        .map(|r| {
            frame
                .row(r)
                .iter()
                .fold(indent.clone(), |mut line, alive| {
                    line.push_str(glyphs.glyph(*alive));
                    line
                })
        })
        .join("\n");
    let mut out = "\n".repeat(padding.top);
    out.push_str(&body);
    out
}
