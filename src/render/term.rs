use std::io::Write;

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::Print,
    terminal::{
        self, disable_raw_mode, enable_raw_mode, Clear, ClearType, DisableLineWrap,
        EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
    },
};

use super::Presenter;

/// Presents frames on a crossterm terminal.
///
/// Each frame is queued whole (cursor home, clear, lines) and flushed once,
/// so a frame is either written entirely or the flush error is returned.
/// Rows past the bottom of the screen are dropped and line wrap is off, so
/// a frame bigger than the terminal is clipped rather than smeared.
pub struct TermPresenter<W: Write> {
    out: W,
    raw: bool,
    /// (cols, rows) to clip to instead of asking the terminal.
    viewport: Option<(u16, u16)>,
}

impl<W: Write> TermPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            raw: false,
            viewport: None,
        }
    }

    #[cfg(test)]
    pub fn with_viewport(out: W, cols: u16, rows: u16) -> Self {
        Self {
            viewport: Some((cols, rows)),
            ..Self::new(out)
        }
    }

    /// Switches to the alternate screen in raw mode with the cursor hidden.
    /// Raw mode is what lets Ctrl-C reach us as a key press.
    pub fn begin(&mut self) -> Result<()> {
        enable_raw_mode().context("failed to enable raw mode")?;
        self.raw = true;
        execute!(self.out, EnterAlternateScreen, Hide).context("failed to set up terminal")?;
        Ok(())
    }

    /// Undoes `begin`. Safe to call when `begin` was never called or failed
    /// part way.
    pub fn end(&mut self) -> Result<()> {
        if !self.raw {
            return Ok(());
        }
        self.raw = false;
        execute!(self.out, EnableLineWrap, Show, LeaveAlternateScreen)
            .context("failed to restore terminal")?;
        disable_raw_mode().context("failed to disable raw mode")?;
        Ok(())
    }

    fn rows(&self) -> Result<u16> {
        match self.viewport {
            Some((_, rows)) => Ok(rows),
            None => Ok(terminal::size().context("failed to query terminal size")?.1),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TermPresenter<W> {
    fn present(&mut self, text: &str) -> Result<()> {
        let rows = self.rows()?;
        queue!(self.out, MoveTo(0, 0), Clear(ClearType::All), DisableLineWrap)?;
        for (y, line) in (0..rows).zip(text.split('\n')) {
            queue!(self.out, MoveTo(0, y), Print(line))?;
        }
        self.out.flush().context("failed to write frame")?;
        Ok(())
    }
}
