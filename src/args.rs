use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::{glyphs::CellStyle, render::Padding};

/// Conway's Game of Life on a torus, drawn in the terminal. Ctrl-C, q, Esc
/// or SIGTERM stops it. Set RUST_LOG for diagnostics and send stderr to a
/// file (`2>log`); it shares the screen with the frames otherwise.
#[derive(Parser, Debug)]
#[command(name = "termlife", version)]
pub struct Args {
    /// Grid row count
    #[arg(long, default_value_t = 32)]
    pub rows: usize,
    /// Grid column count
    #[arg(long, default_value_t = 32)]
    pub cols: usize,
    /// Frames per second
    #[arg(long, default_value_t = 24.0)]
    pub fps: f64,
    /// Glyphs used for dead / alive cells
    #[arg(long, value_enum, default_value_t = CellStyle::Block)]
    pub cell_style: CellStyle,
    /// Blank lines above the grid
    #[arg(long, default_value_t = 1)]
    pub row_offset: usize,
    /// Spaces left of the grid
    #[arg(long, default_value_t = 2)]
    pub col_offset: usize,
    /// Seed for a reproducible starting board
    #[arg(long)]
    pub seed: Option<u64>,
    /// Worker threads for computing generations [default: logical CPUs]
    #[arg(short, long)]
    pub threads: Option<usize>,
    /// Stop after this many frames instead of running until interrupted
    #[arg(short, long)]
    pub generations: Option<u64>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("rows must be greater than 0")]
    ZeroRows,
    #[error("cols must be greater than 0")]
    ZeroCols,
    #[error("a {rows}x{cols} grid is too large")]
    TooLarge { rows: usize, cols: usize },
    #[error("fps must be a positive, finite number (got {0})")]
    InvalidFps(f64),
    #[error("threads must be greater than 0")]
    ZeroThreads,
}

/// Validated run settings.
#[derive(Clone, Debug)]
pub struct Config {
    pub rows: usize,
    pub cols: usize,
    pub frame_duration: Duration,
    pub style: CellStyle,
    pub padding: Padding,
    pub seed: Option<u64>,
    pub threads: usize,
    pub generations: Option<u64>,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if args.rows == 0 {
            return Err(ConfigError::ZeroRows);
        }
        if args.cols == 0 {
            return Err(ConfigError::ZeroCols);
        }
        if args.rows.checked_mul(args.cols).is_none() {
            return Err(ConfigError::TooLarge {
                rows: args.rows,
                cols: args.cols,
            });
        }
        let frame_duration = frame_duration(args.fps)?;
        let threads = match args.threads {
            Some(0) => return Err(ConfigError::ZeroThreads),
            Some(n) => n,
            None => num_cpus::get(),
        };
        Ok(Config {
            rows: args.rows,
            cols: args.cols,
            frame_duration,
            style: args.cell_style,
            padding: Padding {
                top: args.row_offset,
                left: args.col_offset,
            },
            seed: args.seed,
            threads,
            generations: args.generations,
        })
    }
}

fn frame_duration(fps: f64) -> Result<Duration, ConfigError> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(ConfigError::InvalidFps(fps));
    }
    Duration::try_from_secs_f64(fps.recip()).map_err(|_| ConfigError::InvalidFps(fps))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(argv: &[&str]) -> anyhow::Result<Result<Config, ConfigError>> {
        let args = Args::try_parse_from(std::iter::once("termlife").chain(argv.iter().copied()))?;
        Ok(Config::try_from(args))
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let c = config(&[])??;
        assert_eq!((c.rows, c.cols), (32, 32));
        assert_eq!(c.style, CellStyle::Block);
        assert_eq!(c.padding, Padding { top: 1, left: 2 });
        assert_eq!(c.seed, None);
        assert_eq!(c.generations, None);
        assert!(c.threads >= 1);
        assert_eq!(c.frame_duration, Duration::from_secs_f64(1.0 / 24.0));
        Ok(())
    }

    #[test]
    fn test_flags() -> anyhow::Result<()> {
        let c = config(&[
            "--rows", "10", "--cols", "20", "--fps", "4", "--cell-style", "emoji",
            "--row-offset", "0", "--col-offset", "5", "--seed", "9", "-t", "2",
            "--generations", "100",
        ])??;
        assert_eq!((c.rows, c.cols), (10, 20));
        assert_eq!(c.frame_duration, Duration::from_millis(250));
        assert_eq!(c.style, CellStyle::Emoji);
        assert_eq!(c.padding, Padding { top: 0, left: 5 });
        assert_eq!(c.seed, Some(9));
        assert_eq!(c.threads, 2);
        assert_eq!(c.generations, Some(100));
        Ok(())
    }

    #[test]
    fn test_invalid_values() -> anyhow::Result<()> {
        assert_eq!(config(&["--rows", "0"])?.unwrap_err(), ConfigError::ZeroRows);
        assert_eq!(config(&["--cols", "0"])?.unwrap_err(), ConfigError::ZeroCols);
        assert_eq!(config(&["--fps", "0"])?.unwrap_err(), ConfigError::InvalidFps(0.0));
        assert_eq!(config(&["--fps=-3"])?.unwrap_err(), ConfigError::InvalidFps(-3.0));
        assert!(matches!(
            config(&["--fps", "inf"])?.unwrap_err(),
            ConfigError::InvalidFps(_)
        ));
        assert!(matches!(
            config(&["--fps", "1e-300"])?.unwrap_err(),
            ConfigError::InvalidFps(_)
        ));
        assert_eq!(config(&["-t", "0"])?.unwrap_err(), ConfigError::ZeroThreads);
        let huge = usize::MAX.to_string();
        assert!(matches!(
            config(&["--rows", huge.as_str(), "--cols", "2"])?.unwrap_err(),
            ConfigError::TooLarge { .. }
        ));
        Ok(())
    }

    #[test]
    fn test_rejected_by_parser() {
        for argv in [
            &["--cell-style", "sparkles"][..],
            &["--rows", "-1"][..],
            &["--fps", "fast"][..],
        ] {
            assert!(config(argv).is_err(), "{argv:?}");
        }
    }
}
