use anyhow::Result;
use rayon::prelude::*;

use super::{Board, Frame};

/// Moore neighborhood, (0, 0) excluded.
pub const OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Steps `i` by `d` (one of -1, 0, 1) on an axis of length `n`, wrapping at
/// either end. `i` must already be in range.
#[inline]
fn wrap(i: usize, d: i8, n: usize) -> usize {
    match d {
        -1 if i == 0 => n - 1,
        -1 => i - 1,
        1 if i + 1 == n => 0,
        1 => i + 1,
        _ => i,
    }
}

/// The eight wrapped neighbor coordinates of `(row, col)`. On an axis of
/// length 1 or 2 the same cell shows up more than once.
pub fn neighbor_indices(row: usize, col: usize, rows: usize, cols: usize) -> [(usize, usize); 8] {
    OFFSETS.map(|(dr, dc)| (wrap(row, dr, rows), wrap(col, dc, cols)))
}

pub fn count_neighbors(frame: Frame, row: usize, col: usize) -> u8 {
    let (rows, cols) = (frame.rows(), frame.cols());
    let cells = frame.cells();
    neighbor_indices(row, col, rows, cols)
        .iter()
        .filter(|(r, c)| cells[r * cols + c])
        .count() as u8
}

/// B3/S23.
pub fn next_state(alive: bool, neighbors: u8) -> bool {
    match (alive, neighbors) {
        (false, 3) => true,
        (true, n) if n < 2 || n > 3 => false,
        (state, _) => state,
    }
}

/// Computes the generation after `current` into `next`, one row per task.
/// `current` is only read, so this is safe to run next to a renderer that
/// reads the same frame.
pub fn step(current: Frame, next: &mut [bool]) {
    let cols = current.cols();
    assert_eq!(next.len(), current.cells().len(), "buffer shapes differ");
    next.par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, out)| {
            let src = current.row(row);
            out.copy_from_slice(src);
            for (col, cell) in out.iter_mut().enumerate() {
                *cell = next_state(*cell, count_neighbors(current, row, col));
            }
        });
}

/// Owns the worker pool generations are computed on.
pub struct Engine {
    pool: rayon::ThreadPool,
}

impl Engine {
    pub fn new(threads: usize) -> Result<Self> {
        Ok(Self {
            pool: rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("life-worker-{i}"))
                .build()?,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Writes the next generation of `board` into its scratch buffer without
    /// committing. `observe` is handed the current generation and runs on
    /// the pool alongside the computation; its result is returned.
    pub fn advance<F, R>(&self, board: &mut Board, observe: F) -> R
    where
        F: FnOnce(Frame) -> R + Send,
        R: Send,
    {
        let (current, next) = board.split_mut();
        self.pool.install(move || {
            rayon::join(move || observe(current), move || step(current, next)).0
        })
    }
}
