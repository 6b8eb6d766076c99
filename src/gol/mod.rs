use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{fmt::Display, ops::Index};

pub mod engine;

/// Double-buffered toroidal Life board.
///
/// `current` is the generation being read and displayed, `next` is the
/// scratch buffer the engine writes into. `commit` swaps them, which leaves
/// the outgoing generation in `next` until something writes over it; that is
/// what `previous` and `revert` read from.
#[derive(Clone, Debug)]
pub struct Board {
    current: Vec<bool>,
    next: Vec<bool>,
    cols: usize,
    generation: u64,
    snapshot: bool,
}

/// Read-only view of a board's current generation.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    cells: &'a [bool],
    cols: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Point {
    pub row: i64,
    pub col: i64,
}
impl Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
impl<I1, I2> From<(I1, I2)> for Point
where
    I1: Into<i64>,
    I2: Into<i64>,
{
    fn from((r, c): (I1, I2)) -> Self {
        Self {
            row: r.into(),
            col: c.into(),
        }
    }
}

impl Point {
    /// Wraps the point onto a `rows` x `cols` torus. Works for any signed
    /// offset, not only a single step past the edge.
    pub fn remap(&mut self, rows: usize, cols: usize) {
        self.row = self.row.rem_euclid(rows as i64);
        self.col = self.col.rem_euclid(cols as i64);
    }
}

impl Board {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        ensure!(rows > 0 && cols > 0, "board shape {rows}x{cols} is empty");
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| anyhow::anyhow!("board shape {rows}x{cols} overflows"))?;
        Ok(Board {
            current: vec![false; len],
            next: vec![false; len],
            cols,
            generation: 0,
            snapshot: false,
        })
    }

    #[cfg(test)]
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<bool>) -> Result<Self> {
        let mut board = Self::new(rows, cols)?;
        ensure!(
            cells.len() == board.current.len(),
            "expected {} cells for a {rows}x{cols} board, got {}",
            board.current.len(),
            cells.len()
        );
        board.next.copy_from_slice(&cells);
        board.current = cells;
        Ok(board)
    }

    /// Builds a board with the given live cells; coordinates wrap.
    #[cfg(test)]
    pub fn from_pattern<P>(rows: usize, cols: usize, live: &[P]) -> Result<Self>
    where
        P: Into<Point> + Clone,
    {
        let mut board = Self::new(rows, cols)?;
        for pt in live {
            let idx = board.pt_to_index(pt.clone().into());
            board.current[idx] = true;
        }
        board.next.copy_from_slice(&board.current);
        Ok(board)
    }

    /// A board of the given shape filled by `seed`.
    pub fn seeded(rows: usize, cols: usize, seed: Option<u64>) -> Result<Self> {
        let mut board = Self::new(rows, cols)?;
        board.seed(seed);
        Ok(board)
    }

    /// Refills `current` with fair coin flips. The same seed and shape always
    /// produce the same board; without one the OS entropy source is used.
    pub fn seed(&mut self, seed: Option<u64>) {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        self.fill_random(&mut rng);
    }

    pub fn fill_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.current.iter_mut().for_each(|c| *c = rng.gen_bool(0.5));
        self.next.copy_from_slice(&self.current);
        self.generation = 0;
        self.snapshot = false;
    }

    fn pt_to_index(&self, mut pt: Point) -> usize {
        pt.remap(self.rows(), self.cols);
        (pt.row as usize) * self.cols + pt.col as usize
    }

    pub fn rows(&self) -> usize {
        self.current.len() / self.cols
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn generation(&self) -> u64 {
        self.generation
    }
    pub fn alive(&self) -> usize {
        self.frame().alive()
    }

    #[cfg(test)]
    pub fn get(&self, row: i64, col: i64) -> bool {
        self[Point { row, col }]
    }

    /// Writes into the scratch buffer; `current` is untouched until `commit`.
    #[cfg(test)]
    pub fn set_next(&mut self, row: i64, col: i64, value: bool) {
        let idx = self.pt_to_index(Point { row, col });
        self.next[idx] = value;
        self.snapshot = false;
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            cells: &self.current,
            cols: self.cols,
        }
    }

    /// Splits the board into the readable current generation and the writable
    /// next one. Any snapshot held in `next` is lost.
    pub fn split_mut(&mut self) -> (Frame<'_>, &mut [bool]) {
        self.snapshot = false;
        (
            Frame {
                cells: &self.current,
                cols: self.cols,
            },
            &mut self.next,
        )
    }

    /// Publishes `next` as the current generation.
    pub fn commit(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.generation += 1;
        self.snapshot = true;
    }

    /// The generation that was current before the last `commit`, if nothing
    /// has written over it since.
    pub fn previous(&self) -> Option<Frame<'_>> {
        self.snapshot.then(|| Frame {
            cells: &self.next,
            cols: self.cols,
        })
    }

    /// Undoes the last `commit`. Returns false when there is nothing intact
    /// to go back to.
    pub fn revert(&mut self) -> bool {
        if !self.snapshot {
            return false;
        }
        std::mem::swap(&mut self.current, &mut self.next);
        self.generation -= 1;
        self.snapshot = false;
        true
    }
}

impl Index<Point> for Board {
    type Output = bool;
    fn index(&self, index: Point) -> &Self::Output {
        &self.current[self.pt_to_index(index)]
    }
}

impl<'a> Frame<'a> {
    pub fn rows(&self) -> usize {
        self.cells.len() / self.cols
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn cells(&self) -> &'a [bool] {
        self.cells
    }
    pub fn row(&self, row: usize) -> &'a [bool] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }
    #[cfg(test)]
    pub fn get(&self, row: i64, col: i64) -> bool {
        let mut pt = Point { row, col };
        pt.remap(self.rows(), self.cols);
        self.cells[pt.row as usize * self.cols + pt.col as usize]
    }
    pub fn alive(&self) -> usize {
        self.cells.iter().filter(|v| **v).count()
    }
}
