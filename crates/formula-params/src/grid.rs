use core::fmt;

/// A reference to one cell of a [`CellSet`].
///
/// Rows and columns are **0-indexed**: `row = 0` is row `1`, `col = 0` is column `A`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", col_to_name(self.col), self.row + 1)
    }

    /// Parses an A1-style name, accepting optional `$` markers (`$B$2`).
    pub fn from_a1(a1: &str) -> Option<Self> {
        let bytes = a1.as_bytes();
        let mut idx = 0usize;
        if bytes.first() == Some(&b'$') {
            idx += 1;
        }

        let col_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
            idx += 1;
        }
        if idx == col_start {
            return None;
        }
        let col = name_to_col(&a1[col_start..idx])?;

        if bytes.get(idx) == Some(&b'$') {
            idx += 1;
        }
        let row_start = idx;
        while idx < bytes.len() && bytes[idx].is_ascii_digit() {
            idx += 1;
        }
        if idx == row_start || idx != bytes.len() {
            return None;
        }
        let row_1_based: u32 = a1[row_start..].parse().ok()?;
        if row_1_based == 0 {
            return None;
        }

        Some(Self {
            row: row_1_based - 1,
            col,
        })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

fn name_to_col(letters: &str) -> Option<u32> {
    if letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for ch in letters.bytes() {
        col = col * 26 + u32::from(ch.to_ascii_uppercase() - b'A') + 1;
    }
    Some(col - 1)
}

fn col_to_name(mut col: u32) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (col % 26) as u8);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    out.iter().rev().map(|b| *b as char).collect()
}

/// The grid a formula lives in. Names that address a cell inside its bounds are cell
/// references; anything else is left to field/parameter resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellSet {
    rows: u32,
    cols: u32,
}

impl CellSet {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// Resolves `name` to a cell of this grid.
    pub fn cell(&self, name: &str) -> Option<CellRef> {
        CellRef::from_a1(name).filter(|cell| self.contains(*cell))
    }
}
