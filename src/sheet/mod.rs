pub mod address;
pub mod builder;
pub mod formatter;
pub mod grouping;

pub use address::column_name;
pub use builder::SheetBuilder;
pub use formatter::CellFormatter;
pub use grouping::GroupingEngine;

use std::collections::BTreeMap;

use crate::models::{CellStyle, CellValue};

/// Inclusive rectangular region. Rows are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl CellRange {
    pub fn new(first_col: u16, first_row: u32, last_col: u16, last_row: u32) -> Self {
        Self {
            first_row,
            first_col,
            last_row,
            last_col,
        }
    }

    pub fn contains(&self, col: u16, row: u32) -> bool {
        col >= self.first_col && col <= self.last_col && row >= self.first_row && row <= self.last_row
    }
}

/// One written cell: the raw typed value, its formatted display text, and
/// the effective style. Display text is never null; an absent value shows as
/// an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub display: String,
    pub style: CellStyle,
}

impl Cell {
    pub fn new(value: CellValue, display: String, style: CellStyle) -> Self {
        Self {
            value,
            display,
            style,
        }
    }

    pub fn text(display: &str) -> Self {
        Self {
            value: CellValue::Text(display.to_string()),
            display: display.to_string(),
            style: CellStyle::default(),
        }
    }
}

/// Explicit per-job bookkeeping threaded through the builder passes instead
/// of accreting on the builder itself.
#[derive(Debug, Clone, Copy)]
pub struct SheetCursor {
    /// Sheet row the header occupies.
    pub begin_row: u32,
    /// Last written sheet row.
    pub end_row: u32,
    /// Number of visible columns, fixed when the header is generated.
    pub end_col: u16,
    /// Last body row (before footer/after-content), for the autofilter box.
    pub body_end_row: u32,
    /// Count of data rows written (aggregate rows excluded).
    pub data_rows: u64,
    pub any_footer: bool,
}

impl SheetCursor {
    pub fn new(begin_row: u32, end_col: u16) -> Self {
        Self {
            begin_row,
            end_row: begin_row,
            end_col,
            body_end_row: begin_row,
            data_rows: 0,
            any_footer: false,
        }
    }
}

/// Sparse 2-D grid the builder writes into and the format writers read from.
///
/// The grid is exclusively owned by one export job and explicitly released
/// when the job finishes, on both the success and the failure path.
#[derive(Debug, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u16), Cell>,
    merges: Vec<CellRange>,
    /// Number of leading rows kept frozen above the scroll area.
    frozen_rows: Option<u32>,
    autofilter: Option<CellRange>,
}

impl Sheet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn write_cell(&mut self, col: u16, row: u32, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn cell(&self, col: u16, row: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn cell_mut(&mut self, col: u16, row: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&(row, col))
    }

    /// Display text at a position, empty for unwritten cells.
    pub fn display_at(&self, col: u16, row: u32) -> &str {
        self.cell(col, row).map(|c| c.display.as_str()).unwrap_or("")
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn merge(&mut self, range: CellRange) {
        if range.first_row != range.last_row || range.first_col != range.last_col {
            self.merges.push(range);
        }
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    pub fn freeze_rows(&mut self, rows: u32) {
        self.frozen_rows = Some(rows);
    }

    pub fn frozen_rows(&self) -> Option<u32> {
        self.frozen_rows
    }

    pub fn set_autofilter(&mut self, range: CellRange) {
        self.autofilter = Some(range);
    }

    pub fn autofilter(&self) -> Option<CellRange> {
        self.autofilter
    }

    /// A1-style reference for a cell.
    pub fn cell_ref(col: u16, row: u32) -> String {
        format!("{}{row}", address::column_label(col))
    }

    /// A1-style range over one column, e.g. "C2:C5".
    pub fn column_range_ref(col: u16, first_row: u32, last_row: u32) -> String {
        format!(
            "{}:{}",
            Self::cell_ref(col, first_row),
            Self::cell_ref(col, last_row)
        )
    }

    /// Merge `style` into every written cell of `range`; per-cell settings
    /// win over the region style.
    pub fn apply_style_region(&mut self, range: CellRange, style: &CellStyle) {
        if style.is_empty() {
            return;
        }
        for ((_, col), cell) in self
            .cells
            .range_mut((range.first_row, 0)..=(range.last_row, u16::MAX))
        {
            if *col >= range.first_col && *col <= range.last_col {
                cell.style.merge_missing(style);
            }
        }
    }

    /// Greatest written row and column, `(0, 0)` for an empty grid.
    pub fn dimensions(&self) -> (u32, u16) {
        let max_row = self.cells.keys().map(|(r, _)| *r).max().unwrap_or(0);
        let max_col = self.cells.keys().map(|(_, c)| *c).max().unwrap_or(0);
        (max_row, max_col)
    }

    /// Drop the grid contents. Called exactly once per job, after the writer
    /// has finished or failed, so a large sheet never outlives its job.
    pub fn release(&mut self) {
        self.cells.clear();
        self.merges.clear();
        self.frozen_rows = None;
        self.autofilter = None;
    }
}
