use crate::models::CellValue;

/// Mutable record for one grouped column's current run.
///
/// `first_line` is the 1-based data line the run started on. The record is
/// created on the column's first observation and only ever mutated after
/// that; it is never dropped mid-run.
#[derive(Debug, Clone)]
pub struct GroupState {
    pub value: CellValue,
    pub first_line: u64,
}

/// A run that just ended: the grouped column's slot plus the 1-based data
/// lines the run covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedRun {
    pub column: usize,
    pub first_line: u64,
    pub last_line: u64,
}

/// Change-of-value tracker over sort-grouped columns.
///
/// Boundaries are detected by comparing each row against its successor, so
/// the caller scans sequentially with one row of lookahead. The end of data
/// behaves as if the scan wrapped around to the first row: the final run
/// always closes, including a single run spanning the whole result.
pub struct GroupingEngine {
    // One slot per visible column plus two trailing sentinels, mirroring the
    // lookahead-safe layout the scan was written against.
    states: Vec<Option<GroupState>>,
    begin_row: u32,
}

impl GroupingEngine {
    pub fn new(column_count: usize, begin_row: u32) -> Self {
        Self {
            states: vec![None; column_count + 2],
            begin_row,
        }
    }

    /// Feed one observation for a grouped column. `line` is the 1-based data
    /// line of the current row, `next` the same column's value on the
    /// successor row. Returns the run that closed, if any.
    pub fn observe(
        &mut self,
        column: usize,
        current: &CellValue,
        next: &CellValue,
        line: u64,
    ) -> Option<ClosedRun> {
        match self.states[column].take() {
            None => {
                self.states[column] = Some(GroupState {
                    value: current.clone(),
                    first_line: line,
                });
                None
            }
            Some(mut state) => {
                let closed = if next.loose_eq(current) {
                    None
                } else {
                    let run = ClosedRun {
                        column,
                        first_line: state.first_line,
                        last_line: line,
                    };
                    // The new run is keyed off the closing line, not its own
                    // first line; the range-start shift below compensates.
                    state.first_line = line;
                    state.value = next.clone();
                    Some(run)
                };
                self.states[column] = Some(state);
                closed
            }
        }
    }

    /// Force-close every active run at the final data line.
    pub fn finish(&mut self, last_line: u64) -> Vec<ClosedRun> {
        let mut closed = Vec::new();
        for (column, state) in self.states.iter_mut().enumerate() {
            if let Some(run) = state.take() {
                closed.push(ClosedRun {
                    column,
                    first_line: run.first_line,
                    last_line,
                });
            }
        }
        closed
    }

    /// Sheet row a run's formula/merge range starts on.
    ///
    /// The shift is +3 except for a run starting exactly on the header's
    /// begin row, which shifts by +1. This reproduces the long-observed
    /// behavior of the original scan; the arithmetic only lines up in the
    /// common single-group layout and is kept as-is deliberately.
    pub fn range_start_row(&self, first_line: u64) -> u32 {
        if first_line == u64::from(self.begin_row) {
            (first_line + 1) as u32
        } else {
            (first_line + 3) as u32
        }
    }

    /// Whether any grouped column has started a run.
    pub fn has_active_runs(&self) -> bool {
        self.states.iter().any(|s| s.is_some())
    }
}
