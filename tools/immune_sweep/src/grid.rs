// The 3x3 aggregation core
//
// Bins per-run metric values by (x-axis level, y-axis level) for the runs
// matching the fixed parameter level, accumulating a sum and a sample count
// per cell. Means are derived on demand; an empty cell has no mean.

use crate::error::{SweepError, SweepResult};
use crate::tables::ParameterTable;
use crate::types::{SweepLayout, LEVELS_PER_PARAMETER};

/// Cells per axis. The sweep design is a fixed 3x3 grid.
pub const GRID_DIM: usize = LEVELS_PER_PARAMETER;

// ============================================================================
// CELL STATISTICS
// ============================================================================

/// Accumulated samples for one grid cell.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellStats {
    sum: f64,
    count: usize,
}

impl CellStats {
    /// Number of runs that landed in this cell.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Arithmetic mean of the samples, or `None` for an empty cell.
    ///
    /// `None` is the only empty-cell signal; callers never see a NaN or a
    /// placeholder zero.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }
}

// ============================================================================
// SWEEP GRID
// ============================================================================

/// Aggregated 3x3 grid for one fixed parameter level.
///
/// Row 0 holds the smallest y-axis value, so the grid reads bottom-to-top
/// exactly like the rendered image.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    layout: SweepLayout,
    fixed_level: usize,
    cells: [[CellStats; GRID_DIM]; GRID_DIM],
}

impl SweepGrid {
    pub fn layout(&self) -> SweepLayout {
        self.layout
    }

    pub fn fixed_level(&self) -> usize {
        self.fixed_level
    }

    /// The fixed parameter's canonical value.
    pub fn fixed_value(&self) -> f64 {
        self.layout.fixed.levels()[self.fixed_level]
    }

    /// Cell at grid row `iy` (bottom-to-top) and column `ix` (left-to-right).
    pub fn cell(&self, iy: usize, ix: usize) -> &CellStats {
        &self.cells[iy][ix]
    }

    /// Total number of runs matched by the fixed level.
    pub fn total_samples(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .map(|cell| cell.count())
            .sum()
    }

    /// True when no run matched the fixed level at all.
    pub fn is_empty(&self) -> bool {
        self.total_samples() == 0
    }

    /// Min and max of the non-empty cell means, if any cell has samples.
    pub fn mean_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for row in &self.cells {
            for cell in row {
                if let Some(mean) = cell.mean() {
                    range = Some(match range {
                        None => (mean, mean),
                        Some((lo, hi)) => (lo.min(mean), hi.max(mean)),
                    });
                }
            }
        }
        range
    }
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Bin one metric series into the 3x3 sweep grid.
///
/// `metric_values` must be aligned with the parameter table's row order
/// (see `MetricsTable::series_for_runs`). Runs whose fixed-parameter level
/// differs from `fixed_level` are ignored; every other run lands in exactly
/// one cell, so the cell counts partition the fixed-level subset.
///
/// Pure function of its inputs: no I/O, and identical inputs produce
/// identical grids.
pub fn aggregate_grid(
    metric_values: &[f64],
    params: &ParameterTable,
    layout: SweepLayout,
    fixed_level: usize,
) -> SweepResult<SweepGrid> {
    if metric_values.len() != params.len() {
        return Err(SweepError::SeriesLengthMismatch {
            series_len: metric_values.len(),
            table_len: params.len(),
        });
    }
    assert!(fixed_level < LEVELS_PER_PARAMETER, "fixed level out of range");

    let fixed = params.levels_for(layout.fixed);
    let xs = params.levels_for(layout.x_axis);
    let ys = params.levels_for(layout.y_axis);

    let mut cells = [[CellStats::default(); GRID_DIM]; GRID_DIM];
    for (i, &value) in metric_values.iter().enumerate() {
        if fixed[i] != fixed_level {
            continue;
        }
        cells[ys[i]][xs[i]].push(value);
    }

    Ok(SweepGrid {
        layout,
        fixed_level,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Parameter table from (rate, lifetime, bias) level triples, run ids
    // assigned by position.
    fn params(rows: &[(usize, usize, usize)]) -> ParameterTable {
        ParameterTable {
            run_ids: (0..rows.len() as u32).collect(),
            rate_levels: rows.iter().map(|r| r.0).collect(),
            lifetime_levels: rows.iter().map(|r| r.1).collect(),
            bias_levels: rows.iter().map(|r| r.2).collect(),
        }
    }

    #[test]
    fn single_runs_land_in_their_cells() {
        // Fixed attachment rate = 0.2 (level 1); one run at
        // (lifetime=15, bias=0.25), one at (lifetime=15, bias=0.5).
        let table = params(&[(1, 0, 0), (1, 0, 1)]);
        let grid =
            aggregate_grid(&[100.0, 200.0], &table, SweepLayout::fixed_rate(), 1).unwrap();

        assert_eq!(grid.cell(0, 0).count(), 1);
        assert_eq!(grid.cell(0, 0).mean(), Some(100.0));
        assert_eq!(grid.cell(0, 1).count(), 1);
        assert_eq!(grid.cell(0, 1).mean(), Some(200.0));

        let occupied = [(0usize, 0usize), (0, 1)];
        for iy in 0..GRID_DIM {
            for ix in 0..GRID_DIM {
                if !occupied.contains(&(iy, ix)) {
                    assert_eq!(grid.cell(iy, ix).count(), 0);
                    assert_eq!(grid.cell(iy, ix).mean(), None);
                }
            }
        }
    }

    #[test]
    fn repeated_runs_average() {
        // Two seeds at the same (fixed, x, y) triple.
        let table = params(&[(1, 2, 1), (1, 2, 1)]);
        let grid = aggregate_grid(&[10.0, 20.0], &table, SweepLayout::fixed_rate(), 1).unwrap();
        assert_eq!(grid.cell(2, 1).mean(), Some(15.0));
        assert_eq!(grid.cell(2, 1).count(), 2);
        assert_eq!(grid.total_samples(), 2);
    }

    #[test]
    fn absent_fixed_level_leaves_grid_empty() {
        let table = params(&[(0, 0, 0), (2, 1, 1)]);
        let grid = aggregate_grid(&[1.0, 2.0], &table, SweepLayout::fixed_rate(), 1).unwrap();
        assert!(grid.is_empty());
        for iy in 0..GRID_DIM {
            for ix in 0..GRID_DIM {
                assert_eq!(grid.cell(iy, ix).count(), 0);
                assert_eq!(grid.cell(iy, ix).mean(), None);
            }
        }
    }

    #[test]
    fn counts_partition_the_fixed_subset() {
        // Five runs at the fixed level spread over three cells, three
        // runs at other levels that must not be counted anywhere.
        let table = params(&[
            (1, 0, 0),
            (1, 0, 0),
            (1, 1, 2),
            (1, 2, 2),
            (1, 2, 2),
            (0, 0, 0),
            (2, 1, 1),
            (0, 2, 2),
        ]);
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 200.0, 300.0];
        let grid = aggregate_grid(&values, &table, SweepLayout::fixed_rate(), 1).unwrap();

        assert_eq!(grid.total_samples(), 5);
        assert_eq!(grid.cell(0, 0).count(), 2);
        assert_eq!(grid.cell(1, 2).count(), 1);
        assert_eq!(grid.cell(2, 2).count(), 2);
        assert_eq!(grid.cell(0, 0).mean(), Some(1.5));
        assert_eq!(grid.cell(2, 2).mean(), Some(4.5));
    }

    #[test]
    fn aggregation_is_deterministic() {
        let table = params(&[(1, 0, 0), (1, 1, 1), (1, 2, 2), (0, 0, 0)]);
        let values = [3.5, 7.25, 11.0, 42.0];
        let first = aggregate_grid(&values, &table, SweepLayout::fixed_rate(), 1).unwrap();
        let second = aggregate_grid(&values, &table, SweepLayout::fixed_rate(), 1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fixed_bias_layout_maps_rate_to_x() {
        // Fixed migration bias (level 1); the run's attachment rate level
        // becomes the column, its lifetime level the row.
        let table = params(&[(2, 0, 1)]);
        let grid = aggregate_grid(&[7.0], &table, SweepLayout::fixed_bias(), 1).unwrap();
        assert_eq!(grid.cell(0, 2).mean(), Some(7.0));
        assert_eq!(grid.total_samples(), 1);
    }

    #[test]
    fn series_length_must_match_table() {
        let table = params(&[(1, 0, 0), (1, 0, 1)]);
        let err = aggregate_grid(&[1.0], &table, SweepLayout::fixed_rate(), 1).unwrap_err();
        assert!(matches!(
            err,
            SweepError::SeriesLengthMismatch {
                series_len: 1,
                table_len: 2,
            }
        ));
    }

    #[test]
    fn empty_cell_mean_is_none() {
        let stats = CellStats::default();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.mean(), None);
    }

    #[test]
    fn mean_range_spans_nonempty_cells() {
        let table = params(&[(1, 0, 0), (1, 0, 1), (1, 2, 2)]);
        let grid =
            aggregate_grid(&[100.0, 200.0, 150.0], &table, SweepLayout::fixed_rate(), 1).unwrap();
        assert_eq!(grid.mean_range(), Some((100.0, 200.0)));

        let empty = aggregate_grid(&[], &params(&[]), SweepLayout::fixed_rate(), 1).unwrap();
        assert_eq!(empty.mean_range(), None);
    }

    #[test]
    fn fixed_value_reports_the_canonical_level() {
        let grid = aggregate_grid(&[], &params(&[]), SweepLayout::fixed_rate(), 2).unwrap();
        assert_eq!(grid.fixed_value(), 1.0);
        assert_eq!(grid.fixed_level(), 2);
    }
}
