// Machine-readable grid summary
//
// Companion JSON written next to the heatmap so downstream scripts can
// consume the aggregated numbers without re-parsing an image.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::{SweepError, SweepResult};
use crate::grid::{SweepGrid, GRID_DIM};
use crate::types::Metric;

/// One grid cell: the axis values it aggregates and what landed in it.
#[derive(Debug, Serialize)]
pub struct CellSummary {
    pub x: f64,
    pub y: f64,
    /// `null` when no run matched this cell.
    pub mean: Option<f64>,
    pub samples: usize,
}

/// Whole-grid summary for one rendered heatmap.
#[derive(Debug, Serialize)]
pub struct GridSummary {
    pub metric: String,
    pub fixed_parameter: String,
    pub fixed_value: f64,
    pub x_parameter: String,
    pub y_parameter: String,
    pub total_runs: usize,
    /// Row-major, bottom grid row first — the same order as the image.
    pub cells: Vec<CellSummary>,
}

impl GridSummary {
    pub fn new(grid: &SweepGrid, metric: Metric) -> Self {
        let layout = grid.layout();
        let xs = layout.x_axis.levels();
        let ys = layout.y_axis.levels();

        let mut cells = Vec::with_capacity(GRID_DIM * GRID_DIM);
        for iy in 0..GRID_DIM {
            for ix in 0..GRID_DIM {
                let cell = grid.cell(iy, ix);
                cells.push(CellSummary {
                    x: xs[ix],
                    y: ys[iy],
                    mean: cell.mean(),
                    samples: cell.count(),
                });
            }
        }

        Self {
            metric: metric.label().to_string(),
            fixed_parameter: layout.fixed.axis_label().to_string(),
            fixed_value: grid.fixed_value(),
            x_parameter: layout.x_axis.axis_label().to_string(),
            y_parameter: layout.y_axis.axis_label().to_string(),
            total_runs: grid.total_samples(),
            cells,
        }
    }

    /// Serialize to pretty JSON and write to `path`.
    pub fn write(&self, path: &Path) -> SweepResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| SweepError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
