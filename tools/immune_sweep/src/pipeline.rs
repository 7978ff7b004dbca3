// End-to-end pipeline shared by the preset binaries
//
// Load both tables, check the run-id join, aggregate into the 3x3 grid,
// render the heatmap, and optionally export the JSON summary. Each
// invocation is independent; nothing is cached between runs.

use std::fs;
use std::path::PathBuf;

use crate::error::{SweepError, SweepResult};
use crate::grid::{aggregate_grid, SweepGrid, GRID_DIM};
use crate::render::{render_heatmap, RenderOptions};
use crate::summary::GridSummary;
use crate::tables::{check_run_alignment, MetricsTable, ParameterTable};
use crate::types::{format_value, Metric, SweepLayout};

/// Input table filenames, fixed by the sweep tooling that produces them.
pub const METRICS_FILENAME: &str = "final_analysis.txt";
pub const PARAMETERS_FILENAME: &str = "run_rate_lifetime_bias.txt";

/// The metric every heatmap currently plots.
pub const PLOTTED_METRIC: Metric = Metric::LiveCancerCells;

/// Pipeline stages, reported to the caller as each one begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadMetrics,
    LoadParameters,
    Aggregate,
    Render,
}

/// Everything the pipeline needs besides the layout and the fixed value.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub render: RenderOptions,
    pub export_summary: bool,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub grid: SweepGrid,
    pub image_path: PathBuf,
    pub summary_path: Option<PathBuf>,
}

/// Run the whole pipeline for one fixed parameter value.
///
/// `progress` is invoked at the start of each stage so callers can drive a
/// progress bar without the pipeline knowing about terminals. The fixed
/// value is canonicalized against the sweep enumeration up front, before
/// any file is touched.
pub fn run(
    layout: SweepLayout,
    fixed_raw: f64,
    options: &PipelineOptions,
    mut progress: impl FnMut(Stage),
) -> SweepResult<PipelineOutput> {
    let fixed_level =
        layout
            .fixed
            .level_of(fixed_raw)
            .ok_or(SweepError::NotASweepValue {
                parameter: layout.fixed.axis_label(),
                value: fixed_raw,
                allowed: *layout.fixed.levels(),
            })?;

    progress(Stage::LoadMetrics);
    let metrics = MetricsTable::load(&options.input_dir.join(METRICS_FILENAME))?;

    progress(Stage::LoadParameters);
    let params = ParameterTable::load(&options.input_dir.join(PARAMETERS_FILENAME))?;
    check_run_alignment(&metrics, &params)?;

    progress(Stage::Aggregate);
    let series = metrics.series_for_runs(PLOTTED_METRIC, &params.run_ids)?;
    let grid = aggregate_grid(&series, &params, layout, fixed_level)?;
    ensure_populated(&grid)?;

    progress(Stage::Render);
    fs::create_dir_all(&options.output_dir).map_err(|source| SweepError::Io {
        path: options.output_dir.clone(),
        source,
    })?;
    let image_path = options.output_dir.join(image_filename(PLOTTED_METRIC, &grid));
    if let Err(err) = render_heatmap(
        &grid,
        &title_for(PLOTTED_METRIC, &grid),
        &options.render,
        &image_path,
    ) {
        // The backend may have flushed a partial image before the failure.
        let _ = fs::remove_file(&image_path);
        return Err(err);
    }

    let summary_path = if options.export_summary {
        let path = image_path.with_extension("json");
        GridSummary::new(&grid, PLOTTED_METRIC).write(&path)?;
        Some(path)
    } else {
        None
    };

    Ok(PipelineOutput {
        grid,
        image_path,
        summary_path,
    })
}

// A grid with zero samples means the fixed value never occurs in the
// parameter table; rendering it would produce a blank, misleading image.
fn ensure_populated(grid: &SweepGrid) -> SweepResult<()> {
    if grid.is_empty() {
        return Err(SweepError::EmptySweep {
            parameter: grid.layout().fixed.axis_label(),
            value: grid.fixed_value(),
        });
    }
    Ok(())
}

/// Output filename, e.g. `heatmap_avg_num_live_cancer_cells_rate0.2.png`.
pub fn image_filename(metric: Metric, grid: &SweepGrid) -> String {
    format!(
        "heatmap_avg_{}_{}{}.png",
        metric.file_slug(),
        grid.layout().fixed.file_tag(),
        format_value(grid.fixed_value())
    )
}

/// Chart title, e.g. `Avg(# live cancer cells) per N runs; Migration Bias=0.5`.
pub fn title_for(metric: Metric, grid: &SweepGrid) -> String {
    format!(
        "Avg({}) per N runs; {}={}",
        metric.label(),
        grid.layout().fixed.title_label(),
        format_value(grid.fixed_value())
    )
}

/// Aligned per-cell report for the console, top grid row first.
pub fn grid_report(grid: &SweepGrid) -> String {
    let layout = grid.layout();
    let x_labels = layout.x_axis.level_labels();
    let y_labels = layout.y_axis.level_labels();

    let mut out = String::new();
    out.push_str(&format!("{:>16}", ""));
    for label in &x_labels {
        out.push_str(&format!(
            "{:>20}",
            format!("{}={}", layout.x_axis.file_tag(), label)
        ));
    }
    out.push('\n');

    for iy in (0..GRID_DIM).rev() {
        out.push_str(&format!(
            "{:>16}",
            format!("{}={}", layout.y_axis.file_tag(), y_labels[iy])
        ));
        for ix in 0..GRID_DIM {
            let cell = grid.cell(iy, ix);
            let text = match cell.mean() {
                Some(mean) => format!("{:.1} (N={})", mean, cell.count()),
                None => "- (N=0)".to_string(),
            };
            out.push_str(&format!("{:>20}", text));
        }
        out.push('\n');
    }
    out
}
