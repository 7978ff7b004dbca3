// PNG heatmap rendering
//
// Draws the 3x3 grid directly in pixel space: colored cell rectangles, a
// sample-count annotation per cell, centered categorical tick labels, a
// quantized colorbar, and the usual captions. All output geometry comes in
// through an explicit RenderOptions value; no process-global plotting
// state is touched.

use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;

use crate::error::{SweepError, SweepResult};
use crate::grid::{SweepGrid, GRID_DIM};

// ============================================================================
// OPTIONS
// ============================================================================

/// Raster geometry and color quantization for one heatmap.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Discrete color levels across the observed mean range.
    pub color_levels: usize,
}

impl Default for RenderOptions {
    // 1920x1440 is a 6.4in x 4.8in figure at 300 dpi.
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1440,
            color_levels: 128,
        }
    }
}

// ============================================================================
// COLOR SCALE
// ============================================================================

// Plasma colormap sampled at eleven equally spaced stops.
const PLASMA_STOPS: [(u8, u8, u8); 11] = [
    (13, 8, 135),
    (65, 4, 157),
    (106, 0, 168),
    (143, 13, 164),
    (177, 42, 144),
    (204, 71, 120),
    (225, 100, 98),
    (242, 132, 75),
    (252, 166, 54),
    (252, 206, 37),
    (240, 249, 33),
];

// Fill for cells with no samples; deliberately outside the colormap so
// sparse coverage is visible at a glance.
const EMPTY_CELL_FILL: RGBColor = RGBColor(225, 225, 225);

/// Plasma colormap: maps t in [0, 1] to RGB, clamping out-of-range input.
pub fn plasma_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (PLASMA_STOPS.len() - 1) as f64;
    let idx = (scaled.floor() as usize).min(PLASMA_STOPS.len() - 2);
    let frac = scaled - idx as f64;
    let (r0, g0, b0) = PLASMA_STOPS[idx];
    let (r1, g1, b1) = PLASMA_STOPS[idx + 1];
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// Normalize `value` into [0, 1] over [lo, hi], snapped to `levels`
/// discrete steps. A degenerate range maps everything to the midpoint.
pub fn quantize(value: f64, lo: f64, hi: f64, levels: usize) -> f64 {
    assert!(levels >= 2, "need at least two color levels");
    if hi <= lo {
        return 0.5;
    }
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    let bin = ((t * levels as f64) as usize).min(levels - 1);
    bin as f64 / (levels - 1) as f64
}

/// Colorbar tick label; whole numbers once the scale spans at least ten
/// units, two decimals below that.
pub fn scale_label(value: f64, span: f64) -> String {
    if span >= 10.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

// ============================================================================
// HEATMAP
// ============================================================================

/// Render the aggregated grid as an annotated PNG heatmap.
///
/// Cell (row, col) of the grid lands at image row `GRID_DIM - 1 - row`:
/// grid row 0 is the bottom row of the picture, and the tick label at
/// index i always names grid row/column i.
pub fn render_heatmap(
    grid: &SweepGrid,
    title: &str,
    options: &RenderOptions,
    out_path: &Path,
) -> SweepResult<()> {
    let width = options.width as i32;
    let height = options.height as i32;

    // Fixed margins: captions on the left/bottom, colorbar on the right.
    let plot_left = 190;
    let plot_top = 110;
    let plot_right = width - 250;
    let plot_bottom = height - 170;
    let bar_left = width - 210;
    let bar_right = width - 160;

    let layout = grid.layout();
    let x_labels = layout.x_axis.level_labels();
    let y_labels = layout.y_axis.level_labels();

    // Color scale spans the observed non-empty means.
    let (lo, hi) = grid.mean_range().unwrap_or((0.0, 1.0));

    let root = BitMapBackend::new(out_path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let cell_w = (plot_right - plot_left) as f64 / GRID_DIM as f64;
    let cell_h = (plot_bottom - plot_top) as f64 / GRID_DIM as f64;

    let title_style = ("sans-serif", 48)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    let caption_style = ("sans-serif", 42)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    let tick_style = ("sans-serif", 38)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    let ytick_style = ("sans-serif", 38)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Right, VPos::Center));
    let tag_style = ("sans-serif", 34)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Bottom));
    let bar_style = ("sans-serif", 32)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));

    // Cells, bottom-to-top.
    for iy in 0..GRID_DIM {
        for ix in 0..GRID_DIM {
            let cell = grid.cell(iy, ix);
            let x0 = plot_left + (ix as f64 * cell_w) as i32;
            let x1 = plot_left + ((ix + 1) as f64 * cell_w) as i32;
            let y1 = plot_bottom - (iy as f64 * cell_h) as i32;
            let y0 = plot_bottom - ((iy + 1) as f64 * cell_h) as i32;

            let fill = match cell.mean() {
                Some(mean) => plasma_color(quantize(mean, lo, hi, options.color_levels)),
                None => EMPTY_CELL_FILL,
            };
            root.draw(&Rectangle::new([(x0, y0), (x1, y1)], fill.filled()))
                .map_err(render_err)?;

            // Sample-count tag with a white backing box, lower-left region.
            let tag = format!("N={}", cell.count());
            let tag_x = x0 + (0.35 * cell_w) as i32;
            let tag_y = y1 - (0.10 * cell_h) as i32;
            let box_w = 6 + 19 * tag.len() as i32;
            root.draw(&Rectangle::new(
                [(tag_x - 6, tag_y - 40), (tag_x + box_w, tag_y + 6)],
                WHITE.filled(),
            ))
            .map_err(render_err)?;
            root.draw(&Text::new(tag, (tag_x, tag_y), tag_style.clone()))
                .map_err(render_err)?;
        }
    }

    // Plot frame.
    root.draw(&Rectangle::new(
        [(plot_left, plot_top), (plot_right, plot_bottom)],
        &BLACK,
    ))
    .map_err(render_err)?;

    // Categorical tick labels, centered on their cells. Label index i
    // always names grid column/row i.
    for (ix, label) in x_labels.iter().enumerate() {
        let cx = plot_left + ((ix as f64 + 0.5) * cell_w) as i32;
        root.draw(&Text::new(
            label.clone(),
            (cx, plot_bottom + 14),
            tick_style.clone(),
        ))
        .map_err(render_err)?;
    }
    for (iy, label) in y_labels.iter().enumerate() {
        let cy = plot_bottom - ((iy as f64 + 0.5) * cell_h) as i32;
        root.draw(&Text::new(
            label.clone(),
            (plot_left - 14, cy),
            ytick_style.clone(),
        ))
        .map_err(render_err)?;
    }

    // Title and axis captions.
    let center_x = (plot_left + plot_right) / 2;
    let center_y = (plot_top + plot_bottom) / 2;
    root.draw(&Text::new(title, (center_x, plot_top - 75), title_style))
        .map_err(render_err)?;
    root.draw(&Text::new(
        layout.x_axis.axis_label(),
        (center_x, plot_bottom + 70),
        caption_style,
    ))
    .map_err(render_err)?;
    root.draw(&Text::new(
        layout.y_axis.axis_label(),
        (60, center_y),
        ("sans-serif", 42)
            .into_font()
            .transform(FontTransform::Rotate270)
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center)),
    ))
    .map_err(render_err)?;

    // Colorbar: bottom = lo, top = hi, same quantization as the cells.
    let bar_h = (plot_bottom - plot_top) as f64;
    let steps = options.color_levels;
    for k in 0..steps {
        let t = k as f64 / (steps - 1) as f64;
        let y_hi = plot_bottom - (((k + 1) as f64 / steps as f64) * bar_h) as i32;
        let y_lo = plot_bottom - ((k as f64 / steps as f64) * bar_h) as i32;
        root.draw(&Rectangle::new(
            [(bar_left, y_hi), (bar_right, y_lo)],
            plasma_color(t).filled(),
        ))
        .map_err(render_err)?;
    }
    root.draw(&Rectangle::new(
        [(bar_left, plot_top), (bar_right, plot_bottom)],
        &BLACK,
    ))
    .map_err(render_err)?;

    let span = hi - lo;
    for k in 0..=4 {
        let value = lo + span * k as f64 / 4.0;
        let y = plot_bottom - ((k as f64 / 4.0) * bar_h) as i32;
        root.draw(&Text::new(
            scale_label(value, span),
            (bar_right + 10, y),
            bar_style.clone(),
        ))
        .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}

fn render_err(err: impl std::fmt::Display) -> SweepError {
    SweepError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(color: RGBColor) -> (u8, u8, u8) {
        (color.0, color.1, color.2)
    }

    #[test]
    fn plasma_endpoints_match_the_anchor_table() {
        assert_eq!(rgb(plasma_color(0.0)), (13, 8, 135));
        assert_eq!(rgb(plasma_color(1.0)), (240, 249, 33));
    }

    #[test]
    fn plasma_clamps_out_of_range_input() {
        assert_eq!(rgb(plasma_color(-3.0)), rgb(plasma_color(0.0)));
        assert_eq!(rgb(plasma_color(2.0)), rgb(plasma_color(1.0)));
    }

    #[test]
    fn plasma_interpolates_between_stops() {
        // Halfway through the scale sits on the sixth anchor exactly.
        assert_eq!(rgb(plasma_color(0.5)), (204, 71, 120));
    }

    #[test]
    fn quantize_covers_the_full_range() {
        assert_eq!(quantize(0.0, 0.0, 1.0, 128), 0.0);
        assert_eq!(quantize(1.0, 0.0, 1.0, 128), 1.0);
    }

    #[test]
    fn quantize_snaps_values_in_one_bin_together() {
        // Four bins over [0, 1]: 0.51 and 0.62 both land in bin 2.
        assert_eq!(
            quantize(0.51, 0.0, 1.0, 4),
            quantize(0.62, 0.0, 1.0, 4)
        );
        assert!(quantize(0.51, 0.0, 1.0, 4) != quantize(0.76, 0.0, 1.0, 4));
    }

    #[test]
    fn quantize_is_monotone() {
        let mut last = 0.0;
        for k in 0..=100 {
            let q = quantize(k as f64 / 100.0, 0.0, 1.0, 128);
            assert!(q >= last);
            last = q;
        }
    }

    #[test]
    fn degenerate_range_maps_to_midpoint() {
        assert_eq!(quantize(5.0, 5.0, 5.0, 128), 0.5);
    }

    #[test]
    fn scale_label_precision_follows_span() {
        assert_eq!(scale_label(812.3, 500.0), "812");
        assert_eq!(scale_label(0.456, 1.0), "0.46");
    }

    #[test]
    fn default_geometry_matches_a_300_dpi_figure() {
        let options = RenderOptions::default();
        assert_eq!((options.width, options.height), (1920, 1440));
        assert_eq!(options.color_levels, 128);
    }
}
