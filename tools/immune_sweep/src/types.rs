// Type definitions for the cancer-immune parameter sweep

use crate::error::{SweepError, SweepResult};

// ============================================================================
// SWEEP PARAMETERS
// ============================================================================

/// Allowed attachment rate values (mean wait time, hours), ascending.
pub const ATTACHMENT_RATE_LEVELS: [f64; 3] = [0.033, 0.2, 1.0];

/// Allowed attachment lifetime values (minutes), ascending.
pub const ATTACHMENT_LIFETIME_LEVELS: [f64; 3] = [15.0, 60.0, 120.0];

/// Allowed migration bias values (bias towards chemotactic gradients), ascending.
pub const MIGRATION_BIAS_LEVELS: [f64; 3] = [0.25, 0.5, 0.75];

/// Values per parameter, and therefore cells per grid axis.
pub const LEVELS_PER_PARAMETER: usize = 3;

/// The three simulation parameters swept in the study.
///
/// Each parameter takes exactly three values. Everything downstream of the
/// parse boundary identifies a value by its position in the level list
/// (0..2, ascending), so run selection never compares raw floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParameter {
    /// Immune cell attachment rate
    AttachmentRate,
    /// Immune cell attachment lifetime
    AttachmentLifetime,
    /// Random migration bias towards chemotactic gradients
    MigrationBias,
}

impl SweepParameter {
    /// The fixed allowed values for this parameter, ascending.
    pub fn levels(&self) -> &'static [f64; LEVELS_PER_PARAMETER] {
        match self {
            Self::AttachmentRate => &ATTACHMENT_RATE_LEVELS,
            Self::AttachmentLifetime => &ATTACHMENT_LIFETIME_LEVELS,
            Self::MigrationBias => &MIGRATION_BIAS_LEVELS,
        }
    }

    /// Axis caption, e.g. "attachment rate".
    pub fn axis_label(&self) -> &'static str {
        match self {
            Self::AttachmentRate => "attachment rate",
            Self::AttachmentLifetime => "attachment lifetime",
            Self::MigrationBias => "migration bias",
        }
    }

    /// Title form, e.g. "Attachment Rate".
    pub fn title_label(&self) -> &'static str {
        match self {
            Self::AttachmentRate => "Attachment Rate",
            Self::AttachmentLifetime => "Attachment Lifetime",
            Self::MigrationBias => "Migration Bias",
        }
    }

    /// Short tag used in output filenames.
    pub fn file_tag(&self) -> &'static str {
        match self {
            Self::AttachmentRate => "rate",
            Self::AttachmentLifetime => "lifetime",
            Self::MigrationBias => "bias",
        }
    }

    /// Canonicalize a raw value to its level index.
    ///
    /// Input files store the values as decimal text, so anything that
    /// survives a round-trip through f64 parsing should match; the
    /// tolerance only absorbs representation noise, it does not snap
    /// genuinely different values onto a level.
    pub fn level_of(&self, raw: f64) -> Option<usize> {
        self.levels()
            .iter()
            .position(|&level| nearly_equal(raw, level))
    }

    /// Tick label strings, one per level, in level order.
    pub fn level_labels(&self) -> [String; LEVELS_PER_PARAMETER] {
        let levels = self.levels();
        [
            format_value(levels[0]),
            format_value(levels[1]),
            format_value(levels[2]),
        ]
    }
}

fn nearly_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 + 1e-6 * b.abs()
}

/// Format a sweep value the way it appears in labels and filenames
/// (1.0 -> "1", 0.2 -> "0.2").
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}

// ============================================================================
// METRICS
// ============================================================================

/// Scalar end-state metrics recorded once per run.
///
/// The metrics table stores one row per entry here (after the run-index
/// row), one column per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    LiveCancerCells,
    LiveCancerCellsAboveThreshold,
    MeanOncoprotein,
}

impl Metric {
    /// Row position in the metrics table. Row 0 is the run index.
    pub fn row_index(&self) -> usize {
        match self {
            Self::LiveCancerCells => 1,
            Self::LiveCancerCellsAboveThreshold => 2,
            Self::MeanOncoprotein => 3,
        }
    }

    /// Label used in chart titles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LiveCancerCells => "# live cancer cells",
            Self::LiveCancerCellsAboveThreshold => "# live cancer cells above threshold",
            Self::MeanOncoprotein => "mean oncoprotein",
        }
    }

    /// Slug used in output filenames.
    pub fn file_slug(&self) -> &'static str {
        match self {
            Self::LiveCancerCells => "num_live_cancer_cells",
            Self::LiveCancerCellsAboveThreshold => "num_live_cancer_cells_above_threshold",
            Self::MeanOncoprotein => "mean_oncoprotein",
        }
    }
}

// ============================================================================
// GRID LAYOUT
// ============================================================================

/// Which parameter is held fixed and which two span the heatmap axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepLayout {
    pub fixed: SweepParameter,
    pub x_axis: SweepParameter,
    pub y_axis: SweepParameter,
}

impl SweepLayout {
    /// Attachment rate held fixed: migration bias left-to-right,
    /// attachment lifetime bottom-to-top.
    pub fn fixed_rate() -> Self {
        Self {
            fixed: SweepParameter::AttachmentRate,
            x_axis: SweepParameter::MigrationBias,
            y_axis: SweepParameter::AttachmentLifetime,
        }
    }

    /// Migration bias held fixed: attachment rate left-to-right,
    /// attachment lifetime bottom-to-top.
    pub fn fixed_bias() -> Self {
        Self {
            fixed: SweepParameter::MigrationBias,
            x_axis: SweepParameter::AttachmentRate,
            y_axis: SweepParameter::AttachmentLifetime,
        }
    }

    /// Build a custom layout. Each of the three sweep parameters must be
    /// used exactly once.
    pub fn new(
        fixed: SweepParameter,
        x_axis: SweepParameter,
        y_axis: SweepParameter,
    ) -> SweepResult<Self> {
        if fixed == x_axis || fixed == y_axis || x_axis == y_axis {
            return Err(SweepError::InvalidLayout);
        }
        Ok(Self {
            fixed,
            x_axis,
            y_axis,
        })
    }
}
