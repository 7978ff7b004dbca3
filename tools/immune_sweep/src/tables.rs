// Loaders for the two sweep output tables
//
// `final_analysis.txt` is transposed: one row per metric, one column per
// run. `run_rate_lifetime_bias.txt` is one row per run with four columns
// (run id, attachment rate, attachment lifetime, migration bias).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{SweepError, SweepResult};
use crate::types::{Metric, SweepParameter};

/// Rows in the metrics table: run index + three metric series.
const METRICS_ROWS: usize = 4;

/// Columns per parameter record: run id + the three swept parameters.
const PARAMETER_COLUMNS: usize = 4;

fn parse_fields(line: &str, path: &Path, line_no: usize) -> SweepResult<Vec<f64>> {
    line.split(',')
        .map(|field| {
            let trimmed = field.trim();
            trimmed.parse::<f64>().map_err(|_| SweepError::BadNumber {
                path: path.to_path_buf(),
                line: line_no,
                value: trimmed.to_string(),
            })
        })
        .collect()
}

fn as_run_id(value: f64, path: &Path, line_no: usize) -> SweepResult<u32> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(SweepError::BadRunId {
            path: path.to_path_buf(),
            line: line_no,
            value,
        });
    }
    Ok(value as u32)
}

// ============================================================================
// METRICS TABLE
// ============================================================================

/// End-of-run metrics, one series per metric, columns aligned by run.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    run_ids: Vec<u32>,
    // The three metric rows, in table order (run-index row stripped).
    rows: Vec<Vec<f64>>,
}

impl MetricsTable {
    /// Read and parse a metrics table from disk.
    pub fn load(path: &Path) -> SweepResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SweepError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse the comma-delimited metric rows.
    ///
    /// Exactly one row per metric (plus the leading run-index row), all
    /// rows the same length, run indices integral. Blank lines are
    /// tolerated; anything else is a hard error.
    pub fn parse(content: &str, path: &Path) -> SweepResult<Self> {
        let mut rows: Vec<Vec<f64>> = Vec::new();
        let mut row_lines: Vec<usize> = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            rows.push(parse_fields(line, path, idx + 1)?);
            row_lines.push(idx + 1);
        }

        if rows.len() != METRICS_ROWS {
            return Err(SweepError::MetricsShape {
                path: path.to_path_buf(),
                expected: METRICS_ROWS,
                found: rows.len(),
            });
        }

        let run_count = rows[0].len();
        for (row, &line_no) in rows.iter().zip(&row_lines) {
            if row.len() != run_count {
                return Err(SweepError::RaggedRow {
                    path: path.to_path_buf(),
                    line: line_no,
                    expected: run_count,
                    found: row.len(),
                });
            }
        }

        let run_ids = rows[0]
            .iter()
            .map(|&value| as_run_id(value, path, row_lines[0]))
            .collect::<SweepResult<Vec<_>>>()?;

        let metric_rows = rows.split_off(1);
        Ok(Self {
            run_ids,
            rows: metric_rows,
        })
    }

    /// Number of runs (columns).
    pub fn run_count(&self) -> usize {
        self.run_ids.len()
    }

    /// Run ids in table order.
    pub fn run_ids(&self) -> &[u32] {
        &self.run_ids
    }

    /// The series for one metric, in table column order.
    pub fn series(&self, metric: Metric) -> &[f64] {
        &self.rows[metric.row_index() - 1]
    }

    /// The series for one metric, re-ordered to follow `run_ids`.
    ///
    /// This is the explicit join with the parameter table: callers pass the
    /// parameter table's run ids and get metric values in that row order,
    /// or an error if a requested run is absent here.
    pub fn series_for_runs(&self, metric: Metric, run_ids: &[u32]) -> SweepResult<Vec<f64>> {
        let by_run: HashMap<u32, f64> = self
            .run_ids
            .iter()
            .copied()
            .zip(self.series(metric).iter().copied())
            .collect();
        run_ids
            .iter()
            .map(|id| {
                by_run
                    .get(id)
                    .copied()
                    .ok_or_else(|| SweepError::RunIdMismatch {
                        detail: format!("run {id} is missing from the metrics table"),
                    })
            })
            .collect()
    }
}

// ============================================================================
// PARAMETER TABLE
// ============================================================================

/// Per-run parameter assignments, stored as level indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable {
    pub run_ids: Vec<u32>,
    pub rate_levels: Vec<usize>,
    pub lifetime_levels: Vec<usize>,
    pub bias_levels: Vec<usize>,
}

impl ParameterTable {
    /// Read and parse a parameter table from disk.
    pub fn load(path: &Path) -> SweepResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SweepError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse the comma-delimited parameter rows, canonicalizing each raw
    /// parameter value to its sweep level at this boundary.
    pub fn parse(content: &str, path: &Path) -> SweepResult<Self> {
        let mut table = Self {
            run_ids: Vec::new(),
            rate_levels: Vec::new(),
            lifetime_levels: Vec::new(),
            bias_levels: Vec::new(),
        };

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let fields = parse_fields(line, path, line_no)?;
            if fields.len() != PARAMETER_COLUMNS {
                return Err(SweepError::RaggedRow {
                    path: path.to_path_buf(),
                    line: line_no,
                    expected: PARAMETER_COLUMNS,
                    found: fields.len(),
                });
            }

            table.run_ids.push(as_run_id(fields[0], path, line_no)?);
            table.rate_levels.push(canonicalize(
                SweepParameter::AttachmentRate,
                fields[1],
                path,
                line_no,
            )?);
            table.lifetime_levels.push(canonicalize(
                SweepParameter::AttachmentLifetime,
                fields[2],
                path,
                line_no,
            )?);
            table.bias_levels.push(canonicalize(
                SweepParameter::MigrationBias,
                fields[3],
                path,
                line_no,
            )?);
        }

        Ok(table)
    }

    /// Number of runs (rows).
    pub fn len(&self) -> usize {
        self.run_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.run_ids.is_empty()
    }

    /// Level-index column for one parameter.
    pub fn levels_for(&self, parameter: SweepParameter) -> &[usize] {
        match parameter {
            SweepParameter::AttachmentRate => &self.rate_levels,
            SweepParameter::AttachmentLifetime => &self.lifetime_levels,
            SweepParameter::MigrationBias => &self.bias_levels,
        }
    }
}

fn canonicalize(
    parameter: SweepParameter,
    raw: f64,
    path: &Path,
    line_no: usize,
) -> SweepResult<usize> {
    parameter
        .level_of(raw)
        .ok_or_else(|| SweepError::UnknownParameterValue {
            path: path.to_path_buf(),
            line: line_no,
            parameter: parameter.axis_label(),
            value: raw,
            allowed: *parameter.levels(),
        })
}

// ============================================================================
// RUN-ID JOIN
// ============================================================================

/// Verify that the two tables reference exactly the same set of run ids.
///
/// The tables are produced by separate steps of the sweep tooling; a
/// partial re-run can leave them out of sync, which would silently
/// attribute metrics to the wrong parameter combination if the join were
/// positional.
pub fn check_run_alignment(metrics: &MetricsTable, params: &ParameterTable) -> SweepResult<()> {
    if let Some(id) = first_duplicate(metrics.run_ids()) {
        return Err(mismatch(format!(
            "duplicate run id {id} in the metrics table"
        )));
    }
    if let Some(id) = first_duplicate(&params.run_ids) {
        return Err(mismatch(format!(
            "duplicate run id {id} in the parameter table"
        )));
    }

    let metric_ids: HashSet<u32> = metrics.run_ids().iter().copied().collect();
    let param_ids: HashSet<u32> = params.run_ids.iter().copied().collect();

    let only_metrics = sorted_difference(&metric_ids, &param_ids);
    let only_params = sorted_difference(&param_ids, &metric_ids);
    if only_metrics.is_empty() && only_params.is_empty() {
        return Ok(());
    }

    let mut parts = vec![format!(
        "metrics table has {} runs, parameter table has {}",
        metrics.run_count(),
        params.len()
    )];
    if !only_metrics.is_empty() {
        parts.push(format!("only in metrics: {}", preview(&only_metrics)));
    }
    if !only_params.is_empty() {
        parts.push(format!("only in parameters: {}", preview(&only_params)));
    }
    Err(mismatch(parts.join("; ")))
}

fn mismatch(detail: String) -> SweepError {
    SweepError::RunIdMismatch { detail }
}

fn first_duplicate(ids: &[u32]) -> Option<u32> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
}

fn sorted_difference(a: &HashSet<u32>, b: &HashSet<u32>) -> Vec<u32> {
    let mut diff: Vec<u32> = a.difference(b).copied().collect();
    diff.sort_unstable();
    diff
}

fn preview(ids: &[u32]) -> String {
    const SHOWN: usize = 8;
    let head: Vec<String> = ids.iter().take(SHOWN).map(|id| id.to_string()).collect();
    if ids.len() > SHOWN {
        format!("[{}, ...]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRICS: &str = "0,1,2,3\n100,200,300,400\n10,20,30,40\n0.5,0.6,0.7,0.8\n";

    fn metrics() -> MetricsTable {
        MetricsTable::parse(METRICS, Path::new("final_analysis.txt")).unwrap()
    }

    #[test]
    fn parses_metrics_table() {
        let table = metrics();
        assert_eq!(table.run_count(), 4);
        assert_eq!(table.run_ids(), &[0, 1, 2, 3]);
        assert_eq!(
            table.series(Metric::LiveCancerCells),
            &[100.0, 200.0, 300.0, 400.0]
        );
        assert_eq!(
            table.series(Metric::LiveCancerCellsAboveThreshold),
            &[10.0, 20.0, 30.0, 40.0]
        );
        assert_eq!(
            table.series(Metric::MeanOncoprotein),
            &[0.5, 0.6, 0.7, 0.8]
        );
    }

    #[test]
    fn metrics_table_tolerates_blank_lines() {
        let padded = "0,1\n\n5,6\n7,8\n\n0.1,0.2\n";
        let table = MetricsTable::parse(padded, Path::new("m.txt")).unwrap();
        assert_eq!(table.run_count(), 2);
    }

    #[test]
    fn metrics_table_must_have_four_rows() {
        let err = MetricsTable::parse("0,1\n5,6\n", Path::new("m.txt")).unwrap_err();
        assert!(matches!(err, SweepError::MetricsShape { found: 2, .. }));
    }

    #[test]
    fn metrics_table_must_be_rectangular() {
        let bad = "0,1,2\n100,200\n10,20,30\n0.5,0.6,0.7\n";
        let err = MetricsTable::parse(bad, Path::new("m.txt")).unwrap_err();
        assert!(matches!(
            err,
            SweepError::RaggedRow {
                line: 2,
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        let bad = "0,1\nx,200\n10,20\n0.5,0.6\n";
        let err = MetricsTable::parse(bad, Path::new("m.txt")).unwrap_err();
        assert!(matches!(err, SweepError::BadNumber { ref value, .. } if value == "x"));
    }

    #[test]
    fn rejects_fractional_run_ids() {
        let bad = "0,1.5\n100,200\n10,20\n0.5,0.6\n";
        let err = MetricsTable::parse(bad, Path::new("m.txt")).unwrap_err();
        assert!(matches!(err, SweepError::BadRunId { .. }));
    }

    #[test]
    fn series_for_runs_follows_requested_order() {
        let table = metrics();
        let series = table
            .series_for_runs(Metric::LiveCancerCells, &[2, 0, 3])
            .unwrap();
        assert_eq!(series, vec![300.0, 100.0, 400.0]);
    }

    #[test]
    fn series_for_runs_rejects_unknown_ids() {
        let err = metrics()
            .series_for_runs(Metric::LiveCancerCells, &[7])
            .unwrap_err();
        assert!(matches!(err, SweepError::RunIdMismatch { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = MetricsTable::load(Path::new("/nonexistent/final_analysis.txt")).unwrap_err();
        assert!(matches!(err, SweepError::Io { .. }));
    }

    const PARAMS: &str = "0,0.033,15,0.25\n1,0.2,60,0.5\n2,1,120,0.75\n3,0.2,15,0.75\n";

    fn params() -> ParameterTable {
        ParameterTable::parse(PARAMS, Path::new("run_rate_lifetime_bias.txt")).unwrap()
    }

    #[test]
    fn parses_parameter_table_into_levels() {
        let table = params();
        assert_eq!(table.len(), 4);
        assert_eq!(table.run_ids, vec![0, 1, 2, 3]);
        assert_eq!(table.rate_levels, vec![0, 1, 2, 1]);
        assert_eq!(table.lifetime_levels, vec![0, 1, 2, 0]);
        assert_eq!(table.bias_levels, vec![0, 1, 2, 2]);
    }

    #[test]
    fn levels_for_selects_the_right_column() {
        let table = params();
        assert_eq!(
            table.levels_for(SweepParameter::AttachmentLifetime),
            &[0, 1, 2, 0]
        );
    }

    #[test]
    fn rejects_unknown_parameter_values() {
        let bad = "0,0.4,15,0.25\n";
        let err = ParameterTable::parse(bad, Path::new("p.txt")).unwrap_err();
        assert!(matches!(
            err,
            SweepError::UnknownParameterValue {
                parameter: "attachment rate",
                line: 1,
                ..
            }
        ));
    }

    #[test]
    fn parameter_rows_need_four_columns() {
        let err = ParameterTable::parse("0,0.033,15\n", Path::new("p.txt")).unwrap_err();
        assert!(matches!(
            err,
            SweepError::RaggedRow {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn alignment_accepts_matching_tables() {
        assert!(check_run_alignment(&metrics(), &params()).is_ok());
    }

    #[test]
    fn alignment_rejects_disjoint_run_ids() {
        let other =
            ParameterTable::parse("0,0.033,15,0.25\n9,0.2,60,0.5\n", Path::new("p.txt")).unwrap();
        let err = check_run_alignment(&metrics(), &other).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("only in metrics"));
        assert!(message.contains("only in parameters: [9]"));
    }

    #[test]
    fn alignment_rejects_duplicate_run_ids() {
        let dup =
            ParameterTable::parse("0,0.033,15,0.25\n0,0.2,60,0.5\n", Path::new("p.txt")).unwrap();
        let err = check_run_alignment(&metrics(), &dup).unwrap_err();
        assert!(err.to_string().contains("duplicate run id 0"));
    }
}
