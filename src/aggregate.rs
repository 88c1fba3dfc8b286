use tracing::{info, warn};

use crate::dispatch::Outcome;

/// Merged rows from every successful target.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub error_count: usize,
    pub success_count: usize,
    /// True once a success contributed a non-empty column list.
    pub has_results: bool,
}

/// Reduce outcomes, in the order given, into one result set.
///
/// The first success with a non-empty column list fixes the header; later column lists
/// are ignored. Rows keep their per-target order and are never interleaved. Rows whose
/// width differs from the header are kept as-is and reported.
pub fn aggregate(outcomes: Vec<Outcome>) -> AggregateResult {
    let mut merged = AggregateResult::default();

    for outcome in outcomes {
        match outcome {
            Outcome::Success { target, result } => {
                merged.success_count += 1;
                if !merged.has_results && !result.columns.is_empty() {
                    merged.columns = result.columns;
                    merged.has_results = true;
                }
                if merged.has_results
                    && let Some(width) = ragged_width(&result.rows, merged.columns.len())
                {
                    warn!(
                        host = %target,
                        expected = merged.columns.len(),
                        found = width,
                        "row width differs from header, keeping rows as-is"
                    );
                }
                merged.rows.extend(result.rows);
            }
            Outcome::Failure { target, error } => {
                warn!(host = %target, error = %error, "error during processing");
                merged.error_count += 1;
            }
        }
    }

    if merged.error_count > 0 {
        warn!(
            errors = merged.error_count,
            "encountered errors during parallel execution"
        );
    }
    info!(
        rows = merged.rows.len(),
        succeeded = merged.success_count,
        failed = merged.error_count,
        "aggregation complete"
    );

    merged
}

fn ragged_width(rows: &[Vec<String>], expected: usize) -> Option<usize> {
    rows.iter().map(Vec::len).find(|&len| len != expected)
}
