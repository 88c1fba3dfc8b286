use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::aggregate::{AggregateResult, aggregate};
use crate::backend::Connector;
use crate::config::Job;
use crate::dispatch::dispatch;
use crate::error::CollectorError;
use crate::logging::Timer;

/// Persists the merged result set.
pub trait ResultWriter {
    /// Write `columns` and `rows`, returning the file path, or `None` when nothing was written.
    fn write(
        &self,
        columns: &[String],
        rows: &[Vec<String>],
    ) -> Result<Option<PathBuf>, CollectorError>;
}

/// How the run should end, judged from the aggregate alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Every target failed; nothing is written.
    AllFailed,
    /// At least one target succeeded and established a header.
    PartialOrFullSuccess,
    /// No header was established; the writer is still invoked with whatever exists.
    NoColumns,
}

pub fn classify(result: &AggregateResult, target_count: usize) -> RunState {
    if target_count > 0 && result.error_count == target_count {
        RunState::AllFailed
    } else if result.has_results {
        RunState::PartialOrFullSuccess
    } else {
        RunState::NoColumns
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub path: Option<PathBuf>,
    pub rows: usize,
    pub targets: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Dispatch the job, aggregate the outcomes and hand the merged result to `writer`.
///
/// Fails with [`CollectorError::AllTargetsFailed`] without touching the writer when no
/// target succeeded.
pub async fn run<C, W>(job: &Job, connector: Arc<C>, writer: &W) -> Result<RunReport, CollectorError>
where
    C: Connector,
    W: ResultWriter,
{
    let timer = Timer::start();
    let target_count = job.targets.len();
    info!(targets = ?job.targets, workers = job.workers, "starting data collection");

    let outcomes = dispatch(connector, &job.targets, &job.query, job.workers).await;
    let merged = aggregate(outcomes);

    match classify(&merged, target_count) {
        RunState::AllFailed => {
            error!(failed = merged.error_count, "all target queries failed, no data to write");
            return Err(CollectorError::AllTargetsFailed {
                count: merged.error_count,
            });
        }
        RunState::NoColumns => {
            warn!("no data rows retrieved from any successful target");
        }
        RunState::PartialOrFullSuccess => {
            info!(
                rows = merged.rows.len(),
                succeeded = merged.success_count,
                targets = target_count,
                "writing aggregated rows"
            );
        }
    }

    let path = writer.write(&merged.columns, &merged.rows)?;
    if path.is_none() {
        info!("no data rows to write");
    }

    Ok(RunReport {
        path,
        rows: merged.rows.len(),
        targets: target_count,
        failed: merged.error_count,
        elapsed: timer.elapsed(),
    })
}
