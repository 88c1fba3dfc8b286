//! Bounded fan-out of one query over many targets.
//!
//! Every target runs in its own task. A semaphore of `workers` permits gates how many
//! of them may be connected at once, and a `JoinSet` hands outcomes back in completion
//! order. Per-target errors are turned into [`Outcome::Failure`] values here and never
//! escape as `Err`, so one bad host cannot stop the others.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::backend::{Connection, Connector, QueryResult};
use crate::error::CollectorError;

/// What happened on one target.
#[derive(Debug)]
pub enum Outcome {
    Success { target: String, result: QueryResult },
    Failure { target: String, error: CollectorError },
}

impl Outcome {
    pub fn target(&self) -> &str {
        match self {
            Outcome::Success { target, .. } | Outcome::Failure { target, .. } => target,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// Run `sql` on every target with at most `workers` executions in flight.
///
/// Waits for all targets before returning. The result holds exactly one outcome per
/// input target, in the order the executions finished.
pub async fn dispatch<C: Connector>(
    connector: Arc<C>,
    targets: &[String],
    sql: &str,
    workers: usize,
) -> Vec<Outcome> {
    // More permits than targets would never be used.
    let workers = workers.clamp(1, targets.len().max(1));
    let gate = Arc::new(Semaphore::new(workers));
    let sql: Arc<str> = Arc::from(sql);

    let mut tasks = JoinSet::new();
    let mut task_targets = HashMap::with_capacity(targets.len());

    for target in targets {
        let connector = Arc::clone(&connector);
        let gate = Arc::clone(&gate);
        let sql = Arc::clone(&sql);
        let host = target.clone();

        let handle = tasks.spawn(async move {
            let _permit = match gate.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    return Outcome::Failure {
                        error: CollectorError::Worker {
                            target: host.clone(),
                            message: format!("worker slot unavailable: {e}"),
                        },
                        target: host,
                    };
                }
            };
            execute_target(connector.as_ref(), &host, &sql).await
        });
        task_targets.insert(handle.id(), target.clone());
    }

    debug!(targets = targets.len(), workers, "all target tasks submitted");

    let mut outcomes = Vec::with_capacity(targets.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((_, outcome)) => outcomes.push(outcome),
            Err(e) => {
                let target = task_targets.remove(&e.id()).unwrap_or_default();
                warn!(host = %target, error = %e, "target task aborted");
                outcomes.push(Outcome::Failure {
                    error: CollectorError::Worker {
                        target: target.clone(),
                        message: e.to_string(),
                    },
                    target,
                });
            }
        }
    }

    outcomes
}

/// Connect, query and close one target. The connection, once opened, is always closed.
pub async fn execute_target<C: Connector>(connector: &C, target: &str, sql: &str) -> Outcome {
    info!(host = %target, "worker starting");

    let mut conn = match connector.connect(target).await {
        Ok(conn) => conn,
        Err(error) => {
            warn!(host = %target, error = %error, "connect failed");
            return Outcome::Failure {
                target: target.to_string(),
                error,
            };
        }
    };

    debug!(host = %target, query = %sql, "executing query");
    let executed = conn.execute(sql).await;
    conn.close().await;

    match executed {
        Ok(result) => {
            info!(host = %target, rows = result.rows.len(), "query succeeded");
            Outcome::Success {
                target: target.to_string(),
                result,
            }
        }
        Err(error) => {
            warn!(host = %target, error = %error, "query failed");
            Outcome::Failure {
                target: target.to_string(),
                error,
            }
        }
    }
}
