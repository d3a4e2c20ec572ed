//! Fan-out/fan-in of one inference request per file.
//!
//! Every job runs as its own future and all of them are polled together on
//! the calling task. Each future catches its own failure, so the pass always
//! settles every job before `dispatch` returns.

use futures::future::join_all;
use std::sync::Arc;

use super::error::CoreError;
use super::inference::InferenceClient;
use super::{FileId, FileStatus, RawFile, Transition};

/// One file to submit during an analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: FileId,
    pub file: RawFile,
    /// The item already finished a previous pass and must be restarted.
    pub rerun: bool,
}

/// How a single job settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Completed { labels: usize },
    Failed(String),
    /// The item left the registry (or could not start) before its result
    /// could be applied.
    Discarded,
}

/// Per-item outcomes of one pass, in dispatch order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<(FileId, ItemOutcome)>,
}

impl DispatchReport {
    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Completed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    pub fn discarded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Discarded))
    }

    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

#[derive(Clone)]
pub struct AnalysisDispatcher {
    client: Arc<dyn InferenceClient>,
}

impl AnalysisDispatcher {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self { client }
    }

    /// Submits every job concurrently and waits until all of them settled.
    ///
    /// `apply` feeds each status change back into the registry. An
    /// `ItemNotFound` from it means the item was removed mid-flight; the
    /// job's result is then dropped.
    pub async fn dispatch<F>(
        &self,
        jobs: Vec<AnalysisJob>,
        token: Option<&str>,
        apply: F,
    ) -> DispatchReport
    where
        F: Fn(&FileId, Transition) -> Result<FileStatus, CoreError>,
    {
        tracing::info!("Dispatching {} analysis request(s)", jobs.len());
        let apply = &apply;
        let client = &self.client;

        let pending = jobs.into_iter().map(|job| async move {
            let begin = if job.rerun {
                Transition::Restart
            } else {
                Transition::Start
            };
            if let Err(e) = apply(&job.id, begin) {
                if !e.is_item_not_found() {
                    tracing::warn!("Not analyzing {}: {}", job.file.name(), e);
                }
                return (job.id, ItemOutcome::Discarded);
            }

            let (transition, outcome) = match client.predict(&job.file, token).await {
                Ok(result) => {
                    tracing::info!(
                        "{} analyzed: {} label(s)",
                        job.file.name(),
                        result.detected_labels.len()
                    );
                    let labels = result.detected_labels.len();
                    (Transition::Complete(result), ItemOutcome::Completed { labels })
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    let reason = e.to_string();
                    (Transition::Fail(reason.clone()), ItemOutcome::Failed(reason))
                }
            };

            match apply(&job.id, transition) {
                Ok(_) => (job.id, outcome),
                Err(e) => {
                    tracing::debug!("Discarding result for {}: {}", job.file.name(), e);
                    (job.id, ItemOutcome::Discarded)
                }
            }
        });

        let report = DispatchReport {
            outcomes: join_all(pending).await,
        };
        tracing::info!(
            "Analysis pass settled: {} completed, {} failed, {} discarded",
            report.completed(),
            report.failed(),
            report.discarded()
        );
        report
    }
}
