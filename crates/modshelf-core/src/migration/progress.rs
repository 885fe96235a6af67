//! Progress records streamed to the caller while a run executes.

use serde::Serialize;
use tokio::sync::mpsc;

use super::types::RunState;

/// One progress update. Emitted many times, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub stage: RunState,
    pub current_task: String,
    pub processed: usize,
    pub total: usize,
    /// Overall progress from 0.0 to 100.0
    pub percent: f32,
}

/// Sends progress records, in emission order, to an optional sink.
///
/// A dropped receiver is ignored; progress never fails a run.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressRecord>>,
    last_percent: f32,
}

impl ProgressReporter {
    pub fn new(tx: Option<mpsc::UnboundedSender<ProgressRecord>>) -> Self {
        Self {
            tx,
            last_percent: 0.0,
        }
    }

    /// A reporter that discards everything.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn last_percent(&self) -> f32 {
        self.last_percent
    }

    /// Report `processed` of `total` items within `stage`.
    pub fn report(
        &mut self,
        stage: RunState,
        current_task: impl Into<String>,
        processed: usize,
        total: usize,
    ) {
        let percent = match stage {
            RunState::Pending => 0.0,
            RunState::Running(step) => {
                let (start, end) = step.percent_band();
                let fraction = if total == 0 {
                    0.0
                } else {
                    (processed.min(total) as f32) / (total as f32)
                };
                start + (end - start) * fraction
            }
            RunState::Finalizing => 95.0,
            RunState::Complete => 100.0,
            RunState::Error => self.last_percent,
        };
        self.last_percent = percent;

        if let Some(ref tx) = self.tx {
            let _ = tx.send(ProgressRecord {
                stage,
                current_task: current_task.into(),
                processed,
                total,
                percent,
            });
        }
    }

    /// Report a stage transition with no item counts.
    pub fn stage(&mut self, stage: RunState, current_task: impl Into<String>) {
        self.report(stage, current_task, 0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::types::StepKind;

    #[test]
    fn test_fraction_maps_into_step_band() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reporter = ProgressReporter::new(Some(tx));

        reporter.report(RunState::Running(StepKind::Archives), "a1", 1, 2);
        let record = rx.try_recv().unwrap();
        assert_eq!(record.percent, 55.0);
        assert_eq!(record.current_task, "a1");

        reporter.stage(RunState::Complete, "done");
        assert_eq!(rx.try_recv().unwrap().percent, 100.0);
    }

    #[test]
    fn test_error_keeps_last_percent() {
        let mut reporter = ProgressReporter::silent();
        reporter.report(RunState::Running(StepKind::Previews), "p", 0, 4);
        reporter.stage(RunState::Error, "failed");
        assert_eq!(reporter.last_percent(), 80.0);
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut reporter = ProgressReporter::new(Some(tx));
        reporter.stage(RunState::Pending, "start");
    }
}
