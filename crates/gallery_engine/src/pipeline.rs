use tokio_util::sync::CancellationToken;

use crate::{Artifact, PipelineError, TaskKind, TaskOutput, WorkerRequest};

/// Receives intermediate results while a request runs.
pub trait OutputSink: Send + Sync {
    fn output(&self, output: TaskOutput);
}

/// The inference engine behind a worker.
///
/// `load` runs once, before the first request, with whatever artifacts the
/// worker was configured to fetch. `run` may stream intermediate results
/// through `outputs`; its return value travels with the `complete` event.
/// Implementations should poll `cancel` between units of work and await at
/// least once per unit so the worker can service cancellation.
#[async_trait::async_trait]
pub trait Pipeline: Send {
    fn task(&self) -> TaskKind;

    fn name(&self) -> &'static str;

    async fn load(&mut self, artifacts: Vec<Artifact>) -> Result<(), PipelineError>;

    async fn run(
        &mut self,
        request: WorkerRequest,
        outputs: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskOutput>, PipelineError>;
}
