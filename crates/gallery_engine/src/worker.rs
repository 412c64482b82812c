use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures_util::future::try_join_all;
use gallery_logging::{gallery_debug, gallery_info, gallery_warn, RequestScope};
use tokio::sync::mpsc as async_mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::artifacts::ChannelProgressSink;
use crate::{
    ArtifactError, ArtifactFailure, ArtifactFetcher, ArtifactSettings, ArtifactSpec,
    OutputSink, Pipeline, PipelineError, ProgressSink, ProtocolError, ReqwestArtifactFetcher,
    RequestId, TaskOutput, WorkerCommand, WorkerError, WorkerEvent, WorkerMessage, WorkerRequest,
};

/// Where a worker gets its model artifacts from.
#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    pub artifact_base_url: Option<Url>,
    pub artifact_files: Vec<ArtifactSpec>,
    pub artifacts: ArtifactSettings,
}

/// Artifacts to fetch before the first request, and who fetches them.
#[derive(Clone, Default)]
pub struct ModelLoader {
    artifacts: Vec<ArtifactSpec>,
    fetcher: Option<Arc<dyn ArtifactFetcher>>,
}

impl ModelLoader {
    /// A loader with nothing to fetch: the first request goes straight to `ready`.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(artifacts: Vec<ArtifactSpec>, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            artifacts,
            fetcher: Some(fetcher),
        }
    }

    /// HTTP loader for `config`, or [`ModelLoader::none`] without a base URL.
    pub fn from_config(config: &WorkerConfig) -> Result<Self, ArtifactError> {
        match &config.artifact_base_url {
            Some(base_url) if !config.artifact_files.is_empty() => {
                let fetcher = ReqwestArtifactFetcher::new(base_url.clone(), config.artifacts.clone())?;
                Ok(Self::new(config.artifact_files.clone(), Arc::new(fetcher)))
            }
            _ => Ok(Self::none()),
        }
    }

    async fn load(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Vec<crate::Artifact>, ArtifactError> {
        let Some(fetcher) = self.fetcher.as_deref() else {
            return Ok(Vec::new());
        };
        // Downloads run concurrently; progress interleaves across files.
        try_join_all(
            self.artifacts
                .iter()
                .map(|spec| fetcher.fetch(spec, sink, cancel)),
        )
        .await
    }
}

/// Owned handle to one background worker.
///
/// The worker thread lives until [`WorkerHandle::shutdown`] or drop. Events
/// from it arrive in send order.
pub struct WorkerHandle {
    cmd_tx: async_mpsc::UnboundedSender<WorkerCommand>,
    event_rx: mpsc::Receiver<WorkerMessage>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(pipeline: Box<dyn Pipeline>, loader: ModelLoader) -> Result<Self, WorkerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = async_mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let name = format!("worker-{}", pipeline.name());

        let thread = thread::Builder::new().name(name).spawn(move || {
            let core = WorkerCore {
                pipeline,
                loader,
                loaded: false,
                event_tx,
            };
            runtime.block_on(run_loop(core, cmd_rx));
        })?;

        Ok(Self {
            cmd_tx,
            event_rx,
            thread: Some(thread),
        })
    }

    /// Posts one request. The worker replies with events tagged `id`.
    pub fn post(&self, id: RequestId, request: WorkerRequest) -> Result<(), WorkerError> {
        self.send(WorkerCommand::Run { id, request })
    }

    pub fn cancel(&self, id: RequestId) -> Result<(), WorkerError> {
        self.send(WorkerCommand::Cancel { id })
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Returns `Err(Disconnected)` once the worker is gone and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerMessage>, WorkerError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Stops the worker, cancelling any in-flight request, and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn send(&self, command: WorkerCommand) -> Result<(), WorkerError> {
        self.cmd_tx
            .send(command)
            .map_err(|_| WorkerError::Disconnected)
    }

    fn stop(&mut self) {
        let _ = self.cmd_tx.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                gallery_warn!("Worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

struct WorkerCore {
    pipeline: Box<dyn Pipeline>,
    loader: ModelLoader,
    loaded: bool,
    event_tx: mpsc::Sender<WorkerMessage>,
}

/// Streams pipeline outputs as `output` events.
///
/// The first invalid output is kept and stops the pipeline through `stop`.
struct EventOutputs {
    sink: ChannelProgressSink,
    stop: CancellationToken,
    rejected: Mutex<Option<ProtocolError>>,
}

impl EventOutputs {
    fn new(sink: ChannelProgressSink, stop: CancellationToken) -> Self {
        Self {
            sink,
            stop,
            rejected: Mutex::new(None),
        }
    }

    fn take_rejected(&self) -> Option<ProtocolError> {
        self.rejected.lock().ok().and_then(|mut rejected| rejected.take())
    }
}

impl OutputSink for EventOutputs {
    fn output(&self, output: TaskOutput) {
        if let Err(err) = output.validate() {
            gallery_warn!("Pipeline produced an invalid output: {}", err);
            if let Ok(mut rejected) = self.rejected.lock() {
                rejected.get_or_insert(err);
            }
            self.stop.cancel();
            return;
        }
        self.sink.emit(WorkerEvent::Output { output });
    }
}

impl WorkerCore {
    fn emit(&self, request_id: RequestId, event: WorkerEvent) {
        let _ = self.event_tx.send(WorkerMessage::new(request_id, event));
    }

    /// Serves one request to its terminal event.
    async fn serve(&mut self, id: RequestId, request: WorkerRequest, cancel: CancellationToken) {
        let _scope = RequestScope::enter(id);
        let terminal = match self.execute(id, request, &cancel).await {
            Ok(output) => WorkerEvent::Complete { output },
            Err(Failure::Cancelled) => WorkerEvent::Cancelled,
            Err(Failure::Message(message)) => {
                gallery_warn!("Request failed: {}", message);
                WorkerEvent::Error { message }
            }
        };
        gallery_debug!("Terminal event {}", terminal_name(&terminal));
        self.emit(id, terminal);
    }

    async fn execute(
        &mut self,
        id: RequestId,
        request: WorkerRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskOutput>, Failure> {
        request
            .validate()
            .map_err(|err| Failure::Message(err.to_string()))?;
        if request.task() != self.pipeline.task() {
            return Err(Failure::Message(format!(
                "{} cannot serve a {} request",
                self.pipeline.name(),
                request.task().as_str()
            )));
        }

        let sink = ChannelProgressSink::new(self.event_tx.clone(), id);
        if !self.loaded {
            gallery_info!("Loading {}", self.pipeline.name());
            let artifacts = self.loader.load(&sink, cancel).await.map_err(|err| {
                if err.kind == ArtifactFailure::Cancelled {
                    Failure::Cancelled
                } else {
                    Failure::Message(err.to_string())
                }
            })?;
            self.pipeline.load(artifacts).await?;
            self.loaded = true;
        }
        sink.emit(WorkerEvent::Ready);

        let outputs = EventOutputs::new(
            ChannelProgressSink::new(self.event_tx.clone(), id),
            cancel.child_token(),
        );
        let result = self.pipeline.run(request, &outputs, &outputs.stop).await;
        if let Some(err) = outputs.take_rejected() {
            return Err(Failure::invalid_output(err));
        }
        let output = result?;
        if let Some(output) = &output {
            output.validate().map_err(Failure::invalid_output)?;
        }
        Ok(output)
    }
}

enum Failure {
    Cancelled,
    Message(String),
}

impl Failure {
    fn invalid_output(err: ProtocolError) -> Self {
        Failure::Message(format!("invalid pipeline output: {err}"))
    }
}

impl From<PipelineError> for Failure {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Cancelled => Failure::Cancelled,
            other => Failure::Message(other.to_string()),
        }
    }
}

fn terminal_name(event: &WorkerEvent) -> &'static str {
    match event {
        WorkerEvent::Complete { .. } => "complete",
        WorkerEvent::Cancelled => "cancelled",
        _ => "error",
    }
}

async fn run_loop(mut core: WorkerCore, mut cmd_rx: async_mpsc::UnboundedReceiver<WorkerCommand>) {
    let events = core.event_tx.clone();
    while let Some(command) = cmd_rx.recv().await {
        match command {
            WorkerCommand::Run { id, request } => {
                let cancel = CancellationToken::new();
                let mut shutting_down = false;
                let mut commands_open = true;
                {
                    let serve = core.serve(id, request, cancel.clone());
                    tokio::pin!(serve);
                    loop {
                        tokio::select! {
                            () = &mut serve => break,
                            command = cmd_rx.recv(), if commands_open => match command {
                                Some(WorkerCommand::Cancel { id: target }) if target == id => {
                                    gallery_info!("Cancelling request {}", id);
                                    cancel.cancel();
                                }
                                Some(WorkerCommand::Cancel { id: target }) => {
                                    gallery_debug!("Cancel for {} ignored, {} is in flight", target, id);
                                }
                                Some(WorkerCommand::Run { id: rejected, .. }) => {
                                    gallery_warn!("Rejecting request {}: {} is in flight", rejected, id);
                                    let _ = events.send(WorkerMessage::new(
                                        rejected,
                                        WorkerEvent::Error {
                                            message: format!("worker busy with request {id}"),
                                        },
                                    ));
                                }
                                Some(WorkerCommand::Shutdown) | None => {
                                    commands_open = false;
                                    shutting_down = true;
                                    cancel.cancel();
                                }
                            },
                        }
                    }
                }
                if shutting_down {
                    break;
                }
            }
            WorkerCommand::Cancel { id } => {
                gallery_debug!("Cancel for {} ignored, nothing in flight", id);
            }
            WorkerCommand::Shutdown => break,
        }
    }
    gallery_info!("Worker for {} stopped", core.pipeline.name());
}
