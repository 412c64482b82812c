use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context};
use gallery_core::{
    Classification, DemoId, Effect, InferenceRequest, Msg, RankedDocument, RequestId, SpeechClip,
    TaskOutput, WorkerUpdate,
};
use gallery_engine::{
    encode_wav, pipeline_for, ModelLoader, TaskKind, WorkerConfig, WorkerError, WorkerEvent,
    WorkerHandle, WorkerMessage, WorkerRequest,
};
use gallery_logging::{gallery_debug, gallery_info};

/// Executes controller effects against the demo's worker.
pub struct EffectRunner {
    worker: WorkerHandle,
    audio_path: PathBuf,
    written: Vec<PathBuf>,
}

impl EffectRunner {
    /// Acquires a worker for `demo`. It is released when the runner drops.
    pub fn new(demo: DemoId, config: &WorkerConfig, audio_path: PathBuf) -> anyhow::Result<Self> {
        let task = task_for(demo).ok_or_else(|| anyhow!("{demo} has no inference worker"))?;
        let loader = ModelLoader::from_config(config).context("configuring artifact download")?;
        let worker = WorkerHandle::spawn(pipeline_for(task), loader)
            .context("starting inference worker")?;
        gallery_info!("Worker acquired for {}", demo);
        Ok(Self::with_worker(worker, audio_path))
    }

    pub fn with_worker(worker: WorkerHandle, audio_path: PathBuf) -> Self {
        Self {
            worker,
            audio_path,
            written: Vec::new(),
        }
    }

    pub fn apply(&mut self, effects: Vec<Effect>) -> anyhow::Result<()> {
        for effect in effects {
            match effect {
                Effect::PostRequest {
                    request_id,
                    request,
                } => {
                    gallery_info!("PostRequest id={} task={}", request_id, task_name(&request));
                    self.worker
                        .post(request_id, to_worker_request(request))
                        .context("posting request to worker")?;
                }
                Effect::CancelRequest { request_id } => {
                    gallery_info!("CancelRequest id={}", request_id);
                    self.worker
                        .cancel(request_id)
                        .context("cancelling request")?;
                }
                Effect::PresentAudio { request_id, clip } => {
                    let path = self.audio_path.clone();
                    write_clip(&path, &clip)
                        .with_context(|| format!("writing audio for request {request_id}"))?;
                    self.written.push(path);
                }
            }
        }
        Ok(())
    }

    /// Next worker event as a controller message, if one arrives in time.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Msg>, WorkerError> {
        Ok(self.worker.recv_timeout(timeout)?.map(map_message))
    }

    /// Audio files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn release(self) {
        self.worker.shutdown();
    }
}

/// Worker task behind `demo`; `None` for demos that are only listed.
pub fn task_for(demo: DemoId) -> Option<TaskKind> {
    match demo {
        DemoId::CrossEncoder => Some(TaskKind::Rerank),
        DemoId::ZeroShot => Some(TaskKind::Classify),
        DemoId::SpeechT5 | DemoId::AcceleratedTts => Some(TaskKind::Synthesize),
        DemoId::Llama | DemoId::Phi | DemoId::Janus | DemoId::Florence => None,
    }
}

fn task_name(request: &InferenceRequest) -> &'static str {
    match request {
        InferenceRequest::Rerank { .. } => "rerank",
        InferenceRequest::Classify { .. } => "classify",
        InferenceRequest::Synthesize { .. } => "synthesize",
    }
}

fn write_clip(path: &Path, clip: &SpeechClip) -> anyhow::Result<()> {
    let wav = encode_wav(clip.sample_rate, &clip.samples);
    std::fs::write(path, &wav).with_context(|| format!("writing {}", path.display()))?;
    gallery_info!(
        "Wrote {:.2}s of audio to {}",
        clip.duration_secs(),
        path.display()
    );
    Ok(())
}

pub fn to_worker_request(request: InferenceRequest) -> WorkerRequest {
    match request {
        InferenceRequest::Rerank { query, documents } => WorkerRequest::Rerank { query, documents },
        InferenceRequest::Classify { texts, labels } => WorkerRequest::Classify { texts, labels },
        InferenceRequest::Synthesize { text, speaker_id } => WorkerRequest::Synthesize {
            text,
            speaker_id: speaker_id.as_str().to_string(),
        },
    }
}

pub fn map_message(message: WorkerMessage) -> Msg {
    let update = match message.event {
        WorkerEvent::Initiate { file } => WorkerUpdate::FileInitiated { file },
        WorkerEvent::Progress {
            file,
            progress,
            loaded,
            total,
        } => WorkerUpdate::FileProgress {
            file,
            progress,
            loaded,
            total,
        },
        WorkerEvent::Done { file } => WorkerUpdate::FileDone { file },
        WorkerEvent::Ready => WorkerUpdate::ModelReady,
        WorkerEvent::Output { output } => WorkerUpdate::Output(map_output(output)),
        WorkerEvent::Complete { output } => WorkerUpdate::Complete(output.map(map_output)),
        WorkerEvent::Error { message } => WorkerUpdate::Failed { message },
        WorkerEvent::Cancelled => WorkerUpdate::Cancelled,
    };
    gallery_debug!("Worker event for {}: {}", message.request_id, update_name(&update));
    Msg::Worker {
        request_id: message.request_id,
        update,
    }
}

/// Stand-in terminal event when the worker vanishes mid-request.
pub fn worker_lost(request_id: RequestId) -> Msg {
    Msg::Worker {
        request_id,
        update: WorkerUpdate::Failed {
            message: "worker stopped unexpectedly".to_string(),
        },
    }
}

fn map_output(output: gallery_engine::TaskOutput) -> TaskOutput {
    match output {
        gallery_engine::TaskOutput::Ranked { documents } => TaskOutput::Ranked(
            documents
                .into_iter()
                .map(|doc| RankedDocument {
                    corpus_id: doc.corpus_id,
                    score: doc.score,
                    text: doc.text,
                })
                .collect(),
        ),
        gallery_engine::TaskOutput::Classification {
            sequence,
            labels,
            scores,
        } => TaskOutput::Classified(Classification {
            sequence,
            labels,
            scores,
        }),
        gallery_engine::TaskOutput::Audio {
            sample_rate,
            samples,
        } => TaskOutput::Speech(SpeechClip {
            sample_rate,
            samples,
        }),
    }
}

fn update_name(update: &WorkerUpdate) -> &'static str {
    match update {
        WorkerUpdate::FileInitiated { .. } => "initiate",
        WorkerUpdate::FileProgress { .. } => "progress",
        WorkerUpdate::FileDone { .. } => "done",
        WorkerUpdate::ModelReady => "ready",
        WorkerUpdate::Output(_) => "output",
        WorkerUpdate::Complete(_) => "complete",
        WorkerUpdate::Failed { .. } => "error",
        WorkerUpdate::Cancelled => "cancelled",
    }
}
