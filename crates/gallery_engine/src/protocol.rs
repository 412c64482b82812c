//! Wire schema between a controller and its worker.
//!
//! Commands and events are closed tagged unions. Everything crossing the
//! channel as JSON goes through [`decode_command`] / [`decode_message`], which
//! reject shapes the other side could not act on.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Rerank,
    Classify,
    Synthesize,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Rerank => "rerank",
            TaskKind::Classify => "classify",
            TaskKind::Synthesize => "synthesize",
        }
    }
}

/// Parameters of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum WorkerRequest {
    Rerank {
        query: String,
        documents: Vec<String>,
    },
    Classify {
        texts: Vec<String>,
        labels: Vec<String>,
    },
    Synthesize {
        text: String,
        speaker_id: String,
    },
}

impl WorkerRequest {
    pub fn task(&self) -> TaskKind {
        match self {
            WorkerRequest::Rerank { .. } => TaskKind::Rerank,
            WorkerRequest::Classify { .. } => TaskKind::Classify,
            WorkerRequest::Synthesize { .. } => TaskKind::Synthesize,
        }
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            WorkerRequest::Rerank { query, documents } => {
                non_empty(query, "query")?;
                if documents.iter().all(|doc| doc.trim().is_empty()) {
                    return Err(ProtocolError::EmptyField("documents"));
                }
            }
            WorkerRequest::Classify { texts, .. } => {
                if texts.iter().all(|text| text.trim().is_empty()) {
                    return Err(ProtocolError::EmptyField("texts"));
                }
            }
            WorkerRequest::Synthesize { text, speaker_id } => {
                non_empty(text, "text")?;
                non_empty(speaker_id, "speaker_id")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerCommand {
    Run {
        id: RequestId,
        request: WorkerRequest,
    },
    Cancel {
        id: RequestId,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub corpus_id: usize,
    pub score: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutput {
    Ranked {
        documents: Vec<RankedDocument>,
    },
    Classification {
        sequence: String,
        labels: Vec<String>,
        scores: Vec<f32>,
    },
    Audio {
        sample_rate: u32,
        samples: Vec<f32>,
    },
}

impl TaskOutput {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            TaskOutput::Ranked { documents } => {
                if documents.iter().any(|doc| !doc.score.is_finite()) {
                    return Err(ProtocolError::NonFiniteScore("ranked"));
                }
            }
            TaskOutput::Classification { labels, scores, .. } => {
                if labels.len() != scores.len() {
                    return Err(ProtocolError::ScoreLabelMismatch {
                        labels: labels.len(),
                        scores: scores.len(),
                    });
                }
                if scores.iter().any(|score| !score.is_finite()) {
                    return Err(ProtocolError::NonFiniteScore("classification"));
                }
            }
            TaskOutput::Audio { sample_rate, .. } => {
                if *sample_rate == 0 {
                    return Err(ProtocolError::InvalidSampleRate);
                }
            }
        }
        Ok(())
    }
}

/// One status message from the worker, tagged on `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerEvent {
    Initiate {
        file: String,
    },
    Progress {
        file: String,
        progress: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        loaded: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
    },
    Done {
        file: String,
    },
    Ready,
    Output {
        output: TaskOutput,
    },
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<TaskOutput>,
    },
    Error {
        message: String,
    },
    Cancelled,
}

impl WorkerEvent {
    /// `complete`, `error` and `cancelled` end a request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerEvent::Complete { .. } | WorkerEvent::Error { .. } | WorkerEvent::Cancelled
        )
    }

    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            WorkerEvent::Initiate { file } | WorkerEvent::Done { file } => non_empty(file, "file"),
            WorkerEvent::Progress { file, progress, .. } => {
                non_empty(file, "file")?;
                if !progress.is_finite() || !(0.0..=100.0).contains(progress) {
                    return Err(ProtocolError::ProgressOutOfRange {
                        file: file.clone(),
                        progress: *progress,
                    });
                }
                Ok(())
            }
            WorkerEvent::Output { output } => output.validate(),
            WorkerEvent::Complete { output } => output.as_ref().map_or(Ok(()), TaskOutput::validate),
            WorkerEvent::Ready | WorkerEvent::Error { .. } | WorkerEvent::Cancelled => Ok(()),
        }
    }
}

/// An event addressed to the request it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMessage {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub event: WorkerEvent,
}

impl WorkerMessage {
    pub fn new(request_id: RequestId, event: WorkerEvent) -> Self {
        Self { request_id, event }
    }
}

pub fn decode_message(json: &str) -> Result<WorkerMessage, ProtocolError> {
    let message: WorkerMessage = serde_json::from_str(json)?;
    message.event.validate()?;
    Ok(message)
}

pub fn encode_message(message: &WorkerMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_command(json: &str) -> Result<WorkerCommand, ProtocolError> {
    let command: WorkerCommand = serde_json::from_str(json)?;
    if let WorkerCommand::Run { request, .. } = &command {
        request.validate()?;
    }
    Ok(command)
}

pub fn encode_command(command: &WorkerCommand) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(command)?)
}

fn non_empty(value: &str, field: &'static str) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        Err(ProtocolError::EmptyField(field))
    } else {
        Ok(())
    }
}
