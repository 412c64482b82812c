use crate::{RequestId, SpeakerId, TaskOutput};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the reranking query.
    QueryChanged(String),
    /// User edited the reranking documents (one per line).
    DocumentsChanged(String),
    /// User edited the text to classify or synthesize.
    TextChanged(String),
    /// User picked a speaker for speech synthesis.
    SpeakerSelected(SpeakerId),
    /// User clicked the demo's trigger button.
    SubmitClicked,
    /// User asked to abort the in-flight request.
    CancelClicked,
    /// User acknowledged a failed request.
    ErrorDismissed,
    BucketAdded,
    BucketRemoved { index: usize },
    /// The "Remove category" button: drops the bucket before `Other`.
    LastCategoryRemoved,
    BucketRenamed { index: usize, title: String },
    BucketsCleared,
    /// Event received from the worker for `request_id`.
    Worker {
        request_id: RequestId,
        update: WorkerUpdate,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
}

/// Controller-side view of one worker event.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerUpdate {
    FileInitiated {
        file: String,
    },
    FileProgress {
        file: String,
        progress: f32,
        loaded: Option<u64>,
        total: Option<u64>,
    },
    FileDone {
        file: String,
    },
    ModelReady,
    Output(TaskOutput),
    Complete(Option<TaskOutput>),
    Failed {
        message: String,
    },
    Cancelled,
}

impl WorkerUpdate {
    /// Terminal updates end a request and re-enable input.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerUpdate::Complete(_) | WorkerUpdate::Failed { .. } | WorkerUpdate::Cancelled
        )
    }
}
