use crate::{RequestId, SpeakerId, SpeechClip};

/// Task parameters posted to the worker. Immutable once sent.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceRequest {
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
        speaker_id: SpeakerId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Post exactly one request to the demo's worker.
    PostRequest {
        request_id: RequestId,
        request: InferenceRequest,
    },
    /// Ask the worker to abort the in-flight request.
    CancelRequest { request_id: RequestId },
    /// Hand a finished clip to the audio output.
    PresentAudio {
        request_id: RequestId,
        clip: SpeechClip,
    },
}
