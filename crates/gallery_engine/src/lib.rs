//! Gallery engine: inference worker, wire protocol and artifact loading.
mod artifacts;
mod error;
mod lexical;
mod pipeline;
mod protocol;
mod wav;
mod worker;

pub use artifacts::{
    Artifact, ArtifactFetcher, ArtifactSettings, ArtifactSpec, ChannelProgressSink, ProgressSink,
    ReqwestArtifactFetcher,
};
pub use error::{ArtifactError, ArtifactFailure, PipelineError, ProtocolError, WorkerError};
pub use lexical::{pipeline_for, KeywordClassifier, LexicalReranker, ToneSynthesizer};
pub use pipeline::{OutputSink, Pipeline};
pub use protocol::{
    decode_command, decode_message, encode_command, encode_message, RankedDocument, RequestId,
    TaskKind, TaskOutput, WorkerCommand, WorkerEvent, WorkerMessage, WorkerRequest,
};
pub use wav::encode_wav;
pub use worker::{ModelLoader, WorkerConfig, WorkerHandle};
