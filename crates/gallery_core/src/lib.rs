//! Gallery core: pure controller state machine and view-model helpers.
mod buckets;
mod catalog;
mod effect;
mod msg;
mod progress;
mod speakers;
mod state;
mod update;
mod view_model;

pub use buckets::{
    choose_label, Bucket, BucketBoard, BucketError, CLASSIFY_THRESHOLD, DEFAULT_BUCKETS,
    NEW_BUCKET_TITLE, OTHER_BUCKET,
};
pub use catalog::{resolve_route, Capabilities, Catalog, Category, DemoEntry, DemoId, Route};
pub use effect::{Effect, InferenceRequest};
pub use msg::{Msg, WorkerUpdate};
pub use progress::{ProgressItem, ProgressTracker};
pub use speakers::{SpeakerId, SPEAKERS};
pub use state::{
    AppState, Classification, Page, RankedDocument, RequestId, SpeechClip, Status, TaskOutput,
    PLACEHOLDER_REVIEWS,
};
pub use update::update;
pub use view_model::{AppViewModel, BucketView, PageView, ProgressRowView};
