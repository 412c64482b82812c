use crate::{DemoId, RankedDocument, RequestId, SpeakerId, Status};

#[derive(Debug, Clone, PartialEq)]
pub struct AppViewModel {
    pub demo: DemoId,
    pub status: Status,
    pub busy: bool,
    pub trigger_enabled: bool,
    pub trigger_label: &'static str,
    pub cancel_enabled: bool,
    pub show_loading_overlay: bool,
    pub model_resident: bool,
    pub in_flight: Option<RequestId>,
    pub progress: Vec<ProgressRowView>,
    pub error: Option<String>,
    pub page: PageView,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRowView {
    pub file: String,
    pub percent: f32,
    pub loaded: Option<u64>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageView {
    Rerank {
        query: String,
        document_count: usize,
        results: Vec<RankedDocument>,
    },
    ZeroShot {
        input_lines: usize,
        buckets: Vec<BucketView>,
        can_remove_category: bool,
    },
    Speech {
        text: String,
        speaker: SpeakerId,
        clip_duration_secs: Option<f32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketView {
    pub title: String,
    pub items: Vec<String>,
    /// False for the fixed `Other` bucket.
    pub editable: bool,
}
