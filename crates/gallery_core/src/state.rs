use crate::view_model::{AppViewModel, BucketView, PageView, ProgressRowView};
use crate::{BucketBoard, DemoId, InferenceRequest, ProgressTracker, SpeakerId};

/// Identifies one request posted to a worker. Monotonic per controller.
pub type RequestId = u64;

/// Controller lifecycle, derived only from user actions and worker events.
///
/// `Idle -> Processing` on submit, `Loading` while artifacts download,
/// `Ready` once the model is resident, `Processing` while outputs stream,
/// back to `Idle` on completion or cancellation. `Error` ends the request like
/// the other terminals; it is left by dismissing it or by submitting again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Ready,
    Processing,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedDocument {
    pub corpus_id: usize,
    pub score: f32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub sequence: String,
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeechClip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl SpeechClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Result payload carried by `output` and `complete` events.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Ranked(Vec<RankedDocument>),
    Classified(Classification),
    Speech(SpeechClip),
}

const PLACEHOLDER_QUERY: &str = "Who wrote 'To Kill a Mockingbird'?";

const PLACEHOLDER_DOCUMENTS: &[&str] = &[
    "'To Kill a Mockingbird' is a novel by Harper Lee published in 1960. It was immediately successful, winning the Pulitzer Prize, and has become a classic of modern American literature.",
    "The novel 'Moby-Dick' was written by Herman Melville and first published in 1851. It is considered a masterpiece of American literature and deals with complex themes of obsession, revenge, and the conflict between good and evil.",
    "Harper Lee, an American novelist widely known for her novel 'To Kill a Mockingbird', was born in 1926 in Monroeville, Alabama. She received the Pulitzer Prize for Fiction in 1961.",
    "Jane Austen was an English novelist known primarily for her six major novels, which interpret, critique and comment upon the British landed gentry at the end of the 18th century.",
    "The 'Harry Potter' series, which consists of seven fantasy novels written by British author J.K. Rowling, is among the most popular and critically acclaimed books of the modern era.",
    "'The Great Gatsby', a novel written by American author F. Scott Fitzgerald, was published in 1925. The story is set in the Jazz Age and follows the life of millionaire Jay Gatsby and his pursuit of Daisy Buchanan.",
];

pub const PLACEHOLDER_REVIEWS: &[&str] = &[
    // battery and charging
    "Disappointed with the battery life! The phone barely lasts half a day with regular use. Considering how much I paid for it, I expected better performance in this department.",
    "I bought this phone a week ago, and I'm already frustrated with the battery life. It barely lasts half a day with normal usage. I expected more from a supposedly high-end device",
    "The charging port is so finicky. Sometimes it takes forever to charge, and other times it doesn't even recognize the charger. Frustrating experience!",
    // overheating
    "This phone heats up way too quickly, especially when using demanding apps. It's uncomfortable to hold, and I'm concerned it might damage the internal components over time. Not what I expected",
    "This phone is like holding a hot potato. Video calls turn it into a scalding nightmare. Seriously, can't it keep its cool?",
    "Forget about a heatwave outside; my phone's got its own. It's like a little portable heater. Not what I signed up for.",
    // build quality
    "I dropped the phone from a short distance, and the screen cracked easily. Not as durable as I expected from a flagship device.",
    "Took a slight bump in my bag, and the frame got dinged. Are we back in the flip phone era?",
    "So, my phone's been in my pocket with just keys – no ninja moves or anything. Still, it managed to get some scratches. Disappointed with the build quality.",
    // software
    "The software updates are a nightmare. Each update seems to introduce new bugs, and it takes forever for them to be fixed.",
    "Constant crashes and freezes make me want to throw it into a black hole.",
    "Every time I open Instagram, my phone freezes and crashes. It's so frustrating!",
    // other
    "I'm not sure what to make of this phone. It's not bad, but it's not great either. I'm on the fence about it.",
    "I hate the color of this phone. It's so ugly!",
    "This phone sucks! I'm returning it.",
];

const PLACEHOLDER_SPEECH: &str = "I love Hugging Face!";

/// Per-demo inputs and results.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Rerank {
        query: String,
        documents: String,
        results: Vec<RankedDocument>,
    },
    ZeroShot {
        text: String,
        board: BucketBoard,
    },
    Speech {
        text: String,
        speaker: SpeakerId,
        clip: Option<SpeechClip>,
    },
}

impl Page {
    fn for_demo(demo: DemoId) -> Option<Self> {
        let page = match demo {
            DemoId::CrossEncoder => Page::rerank_placeholder(),
            DemoId::ZeroShot => Page::ZeroShot {
                text: PLACEHOLDER_REVIEWS.join("\n"),
                board: BucketBoard::default(),
            },
            DemoId::SpeechT5 | DemoId::AcceleratedTts => Page::Speech {
                text: PLACEHOLDER_SPEECH.to_string(),
                speaker: SpeakerId::default(),
                clip: None,
            },
            DemoId::Llama | DemoId::Phi | DemoId::Janus | DemoId::Florence => return None,
        };
        Some(page)
    }

    fn rerank_placeholder() -> Self {
        Page::Rerank {
            query: PLACEHOLDER_QUERY.to_string(),
            documents: PLACEHOLDER_DOCUMENTS.join("\n"),
            results: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    demo: DemoId,
    status: Status,
    next_request_id: RequestId,
    in_flight: Option<RequestId>,
    cancel_requested: bool,
    model_resident: bool,
    progress: ProgressTracker,
    error: Option<String>,
    page: Page,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_page(DemoId::CrossEncoder, Page::rerank_placeholder())
    }
}

impl AppState {
    /// Fresh controller for `demo`, prefilled with the demo's placeholder inputs.
    ///
    /// `None` for demos the gallery only lists.
    pub fn new(demo: DemoId) -> Option<Self> {
        Page::for_demo(demo).map(|page| Self::with_page(demo, page))
    }

    fn with_page(demo: DemoId, page: Page) -> Self {
        Self {
            demo,
            status: Status::Idle,
            next_request_id: 1,
            in_flight: None,
            cancel_requested: false,
            model_resident: false,
            progress: ProgressTracker::new(),
            error: None,
            page,
            dirty: false,
        }
    }

    pub fn demo(&self) -> DemoId {
        self.demo
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// True while a request is in flight; the trigger stays disabled.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.status,
            Status::Loading | Status::Ready | Status::Processing
        )
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn board(&self) -> Option<&BucketBoard> {
        match &self.page {
            Page::ZeroShot { board, .. } => Some(board),
            _ => None,
        }
    }

    pub fn view(&self) -> AppViewModel {
        let busy = self.is_busy();
        AppViewModel {
            demo: self.demo,
            status: self.status,
            busy,
            trigger_enabled: !busy,
            trigger_label: trigger_label(self.demo, self.status, self.cancel_requested),
            cancel_enabled: self.in_flight.is_some() && !self.cancel_requested,
            show_loading_overlay: self.status == Status::Loading,
            model_resident: self.model_resident,
            in_flight: self.in_flight,
            progress: self
                .progress
                .items()
                .map(|item| ProgressRowView {
                    file: item.file.clone(),
                    percent: item.progress,
                    loaded: item.loaded,
                    total: item.total,
                })
                .collect(),
            error: self.error.clone(),
            page: self.page_view(),
            dirty: self.dirty,
        }
    }

    fn page_view(&self) -> PageView {
        match &self.page {
            Page::Rerank {
                query,
                documents,
                results,
            } => PageView::Rerank {
                query: query.clone(),
                document_count: split_lines(documents).len(),
                results: results.clone(),
            },
            Page::ZeroShot { text, board } => {
                let last = board.buckets().len() - 1;
                PageView::ZeroShot {
                    input_lines: split_lines(text).len(),
                    buckets: board
                        .buckets()
                        .iter()
                        .enumerate()
                        .map(|(index, bucket)| BucketView {
                            title: bucket.title.clone(),
                            items: bucket.items.clone(),
                            editable: index != last,
                        })
                        .collect(),
                    can_remove_category: last > 0,
                }
            }
            Page::Speech {
                text,
                speaker,
                clip,
            } => PageView::Speech {
                text: text.clone(),
                speaker: speaker.clone(),
                clip_duration_secs: clip.as_ref().map(SpeechClip::duration_secs),
            },
        }
    }

    /// Returns whether state changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Builds the request for the current inputs, or `None` if they are unusable.
    pub(crate) fn build_request(&self) -> Option<InferenceRequest> {
        match &self.page {
            Page::Rerank {
                query, documents, ..
            } => {
                let query = query.trim();
                let documents = split_lines(documents);
                if query.is_empty() || documents.is_empty() {
                    return None;
                }
                Some(InferenceRequest::Rerank {
                    query: query.to_string(),
                    documents,
                })
            }
            Page::ZeroShot { text, board } => {
                let texts = split_lines(text);
                if texts.is_empty() {
                    return None;
                }
                Some(InferenceRequest::Classify {
                    texts,
                    labels: board.labels(),
                })
            }
            Page::Speech { text, speaker, .. } => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(InferenceRequest::Synthesize {
                    text: text.to_string(),
                    speaker_id: speaker.clone(),
                })
            }
        }
    }

    pub(crate) fn begin_request(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight = Some(id);
        self.cancel_requested = false;
        self.error = None;
        self.status = Status::Processing;
        self.dirty = true;
        id
    }

    pub(crate) fn request_cancel(&mut self) -> Option<RequestId> {
        let id = self.in_flight?;
        if self.cancel_requested {
            return None;
        }
        self.cancel_requested = true;
        self.dirty = true;
        Some(id)
    }

    pub(crate) fn dismiss_error(&mut self) -> bool {
        if self.status != Status::Error {
            return false;
        }
        self.status = Status::Idle;
        self.error = None;
        self.dirty = true;
        true
    }

    pub(crate) fn file_initiated(&mut self, file: &str) {
        self.progress.initiate(file);
        self.enter_loading();
        self.dirty = true;
    }

    pub(crate) fn file_progress(
        &mut self,
        file: &str,
        progress: f32,
        loaded: Option<u64>,
        total: Option<u64>,
    ) {
        let changed = self.progress.update(file, progress, loaded, total);
        let before = self.status;
        self.enter_loading();
        if changed || before != self.status {
            self.dirty = true;
        }
    }

    pub(crate) fn file_done(&mut self, file: &str) {
        if self.progress.done(file) {
            self.dirty = true;
        }
    }

    pub(crate) fn model_ready(&mut self) {
        self.progress.clear();
        self.model_resident = true;
        self.status = Status::Ready;
        self.dirty = true;
    }

    /// Applies an intermediate or final payload. Returns a clip to present, if any.
    pub(crate) fn apply_output(&mut self, output: TaskOutput) -> Option<SpeechClip> {
        self.dirty = true;
        match (&mut self.page, output) {
            (Page::Rerank { results, .. }, TaskOutput::Ranked(ranked)) => {
                *results = ranked;
                None
            }
            (Page::ZeroShot { board, .. }, TaskOutput::Classified(classification)) => {
                board.assign(&classification);
                None
            }
            (Page::Speech { clip, .. }, TaskOutput::Speech(speech)) => {
                *clip = Some(speech.clone());
                Some(speech)
            }
            (_, other) => {
                gallery_logging::gallery_warn!(
                    "Ignoring output of the wrong shape for {}: {}",
                    self.demo,
                    output_kind(&other)
                );
                None
            }
        }
    }

    pub(crate) fn output_streaming(&mut self) {
        if self.status != Status::Processing {
            self.status = Status::Processing;
            self.dirty = true;
        }
    }

    pub(crate) fn finish(&mut self, status: Status, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.in_flight = None;
        self.cancel_requested = false;
        self.progress.clear();
        self.dirty = true;
    }

    fn enter_loading(&mut self) {
        if matches!(self.status, Status::Processing | Status::Loading) {
            self.status = Status::Loading;
        }
    }
}

fn output_kind(output: &TaskOutput) -> &'static str {
    match output {
        TaskOutput::Ranked(_) => "ranked",
        TaskOutput::Classified(_) => "classified",
        TaskOutput::Speech(_) => "speech",
    }
}

fn trigger_label(demo: DemoId, status: Status, cancel_requested: bool) -> &'static str {
    if cancel_requested {
        return "Cancelling...";
    }
    match status {
        Status::Idle => match demo {
            DemoId::CrossEncoder => "Rerank",
            DemoId::ZeroShot => "Categorize",
            _ => "Generate",
        },
        Status::Loading => "Model loading...",
        Status::Error => "Error",
        Status::Ready | Status::Processing => match demo {
            DemoId::SpeechT5 | DemoId::AcceleratedTts => "Generating...",
            _ => "Processing",
        },
    }
}

pub(crate) fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
