use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use gallery_core::{
    resolve_route, update, AppState, Catalog, DemoId, Msg, Route, SpeakerId, Status,
    WorkerUpdate, DEFAULT_BUCKETS, OTHER_BUCKET,
};
use gallery_engine::{ArtifactSpec, WorkerConfig, WorkerError};
use gallery_logging::{gallery_info, gallery_warn};
use log::LevelFilter;

use super::capabilities;
use super::effects::{self, EffectRunner};
use super::logging::{self, LogDestination};
use super::ui;
use crate::cli::{Cli, Command, RunArgs};

/// How long one wait on the worker lasts before the loop re-checks deadlines.
const POLL_INTERVAL: Duration = Duration::from_millis(75);
/// Grace period for the worker to acknowledge a cancel.
const CANCEL_GRACE: Duration = Duration::from_secs(10);

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match cli.log_file {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    logging::initialize(destination, level);

    match cli.command {
        Command::List { accelerator } => {
            let capabilities = capabilities::detect(accelerator);
            for line in ui::render::render_catalog(&Catalog::builtin(), capabilities) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Run(args) => run_demo(args),
    }
}

fn run_demo(args: RunArgs) -> anyhow::Result<()> {
    let demo = match resolve_route(&args.route) {
        Route::Demo(demo) => demo,
        Route::Home => bail!("`{}` is the gallery home page; pick a demo (see `gallery list`)", args.route),
        Route::NotFound(segment) => bail!("no demo at `{segment}` (see `gallery list`)"),
    };
    let catalog = Catalog::builtin();
    let entry = catalog
        .get(demo)
        .ok_or_else(|| anyhow!("{demo} is not in the catalog"))?;
    if !entry.is_enabled(capabilities::detect(false)) {
        bail!(
            "{} requires an accelerator; set {}=1 to override detection",
            entry.name,
            capabilities::ACCELERATOR_ENV
        );
    }

    let state = AppState::new(demo)
        .ok_or_else(|| anyhow!("{} is listed in the gallery but cannot run here", entry.name))?;

    let inputs = input_msgs(demo, &args)?;
    let config = worker_config(&args);
    let effects = EffectRunner::new(demo, &config, args.output.clone())?;
    let mut session = DemoSession::new(state, effects);

    let outcome = session.run_request(inputs, Duration::from_secs(args.timeout_secs));
    for line in ui::render::render(&session.state.view()) {
        println!("{line}");
    }
    for path in session.effects.written() {
        println!("Audio written to {}", path.display());
    }
    let status = session.state.status();
    let error = session.state.error().map(str::to_owned);
    session.unmount();

    outcome?;
    match (status, error) {
        (Status::Error, Some(message)) => Err(anyhow!("request failed: {message}")),
        _ => Ok(()),
    }
}

fn worker_config(args: &RunArgs) -> WorkerConfig {
    WorkerConfig {
        artifact_base_url: args.artifact_base_url.clone(),
        artifact_files: args.artifacts.iter().map(ArtifactSpec::new).collect(),
        ..WorkerConfig::default()
    }
}

/// Translates CLI inputs into the edits a user would make on the page.
fn input_msgs(demo: DemoId, args: &RunArgs) -> anyhow::Result<Vec<Msg>> {
    let mut msgs = Vec::new();
    match demo {
        DemoId::CrossEncoder => {
            if let Some(query) = &args.query {
                msgs.push(Msg::QueryChanged(query.clone()));
            }
            if !args.documents.is_empty() {
                msgs.push(Msg::DocumentsChanged(args.documents.join("\n")));
            }
        }
        DemoId::ZeroShot => {
            if let Some(text) = &args.text {
                msgs.push(Msg::TextChanged(text.clone()));
            }
            if !args.labels.is_empty() {
                msgs.extend(replace_labels(&args.labels));
            }
        }
        DemoId::SpeechT5 | DemoId::AcceleratedTts => {
            if let Some(text) = &args.text {
                msgs.push(Msg::TextChanged(text.clone()));
            }
            if let Some(speaker) = &args.speaker {
                let speaker = SpeakerId::lookup(speaker)
                    .ok_or_else(|| anyhow!("unknown speaker `{speaker}`"))?;
                msgs.push(Msg::SpeakerSelected(speaker));
            }
        }
        DemoId::Llama | DemoId::Phi | DemoId::Janus | DemoId::Florence => {}
    }
    Ok(msgs)
}

/// Bucket edits that swap the default categories for `labels`.
///
/// `Other` is skipped: the board always ends with its own fixed `Other`.
fn replace_labels(labels: &[String]) -> Vec<Msg> {
    let mut msgs: Vec<Msg> = DEFAULT_BUCKETS
        .iter()
        .map(|_| Msg::LastCategoryRemoved)
        .collect();
    let mut seen = HashSet::new();
    let unique = labels
        .iter()
        .map(|label| label.trim())
        .filter(|label| {
            !label.is_empty() && *label != OTHER_BUCKET && seen.insert(label.to_string())
        });
    for (index, label) in unique.enumerate() {
        msgs.push(Msg::BucketAdded);
        msgs.push(Msg::BucketRenamed {
            index,
            title: label.to_string(),
        });
    }
    msgs
}

/// One mounted demo: controller state plus the worker behind it.
struct DemoSession {
    state: AppState,
    effects: EffectRunner,
    printed: Vec<String>,
}

impl DemoSession {
    fn new(state: AppState, effects: EffectRunner) -> Self {
        Self {
            state,
            effects,
            printed: Vec::new(),
        }
    }

    fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        if self.state.consume_dirty() {
            self.print_live();
        }
        self.effects.apply(effects)
    }

    /// Submits once and pumps worker events until the request settles.
    ///
    /// A request cancelled because it outlived `timeout` is an error.
    fn run_request(&mut self, inputs: Vec<Msg>, timeout: Duration) -> anyhow::Result<()> {
        for msg in inputs {
            self.dispatch(msg)?;
        }
        self.dispatch(Msg::SubmitClicked)?;
        let Some(request_id) = self.state.in_flight() else {
            bail!("nothing to submit: the demo's inputs are empty");
        };

        let started = Instant::now();
        let mut cancel_sent_at: Option<Instant> = None;
        let mut cancelled = false;
        while self.state.is_busy() {
            match self.effects.next_msg(POLL_INTERVAL) {
                Ok(Some(msg)) => {
                    if let Msg::Worker {
                        request_id: id,
                        update: WorkerUpdate::Cancelled,
                    } = &msg
                    {
                        cancelled |= *id == request_id;
                    }
                    self.dispatch(msg)?;
                }
                Ok(None) => {
                    if let Some(sent) = cancel_sent_at {
                        if sent.elapsed() > CANCEL_GRACE {
                            bail!("worker did not acknowledge cancellation of request {request_id}");
                        }
                    } else if started.elapsed() > timeout {
                        gallery_warn!("Request {} timed out after {:?}", request_id, timeout);
                        cancel_sent_at = Some(Instant::now());
                        self.dispatch(Msg::CancelClicked)?;
                    }
                    self.dispatch(Msg::Tick)?;
                }
                Err(WorkerError::Disconnected) => {
                    gallery_warn!("Worker disconnected during request {}", request_id);
                    self.dispatch(effects::worker_lost(request_id))?;
                }
                Err(err) => return Err(err).context("waiting for worker"),
            }
        }
        gallery_info!(
            "Request {} settled in {:?} with status {:?}",
            request_id,
            started.elapsed(),
            self.state.status()
        );
        if cancelled && cancel_sent_at.is_some() {
            bail!("request {request_id} timed out after {timeout:?}");
        }
        Ok(())
    }

    /// Prints live lines that differ from the previous frame.
    fn print_live(&mut self) {
        let frame = ui::render::render_live(&self.state.view());
        for line in frame.iter().filter(|line| !self.printed.contains(line)) {
            eprintln!("{line}");
        }
        self.printed = frame;
    }

    fn unmount(self) {
        self.effects.release();
    }
}

#[cfg(test)]
mod tests {
    use gallery_core::BucketBoard;
    use gallery_engine::{
        Artifact, ModelLoader, OutputSink, Pipeline, PipelineError, TaskKind, TaskOutput,
        WorkerHandle, WorkerRequest,
    };
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;

    use super::*;

    /// A reranker that never finishes on its own.
    struct StalledRanker;

    #[async_trait::async_trait]
    impl Pipeline for StalledRanker {
        fn task(&self) -> TaskKind {
            TaskKind::Rerank
        }

        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn load(&mut self, _artifacts: Vec<Artifact>) -> Result<(), PipelineError> {
            Ok(())
        }

        async fn run(
            &mut self,
            _request: WorkerRequest,
            _outputs: &dyn OutputSink,
            cancel: &CancellationToken,
        ) -> Result<Option<TaskOutput>, PipelineError> {
            cancel.cancelled().await;
            Err(PipelineError::Cancelled)
        }
    }

    #[test]
    fn replacing_labels_yields_exactly_those_buckets() {
        let mut state = AppState::new(DemoId::ZeroShot).unwrap();
        let labels = vec![
            "Billing".to_string(),
            " Shipping ".to_string(),
            "Billing".to_string(),
            "".to_string(),
            "Other".to_string(),
        ];
        for msg in replace_labels(&labels) {
            let (next, effects) = update(state, msg);
            assert!(effects.is_empty());
            state = next;
        }

        let expected = BucketBoard::new(["Billing", "Shipping"]);
        assert_eq!(state.board(), Some(&expected));
    }

    #[test]
    fn speech_inputs_resolve_speaker_names() {
        let args = RunArgs {
            route: "speecht5".to_string(),
            query: None,
            documents: Vec::new(),
            text: Some("Hello".to_string()),
            labels: Vec::new(),
            speaker: Some("US male 1".to_string()),
            output: "speech.wav".into(),
            timeout_secs: 5,
            artifact_base_url: None,
            artifacts: Vec::new(),
        };
        let msgs = input_msgs(DemoId::SpeechT5, &args).unwrap();
        assert_eq!(
            msgs,
            vec![
                Msg::TextChanged("Hello".to_string()),
                Msg::SpeakerSelected(SpeakerId::new("cmu_us_bdl_arctic-wav-arctic_a0003")),
            ]
        );

        let unknown = RunArgs {
            speaker: Some("Nobody".to_string()),
            ..args
        };
        assert!(input_msgs(DemoId::SpeechT5, &unknown).is_err());
    }

    #[test]
    fn rerank_session_completes_against_builtin_worker() {
        let effects = EffectRunner::new(
            DemoId::CrossEncoder,
            &WorkerConfig::default(),
            "unused.wav".into(),
        )
        .unwrap();
        let mut session = DemoSession::new(AppState::new(DemoId::CrossEncoder).unwrap(), effects);

        session
            .run_request(
                vec![
                    Msg::QueryChanged("battery life".to_string()),
                    Msg::DocumentsChanged("screen\nbattery life is great".to_string()),
                ],
                Duration::from_secs(5),
            )
            .unwrap();

        assert_eq!(session.state.status(), Status::Idle);
        let view = session.state.view();
        let gallery_core::PageView::Rerank { results, .. } = view.page else {
            panic!("rerank page expected");
        };
        assert_eq!(results[0].corpus_id, 1);
        session.unmount();
    }

    #[test]
    fn zero_shot_session_fills_buckets() {
        let effects =
            EffectRunner::new(DemoId::ZeroShot, &WorkerConfig::default(), "unused.wav".into())
                .unwrap();
        let mut session = DemoSession::new(AppState::new(DemoId::ZeroShot).unwrap(), effects);
        let mut inputs = vec![Msg::TextChanged(
            "Billing was wrong twice\nthe weather is nice".to_string(),
        )];
        inputs.extend(replace_labels(&["Billing".to_string(), "Shipping".to_string()]));

        session.run_request(inputs, Duration::from_secs(5)).unwrap();

        let board = session.state.board().unwrap();
        assert_eq!(board.item_count(), 2);
        assert_eq!(board.buckets()[0].items, vec!["Billing was wrong twice".to_string()]);
        session.unmount();
    }

    #[test]
    fn timed_out_request_is_cancelled_and_reported() {
        let worker = WorkerHandle::spawn(Box::new(StalledRanker), ModelLoader::none()).unwrap();
        let effects = EffectRunner::with_worker(worker, "unused.wav".into());
        let mut session =
            DemoSession::new(AppState::new(DemoId::CrossEncoder).unwrap(), effects);

        let err = session
            .run_request(Vec::new(), Duration::from_millis(50))
            .unwrap_err();

        assert!(err.to_string().contains("timed out"), "{err}");
        assert_eq!(session.state.status(), Status::Idle);
        assert_eq!(session.state.in_flight(), None);
        session.unmount();
    }

    #[test]
    fn listed_only_demo_has_no_controller() {
        assert!(AppState::new(DemoId::Llama).is_none());
        let args = RunArgs {
            route: "/llama".to_string(),
            query: None,
            documents: Vec::new(),
            text: None,
            labels: Vec::new(),
            speaker: None,
            output: "speech.wav".into(),
            timeout_secs: 5,
            artifact_base_url: None,
            artifacts: Vec::new(),
        };
        assert_eq!(input_msgs(DemoId::Llama, &args).unwrap(), Vec::new());
    }

    #[test]
    fn speech_session_writes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.wav");
        let effects =
            EffectRunner::new(DemoId::SpeechT5, &WorkerConfig::default(), path.clone()).unwrap();
        let mut session = DemoSession::new(AppState::new(DemoId::SpeechT5).unwrap(), effects);

        session
            .run_request(vec![Msg::TextChanged("Hi".to_string())], Duration::from_secs(5))
            .unwrap();

        assert_eq!(session.effects.written(), &[path.clone()]);
        assert!(std::fs::metadata(&path).unwrap().len() > 44);
        session.unmount();
    }
}
