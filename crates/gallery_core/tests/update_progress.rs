use gallery_core::{update, AppState, DemoId, Effect, Msg, Status, WorkerUpdate};

fn submit(state: AppState) -> (AppState, u64) {
    let (state, effects) = update(state, Msg::SubmitClicked);
    match effects.as_slice() {
        [Effect::PostRequest { request_id, .. }] => (state, *request_id),
        other => panic!("expected one post, got {other:?}"),
    }
}

fn progress(file: &str, value: f32) -> WorkerUpdate {
    WorkerUpdate::FileProgress {
        file: file.to_string(),
        progress: value,
        loaded: None,
        total: None,
    }
}

fn send(state: AppState, request_id: u64, updates: Vec<WorkerUpdate>) -> AppState {
    updates.into_iter().fold(state, |state, update_| {
        update(
            state,
            Msg::Worker {
                request_id,
                update: update_,
            },
        )
        .0
    })
}

fn percent_of(state: &AppState, file: &str) -> Option<f32> {
    state.progress().get(file).map(|item| item.progress)
}

#[test]
fn interleaved_downloads_are_keyed_by_file() {
    let (state, id) = submit(AppState::new(DemoId::CrossEncoder).unwrap());
    let state = send(
        state,
        id,
        vec![
            WorkerUpdate::FileInitiated { file: "tokenizer.json".into() },
            WorkerUpdate::FileInitiated { file: "model.onnx".into() },
            progress("model.onnx", 10.0),
            progress("tokenizer.json", 80.0),
            progress("model.onnx", 25.0),
        ],
    );

    assert_eq!(percent_of(&state, "model.onnx"), Some(25.0));
    assert_eq!(percent_of(&state, "tokenizer.json"), Some(80.0));
    assert_eq!(state.view().progress.len(), 2);
}

#[test]
fn progress_never_decreases_per_file() {
    let (state, id) = submit(AppState::new(DemoId::ZeroShot).unwrap());
    let state = send(
        state,
        id,
        vec![
            WorkerUpdate::FileInitiated { file: "model.onnx".into() },
            progress("model.onnx", 60.0),
            progress("model.onnx", 40.0),
        ],
    );
    assert_eq!(percent_of(&state, "model.onnx"), Some(60.0));

    let state = send(state, id, vec![progress("model.onnx", 250.0)]);
    assert_eq!(percent_of(&state, "model.onnx"), Some(100.0));
}

#[test]
fn done_removes_file_and_ready_clears_pending() {
    let (state, id) = submit(AppState::new(DemoId::SpeechT5).unwrap());
    let state = send(
        state,
        id,
        vec![
            WorkerUpdate::FileInitiated { file: "encoder.onnx".into() },
            WorkerUpdate::FileInitiated { file: "decoder.onnx".into() },
            WorkerUpdate::FileDone { file: "encoder.onnx".into() },
        ],
    );
    assert_eq!(state.progress().pending_files(), vec!["decoder.onnx".to_string()]);

    let state = send(state, id, vec![WorkerUpdate::ModelReady]);
    assert!(state.progress().is_empty());
    assert_eq!(state.status(), Status::Ready);
    assert!(state.view().model_resident);
}

#[test]
fn progress_without_initiate_is_tracked() {
    let (state, id) = submit(AppState::new(DemoId::CrossEncoder).unwrap());
    let state = send(state, id, vec![progress("late.onnx", 5.0)]);

    assert_eq!(percent_of(&state, "late.onnx"), Some(5.0));
    assert_eq!(state.status(), Status::Loading);
}

#[test]
fn stale_events_never_change_state() {
    let (state, first) = submit(AppState::new(DemoId::ZeroShot).unwrap());
    let state = send(state, first, vec![WorkerUpdate::Cancelled]);
    let (mut state, second) = submit(state);
    assert!(state.consume_dirty());
    let before = state.clone();

    let (mut after, effects) = update(
        state,
        Msg::Worker {
            request_id: first,
            update: WorkerUpdate::Complete(None),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(after, before);
    assert!(!after.consume_dirty());
    assert_eq!(after.in_flight(), Some(second));
    assert_eq!(after.status(), Status::Processing);
}

#[test]
fn events_after_terminal_are_ignored() {
    let (state, id) = submit(AppState::new(DemoId::CrossEncoder).unwrap());
    let state = send(state, id, vec![WorkerUpdate::Complete(None)]);
    let state = send(state, id, vec![WorkerUpdate::FileInitiated { file: "x".into() }]);

    assert_eq!(state.status(), Status::Idle);
    assert!(state.progress().is_empty());
}

#[test]
fn terminal_updates_are_classified() {
    assert!(WorkerUpdate::Complete(None).is_terminal());
    assert!(WorkerUpdate::Cancelled.is_terminal());
    assert!(WorkerUpdate::Failed { message: "x".into() }.is_terminal());
    assert!(!WorkerUpdate::ModelReady.is_terminal());
    assert!(!WorkerUpdate::Output(gallery_core::TaskOutput::Ranked(Vec::new())).is_terminal());
}
