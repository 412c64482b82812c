use gallery_core::{
    update, AppState, BucketBoard, Classification, DemoId, Effect, Msg, TaskOutput, WorkerUpdate,
    InferenceRequest, NEW_BUCKET_TITLE, OTHER_BUCKET, PLACEHOLDER_REVIEWS,
};
use pretty_assertions::assert_eq;

fn classification(sequence: &str, labels: &[&str], scores: &[f32]) -> Classification {
    Classification {
        sequence: sequence.to_string(),
        labels: labels.iter().map(|label| label.to_string()).collect(),
        scores: scores.to_vec(),
    }
}

fn items_of<'a>(board: &'a BucketBoard, title: &str) -> Vec<&'a str> {
    board
        .buckets()
        .iter()
        .find(|bucket| bucket.title == title)
        .map(|bucket| bucket.items.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn confident_score_goes_to_label_bucket() {
    let mut board = BucketBoard::new(["A", "B", "C"]);
    board.assign(&classification("x", &["A", "B", "C"], &[0.9, 0.05, 0.05]));

    assert_eq!(items_of(&board, "A"), vec!["x"]);
    assert!(items_of(&board, OTHER_BUCKET).is_empty());
}

#[test]
fn low_score_falls_back_to_other() {
    let mut board = BucketBoard::new(["A", "B", "C"]);
    board.assign(&classification("y", &["A", "B", "C"], &[0.4, 0.35, 0.25]));

    assert_eq!(items_of(&board, OTHER_BUCKET), vec!["y"]);
    assert!(items_of(&board, "A").is_empty());
}

#[test]
fn unknown_label_falls_back_to_other() {
    let mut board = BucketBoard::new(["A"]);
    board.assign(&classification("z", &["Renamed away"], &[0.99]));

    assert_eq!(items_of(&board, OTHER_BUCKET), vec!["z"]);
}

#[test]
fn removing_a_bucket_keeps_other_items_in_place() {
    let mut board = BucketBoard::new(["A", "B", "C"]);
    board.assign(&classification("a1", &["A"], &[0.9]));
    board.assign(&classification("c1", &["C"], &[0.9]));
    board.assign(&classification("o1", &["A"], &[0.1]));

    let removed = board.remove_bucket(1).unwrap();
    assert_eq!(removed.title, "B");

    assert_eq!(items_of(&board, "A"), vec!["a1"]);
    assert_eq!(items_of(&board, "C"), vec!["c1"]);
    assert_eq!(items_of(&board, OTHER_BUCKET), vec!["o1"]);
}

#[test]
fn renaming_keeps_items() {
    let mut board = BucketBoard::new(["A"]);
    board.assign(&classification("a1", &["A"], &[0.8]));
    board.rename_bucket(0, "Renamed").unwrap();

    assert_eq!(items_of(&board, "Renamed"), vec!["a1"]);
    assert_eq!(board.labels(), vec!["Renamed".to_string()]);
}

#[test]
fn other_bucket_is_fixed() {
    let mut board = BucketBoard::new(["A"]);
    assert!(board.remove_bucket(1).is_err());
    assert!(board.rename_bucket(1, "Misc").is_err());
    assert!(board.remove_bucket(7).is_err());
    assert_eq!(board.buckets().last().unwrap().title, OTHER_BUCKET);
}

#[test]
fn add_inserts_before_other_and_remove_last_category_pops_it() {
    let mut board = BucketBoard::new(["A"]);
    let index = board.add_bucket();
    assert_eq!(index, 1);
    assert_eq!(board.buckets()[1].title, NEW_BUCKET_TITLE);

    let removed = board.remove_last_category().unwrap();
    assert_eq!(removed.title, NEW_BUCKET_TITLE);
    board.remove_last_category();
    assert!(board.remove_last_category().is_none());
    assert_eq!(board.buckets().len(), 1);
}

#[test]
fn clear_items_keeps_titles() {
    let mut board = BucketBoard::new(["A"]);
    board.assign(&classification("a1", &["A"], &[0.8]));
    board.clear_items();

    assert_eq!(board.item_count(), 0);
    assert_eq!(board.labels(), vec!["A".to_string()]);
}

#[test]
fn bucket_edits_never_emit_effects_even_while_busy() {
    let state = AppState::new(DemoId::ZeroShot).unwrap();
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert_eq!(effects.len(), 1);

    let edits = vec![
        Msg::BucketAdded,
        Msg::BucketRenamed {
            index: 0,
            title: "Battery".into(),
        },
        Msg::BucketRemoved { index: 1 },
        Msg::LastCategoryRemoved,
        Msg::BucketsCleared,
    ];
    let mut state = state;
    for msg in edits {
        let (next, effects) = update(state, msg);
        assert!(effects.is_empty());
        state = next;
    }
    assert!(state.is_busy());
}

#[test]
fn outputs_stream_into_buckets_through_update() {
    let (state, effects) = update(AppState::new(DemoId::ZeroShot).unwrap(), Msg::SubmitClicked);
    let request_id = match effects.as_slice() {
        [Effect::PostRequest { request_id, .. }] => *request_id,
        other => panic!("expected post, got {other:?}"),
    };

    let outputs = [
        classification("too hot", &["Overheating", "Software issues"], &[0.92, 0.08]),
        classification("meh", &["Overheating", "Software issues"], &[0.45, 0.55]),
        classification("unsure", &["Overheating", "Software issues"], &[0.3, 0.2]),
    ];
    let mut state = state;
    for output in outputs {
        state = update(
            state,
            Msg::Worker {
                request_id,
                update: WorkerUpdate::Output(TaskOutput::Classified(output)),
            },
        )
        .0;
    }
    let (state, _) = update(
        state,
        Msg::Worker {
            request_id,
            update: WorkerUpdate::Complete(None),
        },
    );

    let board = state.board().unwrap();
    assert_eq!(items_of(board, "Overheating"), vec!["too hot"]);
    assert_eq!(items_of(board, "Software issues"), vec!["meh"]);
    assert_eq!(items_of(board, OTHER_BUCKET), vec!["unsure"]);
}

#[test]
fn view_marks_other_as_not_editable() {
    let view = AppState::new(DemoId::ZeroShot).unwrap().view();
    match view.page {
        gallery_core::PageView::ZeroShot {
            buckets,
            can_remove_category,
            ..
        } => {
            assert!(can_remove_category);
            assert!(buckets[..buckets.len() - 1].iter().all(|b| b.editable));
            assert!(!buckets.last().unwrap().editable);
        }
        other => panic!("unexpected page {other:?}"),
    }
}

#[test]
fn renaming_a_bucket_to_other_keeps_the_board_intact() {
    let state = AppState::new(DemoId::ZeroShot).unwrap();
    let (mut state, _) = update(
        state,
        Msg::BucketRenamed {
            index: 0,
            title: OTHER_BUCKET.into(),
        },
    );

    assert!(!state.consume_dirty());
    let board = state.board().unwrap();
    assert_eq!(board.buckets()[0].title, "Battery and charging problems");
    assert!(!board.labels().contains(&OTHER_BUCKET.to_string()));
}

#[test]
fn placeholder_reviews_are_submitted_one_per_line() {
    let (_state, effects) = update(AppState::new(DemoId::ZeroShot).unwrap(), Msg::SubmitClicked);
    let Some(Effect::PostRequest {
        request: InferenceRequest::Classify { texts, .. },
        ..
    }) = effects.first()
    else {
        panic!("expected a classify request, got {effects:?}");
    };

    assert_eq!(texts.len(), PLACEHOLDER_REVIEWS.len());
    assert_eq!(texts.len(), 15);
    assert!(texts[3].ends_with("Not what I expected"));
}
