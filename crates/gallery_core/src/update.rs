use gallery_logging::{gallery_debug, gallery_info, gallery_warn};

use crate::{AppState, Effect, Msg, Page, Status, WorkerUpdate};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::QueryChanged(value) => {
            if let Page::Rerank { query, results, .. } = state.page_mut() {
                *query = value;
                results.clear();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::DocumentsChanged(value) => {
            if let Page::Rerank {
                documents, results, ..
            } = state.page_mut()
            {
                *documents = value;
                results.clear();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::TextChanged(value) => {
            match state.page_mut() {
                Page::ZeroShot { text, .. } | Page::Speech { text, .. } => {
                    *text = value;
                    state.mark_dirty();
                }
                Page::Rerank { .. } => {}
            }
            Vec::new()
        }
        Msg::SpeakerSelected(selected) => {
            if let Page::Speech { speaker, .. } = state.page_mut() {
                *speaker = selected;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SubmitClicked => {
            // At most one request in flight: the trigger is inert unless idle.
            if state.is_busy() {
                gallery_debug!("Submit ignored while {:?}", state.status());
                return (state, Vec::new());
            }
            let Some(request) = state.build_request() else {
                gallery_debug!("Submit ignored: inputs are empty");
                return (state, Vec::new());
            };
            let request_id = state.begin_request();
            gallery_info!("Posting request {} for {}", request_id, state.demo());
            vec![Effect::PostRequest {
                request_id,
                request,
            }]
        }
        Msg::CancelClicked => match state.request_cancel() {
            Some(request_id) => vec![Effect::CancelRequest { request_id }],
            None => Vec::new(),
        },
        Msg::ErrorDismissed => {
            state.dismiss_error();
            Vec::new()
        }
        Msg::BucketAdded => {
            edit_board(&mut state, |board| {
                board.add_bucket();
            });
            Vec::new()
        }
        Msg::BucketRemoved { index } => {
            edit_board(&mut state, |board| {
                if let Err(err) = board.remove_bucket(index) {
                    gallery_warn!("Cannot remove bucket: {}", err);
                }
            });
            Vec::new()
        }
        Msg::LastCategoryRemoved => {
            edit_board(&mut state, |board| {
                board.remove_last_category();
            });
            Vec::new()
        }
        Msg::BucketRenamed { index, title } => {
            edit_board(&mut state, |board| {
                if let Err(err) = board.rename_bucket(index, title) {
                    gallery_warn!("Cannot rename bucket: {}", err);
                }
            });
            Vec::new()
        }
        Msg::BucketsCleared => {
            edit_board(&mut state, |board| board.clear_items());
            Vec::new()
        }
        Msg::Worker { request_id, update } => apply_worker_update(&mut state, request_id, update),
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn edit_board(state: &mut AppState, edit: impl FnOnce(&mut crate::BucketBoard)) {
    if let Page::ZeroShot { board, .. } = state.page_mut() {
        let before = board.clone();
        edit(board);
        if *board != before {
            state.mark_dirty();
        }
    }
}

fn apply_worker_update(
    state: &mut AppState,
    request_id: crate::RequestId,
    update: WorkerUpdate,
) -> Vec<Effect> {
    if state.in_flight() != Some(request_id) {
        gallery_debug!(
            "Dropping stale worker event for request {} (in flight: {:?})",
            request_id,
            state.in_flight()
        );
        return Vec::new();
    }

    match update {
        WorkerUpdate::FileInitiated { file } => {
            state.file_initiated(&file);
            Vec::new()
        }
        WorkerUpdate::FileProgress {
            file,
            progress,
            loaded,
            total,
        } => {
            state.file_progress(&file, progress, loaded, total);
            Vec::new()
        }
        WorkerUpdate::FileDone { file } => {
            state.file_done(&file);
            Vec::new()
        }
        WorkerUpdate::ModelReady => {
            state.model_ready();
            Vec::new()
        }
        WorkerUpdate::Output(output) => {
            state.output_streaming();
            present(request_id, state.apply_output(output))
        }
        WorkerUpdate::Complete(output) => {
            let clip = output.and_then(|output| state.apply_output(output));
            state.finish(Status::Idle, None);
            gallery_info!("Request {} complete", request_id);
            present(request_id, clip)
        }
        WorkerUpdate::Failed { message } => {
            gallery_warn!("Request {} failed: {}", request_id, message);
            state.finish(Status::Error, Some(message));
            Vec::new()
        }
        WorkerUpdate::Cancelled => {
            gallery_info!("Request {} cancelled", request_id);
            state.finish(Status::Idle, None);
            Vec::new()
        }
    }
}

fn present(request_id: crate::RequestId, clip: Option<crate::SpeechClip>) -> Vec<Effect> {
    clip.map(|clip| Effect::PresentAudio { request_id, clip })
        .into_iter()
        .collect()
}
