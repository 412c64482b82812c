use gallery_core::{
    AppViewModel, BucketView, Capabilities, Catalog, PageView, ProgressRowView, Status,
};

const BAR_WIDTH: usize = 20;

/// Lines that change while a request runs: status and download progress.
pub fn render_live(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![status_line(view)];
    if view.show_loading_overlay {
        lines.extend(view.progress.iter().map(progress_row));
    }
    lines
}

/// Full page: status, error, then the demo's results.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![status_line(view)];
    if let Some(error) = &view.error {
        lines.push(format!("Error: {error}"));
    }
    match &view.page {
        PageView::Rerank {
            query,
            document_count,
            results,
        } => {
            lines.push(format!("Query: {query}"));
            lines.push(format!("Documents: {document_count}"));
            for (rank, doc) in results.iter().enumerate() {
                lines.push(format!(
                    "{:>2}. [{:.3}] #{} {}",
                    rank + 1,
                    doc.score,
                    doc.corpus_id,
                    doc.text
                ));
            }
        }
        PageView::ZeroShot {
            input_lines,
            buckets,
            ..
        } => {
            lines.push(format!("Inputs: {input_lines}"));
            for bucket in buckets {
                lines.extend(bucket_column(bucket));
            }
        }
        PageView::Speech {
            text,
            speaker,
            clip_duration_secs,
        } => {
            lines.push(format!("Speaker: {}", speaker.display_name()));
            lines.push(format!("Text: {text}"));
            if let Some(secs) = clip_duration_secs {
                lines.push(format!("Audio: {secs:.2}s"));
            }
        }
    }
    lines
}

pub fn status_line(view: &AppViewModel) -> String {
    let status = match view.status {
        Status::Idle => "idle",
        Status::Loading => "loading",
        Status::Ready => "ready",
        Status::Processing => "processing",
        Status::Error => "error",
    };
    let trigger = if view.trigger_enabled {
        format!("[{}]", view.trigger_label)
    } else {
        format!("({})", view.trigger_label)
    };
    let head = format!("{} {} | {}", view.demo, status, trigger);
    match view.in_flight {
        Some(id) => format!("{head} | request {id}"),
        None => head,
    }
}

pub fn progress_row(row: &ProgressRowView) -> String {
    let percent = row.percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * BAR_WIDTH as f32).round() as usize;
    let bar = format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled));
    let size = match (row.loaded, row.total) {
        (Some(loaded), Some(total)) => format!(" ({} / {})", format_bytes(loaded), format_bytes(total)),
        (Some(loaded), None) => format!(" ({})", format_bytes(loaded)),
        _ => String::new(),
    };
    format!("[{bar}] {percent:>5.1}% {}{size}", row.file)
}

fn bucket_column(bucket: &BucketView) -> Vec<String> {
    let marker = if bucket.editable { "" } else { " (fixed)" };
    let mut lines = vec![format!("== {} ({}){marker}", bucket.title, bucket.items.len())];
    lines.extend(bucket.items.iter().map(|item| format!("  - {item}")));
    lines
}

/// Catalog grouped by category; gated demos are marked unavailable.
pub fn render_catalog(catalog: &Catalog, capabilities: Capabilities) -> Vec<String> {
    let mut lines = Vec::new();
    for (category, entries) in catalog.grouped() {
        lines.push(category.friendly_name().to_string());
        for entry in entries {
            let gate = if entry.is_enabled(capabilities) {
                ""
            } else {
                " [requires accelerator]"
            };
            lines.push(format!(
                "  /{:<14} {} - {}{gate}",
                entry.id.slug(),
                entry.name,
                entry.description
            ));
        }
    }
    lines
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
