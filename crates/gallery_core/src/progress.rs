use std::collections::BTreeMap;

/// One model artifact being fetched by the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressItem {
    pub file: String,
    /// Completion percentage in `0.0..=100.0`.
    pub progress: f32,
    pub loaded: Option<u64>,
    pub total: Option<u64>,
}

impl ProgressItem {
    fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            progress: 0.0,
            loaded: None,
            total: None,
        }
    }
}

/// Pending artifact downloads keyed by file name.
///
/// Keyed by identity so interleaved progress from concurrent downloads never
/// lands on the wrong row. Recorded progress per file never decreases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressTracker {
    items: BTreeMap<String, ProgressItem>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initiate(&mut self, file: &str) {
        self.items
            .entry(file.to_string())
            .or_insert_with(|| ProgressItem::new(file));
    }

    /// Records progress for `file`, inserting it if `initiate` was never seen.
    /// Returns `true` if the recorded value changed.
    pub fn update(
        &mut self,
        file: &str,
        progress: f32,
        loaded: Option<u64>,
        total: Option<u64>,
    ) -> bool {
        let clamped = if progress.is_finite() {
            progress.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let item = self
            .items
            .entry(file.to_string())
            .or_insert_with(|| ProgressItem::new(file));
        let before = item.clone();
        if clamped > item.progress {
            item.progress = clamped;
        }
        if let Some(loaded) = loaded {
            item.loaded = Some(item.loaded.map_or(loaded, |prev| prev.max(loaded)));
        }
        if total.is_some() {
            item.total = total;
        }
        *item != before
    }

    pub fn done(&mut self, file: &str) -> bool {
        self.items.remove(file).is_some()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, file: &str) -> Option<&ProgressItem> {
        self.items.get(file)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &ProgressItem> {
        self.items.values()
    }

    pub fn pending_files(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }
}
