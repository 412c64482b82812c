use thiserror::Error;

use crate::Classification;

/// Title of the fallback bucket. Always the last bucket on a board.
pub const OTHER_BUCKET: &str = "Other";
/// Title given to buckets created with [`BucketBoard::add_bucket`].
pub const NEW_BUCKET_TITLE: &str = "New Category";
/// A label must score strictly above this to win its bucket.
pub const CLASSIFY_THRESHOLD: f32 = 0.5;

pub const DEFAULT_BUCKETS: &[&str] = &[
    "Battery and charging problems",
    "Overheating",
    "Poor build quality",
    "Software issues",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BucketError {
    #[error("bucket index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("the \"Other\" bucket cannot be edited")]
    OtherIsFixed,
    #[error("\"Other\" is reserved for the fixed last bucket")]
    ReservedTitle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub title: String,
    pub items: Vec<String>,
}

impl Bucket {
    fn empty(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }
}

/// Ordered, user-editable buckets for the zero-shot demo.
///
/// Invariant: the last bucket is the `Other` bucket. Edits are local and never
/// trigger inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketBoard {
    buckets: Vec<Bucket>,
}

impl Default for BucketBoard {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKETS.iter().copied())
    }
}

impl BucketBoard {
    /// Builds a board from user titles; the `Other` bucket is appended.
    pub fn new<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut buckets: Vec<Bucket> = titles
            .into_iter()
            .map(|title| -> String { title.into() })
            .filter(|title| title != OTHER_BUCKET)
            .map(Bucket::empty)
            .collect();
        buckets.push(Bucket::empty(OTHER_BUCKET));
        Self { buckets }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    fn other_index(&self) -> usize {
        self.buckets.len() - 1
    }

    /// Labels sent to the classifier: every title except `Other`.
    pub fn labels(&self) -> Vec<String> {
        self.buckets[..self.other_index()]
            .iter()
            .map(|bucket| bucket.title.clone())
            .collect()
    }

    /// Places `classification.sequence` into the winning bucket and returns its index.
    pub fn assign(&mut self, classification: &Classification) -> usize {
        let other = self.other_index();
        let index = choose_label(classification, CLASSIFY_THRESHOLD)
            .and_then(|label| {
                self.buckets[..other]
                    .iter()
                    .position(|bucket| bucket.title == label)
            })
            .unwrap_or(other);
        self.buckets[index]
            .items
            .push(classification.sequence.clone());
        index
    }

    /// Inserts a `New Category` bucket just before `Other`.
    pub fn add_bucket(&mut self) -> usize {
        let index = self.other_index();
        self.buckets.insert(index, Bucket::empty(NEW_BUCKET_TITLE));
        index
    }

    pub fn remove_bucket(&mut self, index: usize) -> Result<Bucket, BucketError> {
        self.check_editable(index)?;
        Ok(self.buckets.remove(index))
    }

    /// Removes the bucket just before `Other`, if there is one.
    pub fn remove_last_category(&mut self) -> Option<Bucket> {
        let other = self.other_index();
        if other == 0 {
            return None;
        }
        Some(self.buckets.remove(other - 1))
    }

    pub fn rename_bucket(
        &mut self,
        index: usize,
        title: impl Into<String>,
    ) -> Result<(), BucketError> {
        self.check_editable(index)?;
        let title = title.into();
        if title == OTHER_BUCKET {
            return Err(BucketError::ReservedTitle);
        }
        self.buckets[index].title = title;
        Ok(())
    }

    pub fn clear_items(&mut self) {
        for bucket in &mut self.buckets {
            bucket.items.clear();
        }
    }

    pub fn item_count(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.items.len()).sum()
    }

    fn check_editable(&self, index: usize) -> Result<(), BucketError> {
        let len = self.buckets.len();
        if index >= len {
            return Err(BucketError::OutOfRange { index, len });
        }
        if index == self.other_index() {
            return Err(BucketError::OtherIsFixed);
        }
        Ok(())
    }
}

/// Returns the highest-scoring label if its score is strictly above `threshold`.
///
/// Ties keep the earliest label.
pub fn choose_label(classification: &Classification, threshold: f32) -> Option<&str> {
    let mut best: Option<(usize, f32)> = None;
    for (index, score) in classification.scores.iter().copied().enumerate() {
        if !score.is_finite() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    let (index, score) = best?;
    if score > threshold {
        classification.labels.get(index).map(String::as_str)
    } else {
        None
    }
}
