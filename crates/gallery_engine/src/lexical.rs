//! Dependency-free pipelines that need no model weights.
//!
//! They score with token overlap instead of a neural model, which keeps every
//! demo runnable offline and makes worker behaviour deterministic in tests.

use std::collections::HashSet;
use std::f32::consts::TAU;

use gallery_logging::gallery_debug;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::{
    Artifact, OutputSink, Pipeline, PipelineError, RankedDocument, TaskKind, TaskOutput,
    WorkerRequest,
};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "did", "do", "does", "for", "from", "has",
    "have", "how", "i", "in", "is", "it", "its", "my", "of", "on", "or", "so", "that", "the",
    "this", "to", "was", "what", "when", "where", "which", "who", "why", "with",
];

/// Leading characters compared when matching words ("charging" ~ "charger").
const STEM_LEN: usize = 5;

/// Builds the built-in pipeline for `task`.
pub fn pipeline_for(task: TaskKind) -> Box<dyn Pipeline> {
    match task {
        TaskKind::Rerank => Box::new(LexicalReranker::default()),
        TaskKind::Classify => Box::new(KeywordClassifier::default()),
        TaskKind::Synthesize => Box::new(ToneSynthesizer::default()),
    }
}

fn stems(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .map(|word| word.chars().take(STEM_LEN).collect())
        .collect()
}

fn describe_artifacts(pipeline: &str, artifacts: &[Artifact]) {
    let total: usize = artifacts.iter().map(|artifact| artifact.bytes.len()).sum();
    gallery_debug!(
        "{} loaded with {} artifact(s), {} bytes (unused by lexical scoring)",
        pipeline,
        artifacts.len(),
        total
    );
}

fn ensure_loaded(pipeline: &str, loaded: bool) -> Result<(), PipelineError> {
    if loaded {
        Ok(())
    } else {
        Err(PipelineError::Runtime(format!("{pipeline} was run before load")))
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Scores documents by the share of query terms they contain.
#[derive(Debug, Default)]
pub struct LexicalReranker {
    loaded: bool,
}

impl LexicalReranker {
    pub fn score(query: &str, document: &str) -> f32 {
        let query_terms: HashSet<String> = stems(query).into_iter().collect();
        if query_terms.is_empty() {
            return 0.0;
        }
        let doc_terms: HashSet<String> = stems(document).into_iter().collect();
        let hits = query_terms.intersection(&doc_terms).count();
        hits as f32 / query_terms.len() as f32
    }
}

#[async_trait::async_trait]
impl Pipeline for LexicalReranker {
    fn task(&self) -> TaskKind {
        TaskKind::Rerank
    }

    fn name(&self) -> &'static str {
        "lexical-reranker"
    }

    async fn load(&mut self, artifacts: Vec<Artifact>) -> Result<(), PipelineError> {
        describe_artifacts(self.name(), &artifacts);
        self.loaded = true;
        Ok(())
    }

    async fn run(
        &mut self,
        request: WorkerRequest,
        _outputs: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskOutput>, PipelineError> {
        let task = request.task();
        let WorkerRequest::Rerank { query, documents } = request else {
            return Err(PipelineError::WrongTask {
                pipeline: self.name(),
                task: task.as_str(),
            });
        };
        ensure_loaded(self.name(), self.loaded)?;

        let mut ranked = Vec::with_capacity(documents.len());
        for (corpus_id, text) in documents.into_iter().enumerate() {
            check_cancel(cancel)?;
            let score = Self::score(&query, &text);
            ranked.push(RankedDocument {
                corpus_id,
                score,
                text,
            });
            tokio::task::yield_now().await;
        }
        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.corpus_id.cmp(&b.corpus_id))
        });

        Ok(Some(TaskOutput::Ranked { documents: ranked }))
    }
}

/// Softmax over label/text stem overlap, one `output` per input line.
#[derive(Debug, Default)]
pub struct KeywordClassifier {
    loaded: bool,
}

impl KeywordClassifier {
    /// Logit gained when every word of a label appears in the text.
    const MATCH_WEIGHT: f32 = 4.0;

    /// Returns labels and scores sorted by descending score.
    pub fn classify(text: &str, labels: &[String]) -> (Vec<String>, Vec<f32>) {
        let text_stems: HashSet<String> = stems(text).into_iter().collect();
        let logits: Vec<f32> = labels
            .iter()
            .map(|label| {
                let label_stems = stems(label);
                if label_stems.is_empty() {
                    return 0.0;
                }
                let hits = label_stems
                    .iter()
                    .filter(|stem| text_stems.contains(*stem))
                    .count();
                Self::MATCH_WEIGHT * hits as f32 / label_stems.len() as f32
            })
            .collect();

        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|logit| (logit - max).exp()).collect();
        let sum: f32 = exps.iter().sum();

        let mut scored: Vec<(String, f32)> = labels
            .iter()
            .cloned()
            .zip(exps.into_iter().map(|e| e / sum))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.into_iter().unzip()
    }
}

#[async_trait::async_trait]
impl Pipeline for KeywordClassifier {
    fn task(&self) -> TaskKind {
        TaskKind::Classify
    }

    fn name(&self) -> &'static str {
        "keyword-classifier"
    }

    async fn load(&mut self, artifacts: Vec<Artifact>) -> Result<(), PipelineError> {
        describe_artifacts(self.name(), &artifacts);
        self.loaded = true;
        Ok(())
    }

    async fn run(
        &mut self,
        request: WorkerRequest,
        outputs: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskOutput>, PipelineError> {
        let task = request.task();
        let WorkerRequest::Classify { texts, labels } = request else {
            return Err(PipelineError::WrongTask {
                pipeline: self.name(),
                task: task.as_str(),
            });
        };
        ensure_loaded(self.name(), self.loaded)?;

        for sequence in texts {
            check_cancel(cancel)?;
            if sequence.trim().is_empty() {
                continue;
            }
            let (labels, scores) = Self::classify(&sequence, &labels);
            outputs.output(TaskOutput::Classification {
                sequence,
                labels,
                scores,
            });
            tokio::task::yield_now().await;
        }
        Ok(None)
    }
}

/// Renders text as a sequence of short tones, pitched by speaker.
#[derive(Debug)]
pub struct ToneSynthesizer {
    sample_rate: u32,
    loaded: bool,
}

impl Default for ToneSynthesizer {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            loaded: false,
        }
    }
}

impl ToneSynthesizer {
    const TONE_SECS: f32 = 0.06;
    const SPACE_SECS: f32 = 0.04;
    const PAUSE_SECS: f32 = 0.12;
    const AMPLITUDE: f32 = 0.3;

    /// Base pitch between 110 Hz and 260 Hz, stable per speaker id.
    pub fn base_pitch(speaker_id: &str) -> f32 {
        let digest = Sha256::digest(speaker_id.as_bytes());
        let bucket = u16::from_le_bytes([digest[0], digest[1]]) % 151;
        110.0 + f32::from(bucket)
    }

    fn samples_for(&self, secs: f32) -> usize {
        (self.sample_rate as f32 * secs) as usize
    }

    fn push_tone(&self, out: &mut Vec<f32>, frequency: f32) {
        let len = self.samples_for(Self::TONE_SECS);
        for n in 0..len {
            // Triangular envelope avoids clicks between tones.
            let position = n as f32 / len as f32;
            let envelope = 1.0 - (2.0 * position - 1.0).abs();
            let phase = TAU * frequency * n as f32 / self.sample_rate as f32;
            out.push(Self::AMPLITUDE * envelope * phase.sin());
        }
    }

    fn push_silence(&self, out: &mut Vec<f32>, secs: f32) {
        out.extend(std::iter::repeat(0.0).take(self.samples_for(secs)));
    }
}

#[async_trait::async_trait]
impl Pipeline for ToneSynthesizer {
    fn task(&self) -> TaskKind {
        TaskKind::Synthesize
    }

    fn name(&self) -> &'static str {
        "tone-synthesizer"
    }

    async fn load(&mut self, artifacts: Vec<Artifact>) -> Result<(), PipelineError> {
        describe_artifacts(self.name(), &artifacts);
        self.loaded = true;
        Ok(())
    }

    async fn run(
        &mut self,
        request: WorkerRequest,
        _outputs: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> Result<Option<TaskOutput>, PipelineError> {
        let task = request.task();
        let WorkerRequest::Synthesize { text, speaker_id } = request else {
            return Err(PipelineError::WrongTask {
                pipeline: self.name(),
                task: task.as_str(),
            });
        };
        ensure_loaded(self.name(), self.loaded)?;
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput("nothing to synthesize".to_string()));
        }

        let base = Self::base_pitch(&speaker_id);
        let mut samples = Vec::new();
        for word in text.split_inclusive(char::is_whitespace) {
            check_cancel(cancel)?;
            for c in word.chars() {
                if c.is_alphanumeric() {
                    let offset = (c.to_ascii_lowercase() as u32 % 26) as f32 / 26.0;
                    self.push_tone(&mut samples, base * (1.0 + 0.5 * offset));
                } else if c.is_whitespace() {
                    self.push_silence(&mut samples, Self::SPACE_SECS);
                } else {
                    self.push_silence(&mut samples, Self::PAUSE_SECS);
                }
            }
            tokio::task::yield_now().await;
        }

        Ok(Some(TaskOutput::Audio {
            sample_rate: self.sample_rate,
            samples,
        }))
    }
}
