use std::sync::mpsc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{ArtifactError, ArtifactFailure, RequestId, WorkerEvent, WorkerMessage};

#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    /// Minimum percentage gain between two `progress` events for one file.
    pub progress_step: f32,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            max_bytes: 512 * 1024 * 1024,
            progress_step: 1.0,
        }
    }
}

/// A model file the pipeline needs before it can run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub file: String,
    /// Lowercase hex SHA-256 the downloaded bytes must match.
    pub sha256: Option<String>,
}

impl ArtifactSpec {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into().to_ascii_lowercase());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file: String,
    pub bytes: Bytes,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: WorkerEvent);
}

/// Forwards events for one request onto the worker's event channel.
///
/// Events that fail [`WorkerEvent::validate`] are dropped.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<WorkerMessage>,
    request_id: RequestId,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<WorkerMessage>, request_id: RequestId) -> Self {
        Self { tx, request_id }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: WorkerEvent) {
        if let Err(err) = event.validate() {
            gallery_warn!("Dropping invalid event for request {}: {}", self.request_id, err);
            return;
        }
        let _ = self.tx.send(WorkerMessage::new(self.request_id, event));
    }
}

#[async_trait::async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Fetches one artifact, reporting `initiate`, `progress` and `done` to `sink`.
    async fn fetch(
        &self,
        spec: &ArtifactSpec,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Artifact, ArtifactError>;
}

/// Downloads artifacts from `{base_url}/{file}`.
#[derive(Debug, Clone)]
pub struct ReqwestArtifactFetcher {
    base_url: Url,
    settings: ArtifactSettings,
    client: reqwest::Client,
}

impl ReqwestArtifactFetcher {
    pub fn new(base_url: Url, settings: ArtifactSettings) -> Result<Self, ArtifactError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ArtifactError::new("", ArtifactFailure::Network, err.to_string()))?;
        // `join` drops the last segment unless the base ends with a slash.
        let base_url = if base_url.path().ends_with('/') {
            base_url
        } else {
            let mut with_slash = base_url;
            let path = format!("{}/", with_slash.path());
            with_slash.set_path(&path);
            with_slash
        };
        Ok(Self {
            base_url,
            settings,
            client,
        })
    }

    fn artifact_url(&self, file: &str) -> Result<Url, ArtifactError> {
        self.base_url
            .join(file.trim_start_matches('/'))
            .map_err(|err| ArtifactError::new(file, ArtifactFailure::InvalidUrl, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ArtifactFetcher for ReqwestArtifactFetcher {
    async fn fetch(
        &self,
        spec: &ArtifactSpec,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Artifact, ArtifactError> {
        let file = spec.file.as_str();
        let url = self.artifact_url(file)?;
        sink.emit(WorkerEvent::Initiate {
            file: file.to_string(),
        });
        gallery_info!("Fetching artifact {} from {}", file, url);

        let response = tokio::select! {
            response = self.client.get(url).send() => {
                response.map_err(|err| map_reqwest_error(file, err))?
            }
            () = cancel.cancelled() => {
                return Err(ArtifactError::new(file, ArtifactFailure::Cancelled, "cancelled before response"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::new(
                file,
                ArtifactFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let total = response.content_length();
        if let Some(content_len) = total {
            if content_len > self.settings.max_bytes {
                return Err(ArtifactError::new(
                    file,
                    ArtifactFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "artifact too large",
                ));
            }
        }

        let mut reporter = ProgressReporter::new(file, total, self.settings.progress_step);
        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                () = cancel.cancelled() => {
                    return Err(ArtifactError::new(file, ArtifactFailure::Cancelled, "cancelled mid-download"));
                }
            };
            let Some(chunk) = chunk else { break };
            let chunk = chunk.map_err(|err| map_reqwest_error(file, err))?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(ArtifactError::new(
                    file,
                    ArtifactFailure::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "artifact too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
            reporter.advance(next_len, sink);
        }
        reporter.finish(bytes.len() as u64, sink);

        let bytes = bytes.freeze();
        verify_checksum(spec, &bytes)?;
        sink.emit(WorkerEvent::Done {
            file: file.to_string(),
        });
        gallery_debug!("Artifact {} complete ({} bytes)", file, bytes.len());

        Ok(Artifact {
            file: file.to_string(),
            bytes,
        })
    }
}

/// Throttles `progress` events so one is sent per `step` percent gained.
struct ProgressReporter<'a> {
    file: &'a str,
    total: Option<u64>,
    step: f32,
    last_reported: Option<f32>,
}

impl<'a> ProgressReporter<'a> {
    fn new(file: &'a str, total: Option<u64>, step: f32) -> Self {
        Self {
            file,
            total,
            step: step.max(0.0),
            last_reported: None,
        }
    }

    fn percent(&self, loaded: u64) -> f32 {
        match self.total {
            Some(total) if total > 0 => ((loaded as f64 * 100.0) / total as f64).min(100.0) as f32,
            _ => 0.0,
        }
    }

    fn advance(&mut self, loaded: u64, sink: &dyn ProgressSink) {
        let percent = self.percent(loaded);
        let due = match self.last_reported {
            None => true,
            Some(last) => percent - last >= self.step,
        };
        if due {
            self.report(percent, loaded, sink);
        }
    }

    fn finish(&mut self, loaded: u64, sink: &dyn ProgressSink) {
        let percent = if self.total.is_some() {
            self.percent(loaded)
        } else {
            100.0
        };
        if self.last_reported != Some(percent) {
            self.report(percent, loaded, sink);
        }
    }

    fn report(&mut self, percent: f32, loaded: u64, sink: &dyn ProgressSink) {
        self.last_reported = Some(percent);
        sink.emit(WorkerEvent::Progress {
            file: self.file.to_string(),
            progress: percent,
            loaded: Some(loaded),
            total: self.total,
        });
    }
}

fn verify_checksum(spec: &ArtifactSpec, bytes: &[u8]) -> Result<(), ArtifactError> {
    let Some(expected) = spec.sha256.as_deref() else {
        return Ok(());
    };
    let actual = format!("{:x}", Sha256::digest(bytes));
    if actual == expected {
        Ok(())
    } else {
        Err(ArtifactError::new(
            &spec.file,
            ArtifactFailure::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            },
            "downloaded bytes do not match the expected digest",
        ))
    }
}

fn map_reqwest_error(file: &str, err: reqwest::Error) -> ArtifactError {
    if err.is_timeout() {
        return ArtifactError::new(file, ArtifactFailure::Timeout, err.to_string());
    }
    ArtifactError::new(file, ArtifactFailure::Network, err.to_string())
}
