use std::sync::{Arc, Mutex};
use std::time::Duration;

use gallery_engine::{
    ArtifactFailure, ArtifactFetcher, ArtifactSettings, ArtifactSpec, ProgressSink,
    ReqwestArtifactFetcher, WorkerEvent,
};
use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<WorkerEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<WorkerEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: WorkerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn fetcher(server: &MockServer, settings: ArtifactSettings) -> ReqwestArtifactFetcher {
    let base = Url::parse(&format!("{}/models/demo", server.uri())).unwrap();
    ReqwestArtifactFetcher::new(base, settings).expect("client builds")
}

#[tokio::test]
async fn fetcher_reports_initiate_progress_and_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/demo/model.onnx"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let artifact = fetcher(&server, ArtifactSettings::default())
        .fetch(&ArtifactSpec::new("model.onnx"), &sink, &CancellationToken::new())
        .await
        .expect("fetch ok");
    assert_eq!(artifact.file, "model.onnx");
    assert_eq!(artifact.bytes.len(), 4096);

    let events = sink.take();
    assert_eq!(
        events.first(),
        Some(&WorkerEvent::Initiate {
            file: "model.onnx".to_string()
        })
    );
    assert_eq!(
        events.last(),
        Some(&WorkerEvent::Done {
            file: "model.onnx".to_string()
        })
    );

    let percents: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            WorkerEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(percents.last(), Some(&100.0));
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/demo/missing.bin"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let sink = TestSink::default();
    let err = fetcher(&server, ArtifactSettings::default())
        .fetch(&ArtifactSpec::new("missing.bin"), &sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ArtifactFailure::HttpStatus(404));
    assert_eq!(err.file, "missing.bin");
    assert!(!sink
        .take()
        .iter()
        .any(|event| matches!(event, WorkerEvent::Done { .. })));
}

#[tokio::test]
async fn fetcher_rejects_too_large_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/demo/big.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("01234567890"))
        .mount(&server)
        .await;

    let settings = ArtifactSettings {
        max_bytes: 10,
        ..ArtifactSettings::default()
    };
    let err = fetcher(&server, settings)
        .fetch(&ArtifactSpec::new("big.bin"), &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        ArtifactFailure::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn fetcher_verifies_checksum() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/demo/weights.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_string("weights"))
        .mount(&server)
        .await;
    let fetcher = fetcher(&server, ArtifactSettings::default());

    let good = format!("{:x}", Sha256::digest(b"weights"));
    let artifact = fetcher
        .fetch(
            &ArtifactSpec::new("weights.bin").with_sha256(good),
            &TestSink::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("matching digest");
    assert_eq!(&artifact.bytes[..], b"weights");

    let bad = format!("{:x}", Sha256::digest(b"other"));
    let err = fetcher
        .fetch(
            &ArtifactSpec::new("weights.bin").with_sha256(bad),
            &TestSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, ArtifactFailure::ChecksumMismatch { .. }));
}

#[tokio::test]
async fn fetcher_stops_when_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/demo/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = fetcher(&server, ArtifactSettings::default())
        .fetch(&ArtifactSpec::new("slow.bin"), &TestSink::default(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ArtifactFailure::Cancelled);
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/demo/slow.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = ArtifactSettings {
        request_timeout: Duration::from_millis(50),
        ..ArtifactSettings::default()
    };
    let err = fetcher(&server, settings)
        .fetch(&ArtifactSpec::new("slow.bin"), &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ArtifactFailure::Timeout);
}
