// HTTP API tests: plain routes through `oneshot`, the event socket over a
// real listener

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{sample_video, FakeProvider, RecordingStore};
use futures::StreamExt;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::{self, Message};
use tower::ServiceExt;
use vidrelay::http::DownloadOptionsResponse;
use vidrelay::provider::ProviderVideo;
use vidrelay::{create_router, AppState, ProgressEvent, SessionId};

const SOURCE: &str = "https://video.test/watch?v=abc";

struct TestApp {
    provider: Arc<FakeProvider>,
    state: AppState,
    temp: TempDir,
}

impl TestApp {
    fn new(provider: FakeProvider) -> Self {
        Self::with_published(provider, false)
    }

    fn with_published(provider: FakeProvider, published: bool) -> Self {
        let temp = TempDir::new().unwrap();
        let published_dir: Option<PathBuf> = published.then(|| temp.path().join("published"));
        let provider = Arc::new(provider);
        let state = AppState::new(
            provider.clone(),
            Arc::new(RecordingStore::default()),
            temp.path().join("downloads"),
            4,
            published_dir,
        );
        Self {
            provider,
            state,
            temp,
        }
    }

    fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    /// Serve the router on an ephemeral port
    async fn serve(&self) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router();
        tokio::spawn(async move { axum::serve(listener, router).await });
        addr
    }

    async fn get(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn download_options_lists_the_catalog() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    let (status, body) = app
        .post_json("/api/download_options", json!({ "inputLink": SOURCE }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let response: DownloadOptionsResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(response.video_title, "Demo: Clip #1");
    assert_eq!(response.video_length, 42);
    assert_eq!(
        response.thumbnail_url.as_deref(),
        Some("https://img.test/demo.jpg")
    );

    let labels: Vec<_> = response
        .available_resolutions
        .iter()
        .map(|r| (r.itag, r.res.as_str(), r.progressive))
        .collect();
    assert_eq!(
        labels,
        vec![
            (0, "360p", true),
            (1, "720p", true),
            (2, "128kbps", false),
            (3, "1080p", false),
        ]
    );
    assert_eq!(body["available_resolutions"][2]["type"], "video/m4a");
}

#[tokio::test]
async fn download_options_rejects_unresolvable_source() {
    let mut provider = FakeProvider::new(sample_video());
    provider.resolve_error = Some("private video".to_string());
    let app = TestApp::new(provider);

    let (status, body) = app
        .post_json("/api/download_options", json!({ "inputLink": "https://video.test/x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("private video"));
}

#[tokio::test]
async fn download_options_with_no_usable_streams_returns_empty_list() {
    let video = ProviderVideo {
        progressive: vec![],
        audio_only: vec![],
        video_only: vec![],
        ..sample_video()
    };
    let app = TestApp::new(FakeProvider::new(video));

    let (status, body) = app
        .post_json("/api/download_options", json!({ "inputLink": SOURCE }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available_resolutions"], json!([]));
    assert_eq!(body["video_title"], "Demo: Clip #1");
}

#[tokio::test]
async fn download_video_rejects_out_of_range_index() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    app.post_json("/api/download_options", json!({ "inputLink": SOURCE }))
        .await;

    let (status, body) = app
        .post_json(
            "/api/download_video",
            json!({ "resolutionIndex": 9, "savedLink": SOURCE }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("out of range"));
    assert_eq!(app.state.registry().active_jobs(), 0);
}

#[tokio::test]
async fn download_video_starts_a_job_and_reports_its_state() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    app.post_json("/api/download_options", json!({ "inputLink": SOURCE }))
        .await;

    let (status, body) = app
        .post_json(
            "/api/download_video",
            json!({ "resolutionIndex": 1, "savedLink": SOURCE }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolution_index"], 1);
    let session: SessionId = body["session_id"].as_str().unwrap().parse().unwrap();

    let (status, bytes) = app.get(&format!("/api/jobs/{}", session)).await;
    assert_eq!(status, StatusCode::OK);
    let job: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(job["rendition_id"], "22");
    assert_eq!(job["session_id"], session.to_string());

    app.provider.release();
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.state.registry().job(session).is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job finished");

    let (status, _) = app.get(&format!("/api/jobs/{}", session)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_video_rejects_link_for_another_video() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    app.post_json("/api/download_options", json!({ "inputLink": SOURCE }))
        .await;

    let (status, body) = app
        .post_json(
            "/api/download_video",
            json!({ "resolutionIndex": 0, "savedLink": "https://video.test/watch?v=other" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("does not match"));
    assert_eq!(app.state.registry().active_jobs(), 0);
}

#[tokio::test]
async fn job_status_rejects_malformed_session_id() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    let (status, _) = app.get("/api/jobs/not-a-session").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn save_video_is_disabled_without_local_publishing() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    let (status, _) = app.get("/save_video/clip.mp4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_video_streams_published_file() {
    let app = TestApp::with_published(FakeProvider::new(sample_video()), true);
    let dir = app.temp.path().join("published");
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join("clip.mp4"), b"video bytes").await.unwrap();

    let request = Request::builder()
        .uri("/save_video/clip.mp4")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"clip.mp4\""
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"video bytes");

    let (status, _) = app.get("/save_video/missing.mp4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_video_rejects_path_escapes() {
    let app = TestApp::with_published(FakeProvider::new(sample_video()), true);
    let (status, _) = app.get("/save_video/..%2Fsecret").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/save_video/.hidden").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn wait_for_subscribers(app: &TestApp, session: SessionId, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.state.registry().subscriber_count(session) != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room membership settled");
}

#[tokio::test]
async fn events_socket_joins_room_and_forwards_json() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    let addr = app.serve().await;
    let session = SessionId::new();

    let url = format!("ws://{}/events?sessionId={}", addr, session);
    let (mut socket, _) = tokio_tungstenite::connect_async(url.as_str()).await.unwrap();
    wait_for_subscribers(&app, session, 1).await;

    assert_eq!(app.state.registry().publish(session, ProgressEvent::progress(10)), 1);
    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("frame before timeout")
        .expect("socket open")
        .unwrap();
    assert_eq!(
        frame,
        Message::Text(r#"{"event":"progress","data":{"percentage":"10"}}"#.to_string())
    );

    socket.close(None).await.unwrap();
    wait_for_subscribers(&app, session, 0).await;
    assert_eq!(app.state.registry().publish(session, ProgressEvent::progress(20)), 0);
}

#[tokio::test]
async fn events_socket_rejects_malformed_session_id() {
    let app = TestApp::new(FakeProvider::new(sample_video()));
    let addr = app.serve().await;

    let url = format!("ws://{}/events?sessionId=not-a-session", addr);
    match tokio_tungstenite::connect_async(url.as_str()).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), StatusCode::BAD_REQUEST.as_u16())
        }
        other => panic!("expected HTTP 400, got {:?}", other.map(|(_, r)| r.status())),
    }
}
