use crate::define_routes;
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use events::EventPublisher;
use serde_json::{json, Value};
use service::{api_token::ApiToken, config::Config, AppState};
use std::sync::Arc;
use tower::ServiceExt;
use transport::mock::{MemoryCredentialStore, MockSession, MockSessions, MockTransportFactory};
use transport::{CloseInfo, Credentials, TransportEvent};

const TOKEN: &str = "test-token";

struct TestApp {
    router: Router,
    sessions: MockSessions,
    sse_manager: Arc<sse::Manager>,
}

impl TestApp {
    fn new(args: &[&str]) -> Self {
        Self::with_store(args, MemoryCredentialStore::new())
    }

    fn with_store(args: &[&str], store: MemoryCredentialStore) -> Self {
        let mut argv = vec!["courier_rs"];
        argv.extend_from_slice(args);
        let config = Config::from_args(argv)
            .unwrap()
            .set_api_token(TOKEN.to_string());
        let (api_token, generated) = ApiToken::resolve(config.api_token());
        assert!(generated.is_none());

        let (factory, sessions) = MockTransportFactory::new();
        let sse_manager = Arc::new(sse::Manager::new());
        let publisher = EventPublisher::new().with_handler(Arc::new(
            sse::SseDomainEventHandler::new(sse_manager.clone()),
        ));
        let connection = connection::Manager::spawn(
            config.manager_config(),
            Arc::new(factory),
            Arc::new(store),
            publisher,
        );
        let app_state = AppState::new(
            config,
            connection,
            sse_manager.clone(),
            api_token,
        );

        Self {
            router: define_routes(app_state),
            sessions,
            sse_manager,
        }
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, headers, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Value) {
        self.call(authorized("GET", uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post(&self, uri: &str) -> (StatusCode, HeaderMap, Value) {
        self.call(authorized("POST", uri).body(Body::empty()).unwrap())
            .await
    }

    async fn send_message(&self, destination: &str, body: &str) -> (StatusCode, HeaderMap, Value) {
        let payload = json!({"destination": destination, "body": body});
        self.call(
            authorized("POST", "/messages")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Initializes and returns the created session, opened when `open` is set.
    async fn connect(&mut self, open: bool) -> MockSession {
        let (status, _, _) = self.post("/connection/initialize").await;
        assert_eq!(status, StatusCode::OK);
        let session = self.sessions.next().await;
        if open {
            session.open();
            settle().await;
        }
        session
    }
}

fn authorized(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

fn retry_after(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let app = TestApp::new(&[]);

    let (status, _, body) = app
        .call(Request::get("/health").body(Body::empty()).unwrap())
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("healthy"));
}

#[tokio::test]
async fn test_protected_routes_require_the_api_token() {
    let app = TestApp::new(&[]);

    let (status, _, body) = app
        .call(
            Request::get("/connection/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"status_code": 401, "error": "Unauthorized"}));

    let (status, _, _) = app
        .call(
            Request::get("/connection/status")
                .header(header::AUTHORIZATION, "Bearer wrong-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = app
        .call(
            Request::get("/connection/status")
                .header("x-api-key", TOKEN)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_reports_summary() {
    let app = TestApp::new(&[]);

    let (status, _, body) = app.get("/connection/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status_code": 200,
            "data": {"connected": false, "has_pairing_artifact": false, "attempt_count": 0}
        })
    );
}

#[tokio::test]
async fn test_detailed_status_reports_phase() {
    let mut app = TestApp::new(&[]);
    app.connect(true).await;

    let (status, _, body) = app.get("/connection/status/detailed").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "open");
    assert_eq!(body["data"]["connected"], true);
    assert_eq!(body["data"]["max_attempts"], 5);
    assert_eq!(body["data"]["has_session_handle"], true);
}

#[tokio::test]
async fn test_configured_device_name_reaches_the_session() {
    let mut app = TestApp::new(&["--device-name", "deploy-alerts"]);

    let session = app.connect(false).await;

    assert_eq!(session.options().device_name, "deploy-alerts");
}

#[tokio::test]
async fn test_initialize_during_cooldown_is_429_with_retry_after() {
    let mut app = TestApp::new(&["--reconnect-cooldown-ms", "120000"]);
    app.connect(false).await;

    let (status, headers, body) = app.post("/connection/initialize").await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(retry_after(&headers), Some("120"));
    assert_eq!(body["status_code"], 429);
    assert!(app.sessions.try_next().is_none());
}

#[tokio::test]
async fn test_initialize_after_auth_revocation_is_409() {
    let mut app = TestApp::new(&["--reconnect-cooldown-ms", "0"]);
    let session = app.connect(true).await;
    session.emit(TransportEvent::Closed(CloseInfo::logged_out("logged out")));
    settle().await;

    let (status, _, _) = app.post("/connection/initialize").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = app.post("/connection/reconnect").await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.sessions.try_next().is_some());
}

#[tokio::test]
async fn test_reset_clears_connection_state() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(false).await;
    session.pairing_code("2@pairing");
    settle().await;

    let (status, _, body) = app.post("/connection/reset").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"connected": false, "has_pairing_artifact": false, "attempt_count": 0})
    );
    assert!(session.ended());
}

#[tokio::test]
async fn test_disconnect_ends_the_session() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(true).await;

    let (status, _, body) = app.post("/connection/disconnect").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected"], false);
    assert!(session.ended());
}

#[tokio::test]
async fn test_clear_credentials_returns_removed_entries() {
    let mut credentials = Credentials::new();
    credentials.insert("creds", json!({"me": "123"}));
    let mut app = TestApp::with_store(&[], MemoryCredentialStore::with_entries(credentials));
    app.connect(true).await;

    let (status, _, body) = app
        .call(
            authorized("DELETE", "/connection/credentials")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"removed": ["creds.json"]}));
    let fresh = app.sessions.try_next().unwrap();
    assert!(fresh.credentials().is_empty());
}

#[tokio::test]
async fn test_pairing_code_is_404_until_issued() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(false).await;

    let (status, _, _) = app.get("/connection/pairing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    session.pairing_code("2@pairing-code");
    settle().await;

    let (status, _, body) = app.get("/connection/pairing").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["content"]
        .as_str()
        .unwrap()
        .starts_with("data:image/svg+xml;base64,"));
    assert!(body["data"]["issued_at"].is_string());

    let (status, _, body) = app.get("/connection/pairing?format=text").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"]["content"]
        .as_str()
        .unwrap()
        .starts_with("data:"));

    let (status, _, _) = app.get("/connection/pairing?format=png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_message_when_connected() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(true).await;

    let (status, _, body) = app.send_message("+1234567890", "Deploy finished").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["normalized_destination"],
        "1234567890@s.whatsapp.net"
    );
    assert!(!body["data"]["delivery_id"].as_str().unwrap().is_empty());
    assert_eq!(session.sent().len(), 1);
}

#[tokio::test]
async fn test_send_message_when_not_connected_is_503_with_retry_after() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(false).await;

    let (status, headers, body) = app.send_message("+1234567890", "hello").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(retry_after(&headers), Some("30"));
    assert_eq!(body["status_code"], 503);
    assert!(session.sent().is_empty());
}

#[tokio::test]
async fn test_send_message_with_invalid_destination_is_400() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(true).await;

    let (status, _, body) = app.send_message("abc", "hello").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("destination"));
    assert!(session.sent().is_empty());
}

#[tokio::test]
async fn test_send_message_transport_failure_is_502() {
    let mut app = TestApp::new(&[]);
    let session = app.connect(true).await;
    session.fail_sends("recipient not on network");

    let (status, _, body) = app.send_message("+1234567890", "hello").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body,
        json!({"status_code": 502, "error": "recipient not on network"})
    );
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let app = TestApp::new(&["--rate-limit-max-requests", "2"]);

    for _ in 0..2 {
        let (status, _, _) = app.get("/connection/status").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, headers, body) = app.get("/connection/status").await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(retry_after(&headers), Some("60"));
    assert_eq!(body["status_code"], 429);

    let (status, _, _) = app
        .call(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_event_stream_registers_subscriber() {
    let app = TestApp::new(&[]);

    let response = app
        .router
        .clone()
        .oneshot(
            authorized("GET", "/connection/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(app.sse_manager.connection_count(), 1);
}

#[tokio::test]
async fn test_init_server_reports_a_taken_port() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = taken.local_addr().unwrap().port().to_string();
    let config = Config::from_args([
        "courier_rs",
        "--interface",
        "127.0.0.1",
        "--port",
        port.as_str(),
    ])
    .unwrap();
    let (factory, _sessions) = MockTransportFactory::new();
    let connection = connection::Manager::spawn(
        config.manager_config(),
        Arc::new(factory),
        Arc::new(MemoryCredentialStore::new()),
        EventPublisher::new(),
    );
    let app_state = AppState::new(
        config,
        connection,
        Arc::new(sse::Manager::new()),
        ApiToken::new(TOKEN),
    );

    let served = crate::init_server(app_state, std::future::pending::<()>()).await;

    assert_eq!(
        served.unwrap_err().kind(),
        std::io::ErrorKind::AddrInUse
    );
}
