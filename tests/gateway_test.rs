use axum::body::Body;
use http::{Request, StatusCode};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use sitegate::{build_app, config::GatewayConfig};
use tower::ServiceExt;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const SECRET: &str = "test-secret";

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    email: String,
    role: String,
    iat: i64,
    exp: i64,
}

fn make_token(exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = TestClaims {
        sub: "u1".to_string(),
        email: "a@b.com".to_string(),
        role: "manager".to_string(),
        iat: now,
        exp: now + exp_offset_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// Gateway config with every service pointed at the given backend URL.
fn test_config(backend: &str) -> GatewayConfig {
    let yaml = format!(
        r#"
auth:
  secret: "{SECRET}"

services:
  users: "{backend}"
  tasks: "{backend}"
  orders: "{backend}"

rate_limits:
  policies:
    - name: strict
      requests: 5
      window_secs: 60
    - name: medium
      requests: 60
      window_secs: 60
    - name: high
      requests: 120
      window_secs: 60
  global:
    name: global
    requests: 1000
    window_secs: 3600

routes:
  - path: "/v1/auth/{{*action}}"
    service: users
    methods: [POST]
    public: true
    policy: strict

  - path: "/v1/defects"
    service: tasks
    methods: [GET, POST]
    policy: high

  - path: "/v1/defects/{{id}}"
    service: tasks
    methods: [GET, PUT]
    policy: medium

  - path: "/v1/orders/{{id}}"
    service: orders
    methods: [GET, PUT, DELETE]
    policy: medium
"#
    );

    let config = GatewayConfig::from_yaml(&yaml).unwrap();
    config.validate().unwrap();
    config
}

async fn send(
    app: axum::Router,
    request: Request<Body>,
) -> (StatusCode, http::HeaderMap, bytes::Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

fn error_code(body: &[u8]) -> String {
    let value: serde_json::Value = serde_json::from_slice(body).unwrap();
    assert_eq!(value["success"], serde_json::json!(false));
    value["error"]["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn missing_token_is_401_token_required() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "TOKEN_REQUIRED");
}

#[tokio::test]
async fn expired_token_is_401_token_expired() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .header("Authorization", format!("Bearer {}", make_token(-3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "TOKEN_EXPIRED");
}

#[tokio::test]
async fn garbage_token_is_401_invalid_token() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .header("Authorization", "Bearer not.a.token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "INVALID_TOKEN");
}

#[tokio::test]
async fn identity_headers_reach_the_backend() {
    let mock_server = MockServer::start().await;

    // The mock only matches when all three identity headers arrive intact
    Mock::given(method("GET"))
        .and(path("/v1/defects"))
        .and(header("X-User-ID", "u1"))
        .and(header("X-User-Email", "a@b.com"))
        .and(header("X-User-Role", "manager"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {"defects": []}
        })))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], serde_json::json!(true));
}

#[tokio::test]
async fn backend_response_is_relayed_verbatim_and_idempotent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/defects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true, "data": {"defects": [1, 2]}})),
        )
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let token = make_token(3600);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let app = build_app(&config).unwrap();
        let (status, _, body) = send(
            app,
            Request::builder()
                .uri("/v1/defects")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        bodies.push(body);
    }

    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn query_string_is_forwarded_unchanged() {
    let mock_server = MockServer::start().await;

    // The mock only matches when both query parameters arrive intact
    Mock::given(method("GET"))
        .and(path("/v1/defects"))
        .and(query_param("status", "open"))
        .and(query_param("priority", "high"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true, "data": {"defects": []}})),
        )
        .mount(&mock_server)
        .await;

    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects?status=open&priority=high")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], serde_json::json!(true));
}

#[tokio::test]
async fn backend_error_statuses_are_relayed_not_rewrapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/orders/99"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"success": false, "error": "Order not found"})),
        )
        .mount(&mock_server)
        .await;

    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/orders/99")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    // The backend's own envelope passes through unchanged
    assert_eq!(status, StatusCode::NOT_FOUND);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["error"], serde_json::json!("Order not found"));
}

#[tokio::test]
async fn correlation_id_round_trip() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/defects"))
        .and(header("X-Request-ID", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, headers, _) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .header("X-Request-ID", "abc123")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-request-id").unwrap(), "abc123");
}

#[tokio::test]
async fn correlation_id_generated_when_absent() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    // Even a gateway-originated error carries a generated correlation id
    let (status, headers, _) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let value = headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(!value.is_empty());
}

#[tokio::test]
async fn strict_policy_rejects_sixth_login_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {"token": "signed", "user": {"id": "u1"}}
        })))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let app = build_app(&config).unwrap();

    for _ in 0..5 {
        let (status, _, _) = send(
            app.clone(),
            Request::builder()
                .method("POST")
                .uri("/v1/auth/login")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _, body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email":"a@b.com","password":"pw"}"#))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn unknown_path_is_404_endpoint_not_found() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/nonexistent")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "ENDPOINT_NOT_FOUND");
}

#[tokio::test]
async fn unlisted_method_is_405() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .method("DELETE")
            .uri("/v1/defects")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_code(&body), "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn unreachable_backend_is_503_service_unavailable() {
    // Nothing listens on this port, so the connection is refused
    let app = build_app(&test_config("http://127.0.0.1:1")).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn slow_backend_is_503_service_timeout() {
    let mock_server = MockServer::start().await;

    // Backend answers after 2s, but the forwarding budget is 1s
    Mock::given(method("GET"))
        .and(path("/v1/defects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(std::time::Duration::from_secs(2))
                .set_body_json(serde_json::json!({"success": true})),
        )
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.server.forward_timeout_secs = 1;
    let app = build_app(&config).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/v1/defects")
            .header("Authorization", format!("Bearer {}", make_token(3600)))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_code(&body), "SERVICE_TIMEOUT");
}

#[tokio::test]
async fn health_is_public_and_exempt() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], serde_json::json!("healthy"));
    assert_eq!(value["service"], serde_json::json!("api-gateway"));
}

#[tokio::test]
async fn health_all_aggregates_backends() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "healthy"})))
        .mount(&mock_server)
        .await;

    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/health/all")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], serde_json::json!("healthy"));
    assert_eq!(value["services"]["users"], serde_json::json!("healthy"));
    assert_eq!(value["services"]["tasks"], serde_json::json!("healthy"));
    assert_eq!(value["services"]["orders"], serde_json::json!("healthy"));
}

#[tokio::test]
async fn health_all_reports_degraded_backends() {
    let app = build_app(&test_config("http://127.0.0.1:1")).unwrap();

    let (status, _, body) = send(
        app,
        Request::builder()
            .uri("/health/all")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], serde_json::json!("degraded"));
    assert_eq!(value["services"]["tasks"], serde_json::json!("unreachable"));
}

#[tokio::test]
async fn preflight_options_is_answered_by_the_gateway() {
    let mock_server = MockServer::start().await;
    let app = build_app(&test_config(&mock_server.uri())).unwrap();

    let (status, headers, body) = send(
        app,
        Request::builder()
            .method("OPTIONS")
            .uri("/v1/defects")
            .header("Origin", "http://frontend.local")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn config_loads_from_file() {
    use std::io::Write;

    let mock_server = MockServer::start().await;
    let yaml = format!(
        r#"
auth:
  secret: "{SECRET}"
services:
  users: "{}"
routes:
  - path: "/v1/users"
    service: users
    methods: [GET]
"#,
        mock_server.uri()
    );

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = GatewayConfig::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert!(build_app(&config).is_ok());
}
