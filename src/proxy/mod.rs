use crate::auth::{extract_bearer_token, Claims, TokenVerifier};
use crate::error::{GatewayError, Result};
use crate::rate_limit::RateLimiterService;
use crate::registry::BackendRegistry;
use crate::router::RouteTable;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Method, Request, Response},
    response::IntoResponse,
};
use bytes::Bytes;
use http_body_util::BodyExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Correlation id header, reused from the inbound request when present and
/// echoed back on every response.
pub const HEADER_REQUEST_ID: &str = "x-request-id";
/// Identity headers injected on forwarded calls. Backends trust these
/// implicitly, which requires that they are unreachable except through the
/// gateway's network.
pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_EMAIL: &str = "x-user-email";
pub const HEADER_USER_ROLE: &str = "x-user-role";

/// Shared gateway state handed to every request handler.
#[derive(Clone)]
pub struct GatewayState {
    pub table: Arc<RouteTable>,
    pub registry: Arc<BackendRegistry>,
    pub verifier: Arc<TokenVerifier>,
    pub limiter: Arc<RateLimiterService>,
    /// Forwarding client, bounded by the per-call timeout
    pub client: reqwest::Client,
    /// Short-timeout client for health probes
    pub health_client: reqwest::Client,
}

impl GatewayState {
    pub fn new(
        table: RouteTable,
        registry: BackendRegistry,
        verifier: TokenVerifier,
        limiter: RateLimiterService,
        forward_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(forward_timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let health_client = reqwest::Client::builder()
            .timeout(health_timeout)
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            table: Arc::new(table),
            registry: Arc::new(registry),
            verifier: Arc::new(verifier),
            limiter: Arc::new(limiter),
            client,
            health_client,
        })
    }
}

/// Gateway request handler: route match, public bypass or auth check, rate
/// limit check, then forwarding. Every response carries the correlation id,
/// gateway-originated errors included.
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    req: Request<Body>,
) -> Response<Body> {
    let client_key = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let request_id = correlation_id(req.headers());

    let mut response = match handle(&state, req, &client_key, &request_id).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, code = e.code(), "Request rejected by gateway");
            e.into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(HEADER_REQUEST_ID, value);
    }

    response
}

/// The per-request policy chain.
async fn handle(
    state: &GatewayState,
    req: Request<Body>,
    client_key: &str,
    request_id: &str,
) -> Result<Response<Body>> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = uri.path();
    let query = uri.query();

    info!(
        method = %method,
        path = %path,
        client = %client_key,
        request_id = %request_id,
        "Incoming request"
    );

    let route_match = state.table.match_route(path, &method)?;
    let route = &route_match.route;

    // Public routes skip the auth check entirely
    let claim = if route.public {
        debug!(path = %path, "Public route, bypassing authentication");
        None
    } else {
        let token = extract_bearer_token(req.headers())?;
        let claims = state.verifier.verify(token)?;
        debug!(user_id = %claims.sub, role = %claims.role, "Authentication successful");
        Some(claims)
    };

    state.limiter.check(client_key, &route.policy)?;

    let body_bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::Internal(format!("Failed to read request body: {}", e)))?
        .to_bytes();

    let backend = state.registry.resolve(&route.service)?;
    let target = match query {
        Some(q) => format!("{}{}?{}", backend, path, q),
        None => format!("{}{}", backend, path),
    };

    debug!(target = %target, service = %route.service, "Forwarding to backend");

    forward(
        &state.client,
        &method,
        &target,
        request_id,
        claim.as_ref(),
        body_bytes,
    )
    .await
}

/// Forward one request to a backend and relay its response verbatim.
///
/// The outbound request carries a JSON content type, the correlation id,
/// and (when a claim was verified) the identity headers. GET and DELETE
/// calls are sent without a body.
pub async fn forward(
    client: &reqwest::Client,
    method: &Method,
    target: &str,
    request_id: &str,
    claim: Option<&Claims>,
    body_bytes: Bytes,
) -> Result<Response<Body>> {
    let mut backend_req = client
        .request(method.clone(), target)
        .header("content-type", "application/json")
        .header(HEADER_REQUEST_ID, request_id);

    if let Some(claims) = claim {
        backend_req = backend_req
            .header(HEADER_USER_ID, claims.sub.as_str())
            .header(HEADER_USER_EMAIL, claims.email.as_str())
            .header(HEADER_USER_ROLE, claims.role.as_str());
    }

    if *method != Method::GET && *method != Method::DELETE {
        backend_req = backend_req.body(body_bytes.to_vec());
    }

    let backend_response = backend_req.send().await.map_err(classify_transport_error)?;

    let status = backend_response.status();
    let mut response_builder = Response::builder().status(status);

    for (name, value) in backend_response.headers() {
        if !is_hop_by_hop_header(name.as_str()) {
            response_builder = response_builder.header(name, value);
        }
    }

    let response_bytes = backend_response
        .bytes()
        .await
        .map_err(|e| GatewayError::ServiceError(format!("Failed to read backend response: {}", e)))?;

    response_builder
        .body(Body::from(response_bytes))
        .map_err(|e| GatewayError::Internal(format!("Failed to build response: {}", e)))
}

/// Translate a transport failure on the gateway-to-backend hop into one of
/// the three 503 codes. Operationally equivalent, diagnostically distinct.
fn classify_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::ServiceTimeout(e.to_string())
    } else if e.is_connect() {
        GatewayError::ServiceUnavailable(e.to_string())
    } else {
        GatewayError::ServiceError(e.to_string())
    }
}

/// Reuse the inbound correlation id if present and non-empty, otherwise
/// generate a fresh one.
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(HEADER_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Check if a header is a hop-by-hop header that should not be relayed
fn is_hop_by_hop_header(name: &str) -> bool {
    matches!(
        name.to_lowercase().as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
