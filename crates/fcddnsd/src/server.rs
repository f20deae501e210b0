// HTTP entry point.
//
// Routes:
// - `/healthz`: liveness check
// - `/myip`: echoes the caller's address
// - `/ddns/v1/{token}[/{ip}]`: the update endpoint, any method
// - anything else: 404
//
// Inside Aliyun Function Compute every request carries `x-fc-*` headers with
// the request id and STS credentials of the invocation; they are turned into
// an `InvocationContext` here.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fcddns_core::{DdnsRequest, DdnsResponse, DdnsService, Error, InvocationContext, SessionCredentials};
use tracing::info;

/// Path prefix of the update endpoint
const DDNS_ROUTE: &str = "/ddns/v1";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DdnsService>,
    pub trust_forwarded_for: bool,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/myip", get(myip))
        .fallback(gateway)
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves
pub async fn run(
    addr: &str,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}

/// Route a path to the matching endpoint
///
/// Shared by the HTTP server and the Lambda adapter.
pub async fn dispatch(
    service: &DdnsService,
    ctx: &InvocationContext,
    path: &str,
    client_ip: Option<String>,
) -> DdnsResponse {
    match path {
        "/healthz" => DdnsResponse::ok("ok"),
        "/myip" => match client_ip {
            Some(ip) => DdnsResponse::ok(ip),
            None => DdnsResponse::from_error(&Error::MissingIp),
        },
        _ if path.starts_with(DDNS_ROUTE) => {
            let mut request = DdnsRequest::new(path);
            if let Some(ip) = client_ip {
                request = request.with_client_ip(ip);
            }
            service.handle(ctx, &request).await
        }
        _ => DdnsResponse {
            status_code: 404,
            body: format!("path not found: {path}"),
        },
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn myip(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let ctx = InvocationContext::new();
    let client_ip = client_ip(&headers, connect.as_ref(), state.trust_forwarded_for);
    into_response(dispatch(&state.service, &ctx, "/myip", client_ip).await)
}

async fn gateway(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    connect: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let ctx = invocation_context(&headers);
    let client_ip = client_ip(&headers, connect.as_ref(), state.trust_forwarded_for);
    into_response(dispatch(&state.service, &ctx, uri.path(), client_ip).await)
}

fn into_response(response: DdnsResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body).into_response()
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Build the invocation context from Function Compute headers
pub fn invocation_context(headers: &HeaderMap) -> InvocationContext {
    let mut ctx = InvocationContext::new();

    if let Some(request_id) = header(headers, "x-fc-request-id") {
        ctx = ctx.with_request_id(request_id);
    }

    if let (Some(id), Some(secret)) = (
        header(headers, "x-fc-access-key-id"),
        header(headers, "x-fc-access-key-secret"),
    ) {
        ctx = ctx.with_credentials(SessionCredentials {
            access_key_id: id.to_string(),
            access_key_secret: secret.to_string(),
            security_token: header(headers, "x-fc-security-token").map(str::to_string),
        });
    }

    ctx
}

/// The caller's address
///
/// `X-Forwarded-For` is only honoured when configured; its first entry is
/// the original client.
pub fn client_ip(
    headers: &HeaderMap,
    connect: Option<&ConnectInfo<SocketAddr>>,
    trust_forwarded_for: bool,
) -> Option<String> {
    if trust_forwarded_for
        && let Some(forwarded) = header(headers, "x-forwarded-for")
        && let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty())
    {
        return Some(first.to_string());
    }

    connect.map(|ConnectInfo(addr)| addr.ip().to_string())
}
