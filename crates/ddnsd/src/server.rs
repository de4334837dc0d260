// # HTTP surface
//
// Routes:
// - `GET /ping`: liveness, always 204
// - `POST /`: direct update, JSON body `{"domain", "secret"}`, 204 on success
// - `GET /nic/update`, `GET /v3/update`: DynDNS-style update, `good <ip>`
//
// Handlers only translate between HTTP and `UpdateEngine`; every decision is
// made in ddns-core.

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use ddns_core::{DomainUpdateRequest, DynDnsUpdateRequest, Error, RequestOrigin, UpdateEngine};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, warn};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    engine: Arc<UpdateEngine>,
}

/// Build the router over an engine
pub fn router(engine: Arc<UpdateEngine>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/nic/update", get(dyndns_update))
        .route("/v3/update", get(dyndns_update))
        .route("/", post(direct_update))
        .with_state(AppState { engine })
}

/// Serve until `shutdown` resolves
///
/// In-flight requests are allowed to finish once shutdown starts.
pub async fn serve<F>(
    listener: TcpListener,
    engine: Arc<UpdateEngine>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router(engine).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

/// An engine error on its way out as an HTTP response
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Full detail goes to the log only
        warn!("HTTP {}: {}", status.as_u16(), self.0);

        let message = self.0.public_message().unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        });
        (status, format!("{}\n", message)).into_response()
    }
}

async fn ping() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn direct_update(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    let body = body.map_err(|e| Error::malformed_body(e.body_text()))?;
    let request = DomainUpdateRequest::from_body(&body)?;
    let origin = request_origin(peer, &headers);

    let outcome = state.engine.direct_update(&request, &origin).await?;
    debug!("Direct update for {}: {:?}", request.domain, outcome);
    Ok(StatusCode::NO_CONTENT)
}

async fn dyndns_update(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<DynDnsUpdateRequest>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(request) = query.map_err(|e| Error::invalid_parameters(e.body_text()))?;
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let origin = request_origin(peer, &headers);

    Ok(state
        .engine
        .dyndns_update(&request, authorization, &origin)
        .await?)
}

fn request_origin(peer: SocketAddr, headers: &HeaderMap) -> RequestOrigin {
    let origin = RequestOrigin::new(peer.ip());
    match headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
    {
        Some(forwarded_for) => origin.with_forwarded_for(forwarded_for),
        None => origin,
    }
}
