use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tabchat::{
    AskRequest, AskResponse, Relay,
    protocol::{ErrorBody, HealthResponse, PLOT_UNAVAILABLE},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

#[derive(Clone)]
pub struct ServerState {
    pub relay: Arc<Relay>,
    pub auth_key: Option<String>,
}

pub fn router(state: ServerState, allow_origins: &[String]) -> Router {
    Router::new()
        .route("/ask", post(handle_ask))
        .route("/plot", get(handle_plot))
        .route("/health", get(handle_health))
        .layer(cors_layer(allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentialed CORS for the chat client's origin.
///
/// A wildcard cannot be combined with credentials, so `*` is served by
/// echoing the caller's origin back.
fn cors_layer(allow_origins: &[String]) -> CorsLayer {
    let allow_origin = if allow_origins.is_empty() || allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let origins: Vec<HeaderValue> = allow_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

#[allow(clippy::result_large_err)]
fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(key) = &state.auth_key else {
        return Ok(());
    };

    let unauthorized = |msg: &str| {
        (StatusCode::UNAUTHORIZED, Json(ErrorBody::new(msg))).into_response()
    };

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| unauthorized("Missing authorization"))?;
    let auth_str = auth_header
        .to_str()
        .map_err(|_| unauthorized("Invalid authorization header"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if token == key => Ok(()),
        _ => {
            warn!("unauthorized request");
            Err(unauthorized("Invalid API key"))
        }
    }
}

async fn handle_ask(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, Response> {
    authorize(&state, &headers)?;

    // The agent runs to completion even if the client hangs up first.
    let relay = state.relay.clone();
    let task = tokio::spawn(async move { relay.ask(&req.question).await });
    let resp = match task.await {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, "agent task aborted");
            AskResponse::failed(format!("Agent task aborted: {e}"))
        }
    };
    Ok(Json(resp))
}

async fn handle_plot(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if let Err(resp) = authorize(&state, &headers) {
        return resp;
    }

    match state.relay.plot().await {
        Ok(Some(image)) => (
            [
                (header::CONTENT_TYPE, image.media_type),
                (header::CACHE_CONTROL, "no-store"),
            ],
            image.bytes,
        )
            .into_response(),
        Ok(None) => Json(ErrorBody::new(PLOT_UNAVAILABLE)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to read plot artifact");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response()
        }
    }
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
