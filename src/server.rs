//! Passthrough HTTP server exposing the raw catalog payloads.
//!
//! Routes:
//! - `GET /ping`
//! - `GET /places`: the upstream place list, unmodified
//! - `GET /page`: the page of the configured default place
//! - `GET /page/{place_id}`: the page of one place

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::client::RadioGardenClient;
use crate::traits::FetchError;

#[derive(Clone)]
pub struct ServerState {
    client: Arc<RadioGardenClient>,
    default_place_id: Arc<str>,
}

impl ServerState {
    pub fn new(client: RadioGardenClient, default_place_id: impl Into<Arc<str>>) -> Self {
        Self {
            client: Arc::new(client),
            default_place_id: default_place_id.into(),
        }
    }
}

struct AppError(FetchError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        warn!("upstream request failed: {}", self.0);
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_GATEWAY, body).into_response()
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        Self(err)
    }
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/places", get(get_places))
        .route("/page", get(get_default_page))
        .route("/page/{place_id}", get(get_page))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Passthrough server listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

async fn get_places(State(state): State<ServerState>) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.client.places_raw().await?))
}

async fn get_default_page(
    State(state): State<ServerState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.client.place_page_raw(&state.default_place_id).await?))
}

async fn get_page(
    State(state): State<ServerState>,
    Path(place_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(state.client.place_page_raw(&place_id).await?))
}
