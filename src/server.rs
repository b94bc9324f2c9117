use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::config::{AppConfig, OutputMode};
use crate::element::{MessageElement, TAG_NAME, VisualState};
use crate::renderer::bridge::BridgeErrorBody;

/// Start the dev server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    if config.build.output != OutputMode::Static {
        warn!(
            name: "server.output_mode",
            output = ?config.build.output,
            "Only static output is served; continuing with the build directory as-is"
        );
    }

    info!(
        name: "server.config.loaded",
        out_dir = %config.out_dir().display(),
        assets = %config.assets_dir().display(),
        dev_toolbar = config.dev_toolbar.enabled,
        "Build configuration loaded"
    );

    let state = AppState::new(Arc::clone(&config))?;
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router: bridge, preview API, then the static build output.
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(state.config.out_dir());

    Router::new()
        .route("/healthz", get(healthz))
        .route("/ipc/{command}", post(ipc_invoke))
        .route("/api/messages/render", post(api_render_message))
        .route("/api/messages/loading", get(api_loading_message))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

type ApiError = (StatusCode, Json<BridgeErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(BridgeErrorBody {
            error: message.into(),
        }),
    )
}

async fn healthz() -> &'static str {
    "ok"
}

/// POST /ipc/:command - Run a host command with a JSON argument object.
async fn ipc_invoke(
    State(state): State<AppState>,
    Path(command): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(args) =
        payload.map_err(|rejection| api_error(rejection.status(), rejection.body_text()))?;

    state
        .host
        .dispatch(&command, args)
        .await
        .map(Json)
        .map_err(|e| {
            let status =
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            api_error(status, e.to_string())
        })
}

/// Request body for the preview API.
#[derive(Debug, Deserialize)]
struct RenderRequest {
    message: String,
    #[serde(default)]
    is_local_user: bool,
}

/// A serialized `<chat-message>`.
#[derive(Debug, Serialize)]
struct ElementDto {
    id: Uuid,
    state: VisualState,
    html: String,
}

impl From<&MessageElement> for ElementDto {
    fn from(el: &MessageElement) -> Self {
        Self {
            id: el.id(),
            state: el.state(),
            html: el.outer_html(),
        }
    }
}

fn create_element(state: &AppState) -> Result<MessageElement, ApiError> {
    state
        .registry
        .create(TAG_NAME)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// POST /api/messages/render - Render one message bubble.
async fn api_render_message(
    State(state): State<AppState>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<ElementDto>, ApiError> {
    let element = create_element(&state)?;
    let element = element
        .show(&req.message, req.is_local_user)
        .await
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))?;

    Ok(Json(ElementDto::from(element)))
}

/// GET /api/messages/loading - A bubble in its loading state.
async fn api_loading_message(State(state): State<AppState>) -> Result<Json<ElementDto>, ApiError> {
    let element = create_element(&state)?;
    let element = element.show_loading().await;
    Ok(Json(ElementDto::from(element)))
}
