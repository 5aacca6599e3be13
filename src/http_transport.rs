//! REST surface of the gateway
//!
//! ```text
//! GET  /health
//! GET  /:family                 device names
//! GET  /:family/:name           status of one device
//! POST /:family/:name           {code, value?}
//! POST /:family                 {code, value?, devices?}
//! ```
//!
//! Every control route answers with `{"succeeded": [...], "failed": [...]}`
//! or an error body from [`ErrorReporter::format_api_error`].

use crate::error::{ErrorClass, ErrorReporter, GatewayError, Result};
use crate::logging::LoggingMiddleware;
use crate::server::{Dispatcher, InvokeResponse, STATUS_CODE};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// Control value as sent by clients: a JSON string or integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Int(i64),
    Text(String),
}

impl ControlValue {
    pub fn into_string(self) -> String {
        match self {
            ControlValue::Int(v) => v.to_string(),
            ControlValue::Text(s) => s,
        }
    }
}

/// Body of `POST /:family/:name`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceControlRequest {
    pub code: String,
    #[serde(default)]
    pub value: Option<ControlValue>,
}

/// Body of `POST /:family`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyControlRequest {
    pub code: String,
    #[serde(default)]
    pub value: Option<ControlValue>,
    #[serde(default)]
    pub devices: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: String,
    families: usize,
    devices: usize,
}

/// Error wrapper mapping [`GatewayError`] onto HTTP statuses
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match (&self.0, self.0.class()) {
            (GatewayError::UnknownFamily(_) | GatewayError::UnknownDevice(_), _) => {
                StatusCode::NOT_FOUND
            }
            (_, ErrorClass::Client) => StatusCode::BAD_REQUEST,
            (
                GatewayError::AllTargetsFailed(_) | GatewayError::AllTargetsUnreachable(_),
                _,
            )
            | (_, ErrorClass::Transport) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ErrorReporter::log_error(&self.0, "http", "request");
        let body = ErrorReporter::format_api_error(&self.0);
        (self.status_code(), Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Build the router over a dispatcher
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = AppState { dispatcher };

    Router::new()
        .route("/health", get(health_check))
        .route("/:family", get(list_devices).post(control_family))
        .route("/:family/:name", get(device_status).post(control_device))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.dispatcher.registry();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        families: registry.family_names().count(),
        devices: registry.device_count(),
    })
}

async fn list_devices(
    State(state): State<AppState>,
    Path(family): Path<String>,
) -> ApiResult<Vec<String>> {
    let family = state.dispatcher.registry().family(&family)?;
    Ok(Json(family.names()))
}

async fn device_status(
    State(state): State<AppState>,
    Path((family, name)): Path<(String, String)>,
) -> ApiResult<InvokeResponse> {
    let targets = [name];
    let response = state
        .dispatcher
        .invoke(&family, Some(&targets[..]), STATUS_CODE, None)
        .await?;
    Ok(Json(response))
}

async fn control_device(
    State(state): State<AppState>,
    Path((family, name)): Path<(String, String)>,
    Json(request): Json<DeviceControlRequest>,
) -> ApiResult<InvokeResponse> {
    LoggingMiddleware::log_request(&family, &serde_json::to_value(&request).unwrap_or_default());

    let value = request.value.map(ControlValue::into_string);
    let targets = [name];
    let response = state
        .dispatcher
        .invoke(&family, Some(&targets[..]), &request.code, value.as_deref())
        .await?;
    Ok(Json(response))
}

async fn control_family(
    State(state): State<AppState>,
    Path(family): Path<String>,
    Json(request): Json<FamilyControlRequest>,
) -> ApiResult<InvokeResponse> {
    LoggingMiddleware::log_request(&family, &serde_json::to_value(&request).unwrap_or_default());

    let value = request.value.map(ControlValue::into_string);
    let response = state
        .dispatcher
        .invoke(
            &family,
            request.devices.as_deref(),
            &request.code,
            value.as_deref(),
        )
        .await?;
    Ok(Json(response))
}

/// HTTP transport server
pub struct HttpTransportServer {
    dispatcher: Arc<Dispatcher>,
    bind: String,
}

impl HttpTransportServer {
    pub fn new(dispatcher: Dispatcher, bind: impl Into<String>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            bind: bind.into(),
        }
    }

    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.dispatcher))
    }

    /// Serve until `shutdown` resolves
    pub async fn start_with_shutdown<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.bind).await.map_err(|e| {
            GatewayError::config(format!("Failed to bind to {}: {e}", self.bind))
        })?;

        let registry = self.dispatcher.registry();
        info!(
            bind = %self.bind,
            families = registry.family_names().count(),
            devices = registry.device_count(),
            "HTTP gateway listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP gateway stopped");
        Ok(())
    }

    /// Serve until Ctrl-C
    pub async fn start(&self) -> Result<()> {
        self.start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
            }
        })
        .await
    }
}
