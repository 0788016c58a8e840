use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Form, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::AlertEvent;
use crate::counters::{EngineError, EngineStats, ShopCounters, ThresholdEngine, THRESHOLD};

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<ThresholdEngine>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Events
// ============================================================================

/// Event fields as read from one source (query string or form body)
#[derive(Debug, Default, Deserialize)]
pub struct EventForm {
    #[serde(default)]
    pub shop: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl EventForm {
    /// Merge body fields over query fields. A field present in the body wins;
    /// a field missing from both reads as an empty string.
    fn merge(body: EventForm, query: EventForm) -> EventFields {
        EventFields {
            shop: body.shop.or(query.shop).unwrap_or_default(),
            code: body.code.or(query.code).unwrap_or_default(),
        }
    }
}

/// Fields of an event after merging all sources
#[derive(Debug)]
struct EventFields {
    shop: String,
    code: String,
}

#[derive(Serialize)]
pub struct EventResponse {
    pub accepted: bool,
    pub alert: Option<AlertEvent>,
}

/// Record an event.
///
/// Fields come from an `application/x-www-form-urlencoded` body and from the
/// query string. Other body types (multipart included) are ignored, leaving
/// only the query string.
pub async fn record_event(
    State(state): State<Arc<AppState>>,
    query: Result<Query<EventForm>, QueryRejection>,
    body: Result<Form<EventForm>, FormRejection>,
) -> Result<Json<EventResponse>, ApiError> {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable query string, ignoring it");
            EventForm::default()
        }
    };
    let body = match body {
        Ok(Form(body)) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable form body, ignoring it");
            EventForm::default()
        }
    };
    let form = EventForm::merge(body, query);

    tracing::info!(shop = %form.shop, code = %form.code, "Received code");

    let alert = state.engine.record_raw(&form.shop, &form.code)?;

    Ok(Json(EventResponse {
        accepted: true,
        alert,
    }))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Serialize)]
pub struct ShopsResponse {
    pub threshold: u32,
    pub shops: Vec<ShopCounters>,
}

pub async fn list_shops(State(state): State<Arc<AppState>>) -> Json<ShopsResponse> {
    Json(ShopsResponse {
        threshold: THRESHOLD,
        shops: state.engine.registry().snapshot_all(),
    })
}

pub async fn shop_counters(
    State(state): State<Arc<AppState>>,
    Path(shop): Path<String>,
) -> Result<Json<ShopCounters>, ApiError> {
    let counters = state
        .engine
        .registry()
        .snapshot(&shop)
        .map_err(|_| ApiError::NotFound("shop not found".to_string()))?;

    Ok(Json(counters))
}

// ============================================================================
// Stats
// ============================================================================

#[derive(Serialize)]
pub struct StatsResponse {
    pub shops: usize,
    pub threshold: u32,
    #[serde(flatten)]
    pub engine: EngineStats,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        shops: state.engine.registry().len(),
        threshold: THRESHOLD,
        engine: state.engine.stats(),
    })
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed,
    BadRequest(String),
    NotFound(String),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::InvalidCode(_) => ApiError::BadRequest("invalid code".to_string()),
            EngineError::UnknownShop(_) => ApiError::NotFound("shop not found".to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
