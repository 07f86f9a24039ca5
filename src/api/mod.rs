// src/api/mod.rs
//! HTTP surface of the advisor: prediction, feature inspection, chat and the
//! stored history document.

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

use crate::chat::ChatService;
use crate::error::{AdvisorError, AdvisorResult};
use crate::features::build_feature_vector;
use crate::history::{HistoryDocument, PredictionHistory};
use crate::prediction::{PredictionOutput, PredictionService};

/// Everything the handlers need, built once at startup.
pub struct AppContext {
    pub prediction: PredictionService,
    pub chat: ChatService,
    pub history: Arc<PredictionHistory>,
}

pub type AppState = Arc<AppContext>;

#[derive(Debug, Serialize, Deserialize)]
pub struct NamedFeature {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub features_expected: usize,
    pub features: Vec<NamedFeature>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .route("/features", post(features_handler))
        .route("/chat", post(chat_handler))
        .route("/chat/", post(chat_handler))
        .route("/user_data.json", get(history_handler))
        .with_state(state)
}

fn parse_body(body: &Bytes) -> AdvisorResult<JsonValue> {
    serde_json::from_slice(body).map_err(|e| AdvisorError::MalformedJson(e.to_string()))
}

async fn index_handler(State(state): State<AppState>) -> Json<JsonValue> {
    Json(json!({
        "message": "Savings Prediction API Running!",
        "features_expected": state.prediction.features_expected(),
    }))
}

async fn health_handler() -> Json<JsonValue> {
    Json(json!({ "status": "healthy", "models_loaded": true }))
}

async fn predict_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AdvisorResult<Json<PredictionOutput>> {
    let body = parse_body(&body)?;
    let output = state.prediction.predict(&body).await?;
    Ok(Json(output))
}

async fn features_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AdvisorResult<Json<FeaturesResponse>> {
    let body = parse_body(&body)?;
    if !body.is_object() {
        return Err(AdvisorError::NotAnObject);
    }
    let schema = state.prediction.schema();
    let (derived, vector) = build_feature_vector(schema, &body)?;
    debug!("Derived {} features, {} in schema", derived.len(), vector.len());

    let features = schema
        .names()
        .iter()
        .zip(vector.as_slice())
        .map(|(name, value)| NamedFeature {
            name: name.clone(),
            value: f64::from(*value),
        })
        .collect();
    Ok(Json(FeaturesResponse {
        features_expected: schema.len(),
        features,
    }))
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AdvisorResult<Json<ChatResponse>> {
    let body = parse_body(&body)?;
    let message = body
        .get("message")
        .and_then(JsonValue::as_str)
        .ok_or(AdvisorError::NoMessage)?;
    let response = state.chat.reply(message).await?;
    Ok(Json(ChatResponse { response }))
}

async fn history_handler(State(state): State<AppState>) -> AdvisorResult<Json<HistoryDocument>> {
    Ok(Json(state.history.read_all().await?))
}
