use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub gateway_environment: String,
    pub card_encryption_configured: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version,
        gateway_environment: state.service.sdk().config().environment.to_string(),
        card_encryption_configured: state.card_public_key.is_some(),
    })
}
