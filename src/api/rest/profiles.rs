use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::api::rest::bearer_identity;
use crate::error::AppError;
use crate::models::profile::{UserProfile, UserRole};
use crate::policy::pincode::extract_pincode;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/profiles/me", get(get_profile).put(upsert_profile))
}

#[derive(Deserialize)]
pub struct UpsertProfileRequest {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub role: UserRole,
    pub pincode: Option<String>,
    pub is_available: Option<bool>,
}

async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }

    // Picker-only fields; a picker's service area falls back to whatever
    // pincode their address carries.
    let (pincode, is_available) = match payload.role {
        UserRole::Picker => {
            let pincode = payload
                .pincode
                .filter(|pincode| !pincode.trim().is_empty())
                .or_else(|| extract_pincode(&payload.address).map(str::to_string));
            (pincode, payload.is_available)
        }
        UserRole::Generator => (None, None),
    };

    let now = Utc::now();
    let created_at = state
        .profiles
        .get(&viewer.user_id)
        .map(|existing| existing.created_at)
        .unwrap_or(now);

    let profile = UserProfile {
        user_id: viewer.user_id,
        name: payload.name,
        email: viewer.email,
        phone: payload.phone,
        address: payload.address,
        role: payload.role,
        pincode,
        is_available,
        created_at,
        updated_at: now,
    };

    state.profiles.insert(viewer.user_id, profile.clone());
    Ok(Json(profile))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;

    let profile = state
        .profiles
        .get(&viewer.user_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("profile not set up yet".to_string()))?;

    Ok(Json(profile))
}
