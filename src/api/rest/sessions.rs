use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::api::rest::bearer_token;
use crate::auth::Session;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/login", post(sign_in))
        .route("/auth/logout", post(sign_out))
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state.sessions.sign_up(&payload.email, &payload.password)?;
    Ok(Json(session))
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state.sessions.sign_in(&payload.email, &payload.password)?;
    Ok(Json(session))
}

async fn sign_out(State(state): State<Arc<AppState>>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.sign_out(token);
    }
    StatusCode::NO_CONTENT
}
