use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::bearer_identity;
use crate::error::AppError;
use crate::models::pickup::{Location, PickupRecord, Quantity, WasteType};
use crate::service::{self, NewPickup};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pickups", post(create_pickup).get(list_pickups))
        .route("/pickups/:id", get(get_pickup))
        .route("/pickups/:id/accept", post(accept_pickup))
        .route("/pickups/:id/complete", post(complete_pickup))
        .route("/pickups/:id/cancel", post(cancel_pickup))
        .route("/pickups/:id/rating", post(attach_rating))
}

#[derive(Deserialize)]
pub struct CreatePickupRequest {
    pub waste_types: Vec<WasteType>,
    pub quantity: Quantity,
    pub pickup_date: DateTime<Utc>,
    pub location: Option<Location>,
    pub user_address: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Deserialize)]
pub struct RatingRequest {
    pub rating: u8,
    pub comment: Option<String>,
}

async fn create_pickup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CreatePickupRequest>,
) -> Result<Json<PickupRecord>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;

    let record = service::create_pickup(
        &state,
        viewer.user_id,
        NewPickup {
            waste_types: payload.waste_types,
            quantity: payload.quantity,
            pickup_date: payload.pickup_date,
            location: payload.location,
            user_address: payload.user_address,
            pincode: payload.pincode,
        },
    )
    .await?;

    Ok(Json(record))
}

async fn list_pickups(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<PickupRecord>>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;
    Ok(Json(service::visible_pickups(&state, viewer.user_id)))
}

async fn get_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PickupRecord>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;
    let record = service::get_visible_pickup(&state, viewer.user_id, id)?;
    Ok(Json(record))
}

async fn accept_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PickupRecord>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;
    let record = service::accept_pickup(&state, viewer.user_id, id)?;
    Ok(Json(record))
}

async fn complete_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PickupRecord>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;
    let record = service::complete_pickup(&state, viewer.user_id, id)?;
    Ok(Json(record))
}

async fn cancel_pickup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<PickupRecord>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;
    let record = service::cancel_pickup(&state, viewer.user_id, id)?;
    Ok(Json(record))
}

async fn attach_rating(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<PickupRecord>, AppError> {
    let viewer = bearer_identity(&state, &headers)?;
    let record =
        service::attach_rating(&state, viewer.user_id, id, payload.rating, payload.comment)?;
    Ok(Json(record))
}
