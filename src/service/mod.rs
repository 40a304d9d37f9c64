use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::geocode::ADDRESS_PLACEHOLDER;
use crate::models::pickup::{Location, PickupDraft, PickupRecord, Quantity, WasteType};
use crate::models::profile::UserRole;
use crate::policy::lifecycle;
use crate::policy::ordering::order_for_display;
use crate::policy::pincode::extract_pincode;
use crate::policy::visibility::{visibility_for, Visibility};
use crate::state::AppState;
use crate::store::PickupFeed;

/// Caller-supplied fields for scheduling a pickup.
#[derive(Debug, Clone)]
pub struct NewPickup {
    pub waste_types: Vec<WasteType>,
    pub quantity: Quantity,
    pub pickup_date: DateTime<Utc>,
    pub location: Option<Location>,
    pub user_address: Option<String>,
    pub pincode: Option<String>,
}

/// Schedule a pickup for a generator. The pincode is taken explicitly when
/// supplied, otherwise derived from the location address, then from the
/// owner's saved address. A location whose address is blank is filled by
/// the reverse geocoder, falling back to the placeholder.
pub async fn create_pickup(
    state: &AppState,
    owner_id: Uuid,
    new: NewPickup,
) -> Result<PickupRecord, AppError> {
    let owner_address = {
        let profile = state
            .profiles
            .get(&owner_id)
            .ok_or_else(|| AppError::Forbidden("caller has no profile".to_string()))?;
        if profile.role != UserRole::Generator {
            return Err(AppError::Forbidden(
                "only generators can schedule pickups".to_string(),
            ));
        }
        profile.address.clone()
    };

    if new.waste_types.is_empty() {
        return Err(AppError::Validation(
            "at least one waste type is required".to_string(),
        ));
    }

    let location = match new.location {
        Some(mut location) => {
            if location.address.trim().is_empty() {
                location.address = match &state.geocoder {
                    Some(geocoder) => geocoder.lookup(location.lat, location.lng).await,
                    None => ADDRESS_PLACEHOLDER.to_string(),
                };
            }
            Some(location)
        }
        None => None,
    };

    let user_address = new
        .user_address
        .filter(|address| !address.trim().is_empty())
        .or_else(|| (!owner_address.trim().is_empty()).then_some(owner_address));

    let pincode = new
        .pincode
        .filter(|pincode| !pincode.trim().is_empty())
        .or_else(|| {
            location
                .as_ref()
                .and_then(|l| extract_pincode(&l.address).map(str::to_string))
        })
        .or_else(|| {
            user_address
                .as_deref()
                .and_then(|a| extract_pincode(a).map(str::to_string))
        });

    let record = state.store.create(PickupDraft {
        owner_id,
        waste_types: new.waste_types,
        quantity: new.quantity,
        pickup_date: new.pickup_date,
        location,
        user_address,
        pincode,
    });

    state.metrics.pickups_created_total.inc();
    info!(
        pickup_id = %record.id,
        owner_id = %owner_id,
        pincode = record.pincode.as_deref().unwrap_or("-"),
        "pickup scheduled"
    );

    Ok(record)
}

/// Claim a pending pickup for a picker. The precondition (still pending,
/// unassigned) is checked by the store together with the write, so of two
/// racing claims exactly one succeeds.
pub fn accept_pickup(
    state: &AppState,
    picker_id: Uuid,
    pickup_id: Uuid,
) -> Result<PickupRecord, AppError> {
    {
        let profile = state
            .profiles
            .get(&picker_id)
            .ok_or_else(|| AppError::Forbidden("caller has no profile".to_string()))?;
        if profile.role != UserRole::Picker {
            return Err(AppError::Forbidden(
                "only pickers can accept pickups".to_string(),
            ));
        }
    }

    transition(state, "accept", || {
        state
            .store
            .update(pickup_id, |record| lifecycle::accept(record, picker_id, Utc::now()))
    })
}

pub fn complete_pickup(
    state: &AppState,
    picker_id: Uuid,
    pickup_id: Uuid,
) -> Result<PickupRecord, AppError> {
    transition(state, "complete", || {
        state
            .store
            .update(pickup_id, |record| lifecycle::complete(record, picker_id, Utc::now()))
    })
}

pub fn cancel_pickup(
    state: &AppState,
    owner_id: Uuid,
    pickup_id: Uuid,
) -> Result<PickupRecord, AppError> {
    transition(state, "cancel", || {
        state
            .store
            .update(pickup_id, |record| lifecycle::cancel(record, owner_id, Utc::now()))
    })
}

/// Attach post-completion feedback. The side written is chosen by the
/// viewer's relationship to the record: owners rate the picker, the
/// assigned picker rates the owner.
pub fn attach_rating(
    state: &AppState,
    viewer_id: Uuid,
    pickup_id: Uuid,
    rating: u8,
    comment: Option<String>,
) -> Result<PickupRecord, AppError> {
    transition(state, "rate", || {
        state.store.update(pickup_id, |record| {
            if record.owner_id == viewer_id {
                lifecycle::rate_by_owner(record, viewer_id, rating, comment, Utc::now())
            } else {
                lifecycle::rate_by_picker(record, viewer_id, rating, comment, Utc::now())
            }
        })
    })
}

/// The visibility predicate for a viewer, fail-closed when no profile
/// exists.
pub fn visibility_of(state: &AppState, viewer_id: Uuid) -> Visibility {
    let profile = state.profiles.get(&viewer_id);
    visibility_for(profile.as_deref())
}

/// One-shot visible snapshot in display order.
pub fn visible_pickups(state: &AppState, viewer_id: Uuid) -> Vec<PickupRecord> {
    order_for_display(state.store.query(&visibility_of(state, viewer_id)))
}

/// Point read, scoped: a record outside the viewer's visibility reads as
/// absent rather than leaking its existence.
pub fn get_visible_pickup(
    state: &AppState,
    viewer_id: Uuid,
    pickup_id: Uuid,
) -> Result<PickupRecord, AppError> {
    state
        .store
        .get(pickup_id)
        .filter(|record| visibility_of(state, viewer_id).matches(record))
        .ok_or_else(|| AppError::NotFound(format!("pickup {pickup_id} not found")))
}

/// Display-ordered snapshot plus a live feed of subsequent changes in the
/// viewer's scope. The feed must be re-established (reconnect) if the
/// viewer's role or pincode changes, and is released by dropping it.
pub fn resolve_visible_pickups(
    state: &AppState,
    viewer_id: Uuid,
) -> (Vec<PickupRecord>, PickupFeed) {
    let visibility = visibility_of(state, viewer_id);
    let (snapshot, feed) = state
        .store
        .subscribe(visibility, state.metrics.live_subscriptions.clone());
    (order_for_display(snapshot), feed)
}

fn transition<F>(state: &AppState, action: &str, apply: F) -> Result<PickupRecord, AppError>
where
    F: FnOnce() -> Result<PickupRecord, AppError>,
{
    let start = Instant::now();
    let result = apply();
    let elapsed = start.elapsed().as_secs_f64();

    let outcome = if result.is_ok() { "success" } else { "rejected" };
    state
        .metrics
        .transition_latency_seconds
        .with_label_values(&[action])
        .observe(elapsed);
    state
        .metrics
        .pickup_transitions_total
        .with_label_values(&[action, outcome])
        .inc();

    match &result {
        Ok(record) => info!(pickup_id = %record.id, action, status = ?record.status, "pickup transition applied"),
        Err(err) => warn!(action, error = %err, "pickup transition rejected"),
    }

    result
}
