use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::pickup::{PickupRecord, PickupStatus};

/// Pure transition functions for the pickup lifecycle:
/// Pending -> Assigned -> Completed, with Cancelled reachable from Pending
/// only. Each function validates actor and current state against the
/// transition table and returns the replacement record; a rejection leaves
/// the input untouched. The store applies the returned record under the
/// entry's lock, so the precondition holds at write time.
pub fn accept(
    record: &PickupRecord,
    picker_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PickupRecord, AppError> {
    if record.status != PickupStatus::Pending || record.assigned_to.is_some() {
        return Err(AppError::Conflict(format!(
            "pickup {} is no longer available",
            record.id
        )));
    }

    let mut updated = record.clone();
    updated.status = PickupStatus::Assigned;
    updated.assigned_to = Some(picker_id);
    updated.updated_at = now;
    Ok(updated)
}

pub fn complete(
    record: &PickupRecord,
    picker_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PickupRecord, AppError> {
    if record.assigned_to != Some(picker_id) {
        return Err(AppError::Forbidden(format!(
            "pickup {} is not assigned to the caller",
            record.id
        )));
    }
    if record.status != PickupStatus::Assigned {
        return Err(AppError::Conflict(format!(
            "pickup {} is not awaiting completion",
            record.id
        )));
    }

    let mut updated = record.clone();
    updated.status = PickupStatus::Completed;
    updated.completed_at = Some(now);
    updated.updated_at = now;
    Ok(updated)
}

pub fn cancel(
    record: &PickupRecord,
    owner_id: Uuid,
    now: DateTime<Utc>,
) -> Result<PickupRecord, AppError> {
    if record.owner_id != owner_id {
        return Err(AppError::Forbidden(format!(
            "pickup {} does not belong to the caller",
            record.id
        )));
    }
    if record.status != PickupStatus::Pending {
        return Err(AppError::Conflict(format!(
            "pickup {} is no longer pending",
            record.id
        )));
    }

    let mut updated = record.clone();
    updated.status = PickupStatus::Cancelled;
    updated.updated_at = now;
    Ok(updated)
}

/// Owner's post-completion feedback about the picker. Leaves `status` alone.
pub fn rate_by_owner(
    record: &PickupRecord,
    owner_id: Uuid,
    rating: u8,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<PickupRecord, AppError> {
    validate_rating(rating)?;
    if record.owner_id != owner_id {
        return Err(AppError::Forbidden(format!(
            "pickup {} does not belong to the caller",
            record.id
        )));
    }
    require_completed(record)?;

    let mut updated = record.clone();
    updated.generator_rating = Some(rating);
    updated.generator_comment = comment;
    updated.updated_at = now;
    Ok(updated)
}

/// Picker's post-completion feedback about the owner. Leaves `status` alone.
pub fn rate_by_picker(
    record: &PickupRecord,
    picker_id: Uuid,
    rating: u8,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<PickupRecord, AppError> {
    validate_rating(rating)?;
    if record.assigned_to != Some(picker_id) {
        return Err(AppError::Forbidden(format!(
            "pickup {} is not assigned to the caller",
            record.id
        )));
    }
    require_completed(record)?;

    let mut updated = record.clone();
    updated.picker_rating = Some(rating);
    updated.picker_comment = comment;
    updated.updated_at = now;
    Ok(updated)
}

fn validate_rating(rating: u8) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }
    Ok(())
}

fn require_completed(record: &PickupRecord) -> Result<(), AppError> {
    if record.status != PickupStatus::Completed {
        return Err(AppError::Conflict(format!(
            "pickup {} is not completed",
            record.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{accept, cancel, complete, rate_by_owner, rate_by_picker};
    use crate::error::AppError;
    use crate::models::pickup::{PickupDraft, PickupRecord, PickupStatus, Quantity, WasteType};

    fn pending(owner: Uuid) -> PickupRecord {
        PickupDraft {
            owner_id: owner,
            waste_types: vec![WasteType::Paper, WasteType::Glass],
            quantity: Quantity::MediumBag,
            pickup_date: Utc::now(),
            location: None,
            user_address: None,
            pincode: Some("560001".to_string()),
        }
        .into_record(Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn accept_assigns_pending_record() {
        let record = pending(Uuid::new_v4());
        let picker = Uuid::new_v4();

        let updated = accept(&record, picker, Utc::now()).unwrap();
        assert_eq!(updated.status, PickupStatus::Assigned);
        assert_eq!(updated.assigned_to, Some(picker));
    }

    #[test]
    fn accept_rejects_already_assigned_record() {
        let record = pending(Uuid::new_v4());
        let winner = accept(&record, Uuid::new_v4(), Utc::now()).unwrap();

        let result = accept(&winner, Uuid::new_v4(), Utc::now());
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn complete_requires_the_assigned_picker() {
        let record = pending(Uuid::new_v4());
        let picker = Uuid::new_v4();
        let assigned = accept(&record, picker, Utc::now()).unwrap();

        let result = complete(&assigned, Uuid::new_v4(), Utc::now());
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let completed = complete(&assigned, picker, Utc::now()).unwrap();
        assert_eq!(completed.status, PickupStatus::Completed);
        assert!(completed.completed_at.is_some());
    }

    #[test]
    fn cancel_requires_the_owner() {
        let owner = Uuid::new_v4();
        let record = pending(owner);

        let result = cancel(&record, Uuid::new_v4(), Utc::now());
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        let cancelled = cancel(&record, owner, Utc::now()).unwrap();
        assert_eq!(cancelled.status, PickupStatus::Cancelled);
    }

    #[test]
    fn cancel_rejects_assigned_record() {
        let owner = Uuid::new_v4();
        let record = pending(owner);
        let assigned = accept(&record, Uuid::new_v4(), Utc::now()).unwrap();

        let result = cancel(&assigned, owner, Utc::now());
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let owner = Uuid::new_v4();
        let picker = Uuid::new_v4();

        let record = pending(owner);
        let completed = complete(&accept(&record, picker, Utc::now()).unwrap(), picker, Utc::now()).unwrap();
        assert!(accept(&completed, Uuid::new_v4(), Utc::now()).is_err());
        assert!(complete(&completed, picker, Utc::now()).is_err());
        assert!(cancel(&completed, owner, Utc::now()).is_err());

        let cancelled = cancel(&pending(owner), owner, Utc::now()).unwrap();
        assert!(accept(&cancelled, picker, Utc::now()).is_err());
        assert!(cancel(&cancelled, owner, Utc::now()).is_err());
    }

    #[test]
    fn ratings_attach_only_after_completion() {
        let owner = Uuid::new_v4();
        let picker = Uuid::new_v4();
        let record = pending(owner);

        let result = rate_by_owner(&record, owner, 4, None, Utc::now());
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let completed = complete(&accept(&record, picker, Utc::now()).unwrap(), picker, Utc::now()).unwrap();

        let rated = rate_by_owner(&completed, owner, 4, Some("punctual".to_string()), Utc::now()).unwrap();
        assert_eq!(rated.generator_rating, Some(4));
        assert_eq!(rated.status, PickupStatus::Completed);

        let rated = rate_by_picker(&rated, picker, 5, None, Utc::now()).unwrap();
        assert_eq!(rated.picker_rating, Some(5));
    }

    #[test]
    fn rating_outside_one_to_five_is_rejected() {
        let owner = Uuid::new_v4();
        let picker = Uuid::new_v4();
        let completed = complete(
            &accept(&pending(owner), picker, Utc::now()).unwrap(),
            picker,
            Utc::now(),
        )
        .unwrap();

        assert!(matches!(
            rate_by_owner(&completed, owner, 0, None, Utc::now()),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            rate_by_picker(&completed, picker, 6, None, Utc::now()),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn rating_by_a_stranger_is_rejected() {
        let owner = Uuid::new_v4();
        let picker = Uuid::new_v4();
        let completed = complete(
            &accept(&pending(owner), picker, Utc::now()).unwrap(),
            picker,
            Utc::now(),
        )
        .unwrap();

        assert!(matches!(
            rate_by_owner(&completed, Uuid::new_v4(), 3, None, Utc::now()),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            rate_by_picker(&completed, Uuid::new_v4(), 3, None, Utc::now()),
            Err(AppError::Forbidden(_))
        ));
    }
}
