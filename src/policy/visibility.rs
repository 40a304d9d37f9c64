use uuid::Uuid;

use crate::models::pickup::{PickupRecord, PickupStatus};
use crate::models::profile::{UserProfile, UserRole};

/// Query predicate deciding which pickup records a viewer may see.
///
/// Built once per viewer from their profile and handed to the store, so the
/// role/pincode branching stays testable without a store behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Generators: their own records, across all statuses.
    OwnedBy(Uuid),
    /// Pickers with no declared service area: only work they already hold.
    AssignedTo(Uuid),
    /// Pickers with a service area: unclaimed local work plus everything
    /// they personally hold, whatever its status.
    PendingInAreaOrHeld { pincode: String, picker: Uuid },
    /// Viewer could not be identified. Fail closed.
    Nothing,
}

pub fn visibility_for(profile: Option<&UserProfile>) -> Visibility {
    match profile {
        Some(profile) => match profile.role {
            UserRole::Generator => Visibility::OwnedBy(profile.user_id),
            UserRole::Picker => match &profile.pincode {
                Some(pincode) => Visibility::PendingInAreaOrHeld {
                    pincode: pincode.clone(),
                    picker: profile.user_id,
                },
                None => Visibility::AssignedTo(profile.user_id),
            },
        },
        None => Visibility::Nothing,
    }
}

impl Visibility {
    pub fn matches(&self, record: &PickupRecord) -> bool {
        match self {
            Visibility::OwnedBy(owner) => record.owner_id == *owner,
            Visibility::AssignedTo(picker) => record.assigned_to == Some(*picker),
            Visibility::PendingInAreaOrHeld { pincode, picker } => {
                let pending_local = record.status == PickupStatus::Pending
                    && record.pincode.as_deref() == Some(pincode.as_str());
                pending_local || record.assigned_to == Some(*picker)
            }
            Visibility::Nothing => false,
        }
    }
}
