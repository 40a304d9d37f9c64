use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WasteType {
    Plastic,
    Paper,
    Metal,
    Glass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    #[serde(rename = "Small Bag")]
    SmallBag,
    #[serde(rename = "Medium Bag")]
    MediumBag,
    #[serde(rename = "Large Bag")]
    LargeBag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

/// Coordinates plus the human-readable address resolved for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub assigned_to: Option<Uuid>,
    pub waste_types: Vec<WasteType>,
    pub quantity: Quantity,
    pub pickup_date: DateTime<Utc>,
    pub location: Option<Location>,
    pub user_address: Option<String>,
    pub pincode: Option<String>,
    pub status: PickupStatus,
    pub generator_rating: Option<u8>,
    pub generator_comment: Option<String>,
    pub picker_rating: Option<u8>,
    pub picker_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Caller-supplied fields of a new pickup. The store assigns the id and
/// timestamps when the draft is persisted.
#[derive(Debug, Clone)]
pub struct PickupDraft {
    pub owner_id: Uuid,
    pub waste_types: Vec<WasteType>,
    pub quantity: Quantity,
    pub pickup_date: DateTime<Utc>,
    pub location: Option<Location>,
    pub user_address: Option<String>,
    pub pincode: Option<String>,
}

impl PickupDraft {
    pub(crate) fn into_record(self, id: Uuid, now: DateTime<Utc>) -> PickupRecord {
        PickupRecord {
            id,
            owner_id: self.owner_id,
            assigned_to: None,
            waste_types: self.waste_types,
            quantity: self.quantity,
            pickup_date: self.pickup_date,
            location: self.location,
            user_address: self.user_address,
            pincode: self.pincode,
            status: PickupStatus::Pending,
            generator_rating: None,
            generator_comment: None,
            picker_rating: None,
            picker_comment: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}
