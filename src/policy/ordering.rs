use crate::models::pickup::{PickupRecord, PickupStatus};

/// Display order: ascending pickup date, with cancelled records after all
/// others regardless of date. The sort is stable, so records sharing a date
/// keep their incoming order.
pub fn order_for_display(mut records: Vec<PickupRecord>) -> Vec<PickupRecord> {
    records.sort_by(|a, b| {
        let a_cancelled = a.status == PickupStatus::Cancelled;
        let b_cancelled = b.status == PickupStatus::Cancelled;
        a_cancelled
            .cmp(&b_cancelled)
            .then_with(|| a.pickup_date.cmp(&b.pickup_date))
    });
    records
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::order_for_display;
    use crate::models::pickup::{PickupDraft, PickupRecord, PickupStatus, Quantity, WasteType};

    fn dated(month: u32, status: PickupStatus) -> PickupRecord {
        let mut record = PickupDraft {
            owner_id: Uuid::new_v4(),
            waste_types: vec![WasteType::Metal],
            quantity: Quantity::LargeBag,
            pickup_date: Utc.with_ymd_and_hms(2024, month, 1, 9, 0, 0).unwrap(),
            location: None,
            user_address: None,
            pincode: None,
        }
        .into_record(Uuid::new_v4(), Utc::now());
        record.status = status;
        record
    }

    #[test]
    fn sorts_ascending_by_date_with_cancelled_last() {
        let march = dated(3, PickupStatus::Pending);
        let january = dated(1, PickupStatus::Pending);
        let february_cancelled = dated(2, PickupStatus::Cancelled);

        let ordered = order_for_display(vec![
            march.clone(),
            january.clone(),
            february_cancelled.clone(),
        ]);

        assert_eq!(ordered[0].id, january.id);
        assert_eq!(ordered[1].id, march.id);
        assert_eq!(ordered[2].id, february_cancelled.id);
    }

    #[test]
    fn non_cancelled_terminal_records_keep_date_order() {
        let mut completed = dated(1, PickupStatus::Completed);
        completed.assigned_to = Some(Uuid::new_v4());
        let pending = dated(2, PickupStatus::Pending);

        let ordered = order_for_display(vec![pending.clone(), completed.clone()]);
        assert_eq!(ordered[0].id, completed.id);
        assert_eq!(ordered[1].id, pending.id);
    }

    #[test]
    fn equal_dates_preserve_incoming_order() {
        let first = dated(4, PickupStatus::Pending);
        let second = dated(4, PickupStatus::Pending);

        let ordered = order_for_display(vec![first.clone(), second.clone()]);
        assert_eq!(ordered[0].id, first.id);
        assert_eq!(ordered[1].id, second.id);
    }
}
