use std::pin::Pin;
use std::task::{Context, Poll};

use chrono::Utc;
use dashmap::DashMap;
use prometheus::IntGauge;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::Stream;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::pickup::{PickupDraft, PickupRecord};
use crate::policy::visibility::Visibility;

/// One document change: the prior state (absent for creations) and the
/// record as written.
#[derive(Debug, Clone)]
pub struct PickupChange {
    pub before: Option<PickupRecord>,
    pub after: PickupRecord,
}

/// In-memory pickup collection with the contract the policy layer expects
/// of the backing document database: create, point read, conditional point
/// update, and filtered query with a live change feed.
pub struct PickupStore {
    records: DashMap<Uuid, PickupRecord>,
    changes_tx: broadcast::Sender<PickupChange>,
}

impl PickupStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (changes_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        Self {
            records: DashMap::new(),
            changes_tx,
        }
    }

    /// Persist a draft, assigning the id and timestamps.
    pub fn create(&self, draft: PickupDraft) -> PickupRecord {
        let record = draft.into_record(Uuid::new_v4(), Utc::now());
        self.records.insert(record.id, record.clone());
        let _ = self.changes_tx.send(PickupChange {
            before: None,
            after: record.clone(),
        });
        record
    }

    pub fn get(&self, id: Uuid) -> Option<PickupRecord> {
        self.records.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Conditional point update. `apply` sees the current record under the
    /// entry's lock and either returns the full replacement or an error;
    /// on error nothing is written, so a transition whose precondition no
    /// longer holds fails cleanly and the stored record is untouched.
    pub fn update<F>(&self, id: Uuid, apply: F) -> Result<PickupRecord, AppError>
    where
        F: FnOnce(&PickupRecord) -> Result<PickupRecord, AppError>,
    {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("pickup {id} not found")))?;

        let updated = apply(entry.value())?;
        let before = entry.value().clone();
        *entry.value_mut() = updated.clone();
        drop(entry);

        let _ = self.changes_tx.send(PickupChange {
            before: Some(before),
            after: updated.clone(),
        });
        Ok(updated)
    }

    /// Snapshot of the records currently matching a visibility predicate.
    pub fn query(&self, visibility: &Visibility) -> Vec<PickupRecord> {
        self.records
            .iter()
            .filter(|entry| visibility.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Snapshot plus a live feed of subsequent changes for one viewer.
    ///
    /// The receiver is registered before the snapshot is taken, so a change
    /// racing the subscription shows up at least once. A change is delivered
    /// when the record matches the predicate after the write or matched
    /// before it, so viewers also see records leave their scope. Dropping
    /// the feed releases the delivery channel.
    pub fn subscribe(
        &self,
        visibility: Visibility,
        open_feeds: IntGauge,
    ) -> (Vec<PickupRecord>, PickupFeed) {
        let inner = BroadcastStream::new(self.changes_tx.subscribe());
        let snapshot = self.query(&visibility);
        open_feeds.inc();

        (
            snapshot,
            PickupFeed {
                inner,
                visibility,
                open_feeds,
            },
        )
    }
}

/// Cancellable stream of pickup changes scoped to one viewer's visibility.
/// Ends when the store shuts down or the subscriber lags past the channel
/// buffer; lagging callers reconnect for a fresh snapshot.
pub struct PickupFeed {
    inner: BroadcastStream<PickupChange>,
    visibility: Visibility,
    open_feeds: IntGauge,
}

impl Stream for PickupFeed {
    type Item = PickupChange;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(change))) => {
                    let visible_now = this.visibility.matches(&change.after);
                    let was_visible = change
                        .before
                        .as_ref()
                        .is_some_and(|before| this.visibility.matches(before));
                    if visible_now || was_visible {
                        return Poll::Ready(Some(change));
                    }
                }
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(skipped)))) => {
                    tracing::warn!(skipped, "pickup feed lagged; closing for resync");
                    return Poll::Ready(None);
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for PickupFeed {
    fn drop(&mut self) {
        self.open_feeds.dec();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use prometheus::IntGauge;
    use tokio_stream::StreamExt;
    use uuid::Uuid;

    use super::PickupStore;
    use crate::error::AppError;
    use crate::models::pickup::{PickupDraft, PickupStatus, Quantity, WasteType};
    use crate::policy::lifecycle;
    use crate::policy::visibility::Visibility;

    fn draft(owner: Uuid, pincode: Option<&str>) -> PickupDraft {
        PickupDraft {
            owner_id: owner,
            waste_types: vec![WasteType::Plastic],
            quantity: Quantity::SmallBag,
            pickup_date: Utc::now(),
            location: None,
            user_address: None,
            pincode: pincode.map(str::to_string),
        }
    }

    fn gauge() -> IntGauge {
        IntGauge::new("open_feeds_test", "test gauge").expect("valid gauge")
    }

    #[test]
    fn create_assigns_id_and_timestamps() {
        let store = PickupStore::new(16);
        let record = store.create(draft(Uuid::new_v4(), None));

        assert_eq!(record.status, PickupStatus::Pending);
        assert_eq!(record.created_at, record.updated_at);
        assert_eq!(store.get(record.id).unwrap().id, record.id);
    }

    #[test]
    fn rejected_update_leaves_record_untouched() {
        let store = PickupStore::new(16);
        let owner = Uuid::new_v4();
        let record = store.create(draft(owner, None));
        let picker = Uuid::new_v4();

        store
            .update(record.id, |r| lifecycle::accept(r, picker, Utc::now()))
            .unwrap();

        let result = store.update(record.id, |r| lifecycle::accept(r, Uuid::new_v4(), Utc::now()));
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let stored = store.get(record.id).unwrap();
        assert_eq!(stored.assigned_to, Some(picker));
        assert_eq!(stored.status, PickupStatus::Assigned);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = PickupStore::new(16);
        let result = store.update(Uuid::new_v4(), |r| Ok(r.clone()));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn feed_delivers_matching_changes_and_scope_exits() {
        let store = PickupStore::new(16);
        let owner = Uuid::new_v4();
        let record = store.create(draft(owner, Some("560001")));

        let picker = Uuid::new_v4();
        let visibility = Visibility::PendingInAreaOrHeld {
            pincode: "560001".to_string(),
            picker,
        };
        let (snapshot, mut feed) = store.subscribe(visibility, gauge());
        assert_eq!(snapshot.len(), 1);

        // Claimed by a rival picker: the record leaves this viewer's scope,
        // and the change is still delivered so the viewer can drop it.
        let rival = Uuid::new_v4();
        store
            .update(record.id, |r| lifecycle::accept(r, rival, Utc::now()))
            .unwrap();

        let change = feed.next().await.expect("change delivered");
        assert_eq!(change.after.assigned_to, Some(rival));
        assert_eq!(change.before.as_ref().unwrap().status, PickupStatus::Pending);
    }

    #[tokio::test]
    async fn feed_skips_out_of_scope_changes() {
        let store = PickupStore::new(16);
        let viewer = Uuid::new_v4();
        let (snapshot, mut feed) = store.subscribe(Visibility::OwnedBy(viewer), gauge());
        assert!(snapshot.is_empty());

        store.create(draft(Uuid::new_v4(), None));
        let mine = store.create(draft(viewer, None));

        let change = feed.next().await.expect("own record delivered");
        assert_eq!(change.after.id, mine.id);
    }

    #[test]
    fn dropping_feed_releases_the_gauge() {
        let store = PickupStore::new(16);
        let open_feeds = gauge();

        let (_, feed) = store.subscribe(Visibility::Nothing, open_feeds.clone());
        assert_eq!(open_feeds.get(), 1);
        drop(feed);
        assert_eq!(open_feeds.get(), 0);
    }
}
