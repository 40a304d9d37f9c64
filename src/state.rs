use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::Sessions;
use crate::geocode::ReverseGeocoder;
use crate::models::profile::UserProfile;
use crate::observability::metrics::Metrics;
use crate::store::PickupStore;

pub struct AppState {
    pub store: PickupStore,
    pub profiles: DashMap<Uuid, UserProfile>,
    pub sessions: Sessions,
    pub geocoder: Option<ReverseGeocoder>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, geocoder: Option<ReverseGeocoder>) -> Self {
        Self {
            store: PickupStore::new(event_buffer_size),
            profiles: DashMap::new(),
            sessions: Sessions::new(),
            geocoder,
            metrics: Metrics::new(),
        }
    }
}
