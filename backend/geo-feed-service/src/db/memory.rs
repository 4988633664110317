/// In-process store for tests and local runs without PostGIS.
///
/// Distances use the haversine formula on a spherical earth, so they differ
/// from PostGIS' spheroidal distances by up to ~0.5%.
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{ContentStore, FeedStore, StoreError};
use crate::models::{ContentItem, FeedRow, GeoPoint, InsertOutcome};
use crate::services::planner::FeedQuery;

/// Mean earth radius (IUGG)
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Default)]
pub struct InMemoryStore {
    items: RwLock<Vec<ContentItem>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

/// Great-circle distance in meters
pub fn haversine_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat().to_radians(), b.lat().to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng() - a.lng()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

#[async_trait::async_trait]
impl FeedStore for InMemoryStore {
    async fn fetch_ranked(&self, query: &FeedQuery) -> Result<Vec<FeedRow>, StoreError> {
        self.check_available()?;

        let items = self.items.read().await;
        let candidates = items.iter().map(|item| {
            let distance = haversine_meters(&query.origin, &item.location);
            (item.clone(), distance)
        });

        Ok(query.evaluate(candidates))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[async_trait::async_trait]
impl ContentStore for InMemoryStore {
    async fn insert_content(&self, item: &ContentItem) -> Result<InsertOutcome, StoreError> {
        self.check_available()?;

        let mut items = self.items.write().await;
        if let Some(external_id) = &item.external_id {
            if let Some(existing) = items
                .iter()
                .find(|i| i.external_id.as_deref() == Some(external_id.as_str()))
            {
                return Ok(InsertOutcome::Duplicate(existing.id));
            }
        }

        items.push(item.clone());
        Ok(InsertOutcome::Created(item.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::planner::{plan, TypeFilter};
    use chrono::Utc;
    use uuid::Uuid;

    fn item_at(lat: f64, lng: f64, external_id: Option<&str>) -> ContentItem {
        ContentItem {
            id: Uuid::now_v7(),
            external_id: external_id.map(str::to_string),
            content_type: "post".to_string(),
            location: GeoPoint::new(lat, lng).unwrap(),
            published_at: Utc::now(),
            created_at: Utc::now(),
            attributes: serde_json::json!({}),
            base_score: 1.0,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.2 km on the mean sphere
        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(1.0, 0.0).unwrap();
        let d = haversine_meters(&a, &b);
        assert!((d - 111_195.08).abs() < 1.0, "got {d}");
        assert_eq!(haversine_meters(&a, &a), 0.0);
    }

    #[tokio::test]
    async fn test_insert_is_idempotent_on_external_id() {
        let store = InMemoryStore::new();
        let first = item_at(1.0, 1.0, Some("ext-1"));
        let replay = item_at(2.0, 2.0, Some("ext-1"));

        let created = store.insert_content(&first).await.unwrap();
        let duplicate = store.insert_content(&replay).await.unwrap();

        assert_eq!(created, InsertOutcome::Created(first.id));
        assert_eq!(duplicate, InsertOutcome::Duplicate(first.id));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_items_without_external_id_never_conflict() {
        let store = InMemoryStore::new();
        store.insert_content(&item_at(1.0, 1.0, None)).await.unwrap();
        store.insert_content(&item_at(1.0, 1.0, None)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_fetch_filters_by_radius() {
        let store = InMemoryStore::new();
        let near = item_at(40.0, -74.0, None);
        let far = item_at(41.0, -74.0, None);
        store.insert_content(&near).await.unwrap();
        store.insert_content(&far).await.unwrap();

        let origin = GeoPoint::new(40.0, -74.0).unwrap();
        let query = plan(origin, 5_000.0, TypeFilter::Any, 10, None, Utc::now());
        let rows = store.fetch_ranked(&query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, near.id);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        let result = store.insert_content(&item_at(0.0, 0.0, None)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
