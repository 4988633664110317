/// Feed assembly
///
/// Validates a request, plans the page, fetches `limit + 1` ranked rows and
/// turns them into a [`FeedPage`]. The overfetched row is never served; its
/// sort key becomes the next cursor.
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use super::planner::{self, TypeFilter};
use crate::codec::{cursor, geometry};
use crate::db::FeedStore;
use crate::error::{AppError, Result};
use crate::models::{ContentItem, FeedPage, FeedRow, GeoPoint, ScoredItem};

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

/// Raw feed request as received from a client
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedRequest {
    pub lat: f64,
    pub lng: f64,
    pub radius_meters: i64,
    pub types: Vec<String>,
    pub limit: Option<i64>,
    /// Opaque cursor; empty or absent for the first page
    pub cursor: Option<String>,
}

/// Clamp a requested page size into `1..=MAX_LIMIT`.
pub fn normalize_limit(limit: Option<i64>) -> usize {
    match limit {
        Some(n) if n > MAX_LIMIT as i64 => MAX_LIMIT,
        Some(n) if n > 0 => n as usize,
        _ => DEFAULT_LIMIT,
    }
}

pub struct FeedService {
    store: Arc<dyn FeedStore>,
}

impl FeedService {
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    pub async fn get_feed(&self, request: FeedRequest) -> Result<FeedPage> {
        self.get_feed_at(request, Utc::now()).await
    }

    /// Build one page, scoring against `now`.
    pub async fn get_feed_at(&self, request: FeedRequest, now: DateTime<Utc>) -> Result<FeedPage> {
        let origin = GeoPoint::new(request.lat, request.lng).map_err(AppError::Validation)?;
        if request.radius_meters <= 0 {
            return Err(AppError::Validation(format!(
                "radius_meters must be greater than 0, got {}",
                request.radius_meters
            )));
        }
        let limit = normalize_limit(request.limit);
        let after = cursor::decode(request.cursor.as_deref().unwrap_or(""))?;
        let types = TypeFilter::from_requested(request.types);

        debug!(
            lat = origin.lat(),
            lng = origin.lng(),
            radius_meters = request.radius_meters,
            types = ?types,
            limit,
            resumed = after.is_some(),
            "Assembling feed page"
        );

        let query = planner::plan(
            origin,
            request.radius_meters as f64,
            types,
            limit,
            after,
            now,
        );
        let mut rows = self.store.fetch_ranked(&query).await?;

        let next_cursor = rows.get(limit).map(FeedRow::sort_key);
        rows.truncate(limit);

        let items = rows
            .into_iter()
            .map(decode_row)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        info!(
            items = items.len(),
            has_more = next_cursor.is_some(),
            "Feed page assembled"
        );

        Ok(FeedPage { items, next_cursor })
    }
}

fn decode_row(row: FeedRow) -> std::result::Result<ScoredItem, geometry::GeometryError> {
    let location = geometry::decode(&row.location_wkb)?;

    Ok(ScoredItem {
        item: ContentItem {
            id: row.id,
            external_id: row.external_id,
            content_type: row.content_type,
            location,
            published_at: row.published_at,
            created_at: row.created_at,
            attributes: row.attributes,
            base_score: row.base_score,
        },
        distance_meters: row.distance_meters,
        score: row.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CursorError;
    use crate::db::{ContentStore, InMemoryStore, StoreError};
    use crate::models::Cursor;
    use crate::services::planner::FeedQuery;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn item(id: u128, lat_offset: f64, content_type: &str) -> ContentItem {
        ContentItem {
            id: Uuid::from_u128(id),
            external_id: None,
            content_type: content_type.to_string(),
            location: GeoPoint::new(40.0 + lat_offset, -74.0).unwrap(),
            published_at: now() - Duration::minutes(10),
            created_at: now(),
            attributes: serde_json::json!({ "n": id as u64 }),
            base_score: 1.0,
        }
    }

    fn request(limit: Option<i64>, cursor: Option<String>) -> FeedRequest {
        FeedRequest {
            lat: 40.0,
            lng: -74.0,
            radius_meters: 10_000,
            types: vec![],
            limit,
            cursor,
        }
    }

    async fn service_with(items: Vec<ContentItem>) -> FeedService {
        let store = Arc::new(InMemoryStore::new());
        for item in &items {
            store.insert_content(item).await.unwrap();
        }
        FeedService::new(store)
    }

    /// Store returning fixed rows regardless of the query
    struct FixedRows(Vec<FeedRow>);

    #[async_trait::async_trait]
    impl FeedStore for FixedRows {
        async fn fetch_ranked(
            &self,
            _query: &FeedQuery,
        ) -> std::result::Result<Vec<FeedRow>, StoreError> {
            Ok(self.0.clone())
        }
    }

    fn row(id: u128, wkb: Vec<u8>) -> FeedRow {
        FeedRow {
            id: Uuid::from_u128(id),
            external_id: None,
            content_type: "post".to_string(),
            location_wkb: wkb,
            published_at: now(),
            created_at: now(),
            attributes: serde_json::json!({}),
            base_score: 1.0,
            distance_meters: 0.0,
            score: 1.0 / id as f64,
        }
    }

    #[test]
    fn test_normalize_limit() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 20);
        assert_eq!(normalize_limit(Some(-5)), 20);
        assert_eq!(normalize_limit(Some(1)), 1);
        assert_eq!(normalize_limit(Some(50)), 50);
        assert_eq!(normalize_limit(Some(51)), 50);
        assert_eq!(normalize_limit(Some(i64::MAX)), 50);
    }

    #[tokio::test]
    async fn test_three_items_two_pages() {
        // Equal base score and publish time, increasing distance
        let service = service_with(vec![
            item(1, 0.001, "post"),
            item(2, 0.002, "post"),
            item(3, 0.003, "post"),
        ])
        .await;

        let first = service.get_feed_at(request(Some(2), None), now()).await.unwrap();
        let ids: Vec<u128> = first.items.iter().map(|i| i.item.id.as_u128()).collect();
        assert_eq!(ids, vec![1, 2]);

        let next = first.next_cursor.expect("second page expected");
        assert_eq!(next.id, Uuid::from_u128(3));
        assert_eq!(next.published_at, now() - Duration::minutes(10));
        assert!(next.score < first.items[1].score);

        let token = cursor::encode(&next).unwrap();
        assert_eq!(cursor::decode(&token).unwrap(), Some(next));

        let second = service
            .get_feed_at(request(Some(2), Some(token)), now())
            .await
            .unwrap();
        let ids: Vec<u128> = second.items.iter().map(|i| i.item.id.as_u128()).collect();
        assert_eq!(ids, vec![3]);
        assert_eq!(second.next_cursor, None);
    }

    #[tokio::test]
    async fn test_exact_page_has_no_next_cursor() {
        let service = service_with(vec![item(1, 0.001, "post"), item(2, 0.002, "post")]).await;

        let page = service.get_feed_at(request(Some(2), None), now()).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_pagination_partitions_full_ranking() {
        let items: Vec<ContentItem> = (1..=23u128)
            .map(|i| {
                let mut it = item(i, (i % 7) as f64 * 0.001, "post");
                it.base_score = (i % 3) as f64;
                it.published_at = now() - Duration::minutes((i % 4) as i64);
                it
            })
            .collect();
        let service = service_with(items).await;

        let full = service.get_feed_at(request(Some(50), None), now()).await.unwrap();
        assert_eq!(full.items.len(), 23);

        for limit in [1i64, 2, 5, 7, 23] {
            let mut seen = Vec::new();
            let mut token: Option<String> = None;
            loop {
                let page = service
                    .get_feed_at(request(Some(limit), token.clone()), now())
                    .await
                    .unwrap();
                assert!(page.items.len() <= limit as usize);
                seen.extend(page.items.iter().map(|i| i.item.id));

                match page.next_cursor {
                    Some(c) => token = Some(cursor::encode(&c).unwrap()),
                    None => break,
                }
            }

            let expected: Vec<Uuid> = full.items.iter().map(|i| i.item.id).collect();
            assert_eq!(seen, expected, "limit {limit}");
            assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 23);
        }
    }

    #[tokio::test]
    async fn test_type_filter_applies() {
        let service = service_with(vec![
            item(1, 0.001, "event"),
            item(2, 0.002, "post"),
            item(3, 0.003, "event"),
        ])
        .await;

        let mut req = request(None, None);
        req.types = vec!["event".to_string()];
        let page = service.get_feed_at(req, now()).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|i| i.item.content_type == "event"));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let service = service_with(vec![]).await;

        let mut bad_radius = request(None, None);
        bad_radius.radius_meters = 0;
        assert!(matches!(
            service.get_feed_at(bad_radius, now()).await,
            Err(AppError::Validation(_))
        ));

        let mut bad_lat = request(None, None);
        bad_lat.lat = 91.0;
        assert!(matches!(
            service.get_feed_at(bad_lat, now()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_rejected() {
        let service = service_with(vec![item(1, 0.0, "post")]).await;
        let result = service
            .get_feed_at(request(None, Some("%%%".to_string())), now())
            .await;

        assert!(matches!(
            result,
            Err(AppError::InvalidCursor(CursorError::Encoding(_)))
        ));
    }

    #[tokio::test]
    async fn test_empty_cursor_means_first_page() {
        let service = service_with(vec![item(1, 0.0, "post")]).await;
        let page = service
            .get_feed_at(request(None, Some(String::new())), now())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(InMemoryStore::new());
        store.set_unavailable(true);
        let service = FeedService::new(store);

        assert!(matches!(
            service.get_feed_at(request(None, None), now()).await,
            Err(AppError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_bad_geometry_aborts_whole_page() {
        let good = geometry::encode(&GeoPoint::new(40.0, -74.0).unwrap());
        let store = FixedRows(vec![row(1, good), row(2, vec![1, 2, 3])]);
        let service = FeedService::new(Arc::new(store));

        assert!(matches!(
            service.get_feed_at(request(Some(5), None), now()).await,
            Err(AppError::GeometryFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_overfetched_row_is_not_decoded() {
        let good = geometry::encode(&GeoPoint::new(40.0, -74.0).unwrap());
        let store = FixedRows(vec![row(1, good), row(2, Vec::new())]);
        let service = FeedService::new(Arc::new(store));

        let page = service.get_feed_at(request(Some(1), None), now()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.next_cursor,
            Some(Cursor {
                score: 0.5,
                published_at: now(),
                id: Uuid::from_u128(2),
            })
        );
    }

    async fn collect_pages(
        service: &FeedService,
        limit: i64,
        clock: impl Fn(usize) -> DateTime<Utc>,
    ) -> Vec<Uuid> {
        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        for page_no in 0.. {
            let page = service
                .get_feed_at(request(Some(limit), token.clone()), clock(page_no))
                .await
                .unwrap();
            assert!(page.items.len() <= limit as usize);
            seen.extend(page.items.iter().map(|i| i.item.id));

            match page.next_cursor {
                Some(c) => token = Some(cursor::encode(&c).unwrap()),
                None => break,
            }
        }
        seen
    }

    #[tokio::test]
    async fn test_second_page_after_clock_advance() {
        let service = service_with(vec![
            item(1, 0.001, "post"),
            item(2, 0.002, "post"),
            item(3, 0.003, "post"),
        ])
        .await;

        let first = service.get_feed_at(request(Some(2), None), now()).await.unwrap();
        let token = cursor::encode(&first.next_cursor.unwrap()).unwrap();

        for later in [
            now() + Duration::seconds(1),
            now() + Duration::milliseconds(1),
            now() + Duration::minutes(2),
        ] {
            let second = service
                .get_feed_at(request(Some(2), Some(token.clone())), later)
                .await
                .unwrap();
            let ids: Vec<u128> = second.items.iter().map(|i| i.item.id.as_u128()).collect();
            assert_eq!(ids, vec![3], "clock at {later}");
            assert_eq!(second.next_cursor, None);
        }
    }

    #[tokio::test]
    async fn test_pages_partition_feed_while_scores_decay() {
        let items: Vec<ContentItem> = (1..=9u128)
            .map(|i| item(i, i as f64 * 0.001, "post"))
            .collect();
        let service = service_with(items).await;

        for limit in [1i64, 2, 4] {
            let seen = collect_pages(&service, limit, |page_no| {
                now() + Duration::seconds(page_no as i64)
            })
            .await;
            let expected: Vec<Uuid> = (1..=9u128).map(Uuid::from_u128).collect();
            assert_eq!(seen, expected, "limit {limit}");
        }
    }

    #[tokio::test]
    async fn test_zero_score_boundary_is_served_once_while_clock_advances() {
        // Zero scores never decay, so only the id clause admits the cursor row
        let items: Vec<ContentItem> = (1..=5u128)
            .map(|i| {
                let mut it = item(i, 0.001, "post");
                it.base_score = 0.0;
                it
            })
            .collect();
        let service = service_with(items).await;

        let seen = collect_pages(&service, 2, |page_no| {
            now() + Duration::seconds(page_no as i64 * 30)
        })
        .await;
        let expected: Vec<Uuid> = (1..=5u128).rev().map(Uuid::from_u128).collect();
        assert_eq!(seen, expected);
    }
}
