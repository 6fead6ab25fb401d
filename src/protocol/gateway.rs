//! Request coalescing front for the tile API.
//!
//! At most one request per tile coordinate is in flight for each of the
//! GET and POST paths. Callers that arrive while a request is running share
//! its result. Every failure is logged and turned into `None` (or an empty
//! list for stats) so nothing above this layer has to handle transport errors.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::codec::{GridPoint, PressOutcome, PressRequest, StatEntry, TileState};
use crate::error::Error;
use crate::protocol::transport::TileTransport;

type Flight<T> = Arc<OnceCell<T>>;
type FlightMap<T> = Mutex<HashMap<GridPoint, Flight<T>>>;

pub const STATS_PATH: &str = "/api/stats";

pub struct RemoteTileGateway {
    transport: Arc<dyn TileTransport>,
    gets: FlightMap<Option<TileState>>,
    posts: FlightMap<Option<PressOutcome>>,
    requests: AtomicU64,
}

impl RemoteTileGateway {
    pub fn new(transport: Arc<dyn TileTransport>) -> Self {
        Self {
            transport,
            gets: Mutex::new(HashMap::new()),
            posts: Mutex::new(HashMap::new()),
            requests: AtomicU64::new(0),
        }
    }

    /// Fetch the tile at `point`, sharing any request already in flight.
    pub async fn fetch_tile(&self, point: GridPoint) -> Option<TileState> {
        coalesce(&self.gets, point, || self.request_tile(point)).await
    }

    /// Press `button_id` on the tile at `point` with `hex`.
    ///
    /// Presses are coalesced per tile, not per button: a press issued while
    /// another press on the same tile is in flight receives that press's
    /// outcome.
    pub async fn press_button(&self, point: GridPoint, button_id: i64, hex: &str) -> Option<PressOutcome> {
        let request = PressRequest {
            id: button_id,
            hex: Some(hex.to_string()),
        };
        coalesce(&self.posts, point, || self.request_press(point, request)).await
    }

    /// Fetch global statistics. Never cached; empty on any failure.
    pub async fn fetch_stats(&self) -> Vec<StatEntry> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let reply = match self.transport.get(STATS_PATH).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "stats request failed");
                return Vec::new();
            }
        };
        match reply.ok_json(STATS_PATH) {
            Ok(stats) => stats,
            Err(e @ Error::Status { .. }) => {
                debug!(error = %e, "stats unavailable");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "stats response undecodable");
                Vec::new()
            }
        }
    }

    /// Number of transport calls issued so far.
    pub fn requests_issued(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn tiles_in_flight(&self) -> usize {
        lock(&self.gets).len()
    }

    async fn request_tile(&self, point: GridPoint) -> Option<TileState> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        debug!(%point, "fetching tile");
        let path = point.api_path();
        let reply = match self.transport.get(&path).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%point, error = %e, "tile request failed");
                return None;
            }
        };
        match reply.ok_json::<TileState>(&path) {
            Ok(tile) => Some(tile),
            Err(e @ Error::Status { .. }) => {
                debug!(%point, error = %e, "tile not available");
                None
            }
            Err(e) => {
                warn!(%point, error = %e, "tile response undecodable");
                None
            }
        }
    }

    async fn request_press(&self, point: GridPoint, request: PressRequest) -> Option<PressOutcome> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let body = match serde_json::to_vec(&request) {
            Ok(body) => body,
            Err(e) => {
                warn!(%point, error = %e, "could not encode press");
                return None;
            }
        };
        debug!(%point, id = request.id, "pressing button");
        let reply = match self.transport.post(&point.api_path(), body).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%point, error = %e, "press request failed");
                return None;
            }
        };
        match reply.json::<TileState>() {
            Ok(tile) => Some(PressOutcome {
                tile,
                success: reply.is_ok(),
            }),
            Err(e) => {
                warn!(%point, status = reply.status, error = %e, "press response undecodable");
                None
            }
        }
    }
}

async fn coalesce<T, F, Fut>(flights: &FlightMap<T>, point: GridPoint, start: F) -> T
where
    T: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let flight = {
        let mut map = lock(flights);
        match map.get(&point) {
            Some(flight) => {
                debug!(%point, "joining in-flight request");
                Arc::clone(flight)
            }
            None => {
                let flight = Arc::new(OnceCell::new());
                map.insert(point, Arc::clone(&flight));
                flight
            }
        }
    };

    let value = flight.get_or_init(start).await.clone();

    let mut map = lock(flights);
    if map.get(&point).is_some_and(|current| Arc::ptr_eq(current, &flight)) {
        map.remove(&point);
    }
    value
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::{tile, Method, MockTransport};
    use crate::protocol::transport::HttpReply;

    fn gateway(mock: MockTransport) -> (Arc<MockTransport>, RemoteTileGateway) {
        let mock = Arc::new(mock);
        let gateway = RemoteTileGateway::new(mock.clone());
        (mock, gateway)
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let t = tile(4, 9, &[(3, "abcdef")]);
        let (mock, gw) = gateway(MockTransport::new().with_tile(&t));
        let p = GridPoint::new(4, 9);

        let (a, b, c) = tokio::join!(gw.fetch_tile(p), gw.fetch_tile(p), gw.fetch_tile(p));

        assert_eq!(mock.calls_to(Method::Get, "/api/4/9"), 1);
        assert_eq!(gw.requests_issued(), 1);
        assert_eq!(a, Some(t.clone()));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(gw.tiles_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fetch_after_completion_issues_new_request() {
        let t = tile(1, 1, &[]);
        let (mock, gw) = gateway(MockTransport::new().with_tile(&t));
        let p = GridPoint::new(1, 1);

        assert!(gw.fetch_tile(p).await.is_some());
        assert!(gw.fetch_tile(p).await.is_some());
        assert_eq!(mock.calls_to(Method::Get, "/api/1/1"), 2);
    }

    #[tokio::test]
    async fn test_different_tiles_are_not_coalesced() {
        let (mock, gw) = gateway(
            MockTransport::new()
                .with_tile(&tile(1, 1, &[]))
                .with_tile(&tile(2, 1, &[])),
        );
        let (a, b) = tokio::join!(
            gw.fetch_tile(GridPoint::new(1, 1)),
            gw.fetch_tile(GridPoint::new(2, 1))
        );
        assert_eq!(a.unwrap().x, 1);
        assert_eq!(b.unwrap().x, 2);
        assert_eq!(mock.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_become_none() {
        let (_, gw) = gateway(
            MockTransport::new()
                .fail(Method::Get, "/api/1/1")
                .route(Method::Get, "/api/2/2", HttpReply::new(500, "oops"))
                .route(Method::Get, "/api/3/3", HttpReply::new(200, "{not json")),
        );
        assert_eq!(gw.fetch_tile(GridPoint::new(1, 1)).await, None);
        assert_eq!(gw.fetch_tile(GridPoint::new(2, 2)).await, None);
        assert_eq!(gw.fetch_tile(GridPoint::new(3, 3)).await, None);
        // unrouted -> 404
        assert_eq!(gw.fetch_tile(GridPoint::new(9, 9)).await, None);
        assert_eq!(gw.tiles_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_press_accepted() {
        let t = tile(2, 3, &[(5, "112233")]);
        let (mock, gw) = gateway(MockTransport::new().with_press_reply(&t, 200));

        let outcome = gw.press_button(GridPoint::new(2, 3), t.buttons[5].id, "112233").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.tile, t);

        let bodies = mock.post_bodies("/api/2/3");
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["id"], t.buttons[5].id);
        assert_eq!(bodies[0]["hex"], "112233");
    }

    #[tokio::test]
    async fn test_press_conflict_still_returns_tile() {
        let t = tile(2, 3, &[(5, "999999")]);
        let (_, gw) = gateway(MockTransport::new().with_press_reply(&t, 409));

        let outcome = gw.press_button(GridPoint::new(2, 3), t.buttons[5].id, "112233").await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.tile.buttons[5].hex.as_deref(), Some("999999"));
    }

    #[tokio::test]
    async fn test_concurrent_presses_on_one_tile_share_outcome() {
        let t = tile(2, 3, &[(5, "112233")]);
        let (mock, gw) = gateway(MockTransport::new().with_press_reply(&t, 200));
        let p = GridPoint::new(2, 3);

        let (a, b) = tokio::join!(
            gw.press_button(p, t.buttons[5].id, "112233"),
            gw.press_button(p, t.buttons[6].id, "112233")
        );
        assert_eq!(mock.calls_to(Method::Post, "/api/2/3"), 1);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_press_transport_failure() {
        let (_, gw) = gateway(MockTransport::new().fail(Method::Post, "/api/2/3"));
        assert_eq!(gw.press_button(GridPoint::new(2, 3), 1, "ffffff").await, None);
    }

    #[tokio::test]
    async fn test_stats() {
        let body = r#"[
            {"stat_key":"b","stat_name":"B","stat_desc":"","val":2,"scale":0,"order":2},
            {"stat_key":"a","stat_name":"A","stat_desc":"","val":1,"scale":0,"order":1}
        ]"#;
        let (_, gw) = gateway(MockTransport::new().route(Method::Get, STATS_PATH, HttpReply::new(200, body)));
        let stats = gw.fetch_stats().await;
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].stat_key, "b");

        let (_, down) = gateway(MockTransport::new().route(Method::Get, STATS_PATH, HttpReply::new(503, "")));
        assert!(down.fetch_stats().await.is_empty());

        let (_, broken) = gateway(MockTransport::new().fail(Method::Get, STATS_PATH));
        assert!(broken.fetch_stats().await.is_empty());
    }

    #[test]
    fn test_undecodable_tile_is_none() {
        let (mock, gw) = gateway(MockTransport::new().route(
            Method::Get,
            "/api/6/6",
            HttpReply::new(200, "<html>oops</html>"),
        ));
        assert_eq!(tokio_test::block_on(gw.fetch_tile(GridPoint::new(6, 6))), None);
        assert_eq!(mock.calls_to(Method::Get, "/api/6/6"), 1);
        assert_eq!(gw.tiles_in_flight(), 0);
    }
}
