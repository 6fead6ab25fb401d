//! Scripted in-memory transport for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::codec::{GridLayout, GridPoint, TileState};
use crate::error::{Error, Result};
use crate::protocol::transport::{HttpReply, TileTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
enum Route {
    Reply(HttpReply),
    Fail,
}

pub(crate) struct MockTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    calls: Mutex<Vec<(Method, String, Vec<u8>)>>,
    yields: usize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            yields: 3,
        }
    }

    pub(crate) fn route(self, method: Method, path: &str, reply: HttpReply) -> Self {
        self.set_route(method, path, reply);
        self
    }

    pub(crate) fn set_route(&self, method: Method, path: &str, reply: HttpReply) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Route::Reply(reply));
    }

    pub(crate) fn fail(self, method: Method, path: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Route::Fail);
        self
    }

    /// Serves `tile` on `GET /api/{x}/{y}`.
    pub(crate) fn with_tile(self, tile: &TileState) -> Self {
        let body = serde_json::to_vec(tile).unwrap();
        self.route(Method::Get, &tile.point().api_path(), HttpReply::new(200, body))
    }

    pub(crate) fn with_press_reply(self, tile: &TileState, status: u16) -> Self {
        let body = serde_json::to_vec(tile).unwrap();
        self.route(Method::Post, &tile.point().api_path(), HttpReply::new(status, body))
    }

    pub(crate) fn calls_to(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p, _)| *m == method && p == path)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn post_bodies(&self, path: &str) -> Vec<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p, _)| *m == Method::Post && p == path)
            .map(|(_, _, body)| serde_json::from_slice(body).unwrap())
            .collect()
    }

    async fn respond(&self, method: Method, path: &str, body: Vec<u8>) -> Result<HttpReply> {
        self.calls
            .lock()
            .unwrap()
            .push((method, path.to_string(), body));
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(method, path.to_string()))
            .cloned();
        match route {
            Some(Route::Reply(reply)) => Ok(reply),
            Some(Route::Fail) => Err(Error::Http("connection reset".into())),
            None => Ok(HttpReply::new(404, r#"{"error":"not found"}"#)),
        }
    }
}

#[async_trait]
impl TileTransport for MockTransport {
    async fn get(&self, path: &str) -> Result<HttpReply> {
        self.respond(Method::Get, path, Vec::new()).await
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<HttpReply> {
        self.respond(Method::Post, path, body).await
    }
}

pub(crate) fn layout() -> GridLayout {
    GridLayout::new(4096, 100)
}

/// A 100-button tile with the given `(index, hex)` buttons pressed.
pub(crate) fn tile(x: i64, y: i64, pressed: &[(usize, &str)]) -> TileState {
    let mut tile = TileState::blank(GridPoint::new(x, y), &layout());
    for (ix, hex) in pressed {
        tile.buttons[*ix].hex = Some(hex.to_string());
    }
    tile
}
