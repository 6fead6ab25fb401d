use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::config::ClientConfig;
use crate::client::events::{InputEvent, PanEvent, PanEventKind, ResetCause};
use crate::client::tracker::PanTracker;
use crate::codec::{hex_equivalent, GridPoint, PressOutcome, StatEntry};
use crate::error::Result;
use crate::protocol::{HttpTransport, RemoteTileGateway, TileTransport};
use crate::renderer::{Renderer, Viewport};
use crate::scheduler::{TickReport, ViewportScheduler};
use crate::state::{minimap_target, resolve, ColorPreference, FileStore, Navigation, PreferenceStore, TileCache};

/// Builder for creating canvas sessions
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn TileTransport>>,
    store: Option<Box<dyn PreferenceStore>>,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(base_url))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            store: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.config.viewport_width = width;
        self.config.viewport_height = height;
        self
    }

    pub fn grid(mut self, max_x: i64, max_y: i64) -> Self {
        self.config.grid_max_x = max_x;
        self.config.grid_max_y = max_y;
        self
    }

    /// Use `transport` instead of HTTP to `base_url`.
    pub fn transport(mut self, transport: Arc<dyn TileTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Where the color preference lives; defaults to the user data dir.
    pub fn preference_store(mut self, store: Box<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<CanvasSession> {
        self.config.validate()?;
        let transport: Arc<dyn TileTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.config.base_url, self.config.request_timeout())?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Box::new(FileStore::open_default()));
        Ok(CanvasSession::new(self.config, transport, store))
    }

    /// Build and navigate to `fragment`.
    pub async fn connect(self, fragment: &str) -> Result<CanvasSession> {
        let mut session = self.build()?;
        session.navigate(fragment).await;
        Ok(session)
    }
}

/// Style variables a host applies to the canvas root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleVars {
    pub offset_x: String,
    pub offset_y: String,
    pub cursor_url: String,
}

impl StyleVars {
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("--offset-x", self.offset_x.as_str()),
            ("--offset-y", self.offset_y.as_str()),
            ("--cursor-url", self.cursor_url.as_str()),
        ]
    }
}

/// Active canvas session
pub struct CanvasSession {
    config: ClientConfig,
    gateway: Arc<RemoteTileGateway>,
    cache: TileCache,
    renderer: Renderer,
    viewport: Viewport,
    scheduler: ViewportScheduler,
    tracker: PanTracker,
    pan_events: mpsc::UnboundedReceiver<PanEvent>,
    preference: ColorPreference,
    origin: Option<GridPoint>,
}

impl CanvasSession {
    fn new(config: ClientConfig, transport: Arc<dyn TileTransport>, store: Box<dyn PreferenceStore>) -> Self {
        let (tx, pan_events) = mpsc::unbounded_channel();
        Self {
            gateway: Arc::new(RemoteTileGateway::new(transport)),
            cache: TileCache::new(),
            renderer: Renderer::new(&config),
            viewport: Viewport::new(&config),
            scheduler: ViewportScheduler::new(&config),
            tracker: PanTracker::new(Box::new(tx), config.touch_throttle),
            pan_events,
            preference: ColorPreference::load_or_init(store),
            origin: None,
            config,
        }
    }

    /// Make the tile named by `fragment` the origin.
    ///
    /// Unusable fragments navigate to a random tile instead and come back
    /// as [`Navigation::Redirect`]. The pan and the scene are reset; the
    /// cache survives.
    pub async fn navigate(&mut self, fragment: &str) -> Navigation {
        let navigation = resolve(fragment, self.config.grid_max_x, self.config.grid_max_y);
        let point = navigation.point();
        let cause = match self.origin {
            None => ResetCause::Load,
            Some(_) => ResetCause::Navigation,
        };
        info!(%point, redirect = navigation.is_redirect(), "navigating");

        self.handle_input(InputEvent::Reset(cause));
        self.origin = Some(point);
        self.renderer.reset(point);
        self.viewport.origin = point;

        match self
            .scheduler
            .render_grid_point(point, &mut self.cache, &mut self.renderer, &self.gateway)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(%point, "origin tile unavailable, scheduler will retry"),
            Err(e) => warn!(%point, error = %e, "origin tile not renderable"),
        }
        self.scheduler.mark_dirty();
        navigation
    }

    /// Feed raw input through the pan tracker and apply the resulting pan.
    pub fn handle_input(&mut self, input: InputEvent) -> Vec<PanEvent> {
        self.tracker.handle(input);
        let mut events = Vec::new();
        while let Ok(event) = self.pan_events.try_recv() {
            self.viewport.set_pan(event.pos_x, event.pos_y);
            if event.dragging || event.kind == PanEventKind::DragReset {
                self.scheduler.mark_dirty();
            }
            events.push(event);
        }
        events
    }

    /// One scheduler pass over the current viewport.
    pub async fn tick(&mut self) -> TickReport {
        self.scheduler
            .tick(&mut self.cache, &mut self.renderer, &self.viewport, &self.gateway)
            .await
    }

    /// Press `button_id` on the tile at `point` with the preferred color.
    ///
    /// The button shows as pressed right away; the server's copy of the
    /// tile then replaces it whether or not this press won.
    pub async fn press(&mut self, point: GridPoint, button_id: i64) -> Option<PressOutcome> {
        self.renderer.mark_pressed(button_id);
        let hex = self.preference.hex().to_string();
        let outcome = self.gateway.press_button(point, button_id, &hex).await;

        match &outcome {
            Some(outcome) => {
                let shown = outcome
                    .tile
                    .buttons
                    .iter()
                    .find(|b| b.id == button_id)
                    .and_then(|b| b.hex.as_deref());
                if outcome.success {
                    info!(%point, id = button_id, "press accepted");
                } else if shown.is_some_and(|h| hex_equivalent(h, &hex)) {
                    info!(%point, id = button_id, "button already had our color");
                } else {
                    info!(%point, id = button_id, winner = ?shown, "press lost to another user");
                }
                self.cache.put(outcome.tile.clone());
            }
            None => warn!(%point, id = button_id, "press failed"),
        }

        // Undo the optimistic mark on failure, apply the outcome otherwise.
        if let Some(tile) = self.cache.get_mut(point) {
            if self.renderer.has_container(point) {
                self.renderer.render(tile);
            }
        }
        outcome
    }

    /// Global statistics, ordered for display.
    pub async fn stats(&self) -> Vec<StatEntry> {
        let mut stats = self.gateway.fetch_stats().await;
        stats.sort_by_key(|s| s.order);
        stats
    }

    pub fn set_color(&mut self, hex: &str) -> Result<()> {
        self.preference.set(hex)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.scheduler.mark_dirty();
    }

    /// Fragment for a click on the minimap image of the given display size.
    pub fn minimap_fragment(&self, click_x: f64, click_y: f64, width: f64, height: f64) -> String {
        minimap_target(
            click_x,
            click_y,
            width,
            height,
            self.config.grid_max_x,
            self.config.grid_max_y,
        )
        .fragment()
    }

    pub fn style_vars(&self) -> StyleVars {
        StyleVars {
            offset_x: offset_var(self.viewport.pan_x),
            offset_y: offset_var(self.viewport.pan_y),
            cursor_url: format!("url(\"{}\")", self.preference.cursor_path()),
        }
    }

    /// Ids of rendered buttons whose tile is actually on screen.
    pub fn buttons_in_view(&self) -> Vec<i64> {
        self.renderer
            .containers()
            .filter(|node| self.viewport.intersects(node.point))
            .flat_map(|node| node.buttons().map(|b| b.id))
            .collect()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn origin(&self) -> Option<GridPoint> {
        self.origin
    }

    pub fn pan(&self) -> (f64, f64) {
        self.tracker.position()
    }

    pub fn is_dragging(&self) -> bool {
        self.tracker.is_dragging()
    }

    pub fn color(&self) -> &str {
        self.preference.hex()
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scheduler(&self) -> &ViewportScheduler {
        &self.scheduler
    }

    pub fn gateway(&self) -> &Arc<RemoteTileGateway> {
        &self.gateway
    }
}

fn offset_var(pan: f64) -> String {
    let offset = -pan;
    // avoid "-0px"
    let offset = if offset == 0.0 { 0.0 } else { offset };
    format!("{offset}px")
}
