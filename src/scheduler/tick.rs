//! Viewport reconciliation.
//!
//! Each dirty tick evicts containers that left the pre-render area, grows
//! containers around the visible ones, and makes sure every visible
//! container holds its tile's buttons: straight from the cache when the
//! tile is known, otherwise through a concurrent fetch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::client::ClientConfig;
use crate::codec::{GridPoint, TileState};
use crate::error::{Error, Result};
use crate::protocol::RemoteTileGateway;
use crate::renderer::{Renderer, Viewport};
use crate::state::TileCache;

/// Outcome of one scheduler pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Containers inside the pre-render area
    pub visible: usize,
    /// Tiles fetched from the server
    pub fetched: usize,
    /// Containers (re)filled with buttons, fetched or cached
    pub rendered: usize,
    pub failed: usize,
    pub evicted: usize,
    /// Containers created by probing an empty viewport
    pub probed: usize,
    /// Dirty flag after the pass
    pub dirty: bool,
}

impl TickReport {
    pub fn did_work(&self) -> bool {
        self.fetched > 0 || self.rendered > 0 || self.failed > 0
    }
}

pub struct ViewportScheduler {
    period: Duration,
    max_x: i64,
    max_y: i64,
    dirty: bool,
    passes: u64,
}

impl ViewportScheduler {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            period: config.tick_interval(),
            max_x: config.grid_max_x,
            max_y: config.grid_max_y,
            dirty: true,
            passes: 0,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of dirty passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Periodic timer driving [`tick`](Self::tick); late ticks are skipped,
    /// not bunched. Must be called inside a tokio runtime.
    pub fn interval(&self) -> Interval {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    }

    fn in_bounds(&self, point: GridPoint) -> bool {
        point.within(self.max_x, self.max_y)
    }

    /// Run one reconciliation pass. Returns immediately when not dirty.
    pub async fn tick(
        &mut self,
        cache: &mut TileCache,
        renderer: &mut Renderer,
        viewport: &Viewport,
        gateway: &Arc<RemoteTileGateway>,
    ) -> TickReport {
        if !self.dirty {
            return TickReport::default();
        }
        self.passes += 1;
        let mut report = TickReport::default();

        for point in renderer.points() {
            if !viewport.is_visible(point) && renderer.evict(point) {
                report.evicted += 1;
            }
        }

        if !renderer.points().into_iter().any(|p| viewport.is_visible(p)) {
            report.probed = self.probe(renderer, viewport);
        }

        let visible = self.grow(renderer, viewport);
        report.visible = visible.len();

        let mut fetches = JoinSet::new();
        for &point in &visible {
            if renderer.is_populated(point) {
                continue;
            }
            if let Some(tile) = cache.get_mut(point) {
                trace!(%point, "re-rendering from cache");
                renderer.render(tile);
                report.rendered += 1;
                continue;
            }
            let gateway = Arc::clone(gateway);
            fetches.spawn(async move { (point, gateway.fetch_tile(point).await) });
        }

        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((point, Some(tile))) => {
                    report.fetched += 1;
                    if render_fetched(point, tile, cache, renderer) {
                        report.rendered += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Ok((point, None)) => {
                    debug!(%point, "tile unavailable, will retry");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "fetch task failed");
                    report.failed += 1;
                }
            }
        }

        self.dirty = report.did_work();
        report.dirty = self.dirty;
        debug!(
            visible = report.visible,
            fetched = report.fetched,
            rendered = report.rendered,
            failed = report.failed,
            evicted = report.evicted,
            probed = report.probed,
            dirty = report.dirty,
            "scheduler pass"
        );
        report
    }

    /// Seed containers when nothing is on screen: every sampled tile plus
    /// the compass neighbors of the center sample.
    fn probe(&self, renderer: &mut Renderer, viewport: &Viewport) -> usize {
        let samples = viewport.sample_points().map(|(sx, sy)| viewport.tile_at(sx, sy));
        let mut candidates: BTreeSet<GridPoint> = samples.into_iter().collect();
        candidates.extend(samples[0].neighbors());

        let mut created = 0;
        for point in candidates {
            if self.in_bounds(point) && !renderer.has_container(point) {
                renderer.ensure_container(point);
                created += 1;
            }
        }
        if created > 0 {
            debug!(center = %samples[0], created, "probed empty viewport");
        }
        created
    }

    /// Create the 3x3 neighborhood of every visible container until no new
    /// visible container appears. Returns the visible set.
    fn grow(&self, renderer: &mut Renderer, viewport: &Viewport) -> BTreeSet<GridPoint> {
        let mut visible: BTreeSet<GridPoint> = renderer
            .points()
            .into_iter()
            .filter(|p| viewport.is_visible(*p))
            .collect();
        let mut frontier: Vec<GridPoint> = visible.iter().copied().collect();

        while let Some(point) = frontier.pop() {
            for neighbor in point.neighbors() {
                if !self.in_bounds(neighbor) || renderer.has_container(neighbor) {
                    continue;
                }
                renderer.ensure_container(neighbor);
                if viewport.is_visible(neighbor) && visible.insert(neighbor) {
                    frontier.push(neighbor);
                }
            }
        }
        visible
    }

    /// Render one coordinate from the cache, fetching it when unknown.
    /// Returns whether the tile was rendered.
    pub async fn render_grid_point(
        &self,
        point: GridPoint,
        cache: &mut TileCache,
        renderer: &mut Renderer,
        gateway: &RemoteTileGateway,
    ) -> Result<bool> {
        if !self.in_bounds(point) {
            return Err(Error::OutOfRange {
                x: point.x,
                y: point.y,
                max_x: self.max_x,
                max_y: self.max_y,
            });
        }
        if let Some(tile) = cache.get_mut(point) {
            renderer.render(tile);
            return Ok(true);
        }
        match gateway.fetch_tile(point).await {
            Some(tile) => Ok(render_fetched(point, tile, cache, renderer)),
            None => {
                renderer.ensure_container(point);
                Ok(false)
            }
        }
    }
}

/// Merge a fetched tile and render the cached copy at `point`.
fn render_fetched(point: GridPoint, tile: TileState, cache: &mut TileCache, renderer: &mut Renderer) -> bool {
    let answered = tile.point();
    if answered != point {
        warn!(%point, %answered, "server answered for a different tile");
    }
    cache.put(tile);
    match cache.get_mut(point) {
        Some(cached) => {
            renderer.render(cached);
            true
        }
        None => false,
    }
}
