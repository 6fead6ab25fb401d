//! Persistent node scene for rendered tiles.
//!
//! The renderer owns one [`TileNode`] per materialized tile and one
//! [`ButtonNode`] per rendered button. Hosts mirror this scene onto their
//! real surface; rendering is a reconciliation, so re-rendering unchanged
//! state creates and updates nothing.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::client::ClientConfig;
use crate::codec::{GridPoint, TileState};

/// One rendered button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonNode {
    pub id: i64,
    pub index: usize,
    pub pressed: bool,
    pub color: Option<String>,
    /// Created for a tile that had been rendered before
    pub seen: bool,
}

impl ButtonNode {
    pub fn dom_id(&self) -> String {
        format!("b{}", self.id)
    }

    pub fn aria_label(&self) -> String {
        format!("Button {}", self.dom_id())
    }

    pub fn classes(&self) -> Vec<&'static str> {
        let mut classes = vec!["button"];
        if self.seen {
            classes.push("seen");
        }
        if self.pressed {
            classes.push("pressed");
        }
        classes
    }
}

/// Container for one tile's buttons
#[derive(Debug, Clone, PartialEq)]
pub struct TileNode {
    pub point: GridPoint,
    /// Offset from the origin tile; the pan is applied through `--offset-x/-y`
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
    pub columns: usize,
    buttons: IndexMap<i64, ButtonNode>,
}

impl TileNode {
    pub fn dom_id(&self) -> String {
        self.point.dom_id()
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ButtonNode> {
        self.buttons.values()
    }

    pub fn button(&self, id: i64) -> Option<&ButtonNode> {
        self.buttons.get(&id)
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    pub fn style_left(&self) -> String {
        format!("calc({}px + var(--offset-x))", self.offset_x)
    }

    pub fn style_top(&self) -> String {
        format!("calc({}px + var(--offset-y))", self.offset_y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub containers_created: u64,
    pub buttons_created: u64,
    pub buttons_updated: u64,
    pub evictions: u64,
}

pub struct Renderer {
    origin: GridPoint,
    tile_width: f64,
    tile_height: f64,
    columns: usize,
    tiles: IndexMap<GridPoint, TileNode>,
    button_owner: HashMap<i64, GridPoint>,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            origin: GridPoint::new(1, 1),
            tile_width: config.tile_width,
            tile_height: config.tile_height,
            columns: config.layout().row_length(),
            tiles: IndexMap::new(),
            button_owner: HashMap::new(),
            stats: RenderStats::default(),
        }
    }

    /// Drop the whole scene and lay out future tiles around `origin`.
    pub fn reset(&mut self, origin: GridPoint) {
        debug!(%origin, dropped = self.tiles.len(), "resetting scene");
        self.origin = origin;
        self.tiles.clear();
        self.button_owner.clear();
    }

    pub fn origin(&self) -> GridPoint {
        self.origin
    }

    /// Get or create the container for `point`.
    pub fn ensure_container(&mut self, point: GridPoint) -> &mut TileNode {
        let (origin, tw, th, columns) = (self.origin, self.tile_width, self.tile_height, self.columns);
        let stats = &mut self.stats;
        self.tiles.entry(point).or_insert_with(|| {
            stats.containers_created += 1;
            trace!(%point, "creating container");
            TileNode {
                point,
                offset_x: (point.x - origin.x) as f64 * tw,
                offset_y: (point.y - origin.y) as f64 * th,
                width: tw,
                height: th,
                columns,
                buttons: IndexMap::new(),
            }
        })
    }

    /// Reconcile the scene with `tile` and mark the tile as seen.
    pub fn render(&mut self, tile: &mut TileState) -> &TileNode {
        let point = tile.point();
        let seen = tile.seen;
        self.ensure_container(point);

        let mut created = 0u64;
        let mut updated = 0u64;
        if let Some(node) = self.tiles.get_mut(&point) {
            for (index, state) in tile.buttons.iter().enumerate() {
                let button = node.buttons.entry(state.id).or_insert_with(|| {
                    created += 1;
                    ButtonNode {
                        id: state.id,
                        index,
                        pressed: false,
                        color: None,
                        seen,
                    }
                });
                let pressed = state.hex.is_some();
                if button.pressed != pressed || button.color != state.hex {
                    button.pressed = pressed;
                    button.color = state.hex.clone();
                    updated += 1;
                }
                self.button_owner.insert(state.id, point);
            }
        }

        self.stats.buttons_created += created;
        self.stats.buttons_updated += updated;
        if created > 0 || updated > 0 {
            trace!(%point, created, updated, "rendered tile");
        }
        tile.seen = true;

        &self.tiles[&point]
    }

    /// Empty the container at `point`, keeping the container itself.
    /// Returns whether anything was removed.
    pub fn evict(&mut self, point: GridPoint) -> bool {
        let Some(node) = self.tiles.get_mut(&point) else {
            return false;
        };
        if node.buttons.is_empty() {
            return false;
        }
        for id in node.buttons.keys() {
            self.button_owner.remove(id);
        }
        node.buttons.clear();
        self.stats.evictions += 1;
        trace!(%point, "evicted container");
        true
    }

    /// Show a button as pressed ahead of the server's answer.
    /// Returns `false` when the button is not currently rendered.
    pub fn mark_pressed(&mut self, id: i64) -> bool {
        let Some(point) = self.button_owner.get(&id).copied() else {
            return false;
        };
        match self.tiles.get_mut(&point).and_then(|node| node.buttons.get_mut(&id)) {
            Some(button) => {
                button.pressed = true;
                true
            }
            None => false,
        }
    }

    pub fn container(&self, point: GridPoint) -> Option<&TileNode> {
        self.tiles.get(&point)
    }

    pub fn containers(&self) -> impl Iterator<Item = &TileNode> {
        self.tiles.values()
    }

    pub fn points(&self) -> Vec<GridPoint> {
        self.tiles.keys().copied().collect()
    }

    pub fn has_container(&self, point: GridPoint) -> bool {
        self.tiles.contains_key(&point)
    }

    /// Whether `point` has a container with buttons in it.
    pub fn is_populated(&self, point: GridPoint) -> bool {
        self.tiles.get(&point).is_some_and(|node| !node.is_empty())
    }

    pub fn button(&self, id: i64) -> Option<&ButtonNode> {
        let point = self.button_owner.get(&id)?;
        self.tiles.get(point)?.button(id)
    }

    /// Containers plus buttons currently in the scene.
    pub fn node_count(&self) -> usize {
        self.tiles.len() + self.tiles.values().map(TileNode::len).sum::<usize>()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::testing::tile;

    fn renderer() -> Renderer {
        let mut r = Renderer::new(&ClientConfig::default());
        r.reset(GridPoint::new(5, 5));
        r
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut r = renderer();
        let mut t = tile(5, 5, &[(0, "ff0000"), (9, "00ff00")]);

        r.render(&mut t);
        let after_first = (r.node_count(), r.stats());
        r.render(&mut t);

        assert_eq!(r.node_count(), after_first.0);
        assert_eq!(r.stats(), after_first.1);
        assert_eq!(r.node_count(), 101);
        assert_eq!(r.stats().containers_created, 1);
        assert_eq!(r.stats().buttons_created, 100);
    }

    #[test]
    fn test_pressed_class_and_color() {
        let mut r = renderer();
        let mut t = tile(5, 5, &[(3, "abcdef")]);
        let id = t.buttons[3].id;
        r.render(&mut t);

        let b = r.button(id).unwrap();
        assert!(b.pressed);
        assert_eq!(b.color.as_deref(), Some("abcdef"));
        assert_eq!(b.classes(), vec!["button", "pressed"]);
        assert_eq!(b.dom_id(), format!("b{id}"));
        assert_eq!(b.aria_label(), format!("Button b{id}"));

        t.buttons[3].hex = None;
        r.render(&mut t);
        let b = r.button(id).unwrap();
        assert!(!b.pressed);
        assert_eq!(b.color, None);
        assert_eq!(r.stats().buttons_updated, 2);
    }

    #[test]
    fn test_container_offsets_relative_to_origin() {
        let mut r = renderer();
        let node = r.ensure_container(GridPoint::new(7, 4));
        assert_eq!((node.offset_x, node.offset_y), (640.0, -320.0));
        assert_eq!(node.columns, 10);
        assert_eq!(node.dom_id(), "7-4");
        assert_eq!(node.style_left(), "calc(640px + var(--offset-x))");
        assert_eq!(node.style_top(), "calc(-320px + var(--offset-y))");
        assert!(node.is_empty());
    }

    #[test]
    fn test_seen_marks_rerendered_buttons() {
        let mut r = renderer();
        let mut t = tile(5, 5, &[]);
        assert!(!t.seen);
        r.render(&mut t);
        assert!(t.seen);
        assert!(r.containers().next().unwrap().buttons().all(|b| !b.seen));

        assert!(r.evict(t.point()));
        assert!(!r.is_populated(t.point()));
        assert!(r.has_container(t.point()));

        r.render(&mut t);
        assert!(r.container(t.point()).unwrap().buttons().all(|b| b.seen));
        assert_eq!(r.stats().evictions, 1);
        assert_eq!(r.stats().containers_created, 1);
    }

    #[test]
    fn test_evict_empty_or_missing_is_noop() {
        let mut r = renderer();
        assert!(!r.evict(GridPoint::new(1, 1)));
        r.ensure_container(GridPoint::new(1, 1));
        assert!(!r.evict(GridPoint::new(1, 1)));
        assert_eq!(r.stats().evictions, 0);
    }

    #[test]
    fn test_mark_pressed_stale_node() {
        let mut r = renderer();
        let mut t = tile(5, 5, &[]);
        let id = t.buttons[1].id;
        assert!(!r.mark_pressed(id));

        r.render(&mut t);
        assert!(r.mark_pressed(id));
        assert!(r.button(id).unwrap().pressed);

        r.evict(t.point());
        assert!(!r.mark_pressed(id));
        assert!(r.button(id).is_none());
    }

    #[test]
    fn test_reset_drops_scene() {
        let mut r = renderer();
        r.render(&mut tile(5, 5, &[]));
        r.ensure_container(GridPoint::new(6, 5));
        assert_eq!(r.points(), vec![GridPoint::new(5, 5), GridPoint::new(6, 5)]);
        r.reset(GridPoint::new(1, 1));
        assert_eq!(r.node_count(), 0);
        assert_eq!(r.origin(), GridPoint::new(1, 1));
    }
}
