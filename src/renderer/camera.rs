use crate::client::ClientConfig;
use crate::codec::GridPoint;

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn expand(&self, margin: f64) -> Self {
        Self {
            left: self.left - margin,
            top: self.top - margin,
            right: self.right + margin,
            bottom: self.bottom + margin,
        }
    }

    /// Strict overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right && self.right > other.left && self.top < other.bottom && self.bottom > other.top
    }
}

/// The visible window onto the tile plane.
///
/// Tiles are laid out relative to the origin tile at content `(0, 0)`; the
/// pan offset shifts content by `(-pan_x, -pan_y)` on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub tile_width: f64,
    pub tile_height: f64,
    pub margin: f64,
    pub origin: GridPoint,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Viewport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            width: config.viewport_width,
            height: config.viewport_height,
            tile_width: config.tile_width,
            tile_height: config.tile_height,
            margin: config.visibility_margin,
            origin: GridPoint::new(1, 1),
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn set_pan(&mut self, pan_x: f64, pan_y: f64) {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Content-space offset of a tile from the origin tile, before panning.
    pub fn tile_offset(&self, point: GridPoint) -> (f64, f64) {
        (
            (point.x - self.origin.x) as f64 * self.tile_width,
            (point.y - self.origin.y) as f64 * self.tile_height,
        )
    }

    /// Screen rectangle of a tile at the current pan.
    pub fn tile_rect(&self, point: GridPoint) -> Rect {
        let (x, y) = self.tile_offset(point);
        Rect::new(x - self.pan_x, y - self.pan_y, self.tile_width, self.tile_height)
    }

    /// Visible, counting the pre-render margin.
    pub fn is_visible(&self, point: GridPoint) -> bool {
        self.tile_rect(point).intersects(&self.bounds().expand(self.margin))
    }

    /// Actually on screen, no margin.
    pub fn intersects(&self, point: GridPoint) -> bool {
        self.tile_rect(point).intersects(&self.bounds())
    }

    /// Tile under a screen point.
    pub fn tile_at(&self, screen_x: f64, screen_y: f64) -> GridPoint {
        let cx = ((screen_x + self.pan_x) / self.tile_width).floor() as i64;
        let cy = ((screen_y + self.pan_y) / self.tile_height).floor() as i64;
        GridPoint::new(self.origin.x + cx, self.origin.y + cy)
    }

    /// Screen center followed by a ring of eight points just inside the
    /// viewport edge.
    pub fn sample_points(&self) -> [(f64, f64); 9] {
        let (l, t) = (1.0, 1.0);
        let (r, b) = ((self.width - 1.0).max(l), (self.height - 1.0).max(t));
        let (cx, cy) = (self.width / 2.0, self.height / 2.0);
        [
            (cx, cy),
            (cx, t),
            (r, t),
            (r, cy),
            (r, b),
            (cx, b),
            (l, b),
            (l, cy),
            (l, t),
        ]
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        let config = ClientConfig {
            tile_width: 100.0,
            tile_height: 100.0,
            viewport_width: 300.0,
            viewport_height: 200.0,
            visibility_margin: 10.0,
            ..ClientConfig::default()
        };
        let mut v = Viewport::new(&config);
        v.origin = GridPoint::new(10, 10);
        v
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(a.expand(1.0).intersects(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert_eq!(a.expand(2.0).width(), 14.0);
        assert_eq!(a.height(), 10.0);
    }

    #[test]
    fn test_tile_rect_follows_pan() {
        let mut v = viewport();
        assert_eq!(v.tile_rect(GridPoint::new(11, 10)), Rect::new(100.0, 0.0, 100.0, 100.0));
        v.set_pan(50.0, -20.0);
        assert_eq!(v.tile_rect(GridPoint::new(11, 10)), Rect::new(50.0, 20.0, 100.0, 100.0));
    }

    #[test]
    fn test_margin_prerenders_edge_tiles() {
        let mut v = viewport();
        // tile (13,10) starts at x=300, exactly the right edge
        let edge = GridPoint::new(13, 10);
        assert!(!v.intersects(edge));
        assert!(v.is_visible(edge));
        v.set_pan(-15.0, 0.0);
        assert!(!v.is_visible(edge));
        // origin left of screen by more than the margin
        v.set_pan(111.0, 0.0);
        assert!(!v.is_visible(GridPoint::new(10, 10)));
        assert!(v.is_visible(GridPoint::new(11, 10)));
    }

    #[test]
    fn test_tile_at_and_samples() {
        let mut v = viewport();
        assert_eq!(v.tile_at(0.0, 0.0), GridPoint::new(10, 10));
        assert_eq!(v.tile_at(250.0, 150.0), GridPoint::new(12, 11));
        v.set_pan(-1.0, -1.0);
        assert_eq!(v.tile_at(0.0, 0.0), GridPoint::new(9, 9));

        let samples = v.sample_points();
        assert_eq!(samples[0], (150.0, 100.0));
        for (x, y) in samples {
            assert!((0.0..=300.0).contains(&x) && (0.0..=200.0).contains(&y));
        }
    }
}
