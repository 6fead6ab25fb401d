//! URL-fragment addressing: `#{x},{y}`.

use tracing::info;

use crate::codec::{random_in_range, GridPoint};
use crate::error::{Error, Result};

/// Result of resolving a navigation fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The fragment named a valid tile; make it the origin.
    Origin(GridPoint),
    /// The fragment was unusable; the host should navigate here instead.
    Redirect(GridPoint),
}

impl Navigation {
    pub fn point(self) -> GridPoint {
        match self {
            Self::Origin(p) | Self::Redirect(p) => p,
        }
    }

    pub fn is_redirect(self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

/// Parse `#x,y` (the `#` is optional) into a point within the grid.
pub fn parse_fragment(fragment: &str, max_x: i64, max_y: i64) -> Result<GridPoint> {
    let body = fragment.strip_prefix('#').unwrap_or(fragment);
    let invalid = || Error::InvalidFragment(fragment.to_string());
    let (xs, ys) = body.split_once(',').ok_or_else(invalid)?;
    let x = parse_coordinate(xs).ok_or_else(invalid)?;
    let y = parse_coordinate(ys).ok_or_else(invalid)?;
    let point = GridPoint::new(x, y);
    if !point.within(max_x, max_y) {
        return Err(Error::OutOfRange { x, y, max_x, max_y });
    }
    Ok(point)
}

/// Plain base-10 digits only; no sign or whitespace.
fn parse_coordinate(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Resolve a fragment, substituting a random valid tile when it is unusable.
pub fn resolve(fragment: &str, max_x: i64, max_y: i64) -> Navigation {
    match parse_fragment(fragment, max_x, max_y) {
        Ok(point) => Navigation::Origin(point),
        Err(e) => {
            let target = random_point(max_x, max_y);
            info!(error = %e, %target, "redirecting navigation");
            Navigation::Redirect(target)
        }
    }
}

pub fn random_point(max_x: i64, max_y: i64) -> GridPoint {
    GridPoint::new(random_in_range(max_x), random_in_range(max_y))
}

/// Map a click on the minimap image to the tile it depicts.
///
/// `(click_x, click_y)` is relative to the image's top-left corner and
/// `(width, height)` is its displayed size.
pub fn minimap_target(click_x: f64, click_y: f64, width: f64, height: f64, max_x: i64, max_y: i64) -> GridPoint {
    let axis = |click: f64, size: f64, max: i64| -> i64 {
        if size <= 0.0 {
            return 1;
        }
        let ratio = size / max as f64;
        ((click / ratio).ceil() as i64).clamp(1, max.max(1))
    };
    GridPoint::new(axis(click_x, width, max_x), axis(click_y, height, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_X: i64 = 4096;
    const MAX_Y: i64 = 2500;

    #[test]
    fn test_valid_fragment_sets_origin() {
        assert_eq!(resolve("#12,7", MAX_X, MAX_Y), Navigation::Origin(GridPoint::new(12, 7)));
        assert_eq!(parse_fragment("3,4", MAX_X, MAX_Y).unwrap(), GridPoint::new(3, 4));
        assert_eq!(parse_fragment("#4096,2500", MAX_X, MAX_Y).unwrap(), GridPoint::new(4096, 2500));
    }

    #[test]
    fn test_zero_coordinate_redirects_within_bounds() {
        let nav = resolve("#0,5", MAX_X, MAX_Y);
        assert!(nav.is_redirect());
        assert!(nav.point().within(MAX_X, MAX_Y));
    }

    #[test]
    fn test_out_of_range_and_malformed() {
        assert!(matches!(parse_fragment("#4097,1", MAX_X, MAX_Y), Err(Error::OutOfRange { x: 4097, .. })));
        assert!(matches!(parse_fragment("#1,2501", MAX_X, MAX_Y), Err(Error::OutOfRange { .. })));
        assert!(matches!(parse_fragment("#0,2", MAX_X, MAX_Y), Err(Error::OutOfRange { .. })));
        for bad in [
            "", "#", "#12", "#a,b", "#1,2,3", "#1.5,2", "#12abc,7", "#-3,2", "#+12,7", "##12,7",
            " 12 , 7 ", "#12, 7", "#12,",
        ] {
            assert!(
                matches!(parse_fragment(bad, MAX_X, MAX_Y), Err(Error::InvalidFragment(_))),
                "{bad:?} should be rejected"
            );
            let nav = resolve(bad, MAX_X, MAX_Y);
            assert!(nav.is_redirect());
            assert!(nav.point().within(MAX_X, MAX_Y));
        }
    }

    #[test]
    fn test_random_point_in_small_grid() {
        for _ in 0..100 {
            let p = random_point(3, 2);
            assert!(p.within(3, 2));
        }
    }

    #[test]
    fn test_minimap_target() {
        // 4096x2500 grid drawn at 1024x625: 4 tiles per pixel
        assert_eq!(minimap_target(1.0, 1.0, 1024.0, 625.0, MAX_X, MAX_Y), GridPoint::new(4, 4));
        assert_eq!(minimap_target(0.0, 0.0, 1024.0, 625.0, MAX_X, MAX_Y), GridPoint::new(1, 1));
        assert_eq!(minimap_target(1024.0, 625.0, 1024.0, 625.0, MAX_X, MAX_Y), GridPoint::new(4096, 2500));
        assert_eq!(minimap_target(5000.0, 5000.0, 1024.0, 625.0, MAX_X, MAX_Y), GridPoint::new(4096, 2500));
        assert_eq!(minimap_target(10.0, 10.0, 0.0, 0.0, MAX_X, MAX_Y), GridPoint::new(1, 1));
    }
}
