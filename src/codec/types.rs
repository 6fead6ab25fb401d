use std::fmt;

/// Tile coordinate on the button grid (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct GridPoint {
    pub x: i64,
    pub y: i64,
}

impl GridPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Tiles below 1 on either axis do not exist on the server.
    pub fn is_renderable(self) -> bool {
        self.x >= 1 && self.y >= 1
    }

    pub fn within(self, max_x: i64, max_y: i64) -> bool {
        self.is_renderable() && self.x <= max_x && self.y <= max_y
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.to_offset();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn neighbors(self) -> [GridPoint; 8] {
        Direction::ALL.map(|d| self.step(d))
    }

    /// The point itself followed by its eight neighbors.
    pub fn neighborhood(self) -> [GridPoint; 9] {
        let n = self.neighbors();
        [self, n[0], n[1], n[2], n[3], n[4], n[5], n[6], n[7]]
    }

    /// Container identifier, `"{x}-{y}"`.
    pub fn dom_id(self) -> String {
        format!("{}-{}", self.x, self.y)
    }

    /// URL fragment form, `"#{x},{y}"`.
    pub fn fragment(self) -> String {
        format!("#{},{}", self.x, self.y)
    }

    pub fn api_path(self) -> String {
        format!("/api/{}/{}", self.x, self.y)
    }
}

/// Renders the cache-key form `"{x}_{y}"`.
impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

/// 8-way compass direction on the grid (+Y is down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    pub fn to_offset(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::NorthEast => (1, -1),
            Self::East => (1, 0),
            Self::SouthEast => (1, 1),
            Self::South => (0, 1),
            Self::SouthWest => (-1, 1),
            Self::West => (-1, 0),
            Self::NorthWest => (-1, -1),
        }
    }
}

/// RGB button color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `rrggbb` with an optional leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Lowercase `rrggbb`, no `#`.
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn random() -> Self {
        let mut buf = [0u8; 3];
        if getrandom::getrandom(&mut buf).is_err() {
            let [_, _, _, _, _, r, g, b] = fallback_entropy().to_le_bytes();
            buf = [r, g, b];
        }
        Self::rgb(buf[0], buf[1], buf[2])
    }
}

/// Normalizes a user-supplied color to lowercase `rrggbb`.
pub fn normalize_hex(hex: &str) -> Option<String> {
    Color::from_hex(hex.trim()).map(Color::to_hex)
}

/// Whether two hex strings name the same color, ignoring case and `#`.
pub fn hex_equivalent(a: &str, b: &str) -> bool {
    matches!((Color::from_hex(a), Color::from_hex(b)), (Some(a), Some(b)) if a == b)
}

/// Uniform value in `1..=max`.
pub fn random_in_range(max: i64) -> i64 {
    if max <= 1 {
        return 1;
    }
    let mut buf = [0u8; 8];
    let raw = match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => fallback_entropy(),
    };
    (raw % max as u64) as i64 + 1
}

fn fallback_entropy() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e37_79b9_7f4a_7c15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_point_keys() {
        let p = GridPoint::new(12, 7);
        assert_eq!(p.to_string(), "12_7");
        assert_eq!(p.dom_id(), "12-7");
        assert_eq!(p.fragment(), "#12,7");
        assert_eq!(p.api_path(), "/api/12/7");
        // "1_23" and "12_3" must stay distinct
        assert_ne!(GridPoint::new(1, 23), GridPoint::new(12, 3));
    }

    #[test]
    fn test_renderable_bounds() {
        assert!(GridPoint::new(1, 1).is_renderable());
        assert!(!GridPoint::new(0, 5).is_renderable());
        assert!(!GridPoint::new(5, -1).is_renderable());
        assert!(GridPoint::new(4, 4).within(4, 4));
        assert!(!GridPoint::new(5, 4).within(4, 4));
    }

    #[test]
    fn test_neighborhood() {
        let p = GridPoint::new(5, 5);
        let hood = p.neighborhood();
        assert_eq!(hood[0], p);
        assert!(hood.contains(&GridPoint::new(4, 4)));
        assert!(hood.contains(&GridPoint::new(6, 6)));
        assert_eq!(p.step(Direction::North), GridPoint::new(5, 4));
        assert_eq!(p.step(Direction::SouthWest), GridPoint::new(4, 6));
    }

    #[test]
    fn test_direction_offsets_cover_ring() {
        let offsets: std::collections::HashSet<(i64, i64)> = Direction::ALL.iter().map(|d| d.to_offset()).collect();
        assert_eq!(offsets.len(), 8);
        assert!(!offsets.contains(&(0, 0)));
        assert!(offsets.iter().all(|&(dx, dy)| dx.abs() <= 1 && dy.abs() <= 1));
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#FF8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("ff8000").map(Color::to_hex).as_deref(), Some("ff8000"));
        assert_eq!(Color::from_hex("ff80"), None);
        assert_eq!(Color::from_hex("gg0000"), None);
        assert_eq!(normalize_hex(" #ABCDEF "), Some("abcdef".to_string()));
        assert!(hex_equivalent("#ABCDEF", "abcdef"));
        assert!(!hex_equivalent("abcdef", "abcdee"));
        assert!(!hex_equivalent("", ""));
    }

    #[test]
    fn test_random_in_range() {
        for _ in 0..200 {
            let v = random_in_range(7);
            assert!((1..=7).contains(&v));
        }
        assert_eq!(random_in_range(1), 1);
        assert_eq!(random_in_range(0), 1);
    }
}
