//! Wire types for the tile API.
//!
//! The backend omits `hex` (or sends `""`) for buttons that were never
//! pressed; both decode to `None`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::types::GridPoint;

/// One button on a tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonState {
    pub id: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub hex: Option<String>,
}

impl ButtonState {
    pub fn new(id: i64, hex: Option<&str>) -> Self {
        Self {
            id,
            hex: hex.map(str::to_string),
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.hex.is_some()
    }
}

/// A page of buttons at one grid coordinate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileState {
    pub x: i64,
    pub y: i64,
    pub buttons: Vec<ButtonState>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub next: Option<String>,
    /// Set once the tile has been rendered; never sent over the wire.
    #[serde(skip)]
    pub seen: bool,
}

impl TileState {
    pub fn new(point: GridPoint, buttons: Vec<ButtonState>) -> Self {
        Self {
            x: point.x,
            y: point.y,
            buttons,
            next: None,
            seen: false,
        }
    }

    /// A tile of `page_size` unpressed buttons with ids laid out the way
    /// the server numbers them.
    pub fn blank(point: GridPoint, layout: &GridLayout) -> Self {
        let buttons = (0..layout.page_size)
            .map(|i| ButtonState::new(layout.button_id(point, i), None))
            .collect();
        Self::new(point, buttons)
    }

    pub fn point(&self) -> GridPoint {
        GridPoint::new(self.x, self.y)
    }

    pub fn index_of(&self, button_id: i64) -> Option<usize> {
        self.buttons.iter().position(|b| b.id == button_id)
    }

    pub fn pressed_count(&self) -> usize {
        self.buttons.iter().filter(|b| b.is_pressed()).count()
    }
}

/// Body of `POST /api/{x}/{y}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressRequest {
    pub id: i64,
    pub hex: Option<String>,
}

/// Tile state echoed back by a press, plus whether our press won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PressOutcome {
    pub tile: TileState,
    pub success: bool,
}

/// One row of `GET /api/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
    pub stat_key: String,
    pub stat_name: String,
    #[serde(default)]
    pub stat_desc: String,
    pub val: i64,
    #[serde(default)]
    pub scale: i64,
    #[serde(default)]
    pub order: i64,
}

impl StatEntry {
    /// `val * 10^scale`
    pub fn value(&self) -> f64 {
        self.val as f64 * 10f64.powi(self.scale as i32)
    }
}

/// How the server numbers buttons across the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub columns: i64,
    pub page_size: usize,
}

impl GridLayout {
    pub fn new(columns: i64, page_size: usize) -> Self {
        Self { columns, page_size }
    }

    fn page_offset(&self, point: GridPoint) -> i64 {
        let page = self.page_size as i64;
        (point.y - 1) * self.columns * page + (point.x - 1) * page
    }

    pub fn button_id(&self, point: GridPoint, index: usize) -> i64 {
        self.page_offset(point) + index as i64
    }

    /// Index of `id` on the tile at `point`, or `None` if it lives elsewhere.
    pub fn button_index(&self, point: GridPoint, id: i64) -> Option<usize> {
        let ix = id - self.page_offset(point);
        (0..self.page_size as i64).contains(&ix).then_some(ix as usize)
    }

    /// Buttons per tile row; tiles are square.
    pub fn row_length(&self) -> usize {
        (self.page_size as f64).sqrt().round() as usize
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
