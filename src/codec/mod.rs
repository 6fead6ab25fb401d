pub mod types;
pub mod tile;

pub use types::*;
pub use tile::{ButtonState, TileState, PressRequest, PressOutcome, StatEntry, GridLayout};
