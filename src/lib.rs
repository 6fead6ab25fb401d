//! Button Canvas Client
//!
//! A Rust library for browsing the infinite button canvas: tiles of
//! buttons are streamed from the server as the viewport is panned, and
//! pressing a button paints it in the user's color for everyone.

pub mod codec;
pub mod error;
pub mod protocol;
pub mod state;
pub mod client;
pub mod renderer;
pub mod scheduler;

pub use error::{Error, Result};
pub use protocol::{HttpReply, HttpTransport, RemoteTileGateway, TileTransport};
pub use codec::{
    GridPoint, Direction, Color, GridLayout,
    ButtonState, TileState, PressRequest, PressOutcome, StatEntry,
};
pub use state::{TileCache, Navigation, ColorPreference, PreferenceStore, FileStore, MemoryStore};
pub use renderer::{Renderer, Viewport, TileNode, ButtonNode};
pub use scheduler::{ViewportScheduler, TickReport};
pub use client::{
    CanvasSession, ClientBuilder, ClientConfig, StyleVars,
    PanTracker, PanEvent, PanEventKind, InputEvent,
};
