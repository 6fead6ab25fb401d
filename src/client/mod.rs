pub mod config;
pub mod events;
pub mod session;
pub mod tracker;

pub use config::ClientConfig;
pub use events::{
    InputEvent, PanEvent, PanEventKind, PanEventLog, PanHandler, PointerInput, ResetCause, TouchInput, TouchPoint,
};
pub use session::{CanvasSession, ClientBuilder, StyleVars};
pub use tracker::PanTracker;
