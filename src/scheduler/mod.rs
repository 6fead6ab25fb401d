pub mod tick;

pub use tick::{TickReport, ViewportScheduler};
