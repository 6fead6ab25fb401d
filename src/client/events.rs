use tokio::sync::mpsc;

/// Raw pointer (mouse/pen) input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    Down,
    Move { movement_x: f64, movement_y: f64 },
    Up,
    Leave,
}

/// One active touch contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub identifier: i64,
    pub client_x: f64,
    pub client_y: f64,
}

impl TouchPoint {
    pub fn new(identifier: i64, client_x: f64, client_y: f64) -> Self {
        Self {
            identifier,
            client_x,
            client_y,
        }
    }
}

/// Raw touch input
#[derive(Debug, Clone, PartialEq)]
pub enum TouchInput {
    /// All touches currently on the surface
    Start { touches: Vec<TouchPoint> },
    /// Touches that moved in this event
    Move { changed: Vec<TouchPoint> },
    End,
    Cancel,
}

/// Why the pan was reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    Load,
    Navigation,
}

/// Everything the pan tracker consumes
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerInput),
    Touch(TouchInput),
    Reset(ResetCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanEventKind {
    DragStart,
    DragMove,
    DragEnd,
    DragReset,
}

/// Normalized pan notification
#[derive(Debug, Clone, PartialEq)]
pub struct PanEvent {
    pub kind: PanEventKind,
    /// Input that produced this event
    pub source: InputEvent,
    /// Pointer-space delta of this step; zero for start, end and reset
    pub movement_x: f64,
    pub movement_y: f64,
    pub dragging: bool,
    /// Cumulative viewport offset in pixels
    pub pos_x: f64,
    pub pos_y: f64,
}

/// The single subscriber of a [`PanTracker`](crate::client::PanTracker)
pub trait PanHandler: Send {
    fn on_pan(&mut self, event: PanEvent);
}

impl PanHandler for mpsc::UnboundedSender<PanEvent> {
    fn on_pan(&mut self, event: PanEvent) {
        // A closed receiver means the session is gone; nothing left to notify.
        let _ = self.send(event);
    }
}

/// Simple event collector
#[derive(Debug, Default)]
pub struct PanEventLog {
    events: Vec<PanEvent>,
}

impl PanEventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn drain(&mut self) -> Vec<PanEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl PanHandler for PanEventLog {
    fn on_pan(&mut self, event: PanEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_event() -> PanEvent {
        PanEvent {
            kind: PanEventKind::DragReset,
            source: InputEvent::Reset(ResetCause::Load),
            movement_x: 0.0,
            movement_y: 0.0,
            dragging: false,
            pos_x: 0.0,
            pos_y: 0.0,
        }
    }

    #[test]
    fn test_event_log() {
        let mut log = PanEventLog::new();
        assert!(log.is_empty());
        log.on_pan(reset_event());
        log.on_pan(reset_event());
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_channel_handler() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        tx.on_pan(reset_event());
        assert_eq!(rx.try_recv().unwrap().kind, PanEventKind::DragReset);
        drop(rx);
        // send after close is silently dropped
        tx.on_pan(reset_event());
    }
}
