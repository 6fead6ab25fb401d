//! Drag/pan state machine.
//!
//! Turns pointer and single-finger touch streams into a cumulative pan
//! offset and a stream of [`PanEvent`]s delivered to one [`PanHandler`].
//!
//! # States
//!
//! - **idle**: pointer moves are ignored; pointer-down or a one-finger
//!   touch-start enters `dragging` and emits `DragStart`.
//! - **dragging**: every pointer move (and every `throttle + 1`th touch move)
//!   shifts the offset by the inverse of the movement and emits `DragMove`.
//!   Up/leave/end/cancel return to idle and emit `DragEnd`; touch endings
//!   first flush any movement the throttle held back.
//!
//! A reset from any state zeroes the offset and emits `DragReset`.

use crate::client::events::{
    InputEvent, PanEvent, PanEventKind, PanHandler, PointerInput, TouchInput, TouchPoint,
};

pub struct PanTracker {
    pos_x: f64,
    pos_y: f64,
    dragging: bool,
    /// Touch position at the last emitted move
    tracked: Option<TouchPoint>,
    /// Most recent position of the tracked touch
    latest: Option<TouchPoint>,
    touch_buffer: u32,
    throttle: u32,
    handler: Box<dyn PanHandler>,
}

impl PanTracker {
    pub fn new(handler: Box<dyn PanHandler>, throttle: u32) -> Self {
        Self {
            pos_x: 0.0,
            pos_y: 0.0,
            dragging: false,
            tracked: None,
            latest: None,
            touch_buffer: 0,
            throttle,
            handler,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.pos_x, self.pos_y)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn handle(&mut self, input: InputEvent) {
        match &input {
            InputEvent::Pointer(pointer) => self.on_pointer(*pointer, input.clone()),
            InputEvent::Touch(touch) => self.on_touch(touch.clone(), input.clone()),
            InputEvent::Reset(_) => self.on_reset(input.clone()),
        }
    }

    fn on_pointer(&mut self, pointer: PointerInput, source: InputEvent) {
        match pointer {
            PointerInput::Down => {
                self.dragging = true;
                self.emit(PanEventKind::DragStart, source, 0.0, 0.0);
            }
            PointerInput::Move { movement_x, movement_y } => {
                if self.dragging {
                    self.apply_move(source, movement_x, movement_y);
                }
            }
            PointerInput::Up | PointerInput::Leave => {
                if self.dragging {
                    self.end_drag(source);
                }
            }
        }
    }

    fn on_touch(&mut self, touch: TouchInput, source: InputEvent) {
        match touch {
            TouchInput::Start { touches } => {
                // Pinches and other multi-finger gestures never pan.
                if let [only] = touches.as_slice() {
                    self.tracked = Some(*only);
                    self.latest = Some(*only);
                    self.touch_buffer = 0;
                    self.dragging = true;
                    self.emit(PanEventKind::DragStart, source, 0.0, 0.0);
                }
            }
            TouchInput::Move { changed } => {
                let Some(tracked) = self.tracked else {
                    return;
                };
                self.touch_buffer += 1;
                let Some(next) = changed.iter().find(|t| t.identifier == tracked.identifier) else {
                    return;
                };
                self.latest = Some(*next);
                if self.touch_buffer <= self.throttle {
                    return;
                }
                self.touch_buffer = 0;
                self.flush_touch(source);
            }
            TouchInput::End | TouchInput::Cancel => {
                if self.tracked.is_none() {
                    return;
                }
                self.flush_touch(source.clone());
                self.end_drag(source);
            }
        }
    }

    fn on_reset(&mut self, source: InputEvent) {
        self.pos_x = 0.0;
        self.pos_y = 0.0;
        self.dragging = false;
        self.tracked = None;
        self.latest = None;
        self.touch_buffer = 0;
        self.emit(PanEventKind::DragReset, source, 0.0, 0.0);
    }

    /// Emit the movement between the last reported and the latest touch position.
    fn flush_touch(&mut self, source: InputEvent) {
        let (Some(tracked), Some(latest)) = (self.tracked, self.latest) else {
            return;
        };
        let movement_x = latest.client_x - tracked.client_x;
        let movement_y = latest.client_y - tracked.client_y;
        self.tracked = Some(latest);
        self.apply_move(source, movement_x, movement_y);
    }

    fn apply_move(&mut self, source: InputEvent, movement_x: f64, movement_y: f64) {
        self.pos_x -= movement_x;
        self.pos_y -= movement_y;
        self.emit(PanEventKind::DragMove, source, movement_x, movement_y);
    }

    fn end_drag(&mut self, source: InputEvent) {
        self.dragging = false;
        self.tracked = None;
        self.latest = None;
        self.touch_buffer = 0;
        self.emit(PanEventKind::DragEnd, source, 0.0, 0.0);
    }

    fn emit(&mut self, kind: PanEventKind, source: InputEvent, movement_x: f64, movement_y: f64) {
        let event = PanEvent {
            kind,
            source,
            movement_x,
            movement_y,
            dragging: self.dragging,
            pos_x: self.pos_x,
            pos_y: self.pos_y,
        };
        self.handler.on_pan(event);
    }
}
