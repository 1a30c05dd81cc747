//! Touch gesture recognition for message bubbles.
//!
//! DESIGN
//! ======
//! A single exclusive state machine owns each touch sequence. Once a touch
//! becomes a swipe, a long press or a scroll, no other recognizer can claim
//! it, so a long press can never also complete a double tap.
//!
//! Time is passed in explicitly (milliseconds). The host calls [`tick`] from
//! a timer armed at [`next_deadline`]; every touch entry point also ticks
//! first, so late timers cannot reorder intents.
//!
//! ```text
//!   Idle ──start──▶ Pressed ──hold──▶ LongPressed ──end──▶ Idle
//!                     │  └──horizontal──▶ Swiping ──end──▶ Idle (+Reply)
//!                     │  └──vertical──▶ Idle
//!                     └──end──▶ AwaitingSecondTap ──start(same)──▶ Pressed
//!                                      └──timeout──▶ Idle (+Tap)
//! ```
//!
//! [`tick`]: GestureMachine::tick
//! [`next_deadline`]: GestureMachine::next_deadline

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use crate::config::GestureConfig;

/// Movement below this many pixels is treated as jitter.
pub const TOUCH_SLOP_PX: f64 = 10.0;

/// Screen-space touch position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A recognized gesture, carrying the target message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureIntent {
    /// Swipe right past the threshold.
    Reply(String),
    /// Held past the long-press delay.
    LongPress(String),
    /// Two taps on the same message within the double-tap window.
    DoubleTap(String),
    /// A single tap whose double-tap window expired.
    Tap(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    Idle,
    /// Finger down, not yet classified.
    Pressed {
        message_id: String,
        origin: Point,
        pressed_at: u64,
        /// Release time of a first tap on the same message, if this press
        /// may complete a double tap.
        prior_tap_at: Option<u64>,
    },
    Swiping {
        message_id: String,
        origin: Point,
        dx: f64,
    },
    /// Long press fired; the rest of the touch is consumed.
    LongPressed { message_id: String },
    AwaitingSecondTap { message_id: String, tapped_at: u64 },
}

pub struct GestureMachine {
    config: GestureConfig,
    state: GestureState,
}

impl GestureMachine {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self { config, state: GestureState::Idle }
    }

    #[must_use]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Horizontal bubble offset to render, clamped to `0..=max_swipe_px`.
    #[must_use]
    pub fn swipe_offset(&self) -> f64 {
        match &self.state {
            GestureState::Swiping { dx, .. } => dx.clamp(0.0, self.config.max_swipe_px),
            _ => 0.0,
        }
    }

    /// When [`tick`](Self::tick) next has something to do.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        match &self.state {
            GestureState::Pressed { pressed_at, .. } => Some(pressed_at + self.config.long_press_ms),
            GestureState::AwaitingSecondTap { tapped_at, .. } => Some(tapped_at + self.config.double_tap_ms),
            _ => None,
        }
    }

    /// Fire expired timers.
    pub fn tick(&mut self, now: u64) -> Vec<GestureIntent> {
        let mut out = Vec::new();
        match &self.state {
            GestureState::AwaitingSecondTap { message_id, tapped_at }
                if now >= tapped_at + self.config.double_tap_ms =>
            {
                out.push(GestureIntent::Tap(message_id.clone()));
                self.state = GestureState::Idle;
            }
            GestureState::Pressed { message_id, pressed_at, prior_tap_at, .. }
                if now >= pressed_at + self.config.long_press_ms =>
            {
                let message_id = message_id.clone();
                if prior_tap_at.is_some() {
                    out.push(GestureIntent::Tap(message_id.clone()));
                }
                out.push(GestureIntent::LongPress(message_id.clone()));
                self.state = GestureState::LongPressed { message_id };
            }
            _ => {}
        }
        out
    }

    /// Finger down on a message.
    pub fn touch_start(&mut self, message_id: &str, at: Point, now: u64) -> Vec<GestureIntent> {
        let mut out = self.tick(now);
        let prior_tap_at = match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::AwaitingSecondTap { message_id: prev, tapped_at } if prev == message_id => Some(tapped_at),
            GestureState::AwaitingSecondTap { message_id: prev, .. } => {
                out.push(GestureIntent::Tap(prev));
                None
            }
            GestureState::Pressed { message_id: prev, prior_tap_at: Some(_), .. } => {
                out.push(GestureIntent::Tap(prev));
                None
            }
            _ => None,
        };
        self.state = GestureState::Pressed {
            message_id: message_id.to_string(),
            origin: at,
            pressed_at: now,
            prior_tap_at,
        };
        out
    }

    pub fn touch_move(&mut self, at: Point, now: u64) -> Vec<GestureIntent> {
        let mut out = self.tick(now);
        match &mut self.state {
            GestureState::Pressed { message_id, origin, prior_tap_at, .. } => {
                let dx = at.x - origin.x;
                let dy = at.y - origin.y;
                let horizontal = dx.abs() > TOUCH_SLOP_PX && dx.abs() > dy.abs();
                let vertical = !horizontal && dy.abs() > TOUCH_SLOP_PX;
                if !horizontal && !vertical {
                    return out;
                }
                if prior_tap_at.is_some() {
                    out.push(GestureIntent::Tap(message_id.clone()));
                }
                self.state = if horizontal {
                    GestureState::Swiping { message_id: std::mem::take(message_id), origin: *origin, dx }
                } else {
                    GestureState::Idle
                };
            }
            GestureState::Swiping { origin, dx, .. } => *dx = at.x - origin.x,
            _ => {}
        }
        out
    }

    /// Finger up.
    pub fn touch_end(&mut self, now: u64) -> Vec<GestureIntent> {
        let mut out = self.tick(now);
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::Pressed { message_id, prior_tap_at: Some(_), .. } => {
                out.push(GestureIntent::DoubleTap(message_id));
            }
            GestureState::Pressed { message_id, prior_tap_at: None, .. } => {
                self.state = GestureState::AwaitingSecondTap { message_id, tapped_at: now };
            }
            GestureState::Swiping { message_id, dx, .. } => {
                if dx >= self.config.swipe_threshold_px {
                    out.push(GestureIntent::Reply(message_id));
                }
            }
            GestureState::AwaitingSecondTap { message_id, tapped_at } => {
                // Stray end without a start; keep waiting.
                self.state = GestureState::AwaitingSecondTap { message_id, tapped_at };
            }
            GestureState::LongPressed { .. } | GestureState::Idle => {}
        }
        out
    }

    /// The platform took the touch away (scroll container, interruption).
    pub fn touch_cancel(&mut self) -> Vec<GestureIntent> {
        match std::mem::replace(&mut self.state, GestureState::Idle) {
            GestureState::Pressed { message_id, prior_tap_at: Some(_), .. } => vec![GestureIntent::Tap(message_id)],
            GestureState::AwaitingSecondTap { message_id, tapped_at } => {
                self.state = GestureState::AwaitingSecondTap { message_id, tapped_at };
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}
