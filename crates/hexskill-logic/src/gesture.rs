//! Input normalization: pointer, wheel and keyboard events in, a single
//! stream of [`GestureAction`]s out.
//!
//! Mouse and touch both arrive as [`PointerEvent`]s. One active pointer is
//! a drag, two are a pinch; a third is ignored until one of the first two
//! lifts. When a pinch loses a pointer the remaining one starts a fresh
//! drag, so the viewport never sees a jump.

use serde::{Deserialize, Serialize};

use crate::constants::gesture as defaults;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerPhase {
    Start,
    Move,
    End,
    /// The platform took the pointer away. Ends without inertia or tap.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub phase: PointerPhase,
    pub timestamp_ms: f64,
}

impl PointerEvent {
    pub fn new(id: u64, x: f32, y: f32, phase: PointerPhase, timestamp_ms: f64) -> Self {
        Self {
            id,
            x,
            y,
            phase,
            timestamp_ms,
        }
    }
}

/// Scroll wheel notch at a screen point. Positive `delta_y` scrolls down
/// (zooms out).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub x: f32,
    pub y: f32,
    pub delta_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCommand {
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
    ZoomIn,
    ZoomOut,
    ResetView,
}

/// Gesture tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Max travel (px) for a press to count as a tap.
    pub tap_slop: f32,
    /// Max press duration (ms) for a tap.
    pub tap_max_ms: f64,
    pub pan_step: f32,
    pub zoom_step: f32,
    /// Scale change per wheel delta unit.
    pub wheel_zoom_factor: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_slop: defaults::TAP_SLOP,
            tap_max_ms: defaults::TAP_MAX_MS,
            pan_step: defaults::PAN_STEP,
            zoom_step: defaults::ZOOM_STEP,
            wheel_zoom_factor: defaults::WHEEL_ZOOM_FACTOR,
        }
    }
}

/// Device-independent viewport operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    DragStart { x: f32, y: f32, timestamp_ms: f64 },
    DragMove { x: f32, y: f32, timestamp_ms: f64 },
    /// `inertia` is false when the drag was cancelled, handed over, or ended
    /// as a tap.
    DragEnd { timestamp_ms: f64, inertia: bool },
    PinchStart { a: (f32, f32), b: (f32, f32) },
    PinchMove { a: (f32, f32), b: (f32, f32) },
    PinchEnd,
    /// Scale change anchored at a screen point, or the viewport center
    /// when `anchor` is `None`.
    Zoom { anchor: Option<(f32, f32)>, delta: f32 },
    Pan { dx: f32, dy: f32 },
    Reset,
    Tap { x: f32, y: f32 },
}

#[derive(Debug, Clone, Copy)]
struct Contact {
    id: u64,
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy)]
struct TapCandidate {
    id: u64,
    x: f32,
    y: f32,
    started_ms: f64,
    /// Left the slop radius at some point.
    wandered: bool,
}

/// Tracks active pointers and turns raw events into gesture actions.
#[derive(Debug, Clone, Default)]
pub struct GestureNormalizer {
    config: GestureConfig,
    contacts: Vec<Contact>,
    tap: Option<TapCandidate>,
}

impl GestureNormalizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            contacts: Vec::with_capacity(2),
            tap: None,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Pointers currently tracked (0, 1 or 2).
    pub fn active_pointers(&self) -> usize {
        self.contacts.len()
    }

    /// Forget every tracked pointer.
    pub fn reset(&mut self) {
        self.contacts.clear();
        self.tap = None;
    }

    pub fn handle_pointer(&mut self, ev: &PointerEvent) -> Vec<GestureAction> {
        match ev.phase {
            PointerPhase::Start => self.pointer_down(ev),
            PointerPhase::Move => self.pointer_move(ev),
            PointerPhase::End | PointerPhase::Cancel => self.pointer_up(ev),
        }
    }

    fn pointer_down(&mut self, ev: &PointerEvent) -> Vec<GestureAction> {
        if self.contacts.len() >= 2 || self.contacts.iter().any(|c| c.id == ev.id) {
            return Vec::new();
        }
        self.contacts.push(Contact {
            id: ev.id,
            x: ev.x,
            y: ev.y,
        });

        match self.contacts.as_slice() {
            [only] => {
                self.tap = Some(TapCandidate {
                    id: only.id,
                    x: ev.x,
                    y: ev.y,
                    started_ms: ev.timestamp_ms,
                    wandered: false,
                });
                vec![GestureAction::DragStart {
                    x: ev.x,
                    y: ev.y,
                    timestamp_ms: ev.timestamp_ms,
                }]
            }
            [first, second] => {
                self.tap = None;
                vec![
                    GestureAction::DragEnd {
                        timestamp_ms: ev.timestamp_ms,
                        inertia: false,
                    },
                    GestureAction::PinchStart {
                        a: (first.x, first.y),
                        b: (second.x, second.y),
                    },
                ]
            }
            _ => Vec::new(),
        }
    }

    fn pointer_move(&mut self, ev: &PointerEvent) -> Vec<GestureAction> {
        let Some(contact) = self.contacts.iter_mut().find(|c| c.id == ev.id) else {
            return Vec::new();
        };
        contact.x = ev.x;
        contact.y = ev.y;

        match self.contacts.as_slice() {
            [_] => {
                if let Some(tap) = self.tap.as_mut() {
                    if (ev.x - tap.x).hypot(ev.y - tap.y) > self.config.tap_slop {
                        tap.wandered = true;
                    }
                }
                vec![GestureAction::DragMove {
                    x: ev.x,
                    y: ev.y,
                    timestamp_ms: ev.timestamp_ms,
                }]
            }
            [first, second] => vec![GestureAction::PinchMove {
                a: (first.x, first.y),
                b: (second.x, second.y),
            }],
            _ => Vec::new(),
        }
    }

    fn pointer_up(&mut self, ev: &PointerEvent) -> Vec<GestureAction> {
        let Some(pos) = self.contacts.iter().position(|c| c.id == ev.id) else {
            return Vec::new();
        };
        let was_pinch = self.contacts.len() == 2;
        self.contacts.remove(pos);

        if was_pinch {
            let mut actions = vec![GestureAction::PinchEnd];
            if let Some(rest) = self.contacts.first() {
                actions.push(GestureAction::DragStart {
                    x: rest.x,
                    y: rest.y,
                    timestamp_ms: ev.timestamp_ms,
                });
            }
            return actions;
        }

        let released = ev.phase == PointerPhase::End;
        let candidate = self.tap.take();
        let tapped = released && candidate.is_some_and(|tap| self.is_tap(&tap, ev));

        // A tap never starts inertia.
        let mut actions = vec![GestureAction::DragEnd {
            timestamp_ms: ev.timestamp_ms,
            inertia: released && !tapped,
        }];
        if tapped {
            actions.push(GestureAction::Tap { x: ev.x, y: ev.y });
        }
        actions
    }

    fn is_tap(&self, tap: &TapCandidate, ev: &PointerEvent) -> bool {
        let held = ev.timestamp_ms - tap.started_ms;
        let travel = (ev.x - tap.x).hypot(ev.y - tap.y);
        tap.id == ev.id
            && !tap.wandered
            && travel <= self.config.tap_slop
            && held <= self.config.tap_max_ms
    }

    /// Wheel zoom anchored at the pointer.
    pub fn handle_wheel(&self, ev: &WheelEvent) -> GestureAction {
        GestureAction::Zoom {
            anchor: Some((ev.x, ev.y)),
            delta: -ev.delta_y * self.config.wheel_zoom_factor,
        }
    }

    /// Keyboard navigation. Pan commands move the content, so `PanLeft`
    /// brings what lies to the left into view.
    pub fn handle_key(&self, key: KeyCommand) -> GestureAction {
        let step = self.config.pan_step;
        match key {
            KeyCommand::PanLeft => GestureAction::Pan { dx: step, dy: 0.0 },
            KeyCommand::PanRight => GestureAction::Pan { dx: -step, dy: 0.0 },
            KeyCommand::PanUp => GestureAction::Pan { dx: 0.0, dy: step },
            KeyCommand::PanDown => GestureAction::Pan { dx: 0.0, dy: -step },
            KeyCommand::ZoomIn => GestureAction::Zoom {
                anchor: None,
                delta: self.config.zoom_step,
            },
            KeyCommand::ZoomOut => GestureAction::Zoom {
                anchor: None,
                delta: -self.config.zoom_step,
            },
            KeyCommand::ResetView => GestureAction::Reset,
        }
    }
}
