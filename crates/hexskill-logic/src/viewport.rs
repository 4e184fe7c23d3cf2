//! Pan/zoom viewport over the skill tree content plane.
//!
//! The transform maps content space to screen space as
//! `screen = viewport_center + translate + content * scale`, so a zero
//! translation at scale 1 puts the content origin in the middle of the view.
//!
//! One [`InteractionMode`] is active at a time. Drag, pinch, zoom and pan
//! calls cancel inertia or a running reset animation before they touch the
//! transform; [`ViewportController::tick`] advances whichever of the two is
//! running.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::constants::viewport as defaults;

/// Viewport tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Screen pixels content edges may be pulled inside the viewport edges.
    pub margin: f32,
    /// Velocity multiplier applied once per inertia frame.
    pub friction: f32,
    /// px/ms
    pub inertia_start_speed: f32,
    /// px/ms
    pub inertia_stop_speed: f32,
    pub velocity_stale_ms: f64,
    pub reset_duration_ms: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: defaults::MIN_SCALE,
            max_scale: defaults::MAX_SCALE,
            margin: defaults::MARGIN,
            friction: defaults::FRICTION,
            inertia_start_speed: defaults::INERTIA_START_SPEED,
            inertia_stop_speed: defaults::INERTIA_STOP_SPEED,
            velocity_stale_ms: defaults::VELOCITY_STALE_MS,
            reset_duration_ms: defaults::RESET_DURATION_MS,
        }
    }
}

impl ViewportConfig {
    /// Reject scale limits the transform cannot work with.
    pub fn validate(&self) -> Result<(), ViewportConfigError> {
        if !(self.min_scale > 0.0 && self.min_scale.is_finite()) {
            return Err(ViewportConfigError::MinScale(self.min_scale));
        }
        if !(self.max_scale >= self.min_scale && self.max_scale.is_finite()) {
            return Err(ViewportConfigError::ScaleRange {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewportConfigError {
    /// Must be positive and finite; content coordinates divide by scale.
    MinScale(f32),
    ScaleRange { min: f32, max: f32 },
}

impl std::fmt::Display for ViewportConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewportConfigError::MinScale(s) => {
                write!(f, "min_scale must be positive and finite, got {}", s)
            }
            ViewportConfigError::ScaleRange { min, max } => {
                write!(f, "max_scale {} is below min_scale {}", max, min)
            }
        }
    }
}

impl std::error::Error for ViewportConfigError {}

/// The affine content → screen transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewportState {
    fn lerp(&self, to: &ViewportState, t: f32) -> ViewportState {
        ViewportState {
            translate_x: self.translate_x + (to.translate_x - self.translate_x) * t,
            translate_y: self.translate_y + (to.translate_y - self.translate_y) * t,
            scale: self.scale + (to.scale - self.scale) * t,
        }
    }
}

/// Axis-aligned content rectangle in content units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentExtent {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl ContentExtent {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest extent covering every point. Empty input gives a zero extent.
    pub fn from_points(points: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut iter = points.into_iter();
        let Some((x0, y0)) = iter.next() else {
            return Self::default();
        };
        iter.fold(Self::new(x0, y0, x0, y0), |e, (x, y)| {
            Self::new(e.min_x.min(x), e.min_y.min(y), e.max_x.max(x), e.max_y.max(y))
        })
    }

    /// Grow by `pad` on every side.
    pub fn padded(&self, pad: f32) -> Self {
        Self::new(
            self.min_x - pad,
            self.min_y - pad,
            self.max_x + pad,
            self.max_y + pad,
        )
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Allowed translation range at a given scale. An axis with `min > max`
/// is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn x_degenerate(&self) -> bool {
        self.min_x > self.max_x
    }

    pub fn y_degenerate(&self) -> bool {
        self.min_y > self.max_y
    }

    /// Whether `(tx, ty)` lies inside on every constrained axis.
    pub fn contains(&self, tx: f32, ty: f32) -> bool {
        let ok_x = self.x_degenerate() || (tx >= self.min_x && tx <= self.max_x);
        let ok_y = self.y_degenerate() || (ty >= self.min_y && ty <= self.max_y);
        ok_x && ok_y
    }

    fn clamp(&self, tx: f32, ty: f32) -> (f32, f32) {
        let x = if self.x_degenerate() {
            trace!("Bounds degenerate on x ({} > {})", self.min_x, self.max_x);
            tx
        } else {
            tx.max(self.min_x).min(self.max_x)
        };
        let y = if self.y_degenerate() {
            trace!("Bounds degenerate on y ({} > {})", self.min_y, self.max_y);
            ty
        } else {
            ty.max(self.min_y).min(self.max_y)
        };
        (x, y)
    }
}

/// Which motion source currently drives the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    Idle,
    Dragging,
    Pinching,
    Inertia,
    Animating,
}

#[derive(Debug, Clone)]
struct DragSession {
    last_x: f32,
    last_y: f32,
    last_t: f64,
    vx: f32,
    vy: f32,
}

#[derive(Debug, Clone)]
struct PinchSession {
    start_distance: f32,
    start_scale: f32,
    /// Content point under the starting centroid.
    anchor_x: f32,
    anchor_y: f32,
}

#[derive(Debug, Clone)]
struct ResetAnimation {
    from: ViewportState,
    to: ViewportState,
    elapsed_ms: f32,
    duration_ms: f32,
}

#[derive(Debug, Clone)]
enum Motion {
    Idle,
    Dragging(DragSession),
    Pinching(PinchSession),
    Inertia { vx: f32, vy: f32 },
    Animating(ResetAnimation),
}

impl Motion {
    fn mode(&self) -> InteractionMode {
        match self {
            Motion::Idle => InteractionMode::Idle,
            Motion::Dragging(_) => InteractionMode::Dragging,
            Motion::Pinching(_) => InteractionMode::Pinching,
            Motion::Inertia { .. } => InteractionMode::Inertia,
            Motion::Animating(_) => InteractionMode::Animating,
        }
    }
}

/// Ease-in-out cubic on `t ∈ [0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Owns the viewport transform and applies interaction to it.
#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
    state: ViewportState,
    width: f32,
    height: f32,
    extent: ContentExtent,
    motion: Motion,
}

impl ViewportController {
    /// Controller showing `extent` in a `width × height` viewport, starting
    /// at the home transform.
    pub fn new(config: ViewportConfig, width: f32, height: f32, extent: ContentExtent) -> Self {
        let mut vp = Self {
            config,
            state: ViewportState::default(),
            width,
            height,
            extent,
            motion: Motion::Idle,
        };
        vp.state = vp.home_transform();
        vp
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn mode(&self) -> InteractionMode {
        self.motion.mode()
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.motion, Motion::Inertia { .. } | Motion::Animating(_))
    }

    pub fn viewport_size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn content_extent(&self) -> ContentExtent {
        self.extent
    }

    /// Translation bounds at the current scale.
    pub fn bounds(&self) -> Bounds {
        self.bounds_at(self.state.scale)
    }

    /// Translation bounds at `scale`.
    pub fn bounds_at(&self, scale: f32) -> Bounds {
        let m = self.config.margin;
        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        Bounds {
            max_x: m - cx - self.extent.min_x * scale,
            min_x: self.width - m - cx - self.extent.max_x * scale,
            max_y: m - cy - self.extent.min_y * scale,
            min_y: self.height - m - cy - self.extent.max_y * scale,
        }
    }

    /// Replace the transform outright (scale and bounds still apply).
    pub fn set_state(&mut self, state: ViewportState) {
        self.cancel_motion();
        self.state.scale = self.clamp_scale(state.scale);
        self.state.translate_x = state.translate_x;
        self.state.translate_y = state.translate_y;
        self.clamp_translation();
    }

    pub fn set_viewport_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.clamp_translation();
    }

    pub fn set_content_extent(&mut self, extent: ContentExtent) {
        self.extent = extent;
        self.clamp_translation();
    }

    pub fn content_to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.width / 2.0 + self.state.translate_x + x * self.state.scale,
            self.height / 2.0 + self.state.translate_y + y * self.state.scale,
        )
    }

    pub fn screen_to_content(&self, sx: f32, sy: f32) -> (f32, f32) {
        (
            (sx - self.width / 2.0 - self.state.translate_x) / self.state.scale,
            (sy - self.height / 2.0 - self.state.translate_y) / self.state.scale,
        )
    }

    /// Content centered at scale 1 (clamped into the scale range), with
    /// bounds applied.
    pub fn home_transform(&self) -> ViewportState {
        let scale = self.clamp_scale(1.0);
        let (ccx, ccy) = self.extent.center();
        let (tx, ty) = self.bounds_at(scale).clamp(-ccx * scale, -ccy * scale);
        ViewportState {
            translate_x: tx,
            translate_y: ty,
            scale,
        }
    }

    // ── Drag ────────────────────────────────────────────────────────────

    pub fn begin_drag(&mut self, x: f32, y: f32, timestamp_ms: f64) {
        self.cancel_motion();
        self.set_motion(Motion::Dragging(DragSession {
            last_x: x,
            last_y: y,
            last_t: timestamp_ms,
            vx: 0.0,
            vy: 0.0,
        }));
    }

    /// Move the active drag to `(x, y)`. Ignored outside a drag.
    pub fn drag_to(&mut self, x: f32, y: f32, timestamp_ms: f64) {
        let Motion::Dragging(session) = &mut self.motion else {
            return;
        };
        let dx = x - session.last_x;
        let dy = y - session.last_y;
        let dt = timestamp_ms - session.last_t;
        if dt > 0.0 {
            session.vx = dx / dt as f32;
            session.vy = dy / dt as f32;
        }
        session.last_x = x;
        session.last_y = y;
        session.last_t = timestamp_ms;

        self.state.translate_x += dx;
        self.state.translate_y += dy;
        self.clamp_translation();
    }

    /// Finish the drag. Returns true if it continues as inertia.
    pub fn end_drag(&mut self, timestamp_ms: f64) -> bool {
        let Motion::Dragging(session) = &self.motion else {
            return false;
        };
        let (vx, vy) = if timestamp_ms - session.last_t > self.config.velocity_stale_ms {
            (0.0, 0.0)
        } else {
            (session.vx, session.vy)
        };
        if vx.hypot(vy) > self.config.inertia_start_speed {
            self.set_motion(Motion::Inertia { vx, vy });
            true
        } else {
            self.set_motion(Motion::Idle);
            false
        }
    }

    // ── Pinch ───────────────────────────────────────────────────────────

    pub fn begin_pinch(&mut self, a: (f32, f32), b: (f32, f32)) {
        self.cancel_motion();
        let (mx, my) = midpoint(a, b);
        let (anchor_x, anchor_y) = self.screen_to_content(mx, my);
        self.set_motion(Motion::Pinching(PinchSession {
            start_distance: span(a, b).max(f32::EPSILON),
            start_scale: self.state.scale,
            anchor_x,
            anchor_y,
        }));
    }

    /// Update the pinch with the current contact points. Ignored outside a
    /// pinch.
    pub fn pinch_to(&mut self, a: (f32, f32), b: (f32, f32)) {
        let Motion::Pinching(session) = &self.motion else {
            return;
        };
        let scale = self.clamp_scale(session.start_scale * span(a, b) / session.start_distance);
        let (mx, my) = midpoint(a, b);
        let tx = mx - self.width / 2.0 - session.anchor_x * scale;
        let ty = my - self.height / 2.0 - session.anchor_y * scale;
        self.state = ViewportState {
            translate_x: tx,
            translate_y: ty,
            scale,
        };
        self.clamp_translation();
    }

    pub fn end_pinch(&mut self) {
        if matches!(self.motion, Motion::Pinching(_)) {
            self.set_motion(Motion::Idle);
        }
    }

    // ── Discrete input ──────────────────────────────────────────────────

    /// Change scale by `delta` keeping the screen point `(ax, ay)` over the
    /// same content point.
    pub fn zoom_at_point(&mut self, ax: f32, ay: f32, delta: f32) {
        self.cancel_motion();
        let old = self.state.scale;
        let scale = self.clamp_scale(old + delta);
        if scale == old {
            return;
        }
        let ox = ax - self.width / 2.0;
        let oy = ay - self.height / 2.0;
        let ratio = scale / old;
        self.state.translate_x = ox - (ox - self.state.translate_x) * ratio;
        self.state.translate_y = oy - (oy - self.state.translate_y) * ratio;
        self.state.scale = scale;
        self.clamp_translation();
    }

    /// Zoom anchored at the viewport center.
    pub fn zoom_at_center(&mut self, delta: f32) {
        self.zoom_at_point(self.width / 2.0, self.height / 2.0, delta);
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.cancel_motion();
        self.state.translate_x += dx;
        self.state.translate_y += dy;
        self.clamp_translation();
    }

    /// Return to the home transform, tweened unless `animated` is false or
    /// the reset duration is zero.
    pub fn reset_view(&mut self, animated: bool) {
        self.cancel_motion();
        let to = self.home_transform();
        if !animated || self.config.reset_duration_ms <= 0.0 {
            self.state = to;
            return;
        }
        self.set_motion(Motion::Animating(ResetAnimation {
            from: self.state,
            to,
            elapsed_ms: 0.0,
            duration_ms: self.config.reset_duration_ms,
        }));
    }

    /// Stop inertia or a reset animation. Active gestures are left alone.
    pub fn cancel_motion(&mut self) {
        if self.is_animating() {
            self.set_motion(Motion::Idle);
        }
    }

    /// End an active drag or pinch without inertia.
    pub fn cancel_gesture(&mut self) {
        if matches!(self.motion, Motion::Dragging(_) | Motion::Pinching(_)) {
            self.set_motion(Motion::Idle);
        }
    }

    /// Advance inertia or the reset animation by one frame. Returns true
    /// while motion continues.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        match &mut self.motion {
            Motion::Inertia { vx, vy } => {
                let (vx0, vy0) = (*vx, *vy);
                *vx *= self.config.friction;
                *vy *= self.config.friction;
                let slow = vx.hypot(*vy) < self.config.inertia_stop_speed;

                self.state.translate_x += vx0 * dt_ms;
                self.state.translate_y += vy0 * dt_ms;
                let hit_edge = self.clamp_translation();
                if slow || hit_edge {
                    self.set_motion(Motion::Idle);
                    return false;
                }
                true
            }
            Motion::Animating(anim) => {
                anim.elapsed_ms += dt_ms;
                let t = (anim.elapsed_ms / anim.duration_ms).min(1.0);
                let next = anim.from.lerp(&anim.to, ease_in_out_cubic(t));
                let done = t >= 1.0;
                let to = anim.to;
                self.state = if done { to } else { next };
                self.clamp_translation();
                if done {
                    self.set_motion(Motion::Idle);
                }
                !done
            }
            _ => false,
        }
    }

    fn set_motion(&mut self, motion: Motion) {
        let from = self.motion.mode();
        let to = motion.mode();
        if from != to {
            debug!("Viewport mode {:?} -> {:?}", from, to);
        }
        self.motion = motion;
    }

    fn clamp_scale(&self, scale: f32) -> f32 {
        scale.max(self.config.min_scale).min(self.config.max_scale)
    }

    /// Pull translation into bounds. Returns true if it had to move.
    fn clamp_translation(&mut self) -> bool {
        let (tx, ty) = self
            .bounds()
            .clamp(self.state.translate_x, self.state.translate_y);
        let moved = tx != self.state.translate_x || ty != self.state.translate_y;
        self.state.translate_x = tx;
        self.state.translate_y = ty;
        moved
    }
}

fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn span(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
