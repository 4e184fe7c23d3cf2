//! Tuning constants: default config values, storage keys, format versions.
//!
//! Plain constants with no runtime dependency. The config structs in each
//! module use these for their `Default` impls; the simtest harness reads
//! them to build expectations.

/// Status engine defaults.
pub mod engine {
    /// Maximum fixed-point passes (and cascade BFS depth) before giving up.
    /// Prerequisite chains deeper than this are expected to converge only
    /// over several calls.
    pub const MAX_ROUNDS: u32 = 10;
}

/// Progress persistence.
pub mod progress {
    /// Single storage key holding the serialized `{node id: status}` map.
    pub const STORAGE_KEY: &str = "hexskill.progress";
    /// Save format version (increment when `ProgressSnapshot` changes).
    pub const SAVE_VERSION: u32 = 1;
}

/// Viewport defaults. Distances are screen pixels, times milliseconds.
pub mod viewport {
    pub const MIN_SCALE: f32 = 0.25;
    pub const MAX_SCALE: f32 = 2.0;
    /// How far content edges may be pulled inside the viewport edges.
    pub const MARGIN: f32 = 40.0;
    /// Per-frame velocity multiplier during inertia.
    pub const FRICTION: f32 = 0.92;
    /// Release speed (px/ms) above which a drag continues as inertia.
    pub const INERTIA_START_SPEED: f32 = 0.05;
    /// Speed (px/ms) below which inertia stops.
    pub const INERTIA_STOP_SPEED: f32 = 0.01;
    /// A release this long after the last move carries no velocity.
    pub const VELOCITY_STALE_MS: f64 = 100.0;
    pub const RESET_DURATION_MS: f32 = 350.0;
    pub const DEFAULT_WIDTH: f32 = 1280.0;
    pub const DEFAULT_HEIGHT: f32 = 720.0;
}

/// Gesture normalization defaults.
pub mod gesture {
    /// Maximum pointer travel for a press/release to count as a tap.
    pub const TAP_SLOP: f32 = 6.0;
    /// Maximum press duration for a tap.
    pub const TAP_MAX_MS: f64 = 300.0;
    /// Keyboard pan step.
    pub const PAN_STEP: f32 = 60.0;
    /// Keyboard zoom step (added to scale).
    pub const ZOOM_STEP: f32 = 0.1;
    /// Scale change per wheel delta unit.
    pub const WHEEL_ZOOM_FACTOR: f32 = 0.001;
}

/// Hex layout defaults.
pub mod layout {
    /// Cell radius (center to corner) in content units.
    pub const HEX_SIZE: f32 = 48.0;
}
