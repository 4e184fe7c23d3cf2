//! Core logic for the hex skill tree.
//!
//! This crate holds everything about a skill tree that does not depend on a
//! renderer or a UI toolkit: hex-grid geometry, prerequisite-driven status
//! resolution, progress persistence, and the pan/zoom viewport with its
//! input handling. Hosts feed it input events and draw the frames it
//! returns.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`constants`] | Default tuning values, storage key, save format version |
//! | [`gesture`] | Pointer/wheel/keyboard normalization into gesture actions |
//! | [`hex`] | Axial hex coordinates, plane conversion, cube rounding |
//! | [`progress`] | Progress store seam, memory and file stores, snapshot codec |
//! | [`skill_graph`] | Prerequisite graph validation and the status engine |
//! | [`status`] | Skill status lifecycle and transition table |
//! | [`tree_view`] | Placement, render frames, hit-testing, input routing |
//! | [`viewport`] | Viewport transform, bounds, drag/pinch/inertia, reset |

pub mod constants;
pub mod gesture;
pub mod hex;
pub mod progress;
pub mod skill_graph;
pub mod status;
pub mod tree_view;
pub mod viewport;
