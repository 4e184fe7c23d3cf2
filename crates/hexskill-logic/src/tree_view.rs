//! Skill tree view: ties the status engine, hex layout, viewport and input
//! normalization together.
//!
//! A host feeds raw input into [`SkillTreeView`], calls
//! [`SkillTreeView::tick`] once per frame, and draws whatever
//! [`SkillTreeView::render_frame`] returns. Node taps come back as
//! [`ViewEvent`]s; deciding what a tap means (open a detail panel, advance
//! the skill) is left to the host.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants;
use crate::gesture::{
    GestureAction, GestureConfig, GestureNormalizer, KeyCommand, PointerEvent, WheelEvent,
};
use crate::hex::{AxialCoord, HexLayout};
use crate::progress::ProgressStore;
use crate::skill_graph::{
    EngineConfig, GraphError, SkillDefinition, SkillGraphEngine, SkillNode, TransitionError,
    TransitionOutcome,
};
use crate::status::SkillStatus;
use crate::viewport::{ContentExtent, ViewportConfig, ViewportConfigError, ViewportController};

/// Everything tunable about a view. Missing JSON fields take defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeViewConfig {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub engine: EngineConfig,
    pub viewport: ViewportConfig,
    pub gesture: GestureConfig,
    /// Hit radius in content units. Defaults to the cell's inscribed radius.
    pub node_radius: Option<f32>,
}

impl Default for TreeViewConfig {
    fn default() -> Self {
        Self {
            viewport_width: constants::viewport::DEFAULT_WIDTH,
            viewport_height: constants::viewport::DEFAULT_HEIGHT,
            engine: EngineConfig::default(),
            viewport: ViewportConfig::default(),
            gesture: GestureConfig::default(),
            node_radius: None,
        }
    }
}

fn default_hex_size() -> f32 {
    constants::layout::HEX_SIZE
}

/// A skill tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTreeDefinition {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_hex_size")]
    pub hex_size: f32,
    pub skills: Vec<SkillDefinition>,
}

/// Errors from loading a skill tree document.
#[derive(Debug)]
pub enum DefinitionError {
    Json(serde_json::Error),
    Graph(GraphError),
    /// Cell size must be positive and finite.
    InvalidHexSize(f32),
    Viewport(ViewportConfigError),
}

impl From<serde_json::Error> for DefinitionError {
    fn from(e: serde_json::Error) -> Self {
        DefinitionError::Json(e)
    }
}

impl From<GraphError> for DefinitionError {
    fn from(e: GraphError) -> Self {
        DefinitionError::Graph(e)
    }
}

impl From<ViewportConfigError> for DefinitionError {
    fn from(e: ViewportConfigError) -> Self {
        DefinitionError::Viewport(e)
    }
}

impl std::fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionError::Json(e) => write!(f, "JSON parse error: {}", e),
            DefinitionError::Graph(e) => write!(f, "Invalid skill graph: {}", e),
            DefinitionError::InvalidHexSize(size) => {
                write!(f, "Hex size must be positive and finite, got {}", size)
            }
            DefinitionError::Viewport(e) => write!(f, "Invalid viewport config: {}", e),
        }
    }
}

impl std::error::Error for DefinitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DefinitionError::Json(e) => Some(e),
            DefinitionError::Graph(e) => Some(e),
            DefinitionError::InvalidHexSize(_) => None,
            DefinitionError::Viewport(e) => Some(e),
        }
    }
}

/// One node as the renderer should draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRender {
    pub id: String,
    pub screen_x: f32,
    pub screen_y: f32,
    pub screen_radius: f32,
    pub status: SkillStatus,
}

/// Complete draw state for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub nodes: Vec<NodeRender>,
    pub translate_x: f32,
    pub translate_y: f32,
    pub scale: f32,
}

/// Notable results of routing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    NodeTapped(String),
}

pub struct SkillTreeView {
    title: String,
    engine: SkillGraphEngine,
    layout: HexLayout,
    viewport: ViewportController,
    gestures: GestureNormalizer,
    /// Content-space centers, aligned with `engine.nodes()`.
    positions: Vec<(f32, f32)>,
    node_radius: f32,
}

impl SkillTreeView {
    /// Build a view, restoring saved progress from `store` when present.
    ///
    /// A store that cannot be read is logged and the tree starts from its
    /// initial statuses.
    pub fn new(
        definition: SkillTreeDefinition,
        config: TreeViewConfig,
        store: Box<dyn ProgressStore>,
    ) -> Result<Self, DefinitionError> {
        if !(definition.hex_size > 0.0 && definition.hex_size.is_finite()) {
            return Err(DefinitionError::InvalidHexSize(definition.hex_size));
        }
        config.viewport.validate()?;
        let layout = HexLayout::new(definition.hex_size);
        let mut engine = SkillGraphEngine::new(definition.skills, config.engine, store)?;

        if let Err(e) = engine.load_progress() {
            warn!("Could not restore progress: {}", e);
            engine.compute_all();
        }

        let mut occupied: HashMap<AxialCoord, &str> = HashMap::new();
        for node in engine.nodes() {
            if let Some(other) = occupied.insert(node.coordinate, &node.id) {
                warn!(
                    "Skills '{}' and '{}' share cell ({}, {})",
                    other, node.id, node.coordinate.q, node.coordinate.r
                );
            }
        }

        let positions: Vec<(f32, f32)> = engine
            .nodes()
            .iter()
            .map(|n| layout.to_plane(n.coordinate))
            .collect();
        let extent = ContentExtent::from_points(positions.iter().copied()).padded(layout.size);
        let viewport = ViewportController::new(
            config.viewport,
            config.viewport_width,
            config.viewport_height,
            extent,
        );
        let node_radius = config.node_radius.unwrap_or_else(|| layout.inner_radius());

        info!(
            "Skill tree '{}' ready: {} skills",
            definition.title,
            positions.len()
        );

        Ok(Self {
            title: definition.title,
            engine,
            layout,
            viewport,
            gestures: GestureNormalizer::new(config.gesture),
            positions,
            node_radius,
        })
    }

    /// Parse a [`SkillTreeDefinition`] document and build a view from it.
    pub fn from_json(
        json: &str,
        config: TreeViewConfig,
        store: Box<dyn ProgressStore>,
    ) -> Result<Self, DefinitionError> {
        let definition: SkillTreeDefinition = serde_json::from_str(json)?;
        Self::new(definition, config, store)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn engine(&self) -> &SkillGraphEngine {
        &self.engine
    }

    /// Mutable engine access, e.g. to subscribe observers.
    pub fn engine_mut(&mut self) -> &mut SkillGraphEngine {
        &mut self.engine
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn layout(&self) -> HexLayout {
        self.layout
    }

    pub fn node_radius(&self) -> f32 {
        self.node_radius
    }

    /// Content-space center of a node.
    pub fn position(&self, id: &str) -> Option<(f32, f32)> {
        self.engine
            .nodes()
            .iter()
            .position(|n| n.id == id)
            .map(|i| self.positions[i])
    }

    pub fn render_frame(&self) -> RenderFrame {
        let state = self.viewport.state();
        let nodes = self
            .engine
            .nodes()
            .iter()
            .zip(&self.positions)
            .map(|(node, &(x, y))| {
                let (screen_x, screen_y) = self.viewport.content_to_screen(x, y);
                NodeRender {
                    id: node.id.clone(),
                    screen_x,
                    screen_y,
                    screen_radius: self.node_radius * state.scale,
                    status: node.status,
                }
            })
            .collect();
        RenderFrame {
            nodes,
            translate_x: state.translate_x,
            translate_y: state.translate_y,
            scale: state.scale,
        }
    }

    /// Node under the screen point, nearest center first.
    pub fn hit_test(&self, sx: f32, sy: f32) -> Option<&SkillNode> {
        let (cx, cy) = self.viewport.screen_to_content(sx, sy);
        let r2 = self.node_radius * self.node_radius;
        self.engine
            .nodes()
            .iter()
            .zip(&self.positions)
            .map(|(node, &(x, y))| (node, (x - cx).powi(2) + (y - cy).powi(2)))
            .filter(|&(_, d2)| d2 <= r2)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(node, _)| node)
    }

    pub fn handle_pointer(&mut self, ev: &PointerEvent) -> Option<ViewEvent> {
        let mut event = None;
        for action in self.gestures.handle_pointer(ev) {
            if let Some(e) = self.apply(action) {
                event = Some(e);
            }
        }
        event
    }

    pub fn handle_wheel(&mut self, ev: &WheelEvent) {
        let action = self.gestures.handle_wheel(ev);
        self.apply(action);
    }

    pub fn handle_key(&mut self, key: KeyCommand) {
        let action = self.gestures.handle_key(key);
        self.apply(action);
    }

    fn apply(&mut self, action: GestureAction) -> Option<ViewEvent> {
        let vp = &mut self.viewport;
        match action {
            GestureAction::DragStart { x, y, timestamp_ms } => vp.begin_drag(x, y, timestamp_ms),
            GestureAction::DragMove { x, y, timestamp_ms } => vp.drag_to(x, y, timestamp_ms),
            GestureAction::DragEnd {
                timestamp_ms,
                inertia: true,
            } => {
                vp.end_drag(timestamp_ms);
            }
            GestureAction::DragEnd { inertia: false, .. } | GestureAction::PinchEnd => {
                vp.cancel_gesture()
            }
            GestureAction::PinchStart { a, b } => vp.begin_pinch(a, b),
            GestureAction::PinchMove { a, b } => vp.pinch_to(a, b),
            GestureAction::Zoom {
                anchor: Some((x, y)),
                delta,
            } => vp.zoom_at_point(x, y, delta),
            GestureAction::Zoom {
                anchor: None,
                delta,
            } => vp.zoom_at_center(delta),
            GestureAction::Pan { dx, dy } => vp.pan_by(dx, dy),
            GestureAction::Reset => vp.reset_view(true),
            GestureAction::Tap { x, y } => {
                return self
                    .hit_test(x, y)
                    .map(|node| ViewEvent::NodeTapped(node.id.clone()));
            }
        }
        None
    }

    /// Advance inertia or the reset animation. Returns true while the view
    /// is still moving.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        self.viewport.tick(dt_ms)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.set_viewport_size(width, height);
    }

    /// Move a node one step forward in its lifecycle.
    pub fn advance_node(&mut self, id: &str) -> Result<TransitionOutcome, TransitionError> {
        self.engine.advance(id)
    }

    pub fn request_transition(
        &mut self,
        id: &str,
        desired: SkillStatus,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.engine.request_transition(id, desired)
    }
}
