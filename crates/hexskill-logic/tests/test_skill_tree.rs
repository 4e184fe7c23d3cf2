//! Integration tests for the skill tree pipeline.
//!
//! Exercises: tree document → SkillGraphEngine → ProgressStore
//! → ViewportController → render frame → hit-test
//!
//! All tests are pure logic, no renderer involved.

use std::cell::RefCell;
use std::rc::Rc;

use hexskill_logic::gesture::{KeyCommand, PointerEvent, PointerPhase, WheelEvent};
use hexskill_logic::hex::{AxialCoord, HexLayout};
use hexskill_logic::progress::{FileStore, MemoryStore};
use hexskill_logic::skill_graph::{
    EngineConfig, SkillDefinition, SkillGraphEngine, StatusChange, TransitionError,
};
use hexskill_logic::status::SkillStatus;
use hexskill_logic::tree_view::{SkillTreeView, TreeViewConfig, ViewEvent};
use hexskill_logic::viewport::{ContentExtent, ViewportConfig, ViewportController};

const BUNDLED_TREE: &str = include_str!("../../../data/skill_tree.json");

// ── Helpers ────────────────────────────────────────────────────────────

fn bundled_view() -> SkillTreeView {
    SkillTreeView::from_json(
        BUNDLED_TREE,
        TreeViewConfig::default(),
        Box::new(MemoryStore::new()),
    )
    .expect("bundled tree loads")
}

/// Advance every node as far as it will go, repeating until nothing moves.
fn master_everything(view: &mut SkillTreeView) -> usize {
    let ids: Vec<String> = view.engine().nodes().iter().map(|n| n.id.clone()).collect();
    let mut steps = 0;
    loop {
        let mut progressed = false;
        for id in &ids {
            while view.advance_node(id).is_ok() {
                steps += 1;
                progressed = true;
            }
        }
        if !progressed {
            return steps;
        }
    }
}

fn pointer(id: u64, x: f32, y: f32, phase: PointerPhase, t: f64) -> PointerEvent {
    PointerEvent::new(id, x, y, phase, t)
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("hexskill-{}-{}", name, std::process::id()))
}

// ── Bundled tree ───────────────────────────────────────────────────────

#[test]
fn bundled_tree_is_valid() {
    let view = bundled_view();
    let engine = view.engine();
    assert_eq!(engine.len(), 20);
    assert!(engine.depth() <= EngineConfig::default().max_rounds);
    assert_eq!(engine.status("basics"), Some(SkillStatus::Available));
    for node in engine.nodes().iter().filter(|n| n.id != "basics") {
        assert_eq!(node.status, SkillStatus::Locked, "{}", node.id);
    }
}

#[test]
fn bundled_tree_cells_are_distinct() {
    let view = bundled_view();
    let mut cells: Vec<AxialCoord> = view.engine().nodes().iter().map(|n| n.coordinate).collect();
    let before = cells.len();
    cells.sort_by_key(|c| (c.q, c.r));
    cells.dedup();
    assert_eq!(cells.len(), before);
}

#[test]
fn whole_tree_can_be_mastered() {
    let mut view = bundled_view();
    let steps = master_everything(&mut view);
    // One unlock is implicit per node except the root; each then needs
    // Learning and Mastered.
    assert_eq!(steps, 20 * 2);
    assert!(view
        .engine()
        .nodes()
        .iter()
        .all(|n| n.status == SkillStatus::Mastered));
}

#[test]
fn unlocks_only_after_all_prerequisites() {
    let mut view = bundled_view();
    for id in ["basics", "structs", "enums", "error_handling"] {
        view.advance_node(id).unwrap();
        view.advance_node(id).unwrap();
    }
    // testing needs cargo as well
    assert_eq!(view.engine().status("testing"), Some(SkillStatus::Locked));
    let err = view.advance_node("testing").unwrap_err();
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));

    for id in ["modules", "cargo"] {
        view.advance_node(id).unwrap();
        view.advance_node(id).unwrap();
    }
    assert_eq!(view.engine().status("testing"), Some(SkillStatus::Available));
}

// ── Engine scenarios ───────────────────────────────────────────────────

#[test]
fn chain_scenario() {
    let defs = vec![
        SkillDefinition::new("a", AxialCoord::new(0, 0), &[]).with_status(SkillStatus::Available),
        SkillDefinition::new("b", AxialCoord::new(1, 0), &["a"]),
        SkillDefinition::new("c", AxialCoord::new(2, 0), &["b"]),
    ];
    let mut engine =
        SkillGraphEngine::new(defs, EngineConfig::default(), Box::new(MemoryStore::new()))
            .unwrap();
    engine.compute_all();

    engine.request_transition("a", SkillStatus::Learning).unwrap();
    engine.request_transition("a", SkillStatus::Mastered).unwrap();
    engine.compute_all();
    assert_eq!(engine.status("b"), Some(SkillStatus::Available));

    engine.request_transition("b", SkillStatus::Learning).unwrap();
    engine.request_transition("b", SkillStatus::Mastered).unwrap();
    engine.compute_all();
    assert_eq!(engine.status("c"), Some(SkillStatus::Available));
}

#[test]
fn observers_see_cascade_from_view() {
    let mut view = bundled_view();
    let seen: Rc<RefCell<Vec<StatusChange>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    view.engine_mut()
        .subscribe(Box::new(move |c: &StatusChange| sink.borrow_mut().push(c.clone())));

    view.advance_node("basics").unwrap();
    view.advance_node("basics").unwrap();

    let unlocked: Vec<String> = seen
        .borrow()
        .iter()
        .filter(|c| c.new == SkillStatus::Available)
        .map(|c| c.id.clone())
        .collect();
    for id in ["ownership", "structs", "modules"] {
        assert!(unlocked.iter().any(|u| u == id), "{} not unlocked", id);
    }
    assert_eq!(unlocked.len(), 3);
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn progress_persists_across_sessions() {
    let dir = temp_dir("persist");
    let _ = std::fs::remove_dir_all(&dir);

    {
        let mut view = SkillTreeView::from_json(
            BUNDLED_TREE,
            TreeViewConfig::default(),
            Box::new(FileStore::new(&dir)),
        )
        .unwrap();
        view.advance_node("basics").unwrap();
        view.advance_node("basics").unwrap();
        view.advance_node("ownership").unwrap();
    }

    let view = SkillTreeView::from_json(
        BUNDLED_TREE,
        TreeViewConfig::default(),
        Box::new(FileStore::new(&dir)),
    )
    .unwrap();
    assert_eq!(view.engine().status("basics"), Some(SkillStatus::Mastered));
    assert_eq!(view.engine().status("ownership"), Some(SkillStatus::Learning));
    assert_eq!(view.engine().status("structs"), Some(SkillStatus::Available));
    assert_eq!(view.engine().status("borrowing"), Some(SkillStatus::Locked));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn autosave_can_be_disabled() {
    let dir = temp_dir("no-autosave");
    let _ = std::fs::remove_dir_all(&dir);
    let config = TreeViewConfig {
        engine: EngineConfig {
            autosave: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut view =
        SkillTreeView::from_json(BUNDLED_TREE, config.clone(), Box::new(FileStore::new(&dir)))
            .unwrap();
    view.advance_node("basics").unwrap();
    drop(view);

    let view =
        SkillTreeView::from_json(BUNDLED_TREE, config, Box::new(FileStore::new(&dir))).unwrap();
    assert_eq!(view.engine().status("basics"), Some(SkillStatus::Available));
    let _ = std::fs::remove_dir_all(&dir);
}

// ── Geometry and viewport ──────────────────────────────────────────────

#[test]
fn plane_conversion_known_point() {
    let (x, y) = HexLayout::new(30.0).to_plane(AxialCoord::new(2, -1));
    assert!((x - 90.0).abs() < 1e-4);
    assert!(y.abs() < 1e-4);
}

fn large_viewport() -> ViewportController {
    ViewportController::new(
        ViewportConfig {
            margin: 0.0,
            ..Default::default()
        },
        800.0,
        600.0,
        ContentExtent::new(-1400.0, -1300.0, 1400.0, 1300.0),
    )
}

#[test]
fn oversized_drag_clamps() {
    let mut vp = large_viewport();
    assert!((vp.bounds().max_x - 1000.0).abs() < 1e-3);
    vp.begin_drag(0.0, 0.0, 0.0);
    vp.drag_to(5000.0, 5000.0, 16.0);
    assert!((vp.state().translate_x - 1000.0).abs() < 1e-3);
}

#[test]
fn pinch_doubling_hits_max_scale() {
    let mut vp = large_viewport();
    vp.begin_pinch((350.0, 300.0), (450.0, 300.0));
    vp.pinch_to((300.0, 300.0), (500.0, 300.0));
    assert!((vp.state().scale - 2.0).abs() < 1e-4);
}

#[test]
fn bounds_hold_through_mixed_input() {
    let mut view = bundled_view();
    let mut t = 0.0;
    for i in 0..40u64 {
        let base = 100.0 + (i % 7) as f32 * 90.0;
        view.handle_pointer(&pointer(1, base, 300.0, PointerPhase::Start, t));
        view.handle_pointer(&pointer(1, base + 400.0, 100.0, PointerPhase::Move, t + 16.0));
        view.handle_pointer(&pointer(1, base - 900.0, 700.0, PointerPhase::Move, t + 32.0));
        view.handle_pointer(&pointer(1, base - 900.0, 700.0, PointerPhase::End, t + 40.0));
        for _ in 0..5 {
            view.tick(16.0);
        }
        view.handle_wheel(&WheelEvent {
            x: base,
            y: 200.0,
            delta_y: if i % 2 == 0 { -240.0 } else { 300.0 },
        });
        if i % 5 == 0 {
            view.handle_key(KeyCommand::PanUp);
        }
        t += 500.0;

        let vp = view.viewport();
        let s = vp.state();
        assert!(s.scale >= vp.config().min_scale && s.scale <= vp.config().max_scale);
        assert!(
            vp.bounds().contains(s.translate_x, s.translate_y),
            "iteration {}: {:?} outside {:?}",
            i,
            s,
            vp.bounds()
        );
    }
}

#[test]
fn two_finger_pinch_through_view() {
    let mut view = bundled_view();
    let before = view.viewport().state().scale;
    view.handle_pointer(&pointer(1, 600.0, 360.0, PointerPhase::Start, 0.0));
    view.handle_pointer(&pointer(2, 680.0, 360.0, PointerPhase::Start, 5.0));
    view.handle_pointer(&pointer(2, 720.0, 360.0, PointerPhase::Move, 20.0));
    view.handle_pointer(&pointer(1, 560.0, 360.0, PointerPhase::Move, 30.0));
    assert!((view.viewport().state().scale - before * 2.0).abs() < 1e-3);

    view.handle_pointer(&pointer(2, 720.0, 360.0, PointerPhase::End, 40.0));
    view.handle_pointer(&pointer(1, 560.0, 360.0, PointerPhase::End, 50.0));
    assert!(!view.viewport().is_animating());
}

// ── Render handoff and hit-testing ─────────────────────────────────────

#[test]
fn tapping_rendered_node_reports_it() {
    let mut view = bundled_view();
    let frame = view.render_frame();
    let target = frame
        .nodes
        .iter()
        .find(|n| n.id == "lifetimes")
        .expect("lifetimes rendered")
        .clone();

    view.handle_pointer(&pointer(
        1,
        target.screen_x,
        target.screen_y,
        PointerPhase::Start,
        0.0,
    ));
    let event = view.handle_pointer(&pointer(
        1,
        target.screen_x + 2.0,
        target.screen_y,
        PointerPhase::End,
        80.0,
    ));
    assert_eq!(event, Some(ViewEvent::NodeTapped("lifetimes".into())));
}

#[test]
fn render_reflects_status_changes() {
    let mut view = bundled_view();
    view.advance_node("basics").unwrap();
    view.advance_node("basics").unwrap();
    let frame = view.render_frame();
    let status_of = |id: &str| frame.nodes.iter().find(|n| n.id == id).map(|n| n.status);
    assert_eq!(status_of("basics"), Some(SkillStatus::Mastered));
    assert_eq!(status_of("ownership"), Some(SkillStatus::Available));
    assert_eq!(status_of("traits"), Some(SkillStatus::Locked));
}
