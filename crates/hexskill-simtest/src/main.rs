//! HexSkill Headless Harness
//!
//! Validates the bundled skill tree, the status engine, and viewport
//! behaviour without a renderer. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p hexskill-simtest
//!   cargo run -p hexskill-simtest -- --verbose
//!   RUST_LOG=hexskill_logic=trace cargo run -p hexskill-simtest

use std::collections::HashSet;

use hexskill_logic::constants;
use hexskill_logic::gesture::{
    GestureAction, GestureNormalizer, KeyCommand, PointerEvent, PointerPhase, WheelEvent,
};
use hexskill_logic::hex::{self, AxialCoord, HexLayout};
use hexskill_logic::progress::{MemoryStore, ProgressSnapshot, ProgressStore};
use hexskill_logic::skill_graph::{EngineConfig, GraphError, SkillDefinition, SkillGraphEngine};
use hexskill_logic::status::SkillStatus;
use hexskill_logic::tree_view::{SkillTreeDefinition, SkillTreeView, TreeViewConfig, ViewEvent};
use hexskill_logic::viewport::{ContentExtent, ViewportConfig, ViewportController};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Bundled skill tree (same JSON hosts ship) ───────────────────────────
const TREE_JSON: &str = include_str!("../../../data/skill_tree.json");

const SEED: u64 = 42;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    println!("=== HexSkill Headless Harness ===\n");
    info!("Random sweeps seeded with {}", SEED);

    let mut results = Vec::new();

    // 1. Bundled tree validation
    results.extend(validate_bundled_tree(verbose));

    // 2. Hex geometry sweeps
    results.extend(validate_hex_geometry(verbose));

    // 3. Status engine scenarios
    results.extend(validate_status_engine(verbose));

    // 4. Progress persistence
    results.extend(validate_persistence(verbose));

    // 5. Viewport scenarios and bounds sweep
    results.extend(validate_viewport(verbose));

    // 6. Gesture normalization
    results.extend(validate_gestures(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn view_from_bundle() -> Result<SkillTreeView, String> {
    SkillTreeView::from_json(
        TREE_JSON,
        TreeViewConfig::default(),
        Box::new(MemoryStore::new()),
    )
    .map_err(|e| e.to_string())
}

// ── 1. Bundled Tree ─────────────────────────────────────────────────────

fn validate_bundled_tree(verbose: bool) -> Vec<TestResult> {
    println!("--- Bundled Tree ---");
    let mut results = Vec::new();

    let definition: SkillTreeDefinition = match serde_json::from_str(TREE_JSON) {
        Ok(d) => d,
        Err(e) => {
            results.push(TestResult {
                name: "tree_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            return results;
        }
    };

    results.push(TestResult {
        name: "tree_not_empty".into(),
        passed: definition.skills.len() >= 10,
        detail: format!(
            "'{}': {} skills",
            definition.title,
            definition.skills.len()
        ),
    });

    let mut cells = HashSet::new();
    let shared: Vec<_> = definition
        .skills
        .iter()
        .filter(|s| !cells.insert(s.coordinate))
        .map(|s| s.id.as_str())
        .collect();
    results.push(TestResult {
        name: "tree_distinct_cells".into(),
        passed: shared.is_empty(),
        detail: if shared.is_empty() {
            "every skill has its own cell".into()
        } else {
            format!("shared cells: {:?}", shared)
        },
    });

    let unnamed: Vec<_> = definition
        .skills
        .iter()
        .filter(|s| s.name.trim().is_empty())
        .map(|s| s.id.as_str())
        .collect();
    results.push(TestResult {
        name: "tree_named_skills".into(),
        passed: unnamed.is_empty(),
        detail: format!("{} skills without a display name", unnamed.len()),
    });

    let mut view = match view_from_bundle() {
        Ok(v) => v,
        Err(e) => {
            results.push(TestResult {
                name: "tree_graph_valid".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };

    let depth = view.engine().depth();
    let cap = EngineConfig::default().max_rounds;
    results.push(TestResult {
        name: "tree_depth_within_cap".into(),
        passed: depth <= cap,
        detail: format!("depth {} vs round cap {}", depth, cap),
    });

    let roots: Vec<_> = view
        .engine()
        .nodes()
        .iter()
        .filter(|n| n.prerequisites.is_empty())
        .map(|n| n.id.clone())
        .collect();
    let roots_available = roots
        .iter()
        .all(|id| view.engine().status(id) == Some(SkillStatus::Available));
    results.push(TestResult {
        name: "tree_roots_available".into(),
        passed: !roots.is_empty() && roots_available,
        detail: format!("roots: {:?}", roots),
    });

    // Walk the whole tree to mastery the way a user would.
    let ids: Vec<String> = view.engine().nodes().iter().map(|n| n.id.clone()).collect();
    let mut rounds = 0;
    loop {
        rounds += 1;
        let mut progressed = false;
        for id in &ids {
            while let Ok(outcome) = view.advance_node(id) {
                debug!(
                    "{} -> {} ({} unlocked)",
                    id,
                    outcome.change.new,
                    outcome.cascade.len()
                );
                progressed = true;
            }
        }
        if !progressed || rounds > ids.len() {
            break;
        }
    }
    let unmastered: Vec<_> = view
        .engine()
        .nodes()
        .iter()
        .filter(|n| n.status != SkillStatus::Mastered)
        .map(|n| n.id.as_str())
        .collect();
    if verbose {
        println!("  mastered whole tree in {} sweeps", rounds);
    }
    results.push(TestResult {
        name: "tree_fully_masterable".into(),
        passed: unmastered.is_empty(),
        detail: if unmastered.is_empty() {
            format!("all {} skills mastered", ids.len())
        } else {
            format!("stuck: {:?}", unmastered)
        },
    });

    results
}

// ── 2. Hex Geometry ─────────────────────────────────────────────────────

fn validate_hex_geometry(verbose: bool) -> Vec<TestResult> {
    println!("--- Hex Geometry ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(SEED);

    let (x, y) = HexLayout::new(30.0).to_plane(AxialCoord::new(2, -1));
    results.push(TestResult {
        name: "hex_known_point".into(),
        passed: (x - 90.0).abs() < 1e-4 && y.abs() < 1e-4,
        detail: format!("size 30, (2,-1) → ({:.3}, {:.3})", x, y),
    });

    let samples = 5000;
    let mut round_trip_failures = 0;
    for _ in 0..samples {
        let layout = HexLayout::new(rng.gen_range(5.0..120.0));
        let h = AxialCoord::new(rng.gen_range(-200..=200), rng.gen_range(-200..=200));
        let (px, py) = layout.to_plane(h);
        if layout.to_hex(px, py) != h {
            round_trip_failures += 1;
            if verbose {
                println!("  round trip failed: {:?} size {}", h, layout.size);
            }
        }
    }
    results.push(TestResult {
        name: "hex_round_trip_sweep".into(),
        passed: round_trip_failures == 0,
        detail: format!("{}/{} failures", round_trip_failures, samples),
    });

    let mut constraint_failures = 0;
    for _ in 0..samples {
        let h = hex::cube_round(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        if h.q + h.r + h.s() != 0 {
            constraint_failures += 1;
        }
    }
    results.push(TestResult {
        name: "hex_cube_constraint".into(),
        passed: constraint_failures == 0,
        detail: format!("{} samples, {} violations", samples, constraint_failures),
    });

    let mut symmetry_failures = 0;
    for _ in 0..1000 {
        let h = AxialCoord::new(rng.gen_range(-500..=500), rng.gen_range(-500..=500));
        for (i, n) in hex::neighbors(h).iter().enumerate() {
            if hex::neighbors(*n)[(i + 3) % 6] != h || hex::distance(h, *n) != 1 {
                symmetry_failures += 1;
            }
        }
    }
    results.push(TestResult {
        name: "hex_neighbor_symmetry".into(),
        passed: symmetry_failures == 0,
        detail: format!("{} asymmetric neighbor pairs", symmetry_failures),
    });

    let mut jitter_failures = 0;
    for _ in 0..samples {
        let layout = HexLayout::new(48.0);
        let h = AxialCoord::new(rng.gen_range(-30..=30), rng.gen_range(-30..=30));
        let (cx, cy) = layout.to_plane(h);
        let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        let dist = rng.gen_range(0.0..layout.inner_radius() * 0.95);
        if layout.to_hex(cx + dist * angle.cos(), cy + dist * angle.sin()) != h {
            jitter_failures += 1;
        }
    }
    results.push(TestResult {
        name: "hex_inner_circle_sweep".into(),
        passed: jitter_failures == 0,
        detail: format!("{} points left their cell", jitter_failures),
    });

    results
}

// ── 3. Status Engine ────────────────────────────────────────────────────

fn chain_engine() -> Result<SkillGraphEngine, GraphError> {
    SkillGraphEngine::new(
        vec![
            SkillDefinition::new("a", AxialCoord::new(0, 0), &[])
                .with_status(SkillStatus::Available),
            SkillDefinition::new("b", AxialCoord::new(1, 0), &["a"]),
            SkillDefinition::new("c", AxialCoord::new(2, 0), &["b"]),
        ],
        EngineConfig::default(),
        Box::new(MemoryStore::new()),
    )
}

fn validate_status_engine(verbose: bool) -> Vec<TestResult> {
    println!("--- Status Engine ---");
    let mut results = Vec::new();

    match chain_engine() {
        Ok(mut engine) => {
            engine.compute_all();
            let mut ok = true;
            for id in ["a", "b"] {
                ok &= engine.request_transition(id, SkillStatus::Learning).is_ok();
                ok &= engine.request_transition(id, SkillStatus::Mastered).is_ok();
                engine.compute_all();
            }
            let c = engine.status("c");
            results.push(TestResult {
                name: "engine_chain_unlock".into(),
                passed: ok && c == Some(SkillStatus::Available),
                detail: format!("c = {:?}", c),
            });

            let before = engine.statuses();
            let report = engine.compute_all();
            results.push(TestResult {
                name: "engine_idempotent".into(),
                passed: report.changes.is_empty() && engine.statuses() == before,
                detail: format!("{} round(s), {} changes", report.rounds, report.changes.len()),
            });
        }
        Err(e) => results.push(TestResult {
            name: "engine_chain_unlock".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    if let Ok(mut view) = view_from_bundle() {
        let locked: Vec<String> = view
            .engine()
            .nodes()
            .iter()
            .filter(|n| n.status == SkillStatus::Locked)
            .map(|n| n.id.clone())
            .collect();
        let accepted = locked
            .iter()
            .filter(|id| view.request_transition(id, SkillStatus::Mastered).is_ok())
            .count();
        results.push(TestResult {
            name: "engine_no_stage_skipping".into(),
            passed: accepted == 0,
            detail: format!("{} locked skills, {} skipped to mastered", locked.len(), accepted),
        });
    }

    let cyclic = SkillGraphEngine::new(
        vec![
            SkillDefinition::new("x", AxialCoord::new(0, 0), &["z"]),
            SkillDefinition::new("y", AxialCoord::new(1, 0), &["x"]),
            SkillDefinition::new("z", AxialCoord::new(2, 0), &["y"]),
        ],
        EngineConfig::default(),
        Box::new(MemoryStore::new()),
    );
    let cycle_detail = match &cyclic {
        Err(e) => e.to_string(),
        Ok(_) => "accepted".into(),
    };
    results.push(TestResult {
        name: "engine_rejects_cycle".into(),
        passed: matches!(cyclic, Err(GraphError::Cycle(_))),
        detail: cycle_detail,
    });

    // A long chain under a tiny cap stays best-effort and reports it.
    let mut defs = Vec::new();
    for i in 0..30 {
        let prereqs: Vec<String> = if i == 0 {
            Vec::new()
        } else {
            vec![format!("n{}", i - 1)]
        };
        let refs: Vec<&str> = prereqs.iter().map(String::as_str).collect();
        defs.push(SkillDefinition::new(
            &format!("n{}", i),
            AxialCoord::new(i, 0),
            &refs,
        ));
    }
    defs.reverse();
    let capped = SkillGraphEngine::new(
        defs,
        EngineConfig {
            max_rounds: 1,
            autosave: false,
        },
        Box::new(MemoryStore::new()),
    );
    match capped {
        Ok(mut engine) => {
            let report = engine.compute_all();
            if verbose {
                println!(
                    "  capped run: depth {}, {} rounds, converged {}",
                    engine.depth(),
                    report.rounds,
                    report.converged
                );
            }
            results.push(TestResult {
                name: "engine_round_cap_reported".into(),
                passed: report.rounds == 1
                    && !report.converged
                    && engine.status("n0") == Some(SkillStatus::Available),
                detail: format!("{} rounds, converged {}", report.rounds, report.converged),
            });
        }
        Err(e) => results.push(TestResult {
            name: "engine_round_cap_reported".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    results
}

// ── 4. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut view = match view_from_bundle() {
        Ok(v) => v,
        Err(e) => {
            results.push(TestResult {
                name: "persist_setup".into(),
                passed: false,
                detail: e,
            });
            return results;
        }
    };
    let advanced = ["basics", "basics", "structs"]
        .iter()
        .map(|id| view.advance_node(id))
        .collect::<Result<Vec<_>, _>>();
    if let Err(e) = advanced {
        results.push(TestResult {
            name: "persist_setup".into(),
            passed: false,
            detail: format!("could not advance: {}", e),
        });
        return results;
    }
    let expected = view.engine().statuses();

    let bytes = match ProgressSnapshot::new(expected.clone()).encode() {
        Ok(b) => b,
        Err(e) => {
            results.push(TestResult {
                name: "persist_encode".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    let mut store = MemoryStore::new();
    let stored = store.set(constants::progress::STORAGE_KEY, &bytes).is_ok();

    let restored = SkillTreeView::from_json(TREE_JSON, TreeViewConfig::default(), Box::new(store))
        .map(|v| v.engine().statuses());
    results.push(TestResult {
        name: "persist_round_trip".into(),
        passed: stored && restored.as_ref().ok() == Some(&expected),
        detail: format!("{} bytes for {} skills", bytes.len(), expected.len()),
    });

    // Tampered save: a skill mastered ahead of its prerequisites.
    let mut tampered = expected.clone();
    tampered.insert("async".into(), SkillStatus::Mastered);
    let mut store = MemoryStore::new();
    let ok = ProgressSnapshot::new(tampered)
        .encode()
        .map(|b| store.set(constants::progress::STORAGE_KEY, &b).is_ok())
        .unwrap_or(false);
    let status = SkillTreeView::from_json(TREE_JSON, TreeViewConfig::default(), Box::new(store))
        .ok()
        .and_then(|v| v.engine().status("async"));
    results.push(TestResult {
        name: "persist_rejects_inconsistent".into(),
        passed: ok && status == Some(SkillStatus::Locked),
        detail: format!("tampered 'async' restored as {:?}", status),
    });

    results
}

// ── 5. Viewport ─────────────────────────────────────────────────────────

fn validate_viewport(verbose: bool) -> Vec<TestResult> {
    println!("--- Viewport ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(SEED);

    let large = || {
        ViewportController::new(
            ViewportConfig {
                margin: 0.0,
                ..Default::default()
            },
            800.0,
            600.0,
            ContentExtent::new(-1400.0, -1300.0, 1400.0, 1300.0),
        )
    };

    let mut vp = large();
    vp.begin_drag(0.0, 0.0, 0.0);
    vp.drag_to(5000.0, 5000.0, 16.0);
    let tx = vp.state().translate_x;
    results.push(TestResult {
        name: "viewport_drag_clamp".into(),
        passed: (vp.bounds().max_x - 1000.0).abs() < 1e-3 && (tx - 1000.0).abs() < 1e-3,
        detail: format!("maxX {:.1}, translateX {:.1}", vp.bounds().max_x, tx),
    });

    let mut vp = large();
    vp.begin_pinch((350.0, 300.0), (450.0, 300.0));
    vp.pinch_to((300.0, 300.0), (500.0, 300.0));
    results.push(TestResult {
        name: "viewport_pinch_max_scale".into(),
        passed: (vp.state().scale - 2.0).abs() < 1e-4,
        detail: format!("scale {:.3}", vp.state().scale),
    });

    let mut anchor_drift = 0.0f32;
    let mut vp = large();
    for _ in 0..500 {
        let (ax, ay) = (rng.gen_range(200.0..600.0), rng.gen_range(150.0..450.0));
        let before = vp.screen_to_content(ax, ay);
        let old_scale = vp.state().scale;
        vp.zoom_at_point(ax, ay, rng.gen_range(-0.3..0.3));
        let b = vp.bounds();
        let s = vp.state();
        // Bounds can legitimately move the anchor; only measure free zooms.
        let pinned = (s.translate_x - b.min_x).abs() < 1e-3
            || (s.translate_x - b.max_x).abs() < 1e-3
            || (s.translate_y - b.min_y).abs() < 1e-3
            || (s.translate_y - b.max_y).abs() < 1e-3;
        if !pinned && s.scale != old_scale {
            let after = vp.screen_to_content(ax, ay);
            anchor_drift = anchor_drift
                .max((before.0 - after.0).abs())
                .max((before.1 - after.1).abs());
        }
    }
    results.push(TestResult {
        name: "viewport_zoom_anchor".into(),
        passed: anchor_drift < 0.05,
        detail: format!("max anchor drift {:.5} content units", anchor_drift),
    });

    // Random gesture streams through the full view must never leave bounds.
    let mut violations = 0;
    let streams = 200;
    if let Ok(mut view) = view_from_bundle() {
        view.resize(400.0, 300.0);
        let mut t = 0.0f64;
        for stream in 0..streams {
            match rng.gen_range(0..4) {
                0 => {
                    let (mut x, mut y) = (rng.gen_range(0.0..400.0), rng.gen_range(0.0..300.0));
                    view.handle_pointer(&PointerEvent::new(1, x, y, PointerPhase::Start, t));
                    for _ in 0..rng.gen_range(1..10) {
                        t += rng.gen_range(0.0..30.0);
                        x += rng.gen_range(-200.0..200.0);
                        y += rng.gen_range(-200.0..200.0);
                        view.handle_pointer(&PointerEvent::new(1, x, y, PointerPhase::Move, t));
                    }
                    let phase = if rng.gen_bool(0.9) {
                        PointerPhase::End
                    } else {
                        PointerPhase::Cancel
                    };
                    view.handle_pointer(&PointerEvent::new(1, x, y, phase, t + 5.0));
                }
                1 => {
                    let c = (rng.gen_range(50.0..350.0), rng.gen_range(50.0..250.0));
                    let mut d = rng.gen_range(10.0..100.0);
                    let left = c.0 - d;
                    view.handle_pointer(&PointerEvent::new(1, left, c.1, PointerPhase::Start, t));
                    view.handle_pointer(&PointerEvent::new(2, c.0 + d, c.1, PointerPhase::Start, t));
                    for _ in 0..rng.gen_range(1..8) {
                        d *= rng.gen_range(0.5..1.8);
                        t += 16.0;
                        let right = c.0 + d;
                        view.handle_pointer(&PointerEvent::new(2, right, c.1, PointerPhase::Move, t));
                    }
                    let right = c.0 + d;
                    view.handle_pointer(&PointerEvent::new(2, right, c.1, PointerPhase::End, t));
                    view.handle_pointer(&PointerEvent::new(1, left, c.1, PointerPhase::End, t));
                }
                2 => view.handle_wheel(&WheelEvent {
                    x: rng.gen_range(0.0..400.0),
                    y: rng.gen_range(0.0..300.0),
                    delta_y: rng.gen_range(-600.0..600.0),
                }),
                _ => {
                    let keys = [
                        KeyCommand::PanLeft,
                        KeyCommand::PanRight,
                        KeyCommand::PanUp,
                        KeyCommand::PanDown,
                        KeyCommand::ZoomIn,
                        KeyCommand::ZoomOut,
                        KeyCommand::ResetView,
                    ];
                    view.handle_key(keys[rng.gen_range(0..keys.len())]);
                }
            }
            for _ in 0..rng.gen_range(0..30) {
                view.tick(16.0);
            }
            t += 100.0;

            let vp = view.viewport();
            let s = vp.state();
            let scale_ok = s.scale >= vp.config().min_scale && s.scale <= vp.config().max_scale;
            if !scale_ok || !vp.bounds().contains(s.translate_x, s.translate_y) {
                violations += 1;
                if verbose {
                    println!("  stream {} left bounds: {:?}", stream, s);
                }
            }
        }
    }
    results.push(TestResult {
        name: "viewport_bounds_sweep".into(),
        passed: violations == 0,
        detail: format!("{} random gesture streams, {} violations", streams, violations),
    });

    results
}

// ── 6. Gestures ─────────────────────────────────────────────────────────

fn validate_gestures(_verbose: bool) -> Vec<TestResult> {
    println!("--- Gestures ---");
    let mut results = Vec::new();

    let mut g = GestureNormalizer::default();
    g.handle_pointer(&PointerEvent::new(1, 10.0, 10.0, PointerPhase::Start, 0.0));
    g.handle_pointer(&PointerEvent::new(2, 90.0, 10.0, PointerPhase::Start, 5.0));
    let handover = g.handle_pointer(&PointerEvent::new(1, 10.0, 10.0, PointerPhase::End, 30.0));
    results.push(TestResult {
        name: "gesture_pinch_handover".into(),
        passed: matches!(
            handover.as_slice(),
            [GestureAction::PinchEnd, GestureAction::DragStart { .. }]
        ),
        detail: format!("{:?}", handover),
    });

    match view_from_bundle() {
        Ok(mut view) => {
            let target = view
                .render_frame()
                .nodes
                .into_iter()
                .find(|n| n.id == "traits");
            let event = target.and_then(|n| {
                view.handle_pointer(&PointerEvent::new(
                    7,
                    n.screen_x,
                    n.screen_y,
                    PointerPhase::Start,
                    0.0,
                ));
                view.handle_pointer(&PointerEvent::new(
                    7,
                    n.screen_x + 1.0,
                    n.screen_y - 1.0,
                    PointerPhase::End,
                    90.0,
                ))
            });
            let drifting = view.tick(16.0);
            results.push(TestResult {
                name: "gesture_tap_hits_node".into(),
                passed: event == Some(ViewEvent::NodeTapped("traits".into())) && !drifting,
                detail: format!("{:?}, view still moving: {}", event, drifting),
            });
        }
        Err(e) => results.push(TestResult {
            name: "gesture_tap_hits_node".into(),
            passed: false,
            detail: e,
        }),
    }

    results
}
