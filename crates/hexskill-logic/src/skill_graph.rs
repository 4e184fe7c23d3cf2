//! Skill prerequisite graph and the status resolution engine.
//!
//! The graph is built once from a static list of [`SkillDefinition`]s and
//! validated up front: ids must be unique, prerequisites must resolve, and
//! the prerequisite relation must be acyclic. After that only node status
//! changes, and only through the engine.
//!
//! # Status resolution
//!
//! [`SkillGraphEngine::compute_all`] relaxes every node toward the status
//! the prerequisite rule gives it (see [`SkillStatus::derive`]) in full
//! passes until a pass changes nothing or `max_rounds` is hit.
//! [`SkillGraphEngine::request_transition`] applies one user-requested step
//! and then walks the dependents breadth-first, re-deriving each one.
//!
//! Observers are told about every change once the whole recompute has
//! finished, never halfway through a cascade.
//!
//! ```
//! use hexskill_logic::hex::AxialCoord;
//! use hexskill_logic::progress::MemoryStore;
//! use hexskill_logic::skill_graph::{EngineConfig, SkillDefinition, SkillGraphEngine};
//! use hexskill_logic::status::SkillStatus;
//!
//! let defs = vec![
//!     SkillDefinition::new("a", AxialCoord::new(0, 0), &[]),
//!     SkillDefinition::new("b", AxialCoord::new(1, 0), &["a"]),
//! ];
//! let mut engine =
//!     SkillGraphEngine::new(defs, EngineConfig::default(), Box::new(MemoryStore::new())).unwrap();
//! engine.compute_all();
//! assert_eq!(engine.status("a"), Some(SkillStatus::Available));
//! assert_eq!(engine.status("b"), Some(SkillStatus::Locked));
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::constants;
use crate::hex::AxialCoord;
use crate::progress::{ProgressError, ProgressSnapshot, ProgressStore};
use crate::status::SkillStatus;

/// Static description of one skill, as loaded from a tree document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDefinition {
    pub id: String,
    /// Display name. Defaults to the id.
    #[serde(default)]
    pub name: String,
    pub coordinate: AxialCoord,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub initial_status: SkillStatus,
}

impl SkillDefinition {
    /// Locked skill with the given prerequisites.
    pub fn new(id: &str, coordinate: AxialCoord, prerequisites: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            coordinate,
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            initial_status: SkillStatus::Locked,
        }
    }

    pub fn with_status(mut self, status: SkillStatus) -> Self {
        self.initial_status = status;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

/// A skill node with its current status.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillNode {
    pub id: String,
    pub name: String,
    pub coordinate: AxialCoord,
    /// Prerequisite ids, deduplicated, in definition order.
    pub prerequisites: Vec<String>,
    pub status: SkillStatus,
}

/// Engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Round cap for `compute_all` passes and cascade depth.
    pub max_rounds: u32,
    /// Save progress after every accepted transition.
    pub autosave: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: constants::engine::MAX_ROUNDS,
            autosave: true,
        }
    }
}

/// One observed status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: String,
    pub old: SkillStatus,
    pub new: SkillStatus,
}

/// Receives status changes after each completed recompute.
pub trait StatusObserver {
    fn on_status_changed(&mut self, change: &StatusChange);
}

impl<F: FnMut(&StatusChange)> StatusObserver for F {
    fn on_status_changed(&mut self, change: &StatusChange) {
        self(change)
    }
}

/// Handle returned by [`SkillGraphEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Result of a `compute_all` run.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeReport {
    /// Passes executed, including the final pass that changed nothing.
    pub rounds: u32,
    /// False if the round cap was hit while nodes were still changing.
    pub converged: bool,
    pub changes: Vec<StatusChange>,
}

/// Result of an accepted transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// The requested change itself.
    pub change: StatusChange,
    /// Changes propagated to dependents, in BFS order.
    pub cascade: Vec<StatusChange>,
    /// False if the cascade stopped at the round cap with work left.
    pub cascade_complete: bool,
}

/// Result of restoring saved progress.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Saved entries applied to the graph.
    pub restored: usize,
    /// Saved entries rejected because their prerequisites were not mastered.
    pub discarded: usize,
    /// Saved ids not present in the graph.
    pub unknown: usize,
    /// The `compute_all` run that followed.
    pub compute: ComputeReport,
}

/// Reasons a graph definition is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// No skills defined.
    Empty,
    DuplicateId(String),
    UnknownPrerequisite { id: String, prerequisite: String },
    SelfLoop(String),
    /// Prerequisite cycle, listed in dependency order.
    Cycle(Vec<String>),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::Empty => write!(f, "Skill graph has no nodes"),
            GraphError::DuplicateId(id) => write!(f, "Duplicate skill id '{}'", id),
            GraphError::UnknownPrerequisite { id, prerequisite } => write!(
                f,
                "Skill '{}' lists unknown prerequisite '{}'",
                id, prerequisite
            ),
            GraphError::SelfLoop(id) => write!(f, "Skill '{}' lists itself as a prerequisite", id),
            GraphError::Cycle(path) => write!(f, "Prerequisite cycle: {}", path.join(" -> ")),
        }
    }
}

impl std::error::Error for GraphError {}

/// Reasons a transition request is refused. State is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    UnknownSkill(String),
    InvalidTransition {
        id: String,
        from: SkillStatus,
        to: SkillStatus,
    },
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::UnknownSkill(id) => write!(f, "Unknown skill '{}'", id),
            TransitionError::InvalidTransition { id, from, to } => {
                write!(f, "Skill '{}' cannot go from {} to {}", id, from, to)
            }
        }
    }
}

impl std::error::Error for TransitionError {}

/// Owns the skill graph and derives node status from prerequisites.
pub struct SkillGraphEngine {
    nodes: Vec<SkillNode>,
    index: HashMap<String, usize>,
    /// node → prerequisite nodes
    prereqs: Vec<Vec<usize>>,
    /// node → nodes listing it as a prerequisite
    dependents: Vec<Vec<usize>>,
    /// Prerequisites before dependents.
    topo_order: Vec<usize>,
    initial: Vec<SkillStatus>,
    depth: u32,
    config: EngineConfig,
    store: Box<dyn ProgressStore>,
    observers: Vec<(ObserverId, Box<dyn StatusObserver>)>,
    next_observer: u64,
}

impl SkillGraphEngine {
    /// Validate `definitions` and build the engine.
    ///
    /// Initial statuses that break the prerequisite invariant fall back to
    /// `Locked`. Statuses are not derived yet; call [`Self::compute_all`] or
    /// [`Self::load_progress`] before reading them.
    pub fn new(
        definitions: Vec<SkillDefinition>,
        config: EngineConfig,
        store: Box<dyn ProgressStore>,
    ) -> Result<Self, GraphError> {
        if definitions.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateId(def.id.clone()));
            }
        }

        let mut prereqs = vec![Vec::new(); definitions.len()];
        let mut dependents = vec![Vec::new(); definitions.len()];
        let mut nodes = Vec::with_capacity(definitions.len());
        for (i, def) in definitions.into_iter().enumerate() {
            let mut seen = HashSet::new();
            let mut ids = Vec::new();
            for p in &def.prerequisites {
                if *p == def.id {
                    return Err(GraphError::SelfLoop(def.id.clone()));
                }
                let Some(&pi) = index.get(p) else {
                    return Err(GraphError::UnknownPrerequisite {
                        id: def.id.clone(),
                        prerequisite: p.clone(),
                    });
                };
                if seen.insert(pi) {
                    prereqs[i].push(pi);
                    dependents[pi].push(i);
                    ids.push(p.clone());
                }
            }
            let name = if def.name.is_empty() {
                def.id.clone()
            } else {
                def.name
            };
            nodes.push(SkillNode {
                id: def.id,
                name,
                coordinate: def.coordinate,
                prerequisites: ids,
                status: def.initial_status,
            });
        }

        let topo_order = topological_order(&nodes, &prereqs)?;
        let depth = longest_chain(&topo_order, &prereqs);

        let mut engine = Self {
            initial: Vec::new(),
            nodes,
            index,
            prereqs,
            dependents,
            topo_order,
            depth,
            config,
            store,
            observers: Vec::new(),
            next_observer: 0,
        };

        let requested: Vec<SkillStatus> = engine.nodes.iter().map(|n| n.status).collect();
        let mut discarded = 0;
        for &i in &engine.topo_order.clone() {
            engine.nodes[i].status = SkillStatus::Locked;
            let wanted = requested[i];
            if wanted.needs_prerequisites() && !engine.prerequisites_mastered(i) {
                discarded += 1;
            } else {
                engine.nodes[i].status = wanted;
            }
        }
        if discarded > 0 {
            warn!(
                "{} initial statuses ignored: prerequisites not mastered",
                discarded
            );
        }
        engine.initial = engine.nodes.iter().map(|n| n.status).collect();

        if engine.depth > engine.config.max_rounds {
            warn!(
                "Prerequisite depth {} exceeds round cap {}",
                engine.depth, engine.config.max_rounds
            );
        }
        info!(
            "Skill graph loaded: {} nodes, depth {}",
            engine.nodes.len(),
            engine.depth
        );
        Ok(engine)
    }

    /// Relax every node to its derived status until stable or the round
    /// cap is hit. Never fails; a capped run is reported as not converged.
    pub fn compute_all(&mut self) -> ComputeReport {
        let report = self.relax();
        self.publish(&report.changes);
        report
    }

    fn relax(&mut self) -> ComputeReport {
        let cap = self.config.max_rounds.max(1);
        let mut changes = Vec::new();
        let mut rounds = 0;
        let mut converged = false;

        while rounds < cap {
            rounds += 1;
            let mut changed = false;
            for i in 0..self.nodes.len() {
                if let Some(change) = self.rederive(i) {
                    changes.push(change);
                    changed = true;
                }
            }
            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                "Status resolution did not converge within {} rounds; graph may be too deep",
                cap
            );
        }

        ComputeReport {
            rounds,
            converged,
            changes,
        }
    }

    /// Apply a user-requested status change and cascade it to dependents.
    pub fn request_transition(
        &mut self,
        id: &str,
        desired: SkillStatus,
    ) -> Result<TransitionOutcome, TransitionError> {
        let Some(&i) = self.index.get(id) else {
            return Err(TransitionError::UnknownSkill(id.to_string()));
        };
        let from = self.nodes[i].status;
        if !from.can_request(desired, self.prerequisites_mastered(i)) {
            debug!("Rejected transition '{}': {} -> {}", id, from, desired);
            return Err(TransitionError::InvalidTransition {
                id: id.to_string(),
                from,
                to: desired,
            });
        }

        self.nodes[i].status = desired;
        let change = StatusChange {
            id: id.to_string(),
            old: from,
            new: desired,
        };
        debug!("Transition '{}': {} -> {}", id, from, desired);

        let (cascade, cascade_complete) = self.cascade(i);

        self.publish(std::slice::from_ref(&change));
        self.publish(&cascade);

        if self.config.autosave {
            if let Err(e) = self.save_progress() {
                warn!("Autosave failed: {}", e);
            }
        }

        Ok(TransitionOutcome {
            change,
            cascade,
            cascade_complete,
        })
    }

    /// Request the next forward status for `id`.
    pub fn advance(&mut self, id: &str) -> Result<TransitionOutcome, TransitionError> {
        let current = self
            .status(id)
            .ok_or_else(|| TransitionError::UnknownSkill(id.to_string()))?;
        match current.next() {
            Some(next) => self.request_transition(id, next),
            None => Err(TransitionError::InvalidTransition {
                id: id.to_string(),
                from: current,
                to: current,
            }),
        }
    }

    /// BFS over dependents of `start`, re-deriving each visited node and
    /// expanding only from nodes that changed.
    fn cascade(&mut self, start: usize) -> (Vec<StatusChange>, bool) {
        let cap = self.config.max_rounds.max(1);
        let mut changes = Vec::new();
        let mut queue: VecDeque<(usize, u32)> =
            self.dependents[start].iter().map(|&d| (d, 1)).collect();

        while let Some((node, level)) = queue.pop_front() {
            if level > cap {
                warn!(
                    "Cascade from '{}' stopped at round cap {}",
                    self.nodes[start].id, cap
                );
                return (changes, false);
            }
            if let Some(change) = self.rederive(node) {
                changes.push(change);
                for &d in &self.dependents[node] {
                    queue.push_back((d, level + 1));
                }
            }
        }
        (changes, true)
    }

    fn rederive(&mut self, i: usize) -> Option<StatusChange> {
        let old = self.nodes[i].status;
        let new = old.derive(self.prerequisites_mastered(i));
        if new == old {
            return None;
        }
        self.nodes[i].status = new;
        Some(StatusChange {
            id: self.nodes[i].id.clone(),
            old,
            new,
        })
    }

    fn prerequisites_mastered(&self, i: usize) -> bool {
        self.prereqs[i]
            .iter()
            .all(|&p| self.nodes[p].status == SkillStatus::Mastered)
    }

    fn publish(&mut self, changes: &[StatusChange]) {
        for change in changes {
            for (_, observer) in self.observers.iter_mut() {
                observer.on_status_changed(change);
            }
        }
    }

    /// Register an observer for status changes.
    pub fn subscribe(&mut self, observer: Box<dyn StatusObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Write current statuses to the store.
    pub fn save_progress(&mut self) -> Result<(), ProgressError> {
        let bytes = ProgressSnapshot::new(self.statuses()).encode()?;
        self.store.set(constants::progress::STORAGE_KEY, &bytes)
    }

    /// Restore statuses from the store, then run `compute_all`.
    ///
    /// Saved entries are applied prerequisites-first and only where they
    /// keep the prerequisite invariant. Missing progress is not an error.
    pub fn load_progress(&mut self) -> Result<LoadReport, ProgressError> {
        let Some(bytes) = self.store.get(constants::progress::STORAGE_KEY)? else {
            let compute = self.compute_all();
            return Ok(LoadReport {
                restored: 0,
                discarded: 0,
                unknown: 0,
                compute,
            });
        };
        let snapshot = ProgressSnapshot::decode(&bytes)?;

        let unknown = snapshot
            .statuses
            .keys()
            .filter(|id| !self.index.contains_key(*id))
            .count();

        let mut changes = Vec::new();
        let mut restored = 0;
        let mut discarded = 0;
        for &i in &self.topo_order.clone() {
            let Some(&saved) = snapshot.statuses.get(&self.nodes[i].id) else {
                continue;
            };
            if saved.needs_prerequisites() && !self.prerequisites_mastered(i) {
                discarded += 1;
                continue;
            }
            restored += 1;
            let old = self.nodes[i].status;
            if old != saved {
                self.nodes[i].status = saved;
                changes.push(StatusChange {
                    id: self.nodes[i].id.clone(),
                    old,
                    new: saved,
                });
            }
        }

        if discarded > 0 || unknown > 0 {
            warn!(
                "Progress restore skipped {} inconsistent and {} unknown entries",
                discarded, unknown
            );
        }

        let mut compute = self.relax();
        changes.append(&mut compute.changes);
        compute.changes = changes;
        self.publish(&compute.changes);

        info!("Restored progress for {} skills", restored);
        Ok(LoadReport {
            restored,
            discarded,
            unknown,
            compute,
        })
    }

    /// Put every node back to its initial status and re-derive.
    pub fn reset_progress(&mut self) -> ComputeReport {
        let mut changes = Vec::new();
        for i in 0..self.nodes.len() {
            let old = self.nodes[i].status;
            let new = self.initial[i];
            if old != new {
                self.nodes[i].status = new;
                changes.push(StatusChange {
                    id: self.nodes[i].id.clone(),
                    old,
                    new,
                });
            }
        }
        let mut report = self.relax();
        changes.append(&mut report.changes);
        report.changes = changes;
        self.publish(&report.changes);

        if self.config.autosave {
            if let Err(e) = self.save_progress() {
                warn!("Autosave failed: {}", e);
            }
        }
        report
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn status(&self, id: &str) -> Option<SkillStatus> {
        self.index.get(id).map(|&i| self.nodes[i].status)
    }

    /// Snapshot of every node's status.
    pub fn statuses(&self) -> BTreeMap<String, SkillStatus> {
        self.nodes
            .iter()
            .map(|n| (n.id.clone(), n.status))
            .collect()
    }

    /// Nodes in definition order.
    pub fn nodes(&self) -> &[SkillNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&SkillNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn prerequisites(&self, id: &str) -> Option<Vec<&str>> {
        self.index.get(id).map(|&i| {
            self.prereqs[i]
                .iter()
                .map(|&p| self.nodes[p].id.as_str())
                .collect()
        })
    }

    pub fn dependents(&self, id: &str) -> Option<Vec<&str>> {
        self.index.get(id).map(|&i| {
            self.dependents[i]
                .iter()
                .map(|&d| self.nodes[d].id.as_str())
                .collect()
        })
    }

    /// The status a user would request next for `id`.
    pub fn next_status(&self, id: &str) -> Option<SkillStatus> {
        self.status(id).and_then(SkillStatus::next)
    }

    /// Number of nodes on the longest prerequisite chain.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Kahn's algorithm over prerequisite edges. On failure, walks the leftover
/// nodes to name one cycle.
fn topological_order(nodes: &[SkillNode], prereqs: &[Vec<usize>]) -> Result<Vec<usize>, GraphError> {
    let n = nodes.len();
    let mut pending: Vec<usize> = prereqs.iter().map(|p| p.len()).collect();
    let mut dependents = vec![Vec::new(); n];
    for (i, ps) in prereqs.iter().enumerate() {
        for &p in ps {
            dependents[p].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &d in &dependents[i] {
            pending[d] -= 1;
            if pending[d] == 0 {
                queue.push_back(d);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    // Every leftover node has a leftover prerequisite, so following them
    // must revisit a node.
    let Some(start) = (0..n).find(|&i| pending[i] > 0) else {
        return Ok(order);
    };
    let mut path = vec![start];
    let mut on_path: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut current = start;
    loop {
        let Some(&next) = prereqs[current].iter().find(|&&p| pending[p] > 0) else {
            break;
        };
        if let Some(&pos) = on_path.get(&next) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .rev()
                .map(|&i| nodes[i].id.clone())
                .collect();
            cycle.push(cycle[0].clone());
            return Err(GraphError::Cycle(cycle));
        }
        on_path.insert(next, path.len());
        path.push(next);
        current = next;
    }
    Err(GraphError::Cycle(path.iter().map(|&i| nodes[i].id.clone()).collect()))
}

/// Longest prerequisite chain, counted in nodes.
fn longest_chain(order: &[usize], prereqs: &[Vec<usize>]) -> u32 {
    let mut depth = vec![0u32; prereqs.len()];
    for &i in order {
        depth[i] = 1 + prereqs[i].iter().map(|&p| depth[p]).max().unwrap_or(0);
    }
    depth.into_iter().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn def(id: &str, q: i32, prereqs: &[&str]) -> SkillDefinition {
        SkillDefinition::new(id, AxialCoord::new(q, 0), prereqs)
    }

    fn engine(defs: Vec<SkillDefinition>) -> SkillGraphEngine {
        SkillGraphEngine::new(defs, EngineConfig::default(), Box::new(MemoryStore::new())).unwrap()
    }

    /// A ← B ← C, A starts available.
    fn chain() -> SkillGraphEngine {
        engine(vec![
            def("a", 0, &[]).with_status(SkillStatus::Available),
            def("b", 1, &["a"]),
            def("c", 2, &["b"]),
        ])
    }

    fn recorder(engine: &mut SkillGraphEngine) -> Rc<RefCell<Vec<StatusChange>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        engine.subscribe(Box::new(move |c: &StatusChange| {
            sink.borrow_mut().push(c.clone())
        }));
        log
    }

    fn master(engine: &mut SkillGraphEngine, id: &str) {
        engine.request_transition(id, SkillStatus::Learning).unwrap();
        engine.request_transition(id, SkillStatus::Mastered).unwrap();
    }

    #[test]
    fn chain_unlocks_step_by_step() {
        let mut e = chain();
        e.compute_all();
        assert_eq!(e.status("a"), Some(SkillStatus::Available));
        assert_eq!(e.status("b"), Some(SkillStatus::Locked));

        master(&mut e, "a");
        e.compute_all();
        assert_eq!(e.status("b"), Some(SkillStatus::Available));
        assert_eq!(e.status("c"), Some(SkillStatus::Locked));

        master(&mut e, "b");
        e.compute_all();
        assert_eq!(e.status("c"), Some(SkillStatus::Available));
    }

    #[test]
    fn roots_become_available() {
        let mut e = engine(vec![def("a", 0, &[]), def("b", 1, &[])]);
        let report = e.compute_all();
        assert!(report.converged);
        assert_eq!(report.changes.len(), 2);
        assert_eq!(e.status("b"), Some(SkillStatus::Available));
    }

    #[test]
    fn compute_all_is_idempotent() {
        let mut e = chain();
        e.compute_all();
        master(&mut e, "a");
        e.compute_all();
        let first = e.statuses();
        let report = e.compute_all();
        assert_eq!(e.statuses(), first);
        assert!(report.changes.is_empty());
        assert_eq!(report.rounds, 1);
    }

    #[test]
    fn locked_to_mastered_always_rejected() {
        let mut e = chain();
        e.compute_all();
        for id in ["a", "b", "c"] {
            let before = e.statuses();
            if e.status(id) == Some(SkillStatus::Locked) {
                let err = e.request_transition(id, SkillStatus::Mastered).unwrap_err();
                assert!(matches!(err, TransitionError::InvalidTransition { .. }));
            }
            assert_eq!(e.statuses(), before);
        }
    }

    #[test]
    fn unlock_requires_prerequisites() {
        let mut e = chain();
        e.compute_all();
        let err = e.request_transition("b", SkillStatus::Available).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                id: "b".into(),
                from: SkillStatus::Locked,
                to: SkillStatus::Available,
            }
        );
    }

    #[test]
    fn unknown_skill_rejected() {
        let mut e = chain();
        assert_eq!(
            e.request_transition("nope", SkillStatus::Learning),
            Err(TransitionError::UnknownSkill("nope".into()))
        );
    }

    #[test]
    fn mastering_cascades_to_dependents() {
        let mut e = chain();
        e.compute_all();
        e.request_transition("a", SkillStatus::Learning).unwrap();
        let outcome = e.request_transition("a", SkillStatus::Mastered).unwrap();
        assert_eq!(outcome.change.new, SkillStatus::Mastered);
        assert!(outcome.cascade_complete);
        assert_eq!(
            outcome.cascade,
            vec![StatusChange {
                id: "b".into(),
                old: SkillStatus::Locked,
                new: SkillStatus::Available,
            }]
        );
        assert_eq!(e.status("c"), Some(SkillStatus::Locked));
    }

    #[test]
    fn diamond_needs_all_prerequisites() {
        //   a   b
        //    \ /
        //     c
        let mut e = engine(vec![def("a", 0, &[]), def("b", 1, &[]), def("c", 2, &["a", "b"])]);
        e.compute_all();
        master(&mut e, "a");
        assert_eq!(e.status("c"), Some(SkillStatus::Locked));
        master(&mut e, "b");
        assert_eq!(e.status("c"), Some(SkillStatus::Available));
    }

    #[test]
    fn observers_see_changes_after_recompute() {
        let mut e = chain();
        let log = recorder(&mut e);
        e.compute_all();
        assert!(log.borrow().is_empty(), "a already available, nothing changes");

        master(&mut e, "a");
        let seen = log.borrow().clone();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].new, SkillStatus::Learning);
        assert_eq!(seen[1].new, SkillStatus::Mastered);
        assert_eq!(seen[2].id, "b");
        assert_eq!(seen[2].new, SkillStatus::Available);
    }

    #[test]
    fn rejected_transition_notifies_nobody() {
        let mut e = chain();
        e.compute_all();
        let log = recorder(&mut e);
        let _ = e.request_transition("c", SkillStatus::Learning);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut e = engine(vec![def("a", 0, &[])]);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = e.subscribe(Box::new(move |_: &StatusChange| *c.borrow_mut() += 1));
        assert!(e.unsubscribe(id));
        assert!(!e.unsubscribe(id));
        e.compute_all();
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn malformed_graphs_refused() {
        let store = || Box::new(MemoryStore::new());
        let cfg = EngineConfig::default;

        assert_eq!(
            SkillGraphEngine::new(vec![], cfg(), store()).err(),
            Some(GraphError::Empty)
        );
        assert_eq!(
            SkillGraphEngine::new(vec![def("a", 0, &[]), def("a", 1, &[])], cfg(), store()).err(),
            Some(GraphError::DuplicateId("a".into()))
        );
        assert_eq!(
            SkillGraphEngine::new(vec![def("a", 0, &["ghost"])], cfg(), store()).err(),
            Some(GraphError::UnknownPrerequisite {
                id: "a".into(),
                prerequisite: "ghost".into(),
            })
        );
        assert_eq!(
            SkillGraphEngine::new(vec![def("a", 0, &["a"])], cfg(), store()).err(),
            Some(GraphError::SelfLoop("a".into()))
        );
    }

    #[test]
    fn cycles_refused_with_path() {
        let defs = vec![
            def("root", 0, &[]),
            def("x", 1, &["root", "z"]),
            def("y", 2, &["x"]),
            def("z", 3, &["y"]),
        ];
        let err = SkillGraphEngine::new(defs, EngineConfig::default(), Box::new(MemoryStore::new()))
            .err()
            .unwrap();
        let GraphError::Cycle(path) = err else {
            panic!("expected cycle, got {:?}", err);
        };
        assert_eq!(path.first(), path.last());
        assert_eq!(path.len(), 4);
        for id in ["x", "y", "z"] {
            assert!(path.iter().any(|p| p == id));
        }
    }

    #[test]
    fn duplicate_prerequisites_collapse() {
        let e = engine(vec![def("a", 0, &[]), def("b", 1, &["a", "a"])]);
        assert_eq!(e.prerequisites("b"), Some(vec!["a"]));
        assert_eq!(e.dependents("a"), Some(vec!["b"]));
    }

    #[test]
    fn reverse_listed_chain_settles_within_depth() {
        // Dependents listed before their prerequisites; the first four
        // links start mastered, the fifth must unlock.
        let mut defs: Vec<SkillDefinition> = (0..8)
            .map(|i| {
                let id = format!("s{}", i);
                let prev = format!("s{}", i.max(1) - 1);
                let prereqs: Vec<&str> = if i == 0 { vec![] } else { vec![prev.as_str()] };
                let d = def(&id, i, &prereqs);
                if i < 4 {
                    d.with_status(SkillStatus::Mastered)
                } else {
                    d
                }
            })
            .collect();
        defs.reverse();
        let mut e = engine(defs);

        let report = e.compute_all();
        assert!(report.converged);
        assert!(report.rounds <= e.depth() + 1);
        assert_eq!(e.status("s3"), Some(SkillStatus::Mastered));
        assert_eq!(e.status("s4"), Some(SkillStatus::Available));
        assert_eq!(e.status("s5"), Some(SkillStatus::Locked));
    }

    #[test]
    fn depth_counts_longest_chain() {
        let e = engine(vec![
            def("a", 0, &[]),
            def("b", 1, &["a"]),
            def("c", 2, &["b"]),
            def("d", 3, &["a"]),
        ]);
        assert_eq!(e.depth(), 3);
    }

    #[test]
    fn inconsistent_initial_status_falls_back() {
        let mut e = engine(vec![
            def("a", 0, &[]),
            def("b", 1, &["a"]).with_status(SkillStatus::Mastered),
        ]);
        e.compute_all();
        assert_eq!(e.status("b"), Some(SkillStatus::Locked));
    }

    #[test]
    fn round_cap_reports_non_convergence() {
        let cfg = EngineConfig {
            max_rounds: 1,
            autosave: false,
        };
        let mut e = SkillGraphEngine::new(
            vec![def("a", 0, &[]), def("b", 1, &["a"])],
            cfg,
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        // One pass changes "a" and cannot confirm stability.
        let report = e.compute_all();
        assert_eq!(report.rounds, 1);
        assert!(!report.converged);
        // Best-effort snapshot is still usable.
        assert_eq!(e.status("a"), Some(SkillStatus::Available));
    }

    #[test]
    fn progress_survives_reload() {
        let mut e = chain();
        e.compute_all();
        master(&mut e, "a");
        e.request_transition("b", SkillStatus::Learning).unwrap();
        e.save_progress().unwrap();
        let bytes = e
            .store
            .get(constants::progress::STORAGE_KEY)
            .unwrap()
            .unwrap();

        let mut store = MemoryStore::new();
        store.set(constants::progress::STORAGE_KEY, &bytes).unwrap();
        let mut fresh = SkillGraphEngine::new(
            vec![
                def("a", 0, &[]).with_status(SkillStatus::Available),
                def("b", 1, &["a"]),
                def("c", 2, &["b"]),
            ],
            EngineConfig::default(),
            Box::new(store),
        )
        .unwrap();
        let report = fresh.load_progress().unwrap();
        assert_eq!(report.restored, 3);
        assert_eq!(report.discarded, 0);
        assert_eq!(fresh.status("a"), Some(SkillStatus::Mastered));
        assert_eq!(fresh.status("b"), Some(SkillStatus::Learning));
        assert_eq!(fresh.status("c"), Some(SkillStatus::Locked));
    }

    #[test]
    fn load_rejects_inconsistent_entries() {
        let mut saved = BTreeMap::new();
        saved.insert("a".to_string(), SkillStatus::Available);
        saved.insert("b".to_string(), SkillStatus::Mastered);
        saved.insert("gone".to_string(), SkillStatus::Mastered);
        let mut store = MemoryStore::new();
        store
            .set(
                constants::progress::STORAGE_KEY,
                &ProgressSnapshot::new(saved).encode().unwrap(),
            )
            .unwrap();

        let mut e = SkillGraphEngine::new(
            vec![def("a", 0, &[]), def("b", 1, &["a"])],
            EngineConfig::default(),
            Box::new(store),
        )
        .unwrap();
        let report = e.load_progress().unwrap();
        assert_eq!(report.restored, 1);
        assert_eq!(report.discarded, 1);
        assert_eq!(report.unknown, 1);
        assert_eq!(e.status("b"), Some(SkillStatus::Locked));
    }

    #[test]
    fn load_without_saved_progress_just_computes() {
        let mut e = chain();
        let report = e.load_progress().unwrap();
        assert_eq!(report.restored, 0);
        assert!(report.compute.converged);
        assert_eq!(e.status("a"), Some(SkillStatus::Available));
    }

    #[test]
    fn autosave_writes_after_transition() {
        let mut e = chain();
        e.compute_all();
        e.request_transition("a", SkillStatus::Learning).unwrap();
        let bytes = e
            .store
            .get(constants::progress::STORAGE_KEY)
            .unwrap()
            .unwrap();
        let snap = ProgressSnapshot::decode(&bytes).unwrap();
        assert_eq!(snap.statuses.get("a"), Some(&SkillStatus::Learning));
    }

    #[test]
    fn reset_restores_initial_statuses() {
        let mut e = chain();
        e.compute_all();
        master(&mut e, "a");
        let log = recorder(&mut e);
        let report = e.reset_progress();
        assert!(report.converged);
        assert_eq!(e.status("a"), Some(SkillStatus::Available));
        assert_eq!(e.status("b"), Some(SkillStatus::Locked));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn advance_steps_forward() {
        let mut e = chain();
        e.compute_all();
        e.advance("a").unwrap();
        assert_eq!(e.status("a"), Some(SkillStatus::Learning));
        e.advance("a").unwrap();
        assert_eq!(e.status("a"), Some(SkillStatus::Mastered));
        assert!(e.advance("a").is_err());
        assert_eq!(e.next_status("a"), None);
        assert_eq!(e.next_status("b"), Some(SkillStatus::Learning));
    }

    #[test]
    fn definitions_parse_from_json() {
        let json = r#"[
            {"id": "a", "coordinate": {"q": 0, "r": 0}, "initialStatus": "available"},
            {"id": "b", "name": "Bee", "coordinate": {"q": 1, "r": -1}, "prerequisites": ["a"]}
        ]"#;
        let defs: Vec<SkillDefinition> = serde_json::from_str(json).unwrap();
        assert_eq!(defs[0].initial_status, SkillStatus::Available);
        assert_eq!(defs[1].prerequisites, vec!["a".to_string()]);
        let e = engine(defs);
        assert_eq!(e.node("a").map(|n| n.name.as_str()), Some("a"));
        assert_eq!(e.node("b").map(|n| n.name.as_str()), Some("Bee"));
    }
}
