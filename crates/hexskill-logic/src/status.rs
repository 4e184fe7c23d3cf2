//! Skill status lifecycle and its transition table.
//!
//! ```text
//! Locked ──▶ Available ──▶ Learning ──▶ Mastered
//!    ▲           │             │
//!    └───────────┴─────────────┘   (demotion, engine only)
//! ```
//!
//! `Mastered` is terminal. There is no way to skip a stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unlock state of a single skill node.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SkillStatus {
    /// Some prerequisite is not mastered yet.
    #[default]
    Locked,
    /// All prerequisites mastered; can be started.
    Available,
    /// Started but not finished.
    Learning,
    /// Finished. Terminal.
    Mastered,
}

/// How a transition may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Forward step a user may request.
    Forward,
    /// Forward step that additionally needs every prerequisite mastered.
    Guarded,
    /// Fall back to `Locked` after a prerequisite regressed. Engine only.
    Demotion,
}

impl SkillStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [SkillStatus; 4] = [
        SkillStatus::Locked,
        SkillStatus::Available,
        SkillStatus::Learning,
        SkillStatus::Mastered,
    ];

    /// Look up `self → to` in the transition table.
    ///
    /// Returns `None` for transitions that are never allowed, including
    /// self-transitions.
    pub fn transition_kind(self, to: SkillStatus) -> Option<TransitionKind> {
        use SkillStatus::*;
        match (self, to) {
            (Locked, Available) => Some(TransitionKind::Guarded),
            (Available, Learning) => Some(TransitionKind::Forward),
            (Learning, Mastered) => Some(TransitionKind::Forward),
            (Available, Locked) | (Learning, Locked) => Some(TransitionKind::Demotion),
            _ => None,
        }
    }

    /// Whether a user may request `self → to`, given whether all
    /// prerequisites are mastered.
    pub fn can_request(self, to: SkillStatus, prerequisites_mastered: bool) -> bool {
        match self.transition_kind(to) {
            Some(TransitionKind::Forward) => true,
            Some(TransitionKind::Guarded) => prerequisites_mastered,
            Some(TransitionKind::Demotion) | None => false,
        }
    }

    /// The next forward status, if any.
    pub fn next(self) -> Option<SkillStatus> {
        match self {
            SkillStatus::Locked => Some(SkillStatus::Available),
            SkillStatus::Available => Some(SkillStatus::Learning),
            SkillStatus::Learning => Some(SkillStatus::Mastered),
            SkillStatus::Mastered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SkillStatus::Mastered
    }

    /// Whether holding this status requires every prerequisite mastered.
    pub fn needs_prerequisites(self) -> bool {
        self != SkillStatus::Locked
    }

    /// Status a node settles to under the prerequisite rule.
    ///
    /// Mastered stays mastered. Otherwise a node with every prerequisite
    /// mastered is at least `Available` (an in-progress node keeps its
    /// progress) and a node missing one is `Locked`.
    pub fn derive(self, prerequisites_mastered: bool) -> SkillStatus {
        match (self, prerequisites_mastered) {
            (SkillStatus::Mastered, _) => SkillStatus::Mastered,
            (SkillStatus::Locked, true) => SkillStatus::Available,
            (current, true) => current,
            (_, false) => SkillStatus::Locked,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SkillStatus::Locked => "locked",
            SkillStatus::Available => "available",
            SkillStatus::Learning => "learning",
            SkillStatus::Mastered => "mastered",
        }
    }
}

impl fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
