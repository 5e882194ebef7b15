//! Quest System Module
//!
//! Quest definitions are loaded from TOML per course; the engine tracks
//! per-course progression through accept, start, objective progress and
//! turn-in.

pub mod availability;
pub mod definition;
pub mod engine;
pub mod events;
pub mod interaction;
pub mod lifecycle;
pub mod registry;
pub mod rewards;
pub mod state;

pub use availability::check_availability;
pub use definition::{
    BonusCondition, BonusRewards, ObjectiveSpec, ObjectiveTarget, ObjectiveType, QuestDefinition,
    Rewards, Unlocks,
};
pub use engine::QuestEngine;
pub use events::{GameplayEvent, ObjectiveUpdate};
pub use interaction::UnlockKind;
pub use registry::{QuestCatalog, QuestRegistry};
pub use rewards::{GrantedRewards, Performance, TurnInReport};
pub use state::{
    AbandonedQuestRecord, ActiveQuestRecord, CompletedQuestRecord, CourseProgress,
    ObjectiveProgress, ObjectiveTracker, ProgressionStore, QuestState, QuestStatus,
};
