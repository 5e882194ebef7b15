//! Quest Event Types
//!
//! Gameplay events that can advance objectives of in-progress quests.

use serde::{Deserialize, Serialize};

use super::definition::ObjectiveType;

/// Something that happened in the game world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameplayEvent {
    /// Player finished a scripted task
    TaskCompleted { task_id: String },
    /// Player talked to an NPC
    NpcInteracted { npc_id: String },
    /// Player defeated a monster
    MonsterDefeated { monster_id: String },
    /// Player gathered or picked up items
    ItemGathered { item_id: String, count: u32 },
    /// Player reached a location
    LocationReached { location_id: String },
    /// Player handed something to an NPC
    ItemDelivered { npc_id: String, item_id: String },
    /// Player passed a vocabulary lesson
    LessonPassed { lesson_id: String },
    /// Player met an entity (feeds `meet` objectives)
    EntityEncountered { entity_id: String },
}

impl GameplayEvent {
    /// The id objective targets are matched against
    pub fn subject(&self) -> &str {
        match self {
            GameplayEvent::TaskCompleted { task_id } => task_id,
            GameplayEvent::NpcInteracted { npc_id } => npc_id,
            GameplayEvent::MonsterDefeated { monster_id } => monster_id,
            GameplayEvent::ItemGathered { item_id, .. } => item_id,
            GameplayEvent::LocationReached { location_id } => location_id,
            GameplayEvent::ItemDelivered { npc_id, .. } => npc_id,
            GameplayEvent::LessonPassed { lesson_id } => lesson_id,
            GameplayEvent::EntityEncountered { entity_id } => entity_id,
        }
    }

    /// Progress units this event is worth
    pub fn amount(&self) -> u32 {
        match self {
            GameplayEvent::ItemGathered { count, .. } => *count,
            _ => 1,
        }
    }

    /// Whether objectives of this kind listen to this event
    pub fn drives(&self, objective_type: ObjectiveType) -> bool {
        matches!(
            (self, objective_type),
            (GameplayEvent::TaskCompleted { .. }, ObjectiveType::Task)
                | (GameplayEvent::NpcInteracted { .. }, ObjectiveType::Interact)
                | (GameplayEvent::MonsterDefeated { .. }, ObjectiveType::Combat)
                | (GameplayEvent::ItemGathered { .. }, ObjectiveType::Gathering)
                | (GameplayEvent::ItemGathered { .. }, ObjectiveType::Collect)
                | (GameplayEvent::LocationReached { .. }, ObjectiveType::Exploration)
                | (GameplayEvent::ItemDelivered { .. }, ObjectiveType::Deliver)
                | (GameplayEvent::LessonPassed { .. }, ObjectiveType::VocabularyLesson)
                | (GameplayEvent::EntityEncountered { .. }, ObjectiveType::Meet)
        )
    }

    /// Get event type as string (for logging)
    pub fn event_type(&self) -> &'static str {
        match self {
            GameplayEvent::TaskCompleted { .. } => "task_completed",
            GameplayEvent::NpcInteracted { .. } => "npc_interacted",
            GameplayEvent::MonsterDefeated { .. } => "monster_defeated",
            GameplayEvent::ItemGathered { .. } => "item_gathered",
            GameplayEvent::LocationReached { .. } => "location_reached",
            GameplayEvent::ItemDelivered { .. } => "item_delivered",
            GameplayEvent::LessonPassed { .. } => "lesson_passed",
            GameplayEvent::EntityEncountered { .. } => "entity_encountered",
        }
    }
}

/// Outcome of a single objective update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectiveUpdate {
    pub quest_id: String,
    pub objective_id: String,
    pub current: u32,
    pub required: u32,
    /// The objective became complete with this update
    pub objective_completed: bool,
    /// The quest was promoted to ready-to-turn-in by this update
    pub quest_ready: bool,
}
