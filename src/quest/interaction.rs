//! Interaction Queries
//!
//! Read-only projections for dialogue and map markers. These never fail on
//! bad data: quests with missing definitions are logged and hidden.

use std::sync::Arc;

use tracing::warn;

use super::definition::QuestDefinition;
use super::engine::QuestEngine;
use super::registry::QuestCatalog;
use super::state::{AbandonedQuestRecord, ActiveQuestRecord, CompletedQuestRecord, QuestState};
use crate::player::PlayerStore;

/// Category of a permanent unlock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockKind {
    Quest,
    Npc,
    Location,
    Feature,
}

impl<C: QuestCatalog> QuestEngine<C> {
    /// Quests this NPC can offer right now
    pub fn available_quests_for(
        &self,
        course: &str,
        giver: &str,
        player: &dyn PlayerStore,
    ) -> Vec<Arc<QuestDefinition>> {
        if !self.progression.has_course(course) {
            return Vec::new();
        }
        self.catalog
            .all_quest_ids(course)
            .iter()
            .filter_map(|id| self.catalog.get_quest(course, id))
            .filter(|quest| quest.giver == giver)
            .filter(|quest| self.is_available(course, &quest.id, player))
            .collect()
    }

    pub fn has_available_quests(&self, course: &str, giver: &str, player: &dyn PlayerStore) -> bool {
        !self.available_quests_for(course, giver, player).is_empty()
    }

    /// Active records for quests given by this NPC
    pub fn active_quests_for(&self, course: &str, giver: &str) -> Vec<&ActiveQuestRecord> {
        let Ok(progress) = self.progression.course(course) else {
            return Vec::new();
        };
        progress
            .active
            .iter()
            .filter(|record| match self.tracked_definition(course, &record.quest_id) {
                Ok(quest) => quest.giver == giver,
                Err(e) => {
                    warn!("Hiding quest '{}': {}", record.quest_id, e);
                    false
                }
            })
            .collect()
    }

    /// Whether this NPC has a quest waiting to be turned in
    pub fn has_quests_to_turn_in(&self, course: &str, giver: &str) -> bool {
        self.active_quests_for(course, giver)
            .iter()
            .any(|record| record.state == QuestState::ReadyToTurnIn)
    }

    pub fn completed_records(&self, course: &str) -> &[CompletedQuestRecord] {
        self.progression
            .course(course)
            .map(|p| p.completed.as_slice())
            .unwrap_or(&[])
    }

    pub fn abandoned_records(&self, course: &str) -> &[AbandonedQuestRecord] {
        self.progression
            .course(course)
            .map(|p| p.abandoned.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_unlocked(&self, course: &str, kind: UnlockKind, id: &str) -> bool {
        let Ok(progress) = self.progression.course(course) else {
            return false;
        };
        let set = match kind {
            UnlockKind::Quest => &progress.unlocked_quests,
            UnlockKind::Npc => &progress.unlocked_npcs,
            UnlockKind::Location => &progress.unlocked_locations,
            UnlockKind::Feature => &progress.unlocked_features,
        };
        set.contains(id)
    }

    /// Course-local standing with a faction
    pub fn reputation(&self, course: &str, faction: &str) -> i64 {
        self.progression
            .course(course)
            .map_or(0, |p| p.reputation(faction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuestError;
    use crate::player::PlayerProfile;
    use crate::quest::definition::{ObjectiveSpec, ObjectiveTarget, ObjectiveType};
    use crate::quest::registry::QuestRegistry;
    use crate::quest::state::ProgressionStore;

    const COURSE: &str = "french";

    fn quest(id: &str, giver: &str) -> QuestDefinition {
        QuestDefinition::new(id, giver).with_objective(ObjectiveSpec::new(
            "task",
            ObjectiveType::Task,
            ObjectiveTarget::Count(1),
        ))
    }

    fn engine() -> QuestEngine<QuestRegistry> {
        let mut registry = QuestRegistry::new();
        registry.insert(COURSE, quest("bonjour", "claire")).unwrap();
        registry.insert(COURSE, quest("cafe", "claire").with_level_required(5)).unwrap();
        registry.insert(COURSE, quest("gare", "luc")).unwrap();
        let mut engine = QuestEngine::new(registry);
        engine.ensure_course(COURSE);
        engine
    }

    #[test]
    fn test_available_quests_filtered_by_giver_and_gates() {
        let engine = engine();
        let player = PlayerProfile::new(1);

        let offers: Vec<String> = engine
            .available_quests_for(COURSE, "claire", &player)
            .iter()
            .map(|q| q.id.clone())
            .collect();
        assert_eq!(offers, vec!["bonjour".to_string()]);
        assert!(engine.has_available_quests(COURSE, "luc", &player));
        assert!(!engine.has_available_quests(COURSE, "nobody", &player));
        assert!(!engine.has_available_quests("german", "claire", &player));
    }

    #[test]
    fn test_turn_in_marker_follows_ready_state() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "bonjour", &player).unwrap();
        engine.start(COURSE, "bonjour").unwrap();

        assert_eq!(engine.active_quests_for(COURSE, "claire").len(), 1);
        assert!(!engine.has_quests_to_turn_in(COURSE, "claire"));

        engine.complete_objective(COURSE, "bonjour", "task").unwrap();
        assert!(engine.has_quests_to_turn_in(COURSE, "claire"));
        assert!(!engine.has_quests_to_turn_in(COURSE, "luc"));
    }

    #[test]
    fn test_dangling_active_quest_is_hidden() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "bonjour", &player).unwrap();

        let mut saved = engine.progression().clone();
        saved.ensure_course(COURSE).active[0].quest_id = "deleted_quest".to_string();

        let mut registry = QuestRegistry::new();
        registry.insert(COURSE, quest("bonjour", "claire")).unwrap();
        let restored = QuestEngine::new(registry).with_progression(saved);

        assert!(restored.active_quests_for(COURSE, "claire").is_empty());
        assert!(matches!(
            restored.verify_integrity(COURSE),
            Err(QuestError::DataIntegrity(_))
        ));
        assert!(restored.verify_integrity("german").is_err());
        let empty = QuestEngine::new(QuestRegistry::new()).with_progression(ProgressionStore::new());
        assert!(empty.completed_records(COURSE).is_empty());
    }
}
