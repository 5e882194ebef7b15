//! Lifecycle Controller
//!
//! Drives stored quest state: `Accepted -> InProgress -> ReadyToTurnIn`.
//! Turn-in lives in the rewards module.

use tracing::{debug, info, warn};

use super::engine::QuestEngine;
use super::events::{GameplayEvent, ObjectiveUpdate};
use super::registry::QuestCatalog;
use super::state::{
    AbandonedQuestRecord, ActiveQuestRecord, ObjectiveProgress, ProgressChange, QuestState,
};
use crate::error::QuestError;
use crate::player::PlayerStore;

impl<C: QuestCatalog> QuestEngine<C> {
    /// Accept an available quest. Objectives start incomplete
    pub fn accept(
        &mut self,
        course: &str,
        quest_id: &str,
        player: &dyn PlayerStore,
    ) -> Result<(), QuestError> {
        self.availability(course, quest_id, player)?;
        let quest = self.definition(course, quest_id)?;
        let record = ActiveQuestRecord::new(&quest, self.clock.now());

        self.progression.course_mut(course)?.active.push(record);
        info!("Accepted quest '{}' in course '{}'", quest_id, course);
        Ok(())
    }

    /// Begin an accepted quest. Only one quest per course may be in progress
    pub fn start(&mut self, course: &str, quest_id: &str) -> Result<(), QuestError> {
        let now = self.clock.now();
        let progress = self.progression.course_mut(course)?;

        let record = progress
            .active_record(quest_id)
            .ok_or_else(|| QuestError::QuestNotActive(quest_id.to_string()))?;
        if record.state != QuestState::Accepted {
            return Err(QuestError::QuestAlreadyStarted(quest_id.to_string()));
        }
        if let Some(other) = progress.in_progress() {
            return Err(QuestError::AnotherQuestInProgress {
                requested: quest_id.to_string(),
                in_progress: other.quest_id.clone(),
            });
        }

        if let Some(record) = progress.active_record_mut(quest_id) {
            record.state = QuestState::InProgress;
            record.started_at = Some(now);
        }
        info!("Started quest '{}' in course '{}'", quest_id, course);
        Ok(())
    }

    /// Mark one objective done outright.
    ///
    /// Counters jump to their target and meet objectives are completed
    /// without further encounters. Completing the last objective promotes the
    /// quest to ready-to-turn-in.
    pub fn complete_objective(
        &mut self,
        course: &str,
        quest_id: &str,
        objective_id: &str,
    ) -> Result<ObjectiveUpdate, QuestError> {
        self.update_objective(course, quest_id, objective_id, |objective, now| {
            objective.force_complete(now);
            ProgressChange::Completed
        })
    }

    /// Add counted progress (monsters defeated, items gathered, ...)
    pub fn add_objective_progress(
        &mut self,
        course: &str,
        quest_id: &str,
        objective_id: &str,
        amount: u32,
    ) -> Result<ObjectiveUpdate, QuestError> {
        self.update_objective(course, quest_id, objective_id, |objective, now| {
            objective.add_progress(amount, now)
        })
    }

    /// Record a distinct entity against a meet objective; repeat visits do not count
    pub fn record_meeting(
        &mut self,
        course: &str,
        quest_id: &str,
        objective_id: &str,
        entity_id: &str,
    ) -> Result<ObjectiveUpdate, QuestError> {
        self.update_objective(course, quest_id, objective_id, |objective, now| {
            objective.record_meeting(entity_id, now)
        })
    }

    fn update_objective(
        &mut self,
        course: &str,
        quest_id: &str,
        objective_id: &str,
        apply: impl FnOnce(&mut ObjectiveProgress, chrono::DateTime<chrono::Utc>) -> ProgressChange,
    ) -> Result<ObjectiveUpdate, QuestError> {
        let now = self.clock.now();
        let record = self
            .progression
            .course_mut(course)?
            .active_record_mut(quest_id)
            .ok_or_else(|| QuestError::QuestNotActive(quest_id.to_string()))?;
        let in_progress = record.state == QuestState::InProgress;

        let objective = record.objectives.get_mut(objective_id).ok_or_else(|| {
            QuestError::ObjectiveNotFound {
                quest_id: quest_id.to_string(),
                objective_id: objective_id.to_string(),
            }
        })?;
        if objective.is_completed() {
            return Err(QuestError::ObjectiveAlreadyCompleted {
                quest_id: quest_id.to_string(),
                objective_id: objective_id.to_string(),
            });
        }
        if !in_progress {
            return Err(QuestError::QuestNotActive(quest_id.to_string()));
        }

        let change = apply(objective, now);
        let (current, required) = (objective.current(), objective.required());
        let objective_completed = change == ProgressChange::Completed;
        debug!(
            "Quest '{}' objective '{}': {}/{}",
            quest_id, objective_id, current, required
        );

        let quest_ready = objective_completed && promote_if_complete(record, now);
        Ok(ObjectiveUpdate {
            quest_id: quest_id.to_string(),
            objective_id: objective_id.to_string(),
            current,
            required,
            objective_completed,
            quest_ready,
        })
    }

    /// Promote a quest whose objectives are all complete
    pub fn mark_ready_to_turn_in(&mut self, course: &str, quest_id: &str) -> Result<(), QuestError> {
        let now = self.clock.now();
        let record = self
            .progression
            .course_mut(course)?
            .active_record_mut(quest_id)
            .ok_or_else(|| QuestError::QuestNotActive(quest_id.to_string()))?;
        record.mark_ready(now)?;
        info!("Quest '{}' is ready to turn in", quest_id);
        Ok(())
    }

    /// Drop an active quest. It can be accepted again later
    pub fn abandon(&mut self, course: &str, quest_id: &str) -> Result<(), QuestError> {
        let now = self.clock.now();
        let progress = self.progression.course_mut(course)?;
        let pos = progress
            .active
            .iter()
            .position(|r| r.quest_id == quest_id)
            .ok_or_else(|| QuestError::QuestNotActive(quest_id.to_string()))?;

        let record = progress.active.remove(pos);
        progress.abandoned.push(AbandonedQuestRecord {
            quest_id: record.quest_id,
            accepted_at: record.accepted_at,
            abandoned_at: now,
            state: record.state,
        });
        info!("Abandoned quest '{}' in course '{}'", quest_id, course);
        Ok(())
    }

    /// Feed an encountered entity to every in-progress meet objective
    pub fn on_entity_encountered(
        &mut self,
        course: &str,
        entity_id: &str,
    ) -> Result<Vec<ObjectiveUpdate>, QuestError> {
        self.process_event(
            course,
            &GameplayEvent::EntityEncountered {
                entity_id: entity_id.to_string(),
            },
        )
    }

    /// Route a gameplay event to matching objectives of in-progress quests.
    ///
    /// Quests whose definition is missing from the catalog are skipped.
    pub fn process_event(
        &mut self,
        course: &str,
        event: &GameplayEvent,
    ) -> Result<Vec<ObjectiveUpdate>, QuestError> {
        let now = self.clock.now();
        let quest_ids: Vec<String> = self
            .progression
            .course(course)?
            .active
            .iter()
            .filter(|r| r.state == QuestState::InProgress)
            .map(|r| r.quest_id.clone())
            .collect();

        let mut updates = Vec::new();
        for quest_id in quest_ids {
            let quest = match self.tracked_definition(course, &quest_id) {
                Ok(quest) => quest,
                Err(e) => {
                    warn!("Skipping {} for quest '{}': {}", event.event_type(), quest_id, e);
                    continue;
                }
            };
            let Some(record) = self.progression.course_mut(course)?.active_record_mut(&quest_id)
            else {
                continue;
            };

            for spec in &quest.objectives {
                if !event.drives(spec.objective_type) || !spec.accepts(event.subject()) {
                    continue;
                }
                let Some(objective) = record.objectives.get_mut(&spec.id) else {
                    continue;
                };
                let change = match event {
                    GameplayEvent::EntityEncountered { entity_id } => {
                        objective.record_meeting(entity_id, now)
                    }
                    _ => objective.add_progress(event.amount(), now),
                };
                if change == ProgressChange::Unchanged {
                    continue;
                }

                debug!(
                    "Quest '{}' objective '{}' advanced by {}: {}/{}",
                    quest_id,
                    spec.id,
                    event.event_type(),
                    objective.current(),
                    objective.required()
                );
                updates.push(ObjectiveUpdate {
                    quest_id: quest_id.clone(),
                    objective_id: spec.id.clone(),
                    current: objective.current(),
                    required: objective.required(),
                    objective_completed: change == ProgressChange::Completed,
                    quest_ready: false,
                });
            }

            if promote_if_complete(record, now) {
                if let Some(last) = updates.iter_mut().rev().find(|u| u.quest_id == quest_id) {
                    last.quest_ready = true;
                }
            }
        }

        Ok(updates)
    }
}

/// Auto-promotion after progress; true if the quest just became ready
fn promote_if_complete(record: &mut ActiveQuestRecord, now: chrono::DateTime<chrono::Utc>) -> bool {
    if record.state != QuestState::InProgress || !record.all_objectives_complete() {
        return false;
    }
    match record.mark_ready(now) {
        Ok(()) => {
            info!("Quest '{}' is ready to turn in", record.quest_id);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::player::PlayerProfile;
    use crate::quest::definition::{ObjectiveSpec, ObjectiveTarget, ObjectiveType, QuestDefinition};
    use crate::quest::registry::QuestRegistry;
    use crate::quest::state::QuestStatus;
    use chrono::DateTime;

    const COURSE: &str = "spanish";

    fn engine() -> QuestEngine<QuestRegistry> {
        let mut registry = QuestRegistry::new();
        registry
            .insert(
                COURSE,
                QuestDefinition::new("greetings", "mira")
                    .with_objective(ObjectiveSpec::new(
                        "lesson",
                        ObjectiveType::VocabularyLesson,
                        ObjectiveTarget::Entity("hola".to_string()),
                    ))
                    .with_objective(ObjectiveSpec::new(
                        "meet_locals",
                        ObjectiveType::Meet,
                        ObjectiveTarget::Count(2),
                    )),
            )
            .unwrap();
        registry
            .insert(
                COURSE,
                QuestDefinition::new("herbs", "healer").with_objective(ObjectiveSpec::new(
                    "gather",
                    ObjectiveType::Gathering,
                    ObjectiveTarget::Count(5),
                )),
            )
            .unwrap();

        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let mut engine = QuestEngine::new(registry).with_clock(clock);
        engine.ensure_course(COURSE);
        engine
    }

    fn record(engine: &QuestEngine<QuestRegistry>, quest_id: &str) -> ActiveQuestRecord {
        engine
            .course(COURSE)
            .unwrap()
            .active_record(quest_id)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_accept_makes_quest_unavailable() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);

        assert!(engine.is_available(COURSE, "greetings", &player));
        engine.accept(COURSE, "greetings", &player).unwrap();
        assert!(!engine.is_available(COURSE, "greetings", &player));
        assert_eq!(record(&engine, "greetings").state, QuestState::Accepted);
        assert!(matches!(
            engine.accept(COURSE, "greetings", &player),
            Err(QuestError::QuestNotAvailable { .. })
        ));
        assert_eq!(
            engine.accept(COURSE, "missing", &player),
            Err(QuestError::QuestNotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_operations_require_initialized_course() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        assert_eq!(
            engine.accept("french", "greetings", &player),
            Err(QuestError::CourseNotInitialized("french".to_string()))
        );
        assert!(!engine.is_available("french", "greetings", &player));
    }

    #[test]
    fn test_single_quest_in_progress() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();
        engine.accept(COURSE, "herbs", &player).unwrap();

        engine.start(COURSE, "greetings").unwrap();
        assert_eq!(
            engine.start(COURSE, "greetings"),
            Err(QuestError::QuestAlreadyStarted("greetings".to_string()))
        );
        assert_eq!(
            engine.start(COURSE, "herbs"),
            Err(QuestError::AnotherQuestInProgress {
                requested: "herbs".to_string(),
                in_progress: "greetings".to_string(),
            })
        );

        engine.abandon(COURSE, "greetings").unwrap();
        engine.start(COURSE, "herbs").unwrap();
        assert_eq!(
            engine.start(COURSE, "nothing"),
            Err(QuestError::QuestNotActive("nothing".to_string()))
        );
    }

    #[test]
    fn test_objectives_require_in_progress() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();

        assert_eq!(
            engine.complete_objective(COURSE, "greetings", "lesson"),
            Err(QuestError::QuestNotActive("greetings".to_string()))
        );
        engine.start(COURSE, "greetings").unwrap();
        assert!(matches!(
            engine.complete_objective(COURSE, "greetings", "nope"),
            Err(QuestError::ObjectiveNotFound { .. })
        ));
    }

    #[test]
    fn test_last_objective_promotes_once() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();
        engine.start(COURSE, "greetings").unwrap();

        let update = engine.complete_objective(COURSE, "greetings", "lesson").unwrap();
        assert!(update.objective_completed);
        assert!(!update.quest_ready);

        let update = engine
            .complete_objective(COURSE, "greetings", "meet_locals")
            .unwrap();
        assert!(update.quest_ready);
        let promoted = record(&engine, "greetings");
        assert_eq!(promoted.state, QuestState::ReadyToTurnIn);
        assert!(promoted.ready_at.is_some());

        assert!(matches!(
            engine.complete_objective(COURSE, "greetings", "lesson"),
            Err(QuestError::ObjectiveAlreadyCompleted { .. })
        ));
        assert_eq!(
            engine.mark_ready_to_turn_in(COURSE, "greetings"),
            Err(QuestError::AlreadyReadyToTurnIn("greetings".to_string()))
        );
        assert_eq!(record(&engine, "greetings").ready_at, promoted.ready_at);
    }

    #[test]
    fn test_completed_objective_rejected() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();
        engine.start(COURSE, "greetings").unwrap();

        engine.complete_objective(COURSE, "greetings", "lesson").unwrap();
        assert_eq!(
            engine.complete_objective(COURSE, "greetings", "lesson"),
            Err(QuestError::ObjectiveAlreadyCompleted {
                quest_id: "greetings".to_string(),
                objective_id: "lesson".to_string(),
            })
        );
        assert_eq!(
            engine.mark_ready_to_turn_in(COURSE, "greetings"),
            Err(QuestError::NotAllObjectivesComplete("greetings".to_string()))
        );
    }

    #[test]
    fn test_meet_objective_counts_distinct_entities() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();
        engine.start(COURSE, "greetings").unwrap();

        engine.on_entity_encountered(COURSE, "x").unwrap();
        let updates = engine.on_entity_encountered(COURSE, "x").unwrap();
        assert!(updates.is_empty());
        let meet = record(&engine, "greetings").objectives["meet_locals"].clone();
        assert_eq!((meet.current(), meet.required()), (1, 2));

        let updates = engine.on_entity_encountered(COURSE, "y").unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].objective_completed);
        assert!(!updates[0].quest_ready);
    }

    #[test]
    fn test_events_only_reach_in_progress_quests() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "herbs", &player).unwrap();

        let event = GameplayEvent::ItemGathered {
            item_id: "mint".to_string(),
            count: 3,
        };
        assert!(engine.process_event(COURSE, &event).unwrap().is_empty());

        engine.start(COURSE, "herbs").unwrap();
        let updates = engine.process_event(COURSE, &event).unwrap();
        assert_eq!(updates[0].current, 3);
        let updates = engine.process_event(COURSE, &event).unwrap();
        assert_eq!(updates[0].current, 5);
        assert!(updates[0].quest_ready);
        assert_eq!(
            engine.quest_status(COURSE, "herbs", &player).unwrap(),
            QuestStatus::ReadyToTurnIn
        );
    }

    #[test]
    fn test_symbolic_target_matches_only_its_subject() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();
        engine.start(COURSE, "greetings").unwrap();

        let wrong = GameplayEvent::LessonPassed {
            lesson_id: "adios".to_string(),
        };
        assert!(engine.process_event(COURSE, &wrong).unwrap().is_empty());

        let right = GameplayEvent::LessonPassed {
            lesson_id: "hola".to_string(),
        };
        let updates = engine.process_event(COURSE, &right).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].objective_id, "lesson");
    }

    #[test]
    fn test_abandon_allows_reaccept() {
        let mut engine = engine();
        let player = PlayerProfile::new(1);
        engine.accept(COURSE, "greetings", &player).unwrap();
        engine.start(COURSE, "greetings").unwrap();
        engine.abandon(COURSE, "greetings").unwrap();

        let course = engine.course(COURSE).unwrap();
        assert!(course.active.is_empty());
        assert_eq!(course.abandoned[0].state, QuestState::InProgress);
        assert!(engine.is_available(COURSE, "greetings", &player));
        assert_eq!(
            engine.abandon(COURSE, "greetings"),
            Err(QuestError::QuestNotActive("greetings".to_string()))
        );
    }
}
