//! Availability Resolver
//!
//! Decides whether a quest can be offered. Always evaluated against live
//! player and progression state; nothing is cached.

use chrono::{DateTime, Utc};

use super::definition::QuestDefinition;
use super::engine::QuestEngine;
use super::registry::QuestCatalog;
use super::state::{CourseProgress, QuestStatus};
use crate::error::{LockReason, QuestError};
use crate::player::PlayerStore;

/// Check every gate for offering `quest`.
///
/// A repeatable quest that was completed before is gated by its cooldown
/// instead of by its completed history.
pub fn check_availability(
    progress: &CourseProgress,
    quest: &QuestDefinition,
    player: &dyn PlayerStore,
    now: DateTime<Utc>,
) -> Result<(), LockReason> {
    if progress.is_active(&quest.id) {
        return Err(LockReason::AlreadyActive);
    }

    if !quest.is_repeatable() && progress.is_completed(&quest.id) {
        return Err(LockReason::AlreadyCompleted);
    }

    let level = player.level();
    if level < quest.level_required {
        return Err(LockReason::LevelTooLow {
            required: quest.level_required,
            current: level,
        });
    }

    if let Some(missing) = quest
        .prerequisites
        .iter()
        .find(|prereq| !progress.is_completed(prereq))
    {
        return Err(LockReason::MissingPrerequisite(missing.clone()));
    }

    if let Some(ref required) = quest.location {
        if player.current_location() != Some(required.as_str()) {
            return Err(LockReason::WrongLocation {
                required: required.clone(),
            });
        }
    }

    if let Some(until) = progress.cooldown_until(&quest.id) {
        if now < until {
            return Err(LockReason::OnCooldown { until });
        }
    }

    Ok(())
}

impl<C: QuestCatalog> QuestEngine<C> {
    /// Whether the quest can be offered right now, with the reason if not
    pub fn availability(
        &self,
        course: &str,
        quest_id: &str,
        player: &dyn PlayerStore,
    ) -> Result<(), QuestError> {
        let progress = self.progression.course(course)?;
        let quest = self.definition(course, quest_id)?;
        check_availability(progress, &quest, player, self.clock.now()).map_err(|reason| {
            QuestError::QuestNotAvailable {
                quest_id: quest_id.to_string(),
                reason,
            }
        })
    }

    pub fn is_available(&self, course: &str, quest_id: &str, player: &dyn PlayerStore) -> bool {
        self.availability(course, quest_id, player).is_ok()
    }

    /// Full derived status of a quest for this player
    pub fn quest_status(
        &self,
        course: &str,
        quest_id: &str,
        player: &dyn PlayerStore,
    ) -> Result<QuestStatus, QuestError> {
        let progress = self.progression.course(course)?;
        if let Some(record) = progress.active_record(quest_id) {
            return Ok(record.state.into());
        }

        let quest = self.definition(course, quest_id)?;
        match check_availability(progress, &quest, player, self.clock.now()) {
            Ok(()) => Ok(QuestStatus::Available),
            Err(_) if progress.is_completed(quest_id) => Ok(QuestStatus::Completed),
            Err(_) => Ok(QuestStatus::Locked),
        }
    }

    /// Time left before a repeatable quest can be accepted again
    pub fn cooldown_remaining(&self, course: &str, quest_id: &str) -> Option<chrono::Duration> {
        let until = self.progression.course(course).ok()?.cooldown_until(quest_id)?;
        let now = self.clock.now();
        (until > now).then(|| until - now)
    }
}
