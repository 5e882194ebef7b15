//! Quest State Tracking
//!
//! Per-course progression: active records, completed and abandoned history,
//! cooldowns and permanent unlocks.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::definition::{ObjectiveSpec, ObjectiveType, QuestDefinition, Unlocks};
use super::rewards::{GrantedRewards, Performance};
use crate::error::QuestError;

/// Stored state of an accepted quest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    Accepted,
    InProgress,
    ReadyToTurnIn,
}

impl QuestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestState::Accepted => "accepted",
            QuestState::InProgress => "in_progress",
            QuestState::ReadyToTurnIn => "ready_to_turn_in",
        }
    }
}

/// Full quest status as seen by the presentation layer.
///
/// `Locked` and `Available` are derived on demand; `Completed` means the
/// quest has a completed record and no active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Locked,
    Available,
    Accepted,
    InProgress,
    ReadyToTurnIn,
    Completed,
}

impl From<QuestState> for QuestStatus {
    fn from(state: QuestState) -> Self {
        match state {
            QuestState::Accepted => QuestStatus::Accepted,
            QuestState::InProgress => QuestStatus::InProgress,
            QuestState::ReadyToTurnIn => QuestStatus::ReadyToTurnIn,
        }
    }
}

/// Kind-specific progress data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectiveTracker {
    /// Done or not done
    Flag,
    /// Fed by an external counter
    Counter { count: u32, required: u32 },
    /// Distinct entities encountered
    Meet { met: BTreeSet<String>, required: u32 },
}

/// Result of feeding progress into an objective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressChange {
    Unchanged,
    Advanced,
    Completed,
}

/// Progress on a single objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveProgress {
    pub tracker: ObjectiveTracker,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ObjectiveProgress {
    pub fn for_spec(spec: &ObjectiveSpec) -> Self {
        let required = spec.required();
        let tracker = if spec.objective_type == ObjectiveType::Meet {
            ObjectiveTracker::Meet {
                met: BTreeSet::new(),
                required,
            }
        } else if spec.objective_type.is_counted() || required > 1 {
            ObjectiveTracker::Counter { count: 0, required }
        } else {
            ObjectiveTracker::Flag
        };

        Self {
            tracker,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn current(&self) -> u32 {
        match &self.tracker {
            ObjectiveTracker::Flag => u32::from(self.is_completed()),
            ObjectiveTracker::Counter { count, .. } => *count,
            ObjectiveTracker::Meet { met, .. } => u32::try_from(met.len()).unwrap_or(u32::MAX),
        }
    }

    pub fn required(&self) -> u32 {
        match &self.tracker {
            ObjectiveTracker::Flag => 1,
            ObjectiveTracker::Counter { required, .. } | ObjectiveTracker::Meet { required, .. } => {
                *required
            }
        }
    }

    /// Mark as complete regardless of count
    pub fn force_complete(&mut self, now: DateTime<Utc>) {
        if let ObjectiveTracker::Counter { count, required } = &mut self.tracker {
            *count = *required;
        }
        self.completed_at = Some(now);
    }

    /// Add counted progress; flags complete on any positive amount
    pub fn add_progress(&mut self, amount: u32, now: DateTime<Utc>) -> ProgressChange {
        if self.is_completed() || amount == 0 {
            return ProgressChange::Unchanged;
        }
        let done = match &mut self.tracker {
            ObjectiveTracker::Flag => true,
            ObjectiveTracker::Counter { count, required } => {
                *count = count.saturating_add(amount).min(*required);
                *count >= *required
            }
            ObjectiveTracker::Meet { .. } => return ProgressChange::Unchanged,
        };
        if done {
            self.completed_at = Some(now);
            ProgressChange::Completed
        } else {
            ProgressChange::Advanced
        }
    }

    /// Record a distinct entity for a meet objective; repeats are ignored
    pub fn record_meeting(&mut self, entity_id: &str, now: DateTime<Utc>) -> ProgressChange {
        if self.is_completed() {
            return ProgressChange::Unchanged;
        }
        let ObjectiveTracker::Meet { met, required } = &mut self.tracker else {
            return ProgressChange::Unchanged;
        };
        if !met.insert(entity_id.to_string()) {
            return ProgressChange::Unchanged;
        }
        if met.len() >= *required as usize {
            self.completed_at = Some(now);
            ProgressChange::Completed
        } else {
            ProgressChange::Advanced
        }
    }
}

/// Progress record for an accepted, not yet turned-in quest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuestRecord {
    pub quest_id: String,
    pub state: QuestState,
    pub accepted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    /// Progress keyed by objective id
    pub objectives: BTreeMap<String, ObjectiveProgress>,
}

impl ActiveQuestRecord {
    pub fn new(quest: &QuestDefinition, now: DateTime<Utc>) -> Self {
        let objectives = quest
            .objectives
            .iter()
            .map(|spec| (spec.id.clone(), ObjectiveProgress::for_spec(spec)))
            .collect();

        Self {
            quest_id: quest.id.clone(),
            state: QuestState::Accepted,
            accepted_at: now,
            started_at: None,
            ready_at: None,
            objectives,
        }
    }

    pub fn all_objectives_complete(&self) -> bool {
        self.objectives.values().all(ObjectiveProgress::is_completed)
    }

    /// Promote to ready-to-turn-in once every objective is done
    pub fn mark_ready(&mut self, now: DateTime<Utc>) -> Result<(), QuestError> {
        if self.state == QuestState::ReadyToTurnIn {
            return Err(QuestError::AlreadyReadyToTurnIn(self.quest_id.clone()));
        }
        if !self.all_objectives_complete() {
            return Err(QuestError::NotAllObjectivesComplete(self.quest_id.clone()));
        }
        self.state = QuestState::ReadyToTurnIn;
        self.ready_at = Some(now);
        Ok(())
    }

    pub fn objective(&self, objective_id: &str) -> Option<&ObjectiveProgress> {
        self.objectives.get(objective_id)
    }

    /// Completed objectives over total
    pub fn completion(&self) -> (usize, usize) {
        let done = self.objectives.values().filter(|o| o.is_completed()).count();
        (done, self.objectives.len())
    }
}

/// Append-only record of a turned-in quest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedQuestRecord {
    pub quest_id: String,
    pub accepted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub performance: Performance,
    pub rewards_given: GrantedRewards,
}

/// History entry for a quest the player gave up on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedQuestRecord {
    pub quest_id: String,
    pub accepted_at: DateTime<Utc>,
    pub abandoned_at: DateTime<Utc>,
    pub state: QuestState,
}

/// All quest progression for one course
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub active: Vec<ActiveQuestRecord>,
    pub completed: Vec<CompletedQuestRecord>,
    pub abandoned: Vec<AbandonedQuestRecord>,
    /// Quest id -> instant the quest may be accepted again
    pub cooldowns: BTreeMap<String, DateTime<Utc>>,
    pub reputation: BTreeMap<String, i64>,
    pub unlocked_quests: BTreeSet<String>,
    pub unlocked_npcs: BTreeSet<String>,
    pub unlocked_locations: BTreeSet<String>,
    pub unlocked_features: BTreeSet<String>,
}

impl CourseProgress {
    pub fn active_record(&self, quest_id: &str) -> Option<&ActiveQuestRecord> {
        self.active.iter().find(|r| r.quest_id == quest_id)
    }

    pub fn active_record_mut(&mut self, quest_id: &str) -> Option<&mut ActiveQuestRecord> {
        self.active.iter_mut().find(|r| r.quest_id == quest_id)
    }

    pub fn is_active(&self, quest_id: &str) -> bool {
        self.active_record(quest_id).is_some()
    }

    pub fn is_completed(&self, quest_id: &str) -> bool {
        self.completed.iter().any(|r| r.quest_id == quest_id)
    }

    pub fn completion_count(&self, quest_id: &str) -> usize {
        self.completed.iter().filter(|r| r.quest_id == quest_id).count()
    }

    /// The quest currently in progress, if any
    pub fn in_progress(&self) -> Option<&ActiveQuestRecord> {
        self.active.iter().find(|r| r.state == QuestState::InProgress)
    }

    pub fn cooldown_until(&self, quest_id: &str) -> Option<DateTime<Utc>> {
        self.cooldowns.get(quest_id).copied()
    }

    pub fn reputation(&self, faction: &str) -> i64 {
        self.reputation.get(faction).copied().unwrap_or(0)
    }

    /// Add unlocked ids, returning only those that were new
    pub fn apply_unlocks(&mut self, unlocks: &Unlocks) -> Unlocks {
        fn merge(set: &mut BTreeSet<String>, ids: &[String]) -> Vec<String> {
            ids.iter().filter(|id| set.insert((*id).clone())).cloned().collect()
        }

        Unlocks {
            quests: merge(&mut self.unlocked_quests, &unlocks.quests),
            npcs: merge(&mut self.unlocked_npcs, &unlocks.npcs),
            locations: merge(&mut self.unlocked_locations, &unlocks.locations),
            features: merge(&mut self.unlocked_features, &unlocks.features),
        }
    }
}

/// Quest progression for every course the player has touched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionStore {
    courses: HashMap<String, CourseProgress>,
}

impl ProgressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the course's progression if this is its first use
    pub fn ensure_course(&mut self, course: &str) -> &mut CourseProgress {
        self.courses.entry(course.to_string()).or_default()
    }

    pub fn has_course(&self, course: &str) -> bool {
        self.courses.contains_key(course)
    }

    pub fn course(&self, course: &str) -> Result<&CourseProgress, QuestError> {
        self.courses
            .get(course)
            .ok_or_else(|| QuestError::CourseNotInitialized(course.to_string()))
    }

    pub fn course_mut(&mut self, course: &str) -> Result<&mut CourseProgress, QuestError> {
        self.courses
            .get_mut(course)
            .ok_or_else(|| QuestError::CourseNotInitialized(course.to_string()))
    }

    pub fn courses(&self) -> impl Iterator<Item = (&String, &CourseProgress)> {
        self.courses.iter()
    }
}
