//! Quest Definition Structures
//!
//! Raw structures are deserialized from TOML quest files and resolved into
//! immutable [`QuestDefinition`]s.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Longest cooldown a quest may declare (100 years)
pub const MAX_COOLDOWN_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// A quest definition file
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub giver: String,
    #[serde(default)]
    pub level_required: u32,
    /// Location the player must be standing in to be offered the quest
    pub location: Option<String>,
    /// Repeat cooldown in milliseconds; presence makes the quest repeatable
    pub cooldown_ms: Option<u64>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
    #[serde(default)]
    pub rewards: Rewards,
    pub bonus_rewards: Option<BonusRewards>,
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub id: String,
    #[serde(rename = "type")]
    pub objective_type: String,
    #[serde(default = "default_target")]
    pub target: ObjectiveTarget,
    #[serde(default)]
    pub description: String,
}

fn default_target() -> ObjectiveTarget {
    ObjectiveTarget::Count(1)
}

// ============================================================================
// Resolved Quest Structures
// ============================================================================

/// Objective kinds known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    Task,
    Interact,
    Combat,
    Gathering,
    Meet,
    Exploration,
    Collect,
    Deliver,
    VocabularyLesson,
}

impl ObjectiveType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "task" => Some(ObjectiveType::Task),
            "interact" | "talk" => Some(ObjectiveType::Interact),
            "combat" | "kill" => Some(ObjectiveType::Combat),
            "gathering" | "gather" => Some(ObjectiveType::Gathering),
            "meet" => Some(ObjectiveType::Meet),
            "exploration" | "explore" => Some(ObjectiveType::Exploration),
            "collect" => Some(ObjectiveType::Collect),
            "deliver" => Some(ObjectiveType::Deliver),
            "vocabulary_lesson" | "lesson" => Some(ObjectiveType::VocabularyLesson),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveType::Task => "task",
            ObjectiveType::Interact => "interact",
            ObjectiveType::Combat => "combat",
            ObjectiveType::Gathering => "gathering",
            ObjectiveType::Meet => "meet",
            ObjectiveType::Exploration => "exploration",
            ObjectiveType::Collect => "collect",
            ObjectiveType::Deliver => "deliver",
            ObjectiveType::VocabularyLesson => "vocabulary_lesson",
        }
    }

    /// Kinds whose numeric target is fed by an external counter
    pub fn is_counted(&self) -> bool {
        matches!(
            self,
            ObjectiveType::Combat | ObjectiveType::Gathering | ObjectiveType::Collect
        )
    }
}

/// What an objective is aimed at: a number of things, or one named thing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectiveTarget {
    Count(u32),
    Entity(String),
}

/// A resolved quest objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectiveSpec {
    pub id: String,
    pub objective_type: ObjectiveType,
    pub target: ObjectiveTarget,
    pub description: String,
}

impl ObjectiveSpec {
    pub fn new(id: &str, objective_type: ObjectiveType, target: ObjectiveTarget) -> Self {
        Self {
            id: id.to_string(),
            objective_type,
            target,
            description: String::new(),
        }
    }

    fn from_raw(quest_id: &str, raw: &RawObjective) -> Result<Self, CatalogError> {
        let objective_type =
            ObjectiveType::parse(&raw.objective_type).ok_or_else(|| CatalogError::InvalidDefinition {
                quest_id: quest_id.to_string(),
                reason: format!(
                    "unknown objective type '{}' on objective '{}'",
                    raw.objective_type, raw.id
                ),
            })?;

        if raw.target == ObjectiveTarget::Count(0) {
            return Err(CatalogError::InvalidDefinition {
                quest_id: quest_id.to_string(),
                reason: format!("objective '{}' has a zero target", raw.id),
            });
        }

        Ok(Self {
            id: raw.id.clone(),
            objective_type,
            target: raw.target.clone(),
            description: raw.description.clone(),
        })
    }

    /// Number of progress units needed to complete
    pub fn required(&self) -> u32 {
        match &self.target {
            ObjectiveTarget::Count(n) => (*n).max(1),
            ObjectiveTarget::Entity(_) => 1,
        }
    }

    /// Whether an event about `subject` counts towards this objective.
    ///
    /// A named target only accepts that subject; a count target accepts any.
    pub fn accepts(&self, subject: &str) -> bool {
        match &self.target {
            ObjectiveTarget::Count(_) => true,
            ObjectiveTarget::Entity(id) => id == subject,
        }
    }
}

/// Ids granted to the course progression when a quest is turned in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unlocks {
    pub quests: Vec<String>,
    pub npcs: Vec<String>,
    pub locations: Vec<String>,
    pub features: Vec<String>,
}

impl Unlocks {
    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
            && self.npcs.is_empty()
            && self.locations.is_empty()
            && self.features.is_empty()
    }
}

/// Quest rewards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub xp: u64,
    pub gold: u64,
    pub items: Vec<String>,
    pub equipment: Vec<String>,
    pub reputation: BTreeMap<String, i64>,
    pub spellbook_pages: Vec<String>,
    pub artifacts: Vec<String>,
    pub title: Option<String>,
    pub unlocks: Unlocks,
}

/// Performance condition a bonus reward is gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusCondition {
    PerfectScore,
    Streak,
    Time,
}

/// Extra rewards granted when turn-in performance meets a condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusRewards {
    pub condition: BonusCondition,
    /// Streak length or time limit (ms); engine defaults apply when absent
    pub threshold: Option<u64>,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub items: Vec<String>,
}

/// A fully resolved, immutable quest definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// NPC that offers and accepts this quest
    pub giver: String,
    pub level_required: u32,
    pub location: Option<String>,
    pub cooldown_ms: Option<u64>,
    pub prerequisites: BTreeSet<String>,
    pub objectives: Vec<ObjectiveSpec>,
    pub rewards: Rewards,
    pub bonus_rewards: Option<BonusRewards>,
}

impl QuestDefinition {
    /// Minimal definition for programmatic content; extend with the `with_*` builders
    pub fn new(id: &str, giver: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            giver: giver.to_string(),
            level_required: 0,
            location: None,
            cooldown_ms: None,
            prerequisites: BTreeSet::new(),
            objectives: Vec::new(),
            rewards: Rewards::default(),
            bonus_rewards: None,
        }
    }

    /// Create a definition from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, CatalogError> {
        let objectives = raw
            .objectives
            .iter()
            .map(|o| ObjectiveSpec::from_raw(&raw.id, o))
            .collect::<Result<Vec<_>, _>>()?;

        let quest = Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            description: raw.description.clone(),
            giver: raw.giver.clone(),
            level_required: raw.level_required,
            location: raw.location.clone(),
            cooldown_ms: raw.cooldown_ms,
            prerequisites: raw.prerequisites.iter().cloned().collect(),
            objectives,
            rewards: raw.rewards.clone(),
            bonus_rewards: raw.bonus_rewards.clone(),
        };
        quest.validate()?;
        Ok(quest)
    }

    /// Structural checks shared by TOML loading and programmatic insertion
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: String| CatalogError::InvalidDefinition {
            quest_id: self.id.clone(),
            reason,
        };

        if self.objectives.is_empty() {
            return Err(invalid("quest has no objectives".to_string()));
        }

        let mut seen = BTreeSet::new();
        for objective in &self.objectives {
            if !seen.insert(objective.id.as_str()) {
                return Err(invalid(format!("duplicate objective id '{}'", objective.id)));
            }
        }

        if self.prerequisites.contains(&self.id) {
            return Err(invalid("quest lists itself as a prerequisite".to_string()));
        }

        if let Some(ms) = self.cooldown_ms {
            if ms > MAX_COOLDOWN_MS {
                return Err(invalid(format!(
                    "cooldown of {}ms exceeds the {}ms limit",
                    ms, MAX_COOLDOWN_MS
                )));
            }
        }

        Ok(())
    }

    pub fn with_objective(mut self, objective: ObjectiveSpec) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_prerequisite(mut self, quest_id: &str) -> Self {
        self.prerequisites.insert(quest_id.to_string());
        self
    }

    pub fn with_level_required(mut self, level: u32) -> Self {
        self.level_required = level;
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = Some(cooldown_ms);
        self
    }

    pub fn with_rewards(mut self, rewards: Rewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_bonus(mut self, bonus: BonusRewards) -> Self {
        self.bonus_rewards = Some(bonus);
        self
    }

    pub fn is_repeatable(&self) -> bool {
        self.cooldown_ms.is_some()
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown_ms
            .map(|ms| Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX)))
    }

    /// Get objective by ID
    pub fn objective(&self, id: &str) -> Option<&ObjectiveSpec> {
        self.objectives.iter().find(|o| o.id == id)
    }
}
