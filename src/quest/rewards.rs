//! Reward & Unlock Resolver
//!
//! Turn-in is the only operation that mutates the player store. All checks
//! run before the first side effect so a failed turn-in changes nothing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::definition::{BonusCondition, BonusRewards, QuestDefinition, Unlocks};
use super::engine::QuestEngine;
use super::registry::QuestCatalog;
use super::state::{CompletedQuestRecord, QuestState};
use crate::config::EngineConfig;
use crate::error::QuestError;
use crate::player::PlayerStore;

/// How the player did, as reported by the activity that finished the quest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Percentage score, 100 is perfect
    pub score: u32,
    pub streak: u64,
    /// Completion time in milliseconds, if it was measured
    pub time_ms: Option<u64>,
    pub perfect: bool,
}

/// Everything granted by one turn-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantedRewards {
    pub xp: u64,
    /// Gold including any loot bonus
    pub gold: u64,
    pub items: Vec<String>,
    pub equipment: Vec<String>,
    pub reputation: BTreeMap<String, i64>,
    pub spellbook_pages: Vec<String>,
    pub artifacts: Vec<String>,
    pub title: Option<String>,
    /// The quest's performance bonus was earned
    pub bonus_applied: bool,
    /// Extra gold from the player's loot bonus roll, if it hit
    pub loot_bonus_gold: Option<u64>,
}

/// Result of a successful turn-in
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInReport {
    pub quest_id: String,
    pub rewards: GrantedRewards,
    /// Ids unlocked for the first time by this turn-in
    pub unlocks: Unlocks,
    pub completed_at: DateTime<Utc>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

/// Whether `performance` satisfies the bonus rule
pub fn bonus_condition_met(
    bonus: &BonusRewards,
    performance: &Performance,
    config: &EngineConfig,
) -> bool {
    match bonus.condition {
        // Either signal counts; callers often populate only one
        BonusCondition::PerfectScore => performance.score == 100 || performance.perfect,
        BonusCondition::Streak => {
            performance.streak >= bonus.threshold.unwrap_or(config.default_streak_threshold)
        }
        BonusCondition::Time => performance
            .time_ms
            .is_some_and(|t| t <= bonus.threshold.unwrap_or(config.default_time_threshold_ms)),
    }
}

/// Base rewards plus the performance bonus, before any loot roll
pub fn resolve_rewards(
    quest: &QuestDefinition,
    performance: &Performance,
    config: &EngineConfig,
) -> GrantedRewards {
    let base = &quest.rewards;
    let mut rewards = GrantedRewards {
        xp: base.xp,
        gold: base.gold,
        items: base.items.clone(),
        equipment: base.equipment.clone(),
        reputation: base.reputation.clone(),
        spellbook_pages: base.spellbook_pages.clone(),
        artifacts: base.artifacts.clone(),
        title: base.title.clone(),
        bonus_applied: false,
        loot_bonus_gold: None,
    };

    if let Some(ref bonus) = quest.bonus_rewards {
        if bonus_condition_met(bonus, performance, config) {
            rewards.xp = rewards.xp.saturating_add(bonus.xp);
            rewards.gold = rewards.gold.saturating_add(bonus.gold);
            rewards.items.extend(bonus.items.iter().cloned());
            rewards.bonus_applied = true;
        }
    }

    rewards
}

/// Extra gold for a successful loot roll
pub fn loot_bonus_amount(gold: u64, ratio: f64) -> u64 {
    (gold as f64 * ratio).floor() as u64
}

impl<C: QuestCatalog> QuestEngine<C> {
    /// Claim the rewards of a ready quest and move it to the completed history
    pub fn turn_in(
        &mut self,
        course: &str,
        quest_id: &str,
        performance: Performance,
        player: &mut dyn PlayerStore,
    ) -> Result<TurnInReport, QuestError> {
        let now = self.clock.now();

        let record = self
            .progression
            .course(course)?
            .active_record(quest_id)
            .ok_or_else(|| QuestError::QuestNotActive(quest_id.to_string()))?;
        if record.state != QuestState::ReadyToTurnIn {
            return Err(QuestError::QuestNotReadyToTurnIn(quest_id.to_string()));
        }
        let quest = self.tracked_definition(course, quest_id)?;
        let cooldown_until = match quest.cooldown() {
            Some(cooldown) => Some(now.checked_add_signed(cooldown).ok_or_else(|| {
                QuestError::DataIntegrity(format!(
                    "cooldown of quest '{}' overflows the calendar",
                    quest_id
                ))
            })?),
            None => None,
        };

        let mut rewards = resolve_rewards(&quest, &performance, &self.config);

        let pos = self
            .progression
            .course(course)?
            .active
            .iter()
            .position(|r| r.quest_id == quest_id)
            .ok_or_else(|| QuestError::QuestNotActive(quest_id.to_string()))?;

        let chance = player.loot_bonus_chance().clamp(0.0, 1.0);
        if chance > 0.0 && self.rng.gen_bool(chance) {
            let extra = loot_bonus_amount(rewards.gold, self.config.loot_bonus_gold_ratio);
            if extra > 0 {
                rewards.gold = rewards.gold.saturating_add(extra);
                rewards.loot_bonus_gold = Some(extra);
            }
        }

        self.grant(quest_id, &rewards, player);

        let progress = self.progression.course_mut(course)?;
        for (faction, amount) in &rewards.reputation {
            let standing = progress.reputation.entry(faction.clone()).or_insert(0);
            *standing = standing.saturating_add(*amount);
        }
        let unlocks = progress.apply_unlocks(&quest.rewards.unlocks);

        let record = progress.active.remove(pos);
        progress.completed.push(CompletedQuestRecord {
            quest_id: quest_id.to_string(),
            accepted_at: record.accepted_at,
            completed_at: now,
            performance,
            rewards_given: rewards.clone(),
        });

        if let Some(until) = cooldown_until {
            progress.cooldowns.insert(quest_id.to_string(), until);
        }

        info!(
            "Turned in quest '{}': {} xp, {} gold{}{}",
            quest_id,
            rewards.xp,
            rewards.gold,
            if rewards.bonus_applied { ", bonus earned" } else { "" },
            if rewards.loot_bonus_gold.is_some() { ", loot bonus" } else { "" },
        );

        Ok(TurnInReport {
            quest_id: quest_id.to_string(),
            rewards,
            unlocks,
            completed_at: now,
            cooldown_until,
        })
    }

    /// Push every reward component to the player and the optional integrations
    fn grant(&mut self, quest_id: &str, rewards: &GrantedRewards, player: &mut dyn PlayerStore) {
        if rewards.xp > 0 {
            player.award_experience(rewards.xp, &format!("quest:{}", quest_id));
        }
        if rewards.gold > 0 {
            player.award_currency(rewards.gold);
        }
        if !rewards.items.is_empty() {
            player.add_items(&rewards.items);
        }
        if !rewards.equipment.is_empty() {
            player.add_equipment(&rewards.equipment);
        }
        if let Some(ref title) = rewards.title {
            player.grant_title(title);
        }
        for (faction, amount) in &rewards.reputation {
            self.hooks.add_reputation(faction, *amount);
        }
        if !rewards.spellbook_pages.is_empty() {
            self.hooks.unlock_spellbook_pages(&rewards.spellbook_pages);
        }
        for artifact in &rewards.artifacts {
            self.hooks.unlock_artifact(artifact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bonus(condition: BonusCondition, threshold: Option<u64>) -> BonusRewards {
        BonusRewards {
            condition,
            threshold,
            xp: 20,
            gold: 10,
            items: vec!["gold_star".to_string()],
        }
    }

    #[test]
    fn test_perfect_score_accepts_either_signal() {
        let config = EngineConfig::default();
        let rule = bonus(BonusCondition::PerfectScore, None);

        let by_score = Performance {
            score: 100,
            ..Default::default()
        };
        let by_flag = Performance {
            score: 80,
            perfect: true,
            ..Default::default()
        };
        assert!(bonus_condition_met(&rule, &by_score, &config));
        assert!(bonus_condition_met(&rule, &by_flag, &config));
        assert!(!bonus_condition_met(&rule, &Performance::default(), &config));
    }

    #[test]
    fn test_streak_uses_default_threshold() {
        let config = EngineConfig::default();
        let rule = bonus(BonusCondition::Streak, None);
        let at = |streak| Performance {
            streak,
            ..Default::default()
        };

        assert!(!bonus_condition_met(&rule, &at(4), &config));
        assert!(bonus_condition_met(&rule, &at(5), &config));
        assert!(!bonus_condition_met(&bonus(BonusCondition::Streak, Some(8)), &at(7), &config));
    }

    #[test]
    fn test_time_requires_measurement() {
        let config = EngineConfig::default();
        let rule = bonus(BonusCondition::Time, None);
        let timed = |ms| Performance {
            time_ms: Some(ms),
            ..Default::default()
        };

        assert!(bonus_condition_met(&rule, &timed(60_000), &config));
        assert!(!bonus_condition_met(&rule, &timed(60_001), &config));
        assert!(!bonus_condition_met(&rule, &Performance::default(), &config));
    }

    #[test]
    fn test_resolve_adds_bonus_on_top_of_base() {
        let mut quest = QuestDefinition::new("q", "npc").with_bonus(bonus(BonusCondition::PerfectScore, None));
        quest.rewards.xp = 10;
        quest.rewards.gold = 5;
        quest.rewards.items = vec!["bread".to_string()];

        let config = EngineConfig::default();
        let plain = resolve_rewards(&quest, &Performance::default(), &config);
        assert_eq!((plain.xp, plain.gold, plain.bonus_applied), (10, 5, false));

        let perfect = Performance {
            perfect: true,
            ..Default::default()
        };
        let boosted = resolve_rewards(&quest, &perfect, &config);
        assert_eq!((boosted.xp, boosted.gold), (30, 15));
        assert_eq!(boosted.items, vec!["bread".to_string(), "gold_star".to_string()]);
        assert!(boosted.bonus_applied);
    }

    #[test]
    fn test_loot_bonus_is_half_rounded_down() {
        assert_eq!(loot_bonus_amount(15, 0.5), 7);
        assert_eq!(loot_bonus_amount(0, 0.5), 0);
    }

    #[test]
    fn test_bonus_saturates_instead_of_overflowing() {
        let mut quest = QuestDefinition::new("q", "npc").with_bonus(bonus(BonusCondition::PerfectScore, None));
        quest.rewards.xp = u64::MAX;
        quest.rewards.gold = u64::MAX - 1;

        let perfect = Performance {
            perfect: true,
            ..Default::default()
        };
        let rewards = resolve_rewards(&quest, &perfect, &EngineConfig::default());
        assert_eq!((rewards.xp, rewards.gold), (u64::MAX, u64::MAX));
    }

    #[test]
    fn test_unrepresentable_cooldown_fails_before_granting() {
        use std::collections::HashMap;
        use std::sync::Arc;

        use crate::clock::ManualClock;
        use crate::player::PlayerProfile;
        use crate::quest::definition::{ObjectiveSpec, ObjectiveTarget, ObjectiveType, Rewards};

        // Bypasses registry validation, like content restored from an old save
        struct RawCatalog(HashMap<String, Arc<QuestDefinition>>);

        impl QuestCatalog for RawCatalog {
            fn get_quest(&self, _course: &str, quest_id: &str) -> Option<Arc<QuestDefinition>> {
                self.0.get(quest_id).cloned()
            }

            fn all_quest_ids(&self, _course: &str) -> Vec<String> {
                let mut ids: Vec<String> = self.0.keys().cloned().collect();
                ids.sort();
                ids
            }
        }

        let quest = QuestDefinition::new("forever", "npc")
            .with_objective(ObjectiveSpec::new("task", ObjectiveType::Task, ObjectiveTarget::Count(1)))
            .with_cooldown_ms(u64::MAX)
            .with_rewards(Rewards {
                gold: 5,
                ..Default::default()
            });
        let catalog = RawCatalog([("forever".to_string(), Arc::new(quest))].into_iter().collect());
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let mut engine = QuestEngine::new(catalog).with_clock(clock);
        engine.ensure_course("spanish");

        let mut player = PlayerProfile::new(1).with_loot_bonus(1.0);
        engine.accept("spanish", "forever", &player).unwrap();
        engine.start("spanish", "forever").unwrap();
        engine.complete_objective("spanish", "forever", "task").unwrap();
        let before = engine.progression().clone();

        let result = engine.turn_in("spanish", "forever", Performance::default(), &mut player);
        assert!(matches!(result, Err(QuestError::DataIntegrity(_))));
        assert_eq!(engine.progression(), &before);
        assert_eq!(player, PlayerProfile::new(1).with_loot_bonus(1.0));
    }
}
