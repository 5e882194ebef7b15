//! Player and economy collaborators.
//!
//! The engine never owns player state. Availability checks read it through a
//! shared reference; only turn-in receives it mutably.

use std::collections::BTreeMap;

use tracing::debug;

/// The host game's player/economy store
pub trait PlayerStore {
    fn level(&self) -> u32;

    /// Where the player is right now. Read live on every availability check
    fn current_location(&self) -> Option<&str>;

    /// Probability in `[0, 1]` that a turn-in earns extra gold
    fn loot_bonus_chance(&self) -> f64 {
        0.0
    }

    /// Grants experience. Level-up rules live behind this call
    fn award_experience(&mut self, amount: u64, reason: &str);

    fn award_currency(&mut self, amount: u64);

    fn add_items(&mut self, items: &[String]);

    fn add_equipment(&mut self, equipment: &[String]);

    fn grant_title(&mut self, _title: &str) {}
}

/// Optional integrations granted at turn-in.
///
/// Every method is an idempotent grant; the default bodies do nothing so a
/// host only overrides the systems it actually has.
pub trait UnlockHooks: Send {
    fn unlock_spellbook_pages(&mut self, _pages: &[String]) {}

    fn unlock_artifact(&mut self, _artifact_id: &str) {}

    fn add_reputation(&mut self, _faction_id: &str, _amount: i64) {}
}

/// Hooks for a host without spellbook, artifact or reputation systems
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl UnlockHooks for NoopHooks {}

/// In-memory player used by tests and simple hosts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerProfile {
    pub level: u32,
    pub location: Option<String>,
    pub experience: u64,
    pub gold: u64,
    pub inventory: BTreeMap<String, u32>,
    pub equipment: Vec<String>,
    pub titles: Vec<String>,
    pub loot_bonus_chance: f64,
}

impl PlayerProfile {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn at(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_loot_bonus(mut self, chance: f64) -> Self {
        self.loot_bonus_chance = chance;
        self
    }

    pub fn item_count(&self, item_id: &str) -> u32 {
        self.inventory.get(item_id).copied().unwrap_or(0)
    }
}

impl PlayerStore for PlayerProfile {
    fn level(&self) -> u32 {
        self.level
    }

    fn current_location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    fn loot_bonus_chance(&self) -> f64 {
        self.loot_bonus_chance
    }

    fn award_experience(&mut self, amount: u64, reason: &str) {
        self.experience += amount;
        debug!("Awarded {} xp ({})", amount, reason);
    }

    fn award_currency(&mut self, amount: u64) {
        self.gold += amount;
    }

    fn add_items(&mut self, items: &[String]) {
        for item in items {
            *self.inventory.entry(item.clone()).or_insert(0) += 1;
        }
    }

    fn add_equipment(&mut self, equipment: &[String]) {
        self.equipment.extend(equipment.iter().cloned());
    }

    fn grant_title(&mut self, title: &str) {
        if !self.titles.iter().any(|t| t == title) {
            self.titles.push(title.to_string());
        }
    }
}
