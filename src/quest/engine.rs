//! Quest Engine
//!
//! Owns the progression store and the injected collaborators. Operations
//! are spread over the availability, lifecycle, rewards and interaction
//! modules as separate `impl` blocks.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use super::definition::QuestDefinition;
use super::registry::QuestCatalog;
use super::state::{CourseProgress, ProgressionStore};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::QuestError;
use crate::player::{NoopHooks, UnlockHooks};

/// Single-player quest engine.
///
/// Every operation runs to completion synchronously. A multi-threaded host
/// should put the whole engine behind one lock.
pub struct QuestEngine<C: QuestCatalog> {
    pub(crate) catalog: C,
    pub(crate) progression: ProgressionStore,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) hooks: Box<dyn UnlockHooks>,
    pub(crate) config: EngineConfig,
    pub(crate) rng: StdRng,
}

impl<C: QuestCatalog> QuestEngine<C> {
    pub fn new(catalog: C) -> Self {
        let config = EngineConfig::default();
        Self {
            catalog,
            progression: ProgressionStore::new(),
            clock: Box::new(SystemClock),
            hooks: Box::new(NoopHooks),
            rng: seeded_rng(&config),
            config,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_hooks(mut self, hooks: impl UnlockHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    /// Replace the config; reseeds the loot RNG
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.rng = seeded_rng(&config);
        self.config = config;
        self
    }

    /// Resume from progression restored by the host's save system
    pub fn with_progression(mut self, progression: ProgressionStore) -> Self {
        self.progression = progression;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn progression(&self) -> &ProgressionStore {
        &self.progression
    }

    pub fn into_progression(self) -> ProgressionStore {
        self.progression
    }

    /// Create the course's progression on first use
    pub fn ensure_course(&mut self, course: &str) {
        if !self.progression.has_course(course) {
            tracing::info!("Initializing quest progression for course '{}'", course);
        }
        self.progression.ensure_course(course);
    }

    pub fn course(&self, course: &str) -> Result<&CourseProgress, QuestError> {
        self.progression.course(course)
    }

    pub(crate) fn definition(
        &self,
        course: &str,
        quest_id: &str,
    ) -> Result<Arc<QuestDefinition>, QuestError> {
        self.catalog
            .get_quest(course, quest_id)
            .ok_or_else(|| QuestError::QuestNotFound(quest_id.to_string()))
    }

    /// Definition for a quest the progression already references
    pub(crate) fn tracked_definition(
        &self,
        course: &str,
        quest_id: &str,
    ) -> Result<Arc<QuestDefinition>, QuestError> {
        self.catalog.get_quest(course, quest_id).ok_or_else(|| {
            QuestError::DataIntegrity(format!(
                "course '{}' tracks quest '{}' which is missing from the catalog",
                course, quest_id
            ))
        })
    }

    /// Check that every active quest still exists in the catalog
    pub fn verify_integrity(&self, course: &str) -> Result<(), QuestError> {
        for record in &self.progression.course(course)?.active {
            self.tracked_definition(course, &record.quest_id)?;
        }
        Ok(())
    }
}

fn seeded_rng(config: &EngineConfig) -> StdRng {
    match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
