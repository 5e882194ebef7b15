//! Error types for quest operations, catalog loading and configuration.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Expected failures of quest engine operations.
///
/// Every variant except [`QuestError::DataIntegrity`] is a recoverable domain
/// condition: the caller branches on it and re-renders its UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestError {
    #[error("quest '{0}' not found in catalog")]
    QuestNotFound(String),

    #[error("quest '{quest_id}' is not available: {reason}")]
    QuestNotAvailable { quest_id: String, reason: LockReason },

    #[error("course '{0}' has not been initialized")]
    CourseNotInitialized(String),

    #[error("quest '{0}' is not active")]
    QuestNotActive(String),

    #[error("quest '{0}' has already been started")]
    QuestAlreadyStarted(String),

    #[error("cannot start '{requested}': quest '{in_progress}' is already in progress")]
    AnotherQuestInProgress {
        requested: String,
        in_progress: String,
    },

    #[error("objective '{objective_id}' not found on quest '{quest_id}'")]
    ObjectiveNotFound {
        quest_id: String,
        objective_id: String,
    },

    #[error("objective '{objective_id}' on quest '{quest_id}' is already completed")]
    ObjectiveAlreadyCompleted {
        quest_id: String,
        objective_id: String,
    },

    #[error("quest '{0}' still has incomplete objectives")]
    NotAllObjectivesComplete(String),

    #[error("quest '{0}' is not ready to turn in")]
    QuestNotReadyToTurnIn(String),

    #[error("quest '{0}' is already ready to turn in")]
    AlreadyReadyToTurnIn(String),

    /// Progression state references content that does not exist
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
}

impl QuestError {
    /// True for the corrupt-data kind the presentation layer should hide
    /// rather than report to the player.
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, QuestError::DataIntegrity(_))
    }
}

/// Why a quest cannot currently be offered
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockReason {
    #[error("already active")]
    AlreadyActive,

    #[error("already completed")]
    AlreadyCompleted,

    #[error("requires level {required}, player is level {current}")]
    LevelTooLow { required: u32, current: u32 },

    #[error("prerequisite '{0}' not completed")]
    MissingPrerequisite(String),

    #[error("only offered at '{required}'")]
    WrongLocation { required: String },

    #[error("on cooldown until {until}")]
    OnCooldown { until: DateTime<Utc> },
}

/// Errors raised while loading quest definitions
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid quest definition '{quest_id}': {reason}")]
    InvalidDefinition { quest_id: String, reason: String },
}

/// Errors raised while loading [`crate::config::EngineConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
