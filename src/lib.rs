//! Quest progression engine for course-based language-learning games.
//!
//! The engine owns per-course quest progression. Quest content comes from a
//! [`QuestCatalog`]; the player's level, location and wallet live in the
//! host's [`PlayerStore`], which only turn-in is allowed to mutate.

pub mod clock;
pub mod config;
pub mod error;
pub mod player;
pub mod quest;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use error::{CatalogError, ConfigError, LockReason, QuestError};
pub use player::{NoopHooks, PlayerProfile, PlayerStore, UnlockHooks};
pub use quest::*;
