//! Quest Registry
//!
//! The [`QuestCatalog`] trait is how the engine reads content.
//! [`QuestRegistry`] is the in-memory catalog, loaded from TOML files laid
//! out as one subdirectory per course.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::definition::{QuestDefinition, RawQuestFile};
use crate::error::CatalogError;

/// Read-only source of quest definitions, scoped per course
pub trait QuestCatalog {
    fn get_quest(&self, course: &str, quest_id: &str) -> Option<Arc<QuestDefinition>>;

    fn all_quest_ids(&self, course: &str) -> Vec<String>;
}

/// Registry for all quest definitions, keyed by course then quest id
#[derive(Debug, Default)]
pub struct QuestRegistry {
    courses: HashMap<String, HashMap<String, Arc<QuestDefinition>>>,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every course under `data_dir`.
    ///
    /// Each subdirectory is a course; every `*.toml` file below it holds one
    /// quest. Files that fail to parse or validate are skipped with a warning.
    pub fn load_from_directory(&mut self, data_dir: &Path) -> Result<usize, CatalogError> {
        info!("Loading quests from {:?}", data_dir);

        if !data_dir.exists() {
            warn!("Quest directory does not exist: {:?}", data_dir);
            return Ok(0);
        }

        let mut total = 0;
        for entry in read_dir(data_dir)? {
            if entry.is_dir() {
                let Some(course) = entry.file_name().and_then(|n| n.to_str()) else {
                    warn!("Skipping course directory with non UTF-8 name: {:?}", entry);
                    continue;
                };
                let course = course.to_string();
                total += self.load_course_directory(&course, &entry)?;
            }
        }

        info!("Loaded {} quest definitions", total);
        Ok(total)
    }

    /// Load all quest files for a single course
    pub fn load_course_directory(&mut self, course: &str, dir: &Path) -> Result<usize, CatalogError> {
        let mut paths = Vec::new();
        collect_toml_files(dir, &mut paths)?;
        paths.sort();

        let mut count = 0;
        for path in paths {
            match load_quest_file(&path) {
                Ok(quest) => {
                    self.insert_arc(course, quest);
                    count += 1;
                }
                Err(e) => warn!("Failed to load quest {:?}: {}", path, e),
            }
        }

        for problem in self.validate_references(course) {
            warn!("{}", problem);
        }

        Ok(count)
    }

    /// Add a programmatically built definition
    pub fn insert(&mut self, course: &str, quest: QuestDefinition) -> Result<(), CatalogError> {
        quest.validate()?;
        self.insert_arc(course, Arc::new(quest));
        Ok(())
    }

    fn insert_arc(&mut self, course: &str, quest: Arc<QuestDefinition>) {
        let quests = self.courses.entry(course.to_string()).or_default();
        if quests.contains_key(&quest.id) {
            warn!("Duplicate quest ID '{}' in course '{}', overwriting", quest.id, course);
        }
        quests.insert(quest.id.clone(), quest);
    }

    /// Report prerequisites and unlocks that point at unknown quests
    pub fn validate_references(&self, course: &str) -> Vec<String> {
        let Some(quests) = self.courses.get(course) else {
            return Vec::new();
        };

        let mut problems = Vec::new();
        for quest in quests.values() {
            for prereq in &quest.prerequisites {
                if !quests.contains_key(prereq) {
                    problems.push(format!(
                        "Quest '{}' references non-existent prerequisite '{}'",
                        quest.id, prereq
                    ));
                }
            }
            for unlocked in &quest.rewards.unlocks.quests {
                if !quests.contains_key(unlocked) {
                    problems.push(format!(
                        "Quest '{}' unlocks non-existent quest '{}'",
                        quest.id, unlocked
                    ));
                }
            }
        }
        problems.sort();
        problems
    }

    /// Quests offered by a specific NPC
    pub fn quests_for_giver(&self, course: &str, giver: &str) -> Vec<Arc<QuestDefinition>> {
        let mut quests: Vec<_> = self
            .courses
            .get(course)
            .into_iter()
            .flat_map(|q| q.values())
            .filter(|q| q.giver == giver)
            .cloned()
            .collect();
        quests.sort_by(|a, b| a.id.cmp(&b.id));
        quests
    }

    pub fn courses(&self) -> impl Iterator<Item = &String> {
        self.courses.keys()
    }

    /// Number of quests loaded for a course
    pub fn count(&self, course: &str) -> usize {
        self.courses.get(course).map_or(0, HashMap::len)
    }
}

impl QuestCatalog for QuestRegistry {
    fn get_quest(&self, course: &str, quest_id: &str) -> Option<Arc<QuestDefinition>> {
        self.courses.get(course)?.get(quest_id).cloned()
    }

    /// Ids sorted so listings are stable
    fn all_quest_ids(&self, course: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .courses
            .get(course)
            .map(|q| q.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}

fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    for path in read_dir(dir)? {
        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    Ok(())
}

fn load_quest_file(path: &Path) -> Result<Arc<QuestDefinition>, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawQuestFile = toml::from_str(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let quest = QuestDefinition::from_raw(&raw.quest)?;
    info!("Loaded quest: {} ({})", quest.name, quest.id);
    Ok(Arc::new(quest))
}
