//! Saved timer repository
//!
//! Presets for common cooking countdowns. A fresh store is seeded with a
//! few defaults so the timer list is never empty on first run.

use uuid::Uuid;

use super::{DbPool, KvStore};
use crate::Result;
use crate::types::SavedTimer;

/// Storage key for the saved timer list
const SAVED_TIMERS_KEY: &str = "saved_timers";

/// Default presets seeded on first use: (label, seconds)
const DEFAULT_TIMERS: &[(&str, u32)] = &[("라면", 240), ("계란 삶기", 360), ("파스타 면", 480)];

/// Repository for saved timer presets
#[derive(Clone)]
pub struct SavedTimerRepo {
    store: KvStore,
}

impl SavedTimerRepo {
    /// Create a new saved timer repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self {
            store: KvStore::new(pool),
        }
    }

    /// List saved timers, seeding the defaults if none exist yet
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn list(&self) -> Result<Vec<SavedTimer>> {
        if let Some(timers) = self.store.get(SAVED_TIMERS_KEY)? {
            return Ok(timers);
        }

        let defaults: Vec<SavedTimer> = DEFAULT_TIMERS
            .iter()
            .map(|&(label, seconds)| SavedTimer {
                id: Uuid::new_v4().to_string(),
                label: label.to_string(),
                seconds,
            })
            .collect();
        self.store.set(SAVED_TIMERS_KEY, &defaults)?;

        tracing::debug!(count = defaults.len(), "seeded default timers");
        Ok(defaults)
    }

    /// Add a timer preset
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn add(&self, label: &str, seconds: u32) -> Result<SavedTimer> {
        let mut timers = self.list()?;
        let timer = SavedTimer {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            seconds,
        };
        timers.push(timer.clone());
        self.store.set(SAVED_TIMERS_KEY, &timers)?;

        tracing::info!(label = %label, seconds, "timer preset added");
        Ok(timer)
    }

    /// Delete a timer preset by id; returns whether it existed
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut timers = self.list()?;
        let before = timers.len();
        timers.retain(|t| t.id != id);

        if timers.len() == before {
            return Ok(false);
        }

        self.store.set(SAVED_TIMERS_KEY, &timers)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    #[test]
    fn fresh_store_seeds_defaults() {
        let repo = SavedTimerRepo::new(init_memory().unwrap());
        let timers = repo.list().unwrap();

        assert_eq!(timers.len(), 3);
        assert_eq!(timers[0].label, "라면");
        assert_eq!(timers[0].seconds, 240);
        // Seeding happens once; a second list call returns the same set
        assert_eq!(repo.list().unwrap().len(), 3);
    }

    #[test]
    fn add_and_delete_presets() {
        let repo = SavedTimerRepo::new(init_memory().unwrap());
        let added = repo.add("찜", 1200).unwrap();

        assert_eq!(repo.list().unwrap().len(), 4);
        assert!(repo.delete(&added.id).unwrap());
        assert!(!repo.delete(&added.id).unwrap());
        assert_eq!(repo.list().unwrap().len(), 3);
    }

    #[test]
    fn deleting_a_seeded_default_sticks() {
        let repo = SavedTimerRepo::new(init_memory().unwrap());
        let timers = repo.list().unwrap();

        assert!(repo.delete(&timers[0].id).unwrap());
        // The default is not re-seeded once the key exists
        assert_eq!(repo.list().unwrap().len(), 2);
    }
}
