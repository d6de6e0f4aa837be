//! Saved recipe repository

use chrono::Utc;

use super::{DbPool, KvStore};
use crate::Result;
use crate::types::{RecipeStep, SavedRecipe};

/// Storage key for the saved recipe list
const SAVED_RECIPES_KEY: &str = "saved_recipes";

/// Result of a save attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The recipe was added to the saved list
    Saved,
    /// The recipe was already saved; nothing changed
    AlreadySaved,
}

/// Repository for saved recipes
#[derive(Clone)]
pub struct SavedRecipeRepo {
    store: KvStore,
}

impl SavedRecipeRepo {
    /// Create a new saved recipe repository
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self {
            store: KvStore::new(pool),
        }
    }

    /// Save a recipe with its steps. Saving an already-saved recipe is a
    /// no-op reported as [`SaveOutcome::AlreadySaved`].
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn save(&self, recipe_id: &str, title: &str, steps: &[RecipeStep]) -> Result<SaveOutcome> {
        let mut saved = self.list()?;

        if saved.iter().any(|r| r.id == recipe_id) {
            tracing::debug!(recipe_id = %recipe_id, "recipe already saved");
            return Ok(SaveOutcome::AlreadySaved);
        }

        saved.push(SavedRecipe {
            id: recipe_id.to_string(),
            title: title.to_string(),
            steps: steps.to_vec(),
            date: Utc::now(),
        });
        self.store.set(SAVED_RECIPES_KEY, &saved)?;

        tracing::info!(recipe_id = %recipe_id, title = %title, "recipe saved");
        Ok(SaveOutcome::Saved)
    }

    /// List saved recipes, most recent first
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn list(&self) -> Result<Vec<SavedRecipe>> {
        let mut saved: Vec<SavedRecipe> =
            self.store.get(SAVED_RECIPES_KEY)?.unwrap_or_default();
        saved.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(saved)
    }

    /// Delete a saved recipe by id; returns whether it existed
    ///
    /// # Errors
    ///
    /// Returns error if the database operation fails
    pub fn delete(&self, recipe_id: &str) -> Result<bool> {
        let mut saved = self.list()?;
        let before = saved.len();
        saved.retain(|r| r.id != recipe_id);

        if saved.len() == before {
            return Ok(false);
        }

        self.store.set(SAVED_RECIPES_KEY, &saved)?;
        tracing::info!(recipe_id = %recipe_id, "saved recipe deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn steps() -> Vec<RecipeStep> {
        vec![RecipeStep {
            step_number: 1,
            instruction: "물을 끓이세요".to_string(),
            tip: None,
        }]
    }

    #[test]
    fn save_is_idempotent_per_recipe() {
        let repo = SavedRecipeRepo::new(init_memory().unwrap());

        assert_eq!(repo.save("r1", "라면", &steps()).unwrap(), SaveOutcome::Saved);
        assert_eq!(
            repo.save("r1", "라면", &steps()).unwrap(),
            SaveOutcome::AlreadySaved
        );
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn delete_removes_only_the_named_recipe() {
        let repo = SavedRecipeRepo::new(init_memory().unwrap());
        repo.save("r1", "라면", &steps()).unwrap();
        repo.save("r2", "파스타", &steps()).unwrap();

        assert!(repo.delete("r1").unwrap());
        assert!(!repo.delete("r1").unwrap());

        let remaining = repo.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "r2");
    }
}
