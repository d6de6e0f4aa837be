//! Core data types shared between the backend, session, and persistence layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A suggested recipe returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Concise slug identifier
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ingredient names
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Human-readable cook time (e.g. "15분")
    #[serde(default, rename = "cookTime")]
    pub cook_time: Option<String>,
}

/// A single cooking step. Immutable once loaded for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeStep {
    /// 1-based step number
    #[serde(alias = "step", rename = "stepNumber")]
    pub step_number: u32,
    pub instruction: String,
    #[serde(default)]
    pub tip: Option<String>,
}

/// Substitute-ingredient suggestions. Transient: replaced wholesale on each
/// lookup, cleared on dismissal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteResult {
    pub ingredient: String,
    #[serde(default)]
    pub substitutes: Vec<String>,
    #[serde(default)]
    pub advice: String,
}

/// A recipe snapshot saved by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedRecipe {
    pub id: String,
    pub title: String,
    pub steps: Vec<RecipeStep>,
    pub date: DateTime<Utc>,
}

/// A reusable named timer preset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedTimer {
    pub id: String,
    pub label: String,
    pub seconds: u32,
}
