//! Recipe backend — LLM-powered recipe, step, and substitute suggestions
//!
//! All network failures are absorbed at this boundary and converted to safe
//! defaults (empty list, diagnostic step, or `None`); callers never see raw
//! transport errors. Empty results and backend failures are indistinguishable
//! by contract.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::types::{Recipe, RecipeStep, SubstituteResult};
use crate::{Error, Result};

/// External recipe/substitute service consumed by the session controller
/// and the pre-session search flow
#[async_trait]
pub trait RecipeService: Send + Sync {
    /// Suggest recipes for a set of ingredients.
    /// Empty input yields an empty result without a network call.
    async fn suggest_recipes(&self, ingredients: &[String]) -> Vec<Recipe>;

    /// Resolve the step list for a recipe. On failure, returns a single
    /// synthetic diagnostic step so a cooking view always has something
    /// to render.
    async fn recipe_steps(
        &self,
        recipe_id: &str,
        recipe_title: Option<&str>,
        servings: u32,
    ) -> Vec<RecipeStep>;

    /// Look up substitute suggestions for an ingredient. `None` on failure.
    async fn substitutes(
        &self,
        ingredient: &str,
        recipe_context: Option<&str>,
    ) -> Option<SubstituteResult>;
}

/// Chat completions response (OpenAI-compatible)
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Groq-backed implementation of [`RecipeService`]
pub struct GroqClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GroqClient {
    /// Create a client from backend configuration
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let api_key = config
            .groq_api_key
            .clone()
            .ok_or_else(|| Error::Config("Groq API key required (GROQ_API_KEY)".to_string()))?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        })
    }

    /// Run a chat completion constrained to JSON output and return the
    /// raw message content
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;
        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        tracing::debug!(bytes = content.len(), "chat completion received");
        Ok(content)
    }

    async fn try_suggest(&self, ingredients: &[String]) -> Result<Vec<Recipe>> {
        let content = self
            .complete_json(
                "You are a professional chef. Suggest 3 recipes based on user \
                 ingredients. Return strictly a JSON array.",
                &format!(
                    "Ingredients: {}.\n\
                     Return strictly a JSON array of objects.\n\
                     Each object should have:\n\
                     - id: string (concise slug)\n\
                     - title: string (in Korean)\n\
                     - description: string (in Korean, brief)\n\
                     - ingredients: string[] (in Korean)\n\
                     - cookTime: string (e.g., \"15분\")",
                    ingredients.join(", ")
                ),
            )
            .await?;

        let value: Value = serde_json::from_str(&content)?;
        let items = unwrap_array(value, &["recipes", "suggestions"])
            .ok_or_else(|| Error::Backend("response is not a recipe array".to_string()))?;
        Ok(serde_json::from_value(Value::Array(items))?)
    }

    async fn try_steps(&self, title: &str, servings: u32) -> Result<Vec<RecipeStep>> {
        let content = self
            .complete_json(
                "You are a professional chef. Create detailed cooking steps. \
                 Return strictly a JSON array.",
                &format!(
                    "Recipe: \"{title}\" for {servings} servings.\n\
                     Return strictly a JSON array of objects.\n\
                     Each object should have:\n\
                     - step: number\n\
                     - instruction: string (in Korean, detailed)\n\
                     - tip: string (optional, helpful tip in Korean)"
                ),
            )
            .await?;

        let value: Value = serde_json::from_str(&content)?;
        let items = unwrap_array(value, &["steps", "instructions"])
            .ok_or_else(|| Error::Backend("response is not a step array".to_string()))?;
        Ok(serde_json::from_value(Value::Array(items))?)
    }

    async fn try_substitutes(
        &self,
        ingredient: &str,
        recipe_context: Option<&str>,
    ) -> Result<SubstituteResult> {
        let context = recipe_context.unwrap_or("일반 요리");
        let content = self
            .complete_json(
                "You are a professional chef. Suggest ingredient substitutes. \
                 Return strictly a JSON object.",
                &format!(
                    "Ingredient: \"{ingredient}\" in the recipe \"{context}\".\n\
                     Return strictly a JSON object with:\n\
                     - ingredient: string (in Korean)\n\
                     - substitutes: string[] (in Korean, 2-4 options)\n\
                     - advice: string (in Korean, one sentence)"
                ),
            )
            .await?;

        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl RecipeService for GroqClient {
    async fn suggest_recipes(&self, ingredients: &[String]) -> Vec<Recipe> {
        if ingredients.is_empty() {
            return Vec::new();
        }

        match self.try_suggest(ingredients).await {
            Ok(recipes) => {
                tracing::info!(count = recipes.len(), "recipe suggestions received");
                recipes
            }
            Err(e) => {
                tracing::warn!(error = %e, "recipe suggestion failed");
                Vec::new()
            }
        }
    }

    async fn recipe_steps(
        &self,
        recipe_id: &str,
        recipe_title: Option<&str>,
        servings: u32,
    ) -> Vec<RecipeStep> {
        let title = recipe_title.unwrap_or(recipe_id);

        match self.try_steps(title, servings).await {
            Ok(steps) => {
                tracing::info!(count = steps.len(), title, "recipe steps received");
                steps
            }
            Err(e) => {
                tracing::error!(error = %e, title, "step generation failed");
                vec![diagnostic_step(&e)]
            }
        }
    }

    async fn substitutes(
        &self,
        ingredient: &str,
        recipe_context: Option<&str>,
    ) -> Option<SubstituteResult> {
        match self.try_substitutes(ingredient, recipe_context).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(error = %e, ingredient, "substitute lookup failed");
                None
            }
        }
    }
}

/// Unwrap a JSON value that should be an array but may arrive wrapped in an
/// object (`{"recipes": [...]}`) — a known quirk of JSON-mode completions
fn unwrap_array(value: Value, known_keys: &[&str]) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => {
            for key in known_keys {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Some(items);
                }
            }
            // Fall back to the first array-valued field
            map.into_iter().find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
        }
        _ => None,
    }
}

/// Placeholder step shown when the backend cannot produce real steps
fn diagnostic_step(error: &Error) -> RecipeStep {
    RecipeStep {
        step_number: 1,
        instruction: "레시피 단계를 불러오지 못했습니다. 잠시 후 다시 시도해주세요.".to_string(),
        tip: Some(format!("오류: {error}")),
    }
}
