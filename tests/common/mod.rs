//! Shared test utilities

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use sous::db::{self, SavedRecipeRepo};
use sous::session::{CookingSessionController, EngineFactory, SessionEvent};
use sous::voice::{
    CommandKeywords, EngineEvent, RecognitionEngine, SpeakCancel, Speaker, SpeechOutputChannel,
    StepNarrator, VoiceCommandInterpreter,
};
use sous::{DbPool, Error, Recipe, RecipeStep, RecipeService, Result, SubstituteResult};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Speaker that records spoken lines instead of playing audio
pub struct RecordingSpeaker {
    pub spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn say(&self, text: &str, _cancel: &SpeakCancel) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Backend stub returning fixed data
#[derive(Default)]
pub struct StaticBackend {
    pub recipes: Vec<Recipe>,
    pub steps: Vec<RecipeStep>,
    pub substitutes: Option<SubstituteResult>,
}

#[async_trait]
impl RecipeService for StaticBackend {
    async fn suggest_recipes(&self, ingredients: &[String]) -> Vec<Recipe> {
        if ingredients.is_empty() {
            return Vec::new();
        }
        self.recipes.clone()
    }

    async fn recipe_steps(
        &self,
        _recipe_id: &str,
        _recipe_title: Option<&str>,
        _servings: u32,
    ) -> Vec<RecipeStep> {
        self.steps.clone()
    }

    async fn substitutes(
        &self,
        _ingredient: &str,
        _recipe_context: Option<&str>,
    ) -> Option<SubstituteResult> {
        self.substitutes.clone()
    }
}

/// Recognition engine that replays a fixed transcript script, then idles
pub struct ScriptedEngine {
    events: Vec<EngineEvent>,
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn next_utterance(&mut self) -> Result<EngineEvent> {
        if self.events.is_empty() {
            std::future::pending::<()>().await;
            unreachable!()
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.events.remove(0))
    }
}

/// Engine factory replaying `transcripts` once, idling afterwards
#[must_use]
pub fn scripted_factory(transcripts: Vec<&str>) -> EngineFactory {
    let script: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(
        transcripts.into_iter().map(ToString::to_string).collect(),
    ));
    Box::new(move || {
        let events = std::mem::take(&mut *script.lock().unwrap())
            .into_iter()
            .map(EngineEvent::Transcript)
            .collect();
        Ok(Box::new(ScriptedEngine { events }) as Box<dyn RecognitionEngine>)
    })
}

/// Engine factory that never yields an utterance
#[must_use]
pub fn silent_factory() -> EngineFactory {
    Box::new(|| {
        Ok(Box::new(ScriptedEngine { events: Vec::new() }) as Box<dyn RecognitionEngine>)
    })
}

/// Engine factory reporting no recognition capability
#[must_use]
pub fn unavailable_factory() -> EngineFactory {
    Box::new(|| {
        Err(Error::CapabilityUnavailable(
            "no recognition support".to_string(),
        ))
    })
}

/// Build a numbered step list
#[must_use]
pub fn make_steps(instructions: &[&str]) -> Vec<RecipeStep> {
    instructions
        .iter()
        .enumerate()
        .map(|(i, instruction)| RecipeStep {
            step_number: u32::try_from(i).unwrap() + 1,
            instruction: (*instruction).to_string(),
            tip: None,
        })
        .collect()
}

/// A fully wired controller over fakes
pub struct TestSession {
    pub controller: CookingSessionController,
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub events_rx: mpsc::Receiver<SessionEvent>,
    pub db: DbPool,
}

/// Build a controller over recording/static fakes
#[must_use]
pub fn build_session(
    steps: Vec<RecipeStep>,
    factory: EngineFactory,
    backend: StaticBackend,
) -> TestSession {
    let spoken = Arc::new(Mutex::new(Vec::new()));
    let output = SpeechOutputChannel::new(Arc::new(RecordingSpeaker {
        spoken: Arc::clone(&spoken),
    }));
    let narrator = StepNarrator::new(
        output,
        "다음 단계로 넘어갈까요?".to_string(),
        Duration::from_millis(5),
    );
    let interpreter = VoiceCommandInterpreter::new(CommandKeywords::default())
        .expect("default keywords compile");
    let (events_tx, events_rx) = mpsc::channel(32);
    let db = setup_test_db();

    let controller = CookingSessionController::new(
        "kimchi-jjigae".to_string(),
        "김치찌개".to_string(),
        steps,
        2,
        narrator,
        interpreter,
        Arc::new(backend),
        SavedRecipeRepo::new(db.clone()),
        factory,
        events_tx,
    )
    .expect("non-empty step list");

    TestSession {
        controller,
        spoken,
        events_rx,
        db,
    }
}
