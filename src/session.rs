//! Cooking session controller
//!
//! Owns all mutable session state: step position, voice mode, the timer,
//! the transient substitute result, and completion. The voice channels,
//! timer, and interpreter are self-contained utilities the controller
//! drives; recipe and substitute data flow in from the [`RecipeService`].
//!
//! Mutations run synchronously on the session loop. Asynchronous work
//! (speech, recognition, substitute lookups) reports back through
//! [`SessionEvent`] messages, and liveness flags on the channels make
//! stale callbacks no-ops rather than errors.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::RecipeService;
use crate::db::{SaveOutcome, SavedRecipeRepo};
use crate::timer::{CookingTimer, TimerTick};
use crate::types::{RecipeStep, SubstituteResult};
use crate::voice::{
    RecognitionEngine, SpeechInputChannel, StepNarrator, VoiceCommand, VoiceCommandInterpreter,
};
use crate::{Error, Result};

/// Spoken when the session completes
const COMPLETION_MESSAGE: &str = "요리가 완성되었습니다. 수고하셨어요!";

/// Spoken when the timer reaches zero
const TIMER_DONE_MESSAGE: &str = "타이머가 끝났습니다!";

/// Asynchronous input to the session loop
#[derive(Debug)]
pub enum SessionEvent {
    /// A finalized voice transcript
    Transcript(String),
    /// A resolved substitute lookup; `None` means the lookup failed and the
    /// prior result should be kept
    Substitutes(Option<SubstituteResult>),
}

/// What the caller should do after handling a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Keep the session running
    Continue,
    /// Tear down and return to the home view
    ExitToHome,
}

/// Factory producing recognition engines on voice-mode activation
pub type EngineFactory = Box<dyn Fn() -> Result<Box<dyn RecognitionEngine>> + Send>;

/// Mutable session state, owned exclusively by the controller
#[derive(Debug)]
pub struct CookingSession {
    pub recipe_id: String,
    pub title: String,
    pub steps: Vec<RecipeStep>,
    pub current_step: usize,
    pub voice_mode: bool,
    pub completed: bool,
    pub servings: u32,
}

/// Orchestrates a voice-guided cooking session
pub struct CookingSessionController {
    session: CookingSession,
    narrator: StepNarrator,
    interpreter: VoiceCommandInterpreter,
    timer: CookingTimer,
    backend: Arc<dyn RecipeService>,
    saved: SavedRecipeRepo,
    engine_factory: EngineFactory,
    input: Option<SpeechInputChannel>,
    events_tx: mpsc::Sender<SessionEvent>,
    substitutes: Option<SubstituteResult>,
    substitutes_loading: bool,
}

impl CookingSessionController {
    /// Create a controller over a resolved step list
    ///
    /// # Errors
    ///
    /// Returns `EmptyRecipe` if `steps` is empty; no session is started
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recipe_id: String,
        title: String,
        steps: Vec<RecipeStep>,
        servings: u32,
        narrator: StepNarrator,
        interpreter: VoiceCommandInterpreter,
        backend: Arc<dyn RecipeService>,
        saved: SavedRecipeRepo,
        engine_factory: EngineFactory,
        events_tx: mpsc::Sender<SessionEvent>,
    ) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::EmptyRecipe(recipe_id));
        }

        Ok(Self {
            session: CookingSession {
                recipe_id,
                title,
                steps,
                current_step: 0,
                voice_mode: false,
                completed: false,
                servings,
            },
            narrator,
            interpreter,
            timer: CookingTimer::new(),
            backend,
            saved,
            engine_factory,
            input: None,
            events_tx,
            substitutes: None,
            substitutes_loading: false,
        })
    }

    /// Session state, read-only
    #[must_use]
    pub const fn session(&self) -> &CookingSession {
        &self.session
    }

    /// The step currently displayed
    #[must_use]
    pub fn current_step(&self) -> &RecipeStep {
        &self.session.steps[self.session.current_step]
    }

    /// Whether the session is on its final step
    #[must_use]
    pub fn at_last_step(&self) -> bool {
        self.session.current_step + 1 == self.session.steps.len()
    }

    /// Current substitute result, if a lookup has resolved
    #[must_use]
    pub const fn substitutes(&self) -> Option<&SubstituteResult> {
        self.substitutes.as_ref()
    }

    /// Whether a substitute lookup is in flight
    #[must_use]
    pub const fn substitutes_loading(&self) -> bool {
        self.substitutes_loading
    }

    /// Seconds remaining on the session timer (zero when inactive)
    #[must_use]
    pub const fn timer_remaining(&self) -> u32 {
        self.timer.remaining_seconds()
    }

    /// Move to the next step, or complete the session from the last step.
    /// Ignored once completed.
    pub fn advance(&mut self) {
        if self.session.completed {
            return;
        }

        if self.at_last_step() {
            self.complete();
        } else {
            self.session.current_step += 1;
            self.on_step_changed();
        }
    }

    /// Move back one step, or return from the completed view to the last step
    pub fn retreat(&mut self) {
        if self.session.completed {
            self.session.completed = false;
            self.session.current_step = self.session.steps.len() - 1;
            self.resume_listening();
            self.on_step_changed();
            return;
        }

        if self.session.current_step > 0 {
            self.session.current_step -= 1;
            self.on_step_changed();
        }
    }

    /// Jump to a step index, clamped into range. Ignored once completed.
    pub fn jump_to(&mut self, index: usize) {
        if self.session.completed {
            return;
        }

        let clamped = index.min(self.session.steps.len() - 1);
        if clamped != self.session.current_step {
            self.session.current_step = clamped;
            self.on_step_changed();
        }
    }

    /// Toggle voice mode.
    ///
    /// Turning on starts continuous recognition and narrates the current
    /// step. Turning off stops recognition and cancels pending speech.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if recognition cannot be started;
    /// voice mode is left unchanged (off)
    pub fn toggle_voice_mode(&mut self) -> Result<()> {
        if self.session.voice_mode {
            self.session.voice_mode = false;
            self.stop_listening();
            self.narrator.cancel();
            tracing::info!("voice mode off");
            return Ok(());
        }

        self.start_listening()?;
        self.session.voice_mode = true;
        tracing::info!("voice mode on");

        if !self.session.completed {
            self.narrator.announce(self.current_step().instruction.clone());
        }
        Ok(())
    }

    /// Handle a finalized voice transcript
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails during a save command
    pub fn handle_transcript(&mut self, transcript: &str) -> Result<SessionSignal> {
        let on_last_step = self.session.completed || self.at_last_step();
        let command = self.interpreter.interpret(transcript, on_last_step);
        tracing::debug!(?command, transcript, "voice command interpreted");

        match command {
            VoiceCommand::PreviousStep => self.retreat(),
            VoiceCommand::NextStepOrComplete => self.advance(),
            VoiceCommand::RepeatCurrentStep => {
                if !self.session.completed {
                    self.narrator.say_once(self.current_step().instruction.clone());
                }
            }
            VoiceCommand::StartTimer(minutes) => self.start_timer(minutes),
            VoiceCommand::GoHome => return Ok(SessionSignal::ExitToHome),
            VoiceCommand::SaveRecipe => {
                let outcome = self.save_session()?;
                let message = match outcome {
                    SaveOutcome::Saved => "레시피가 저장되었습니다",
                    SaveOutcome::AlreadySaved => "이미 저장된 레시피입니다",
                };
                self.narrator.say_once(message.to_string());
            }
            // Noise: no state change, no error
            VoiceCommand::Unrecognized => {}
        }

        Ok(SessionSignal::Continue)
    }

    /// Start (or restart) the session timer and announce it
    pub fn start_timer(&mut self, minutes: u32) {
        if minutes == 0 {
            return;
        }
        self.timer.start(minutes);
        tracing::info!(minutes, "timer started");
        self.narrator.say_once(format!("{minutes}분 타이머를 시작합니다"));
    }

    /// Stop the session timer without alerting
    pub fn stop_timer(&mut self) {
        self.timer.stop();
    }

    /// Advance the timer by one second; speaks the alert when it fires
    pub fn tick(&mut self) {
        match self.timer.tick() {
            TimerTick::Finished => {
                tracing::info!("timer finished");
                self.narrator.say_once(TIMER_DONE_MESSAGE.to_string());
            }
            TimerTick::Running(remaining) => {
                tracing::trace!(remaining, "timer tick");
            }
            TimerTick::Inactive => {}
        }
    }

    /// Kick off a substitute lookup for an ingredient. The result arrives
    /// later as [`SessionEvent::Substitutes`]; navigation in the meantime
    /// does not cancel it, and the result is applied against whatever step
    /// is current when it resolves.
    pub fn request_substitutes(&mut self, ingredient: String) {
        self.substitutes_loading = true;

        let backend = Arc::clone(&self.backend);
        let title = self.session.title.clone();
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            let result = backend.substitutes(&ingredient, Some(&title)).await;
            if events_tx.send(SessionEvent::Substitutes(result)).await.is_err() {
                tracing::debug!("session gone before substitute lookup resolved");
            }
        });
    }

    /// Apply a resolved substitute lookup. A failed lookup (`None`) leaves
    /// the prior result untouched.
    pub fn apply_substitutes(&mut self, result: Option<SubstituteResult>) {
        self.substitutes_loading = false;
        match result {
            Some(substitutes) => self.substitutes = Some(substitutes),
            None => tracing::warn!("substitute lookup failed, keeping prior result"),
        }
    }

    /// Dismiss the current substitute result
    pub fn dismiss_substitutes(&mut self) {
        self.substitutes = None;
    }

    /// Save the session's recipe snapshot. Idempotent per recipe id.
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails
    pub fn save_session(&self) -> Result<SaveOutcome> {
        self.saved.save(
            &self.session.recipe_id,
            &self.session.title,
            &self.session.steps,
        )
    }

    /// Release the timer, recognition, and pending speech. Safe to call on
    /// every exit path, repeatedly.
    pub fn teardown(&mut self) {
        self.timer.stop();
        self.stop_listening();
        self.narrator.cancel();
        tracing::debug!("session torn down");
    }

    /// Force completion from any step (user pressed "finish")
    pub fn complete(&mut self) {
        if self.session.completed {
            return;
        }
        self.session.completed = true;
        // Recognition pauses on the completed view; voice mode stays set so
        // retreating resumes listening
        self.stop_listening();
        self.narrator.say_once(COMPLETION_MESSAGE.to_string());
        tracing::info!(recipe_id = %self.session.recipe_id, "session completed");
    }

    fn on_step_changed(&mut self) {
        // Manual or voice navigation both abort the running narration
        self.narrator.cancel();
        if self.session.voice_mode {
            self.narrator.announce(self.current_step().instruction.clone());
        }
    }

    fn start_listening(&mut self) -> Result<()> {
        if self.input.is_some() {
            return Ok(());
        }

        let engine = (self.engine_factory)()?;
        let (channel, mut transcripts) = SpeechInputChannel::start(engine);
        self.input = Some(channel);

        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            while let Some(text) = transcripts.recv().await {
                if events_tx.send(SessionEvent::Transcript(text)).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }

    fn stop_listening(&mut self) {
        if let Some(input) = self.input.take() {
            input.stop();
        }
    }

    fn resume_listening(&mut self) {
        if !self.session.voice_mode {
            return;
        }
        if let Err(e) = self.start_listening() {
            tracing::warn!(error = %e, "could not resume recognition, voice mode off");
            self.session.voice_mode = false;
        }
    }
}

impl Drop for CookingSessionController {
    fn drop(&mut self) {
        self.teardown();
    }
}
