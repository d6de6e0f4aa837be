//! sous - Voice-guided cooking assistant
//!
//! This library provides the core functionality for sous:
//! - Recipe suggestion and step generation via an LLM backend
//! - A voice-driven cooking session state machine
//! - Voice processing (microphone capture, STT, TTS)
//! - Saved recipe and timer persistence
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      CLI                             │
//! │   suggest  │  cook  │  saved  │  timers  │  setup   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │           CookingSessionController                   │
//! │   Steps  │  Voice Mode  │  Timer  │  Substitutes    │
//! └──────┬──────────────┬──────────────────┬────────────┘
//!        │              │                  │
//! ┌──────▼──────┐ ┌─────▼──────┐ ┌─────────▼───────────┐
//! │    Voice    │ │   Backend  │ │     Persistence     │
//! │  STT / TTS  │ │ Groq (LLM) │ │  SQLite (kv_store)  │
//! └─────────────┘ └────────────┘ └─────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod session;
pub mod setup;
pub mod timer;
pub mod types;
pub mod voice;

pub use backend::{GroqClient, RecipeService};
pub use config::Config;
pub use db::{DbConn, DbPool, SaveOutcome, SavedRecipeRepo, SavedTimerRepo};
pub use error::{Error, Result};
pub use session::{
    CookingSession, CookingSessionController, EngineFactory, SessionEvent, SessionSignal,
};
pub use timer::{CookingTimer, TimerTick};
pub use types::{Recipe, RecipeStep, SavedRecipe, SavedTimer, SubstituteResult};
pub use voice::{
    CommandKeywords, SpeechInputChannel, SpeechOutputChannel, StepNarrator, VoiceCommand,
    VoiceCommandInterpreter,
};
