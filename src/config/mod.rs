//! Configuration management for sous
//!
//! Layered: built-in defaults, then the TOML config file, then environment
//! variables (`GROQ_API_KEY`, `OPENAI_API_KEY`, `SOUS_DISABLE_VOICE`).

pub mod file;

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::voice::CommandKeywords;
use crate::{Error, Result};

use file::SousConfigFile;

/// Default chat completions model
const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Default OpenAI-compatible API base URL
const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// sous configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database, cache)
    pub data_dir: PathBuf,

    /// Recipe backend configuration
    pub backend: BackendConfig,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Voice command keyword sets
    pub keywords: CommandKeywords,

    /// Default serving count for step generation
    pub default_servings: u32,
}

/// Recipe backend (LLM) configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Groq API key (chat completions and Whisper STT)
    pub groq_api_key: Option<String>,

    /// Chat completions model
    pub model: String,

    /// OpenAI-compatible API base URL
    pub base_url: String,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable voice input/output
    pub enabled: bool,

    /// STT model (e.g. "whisper-large-v3")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Recognition/synthesis language code
    pub language: String,

    /// Delay before the "move to next step?" prompt, in milliseconds
    pub prompt_delay_ms: u64,

    /// `OpenAI` API key (TTS)
    pub openai_api_key: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_model: "whisper-large-v3".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            language: "ko".to_string(),
            prompt_delay_ms: 1000,
            openai_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed, or the
    /// data directory cannot be created
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration, optionally forcing voice off (headless hosts)
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed, or the
    /// data directory cannot be created
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        let dirs = ProjectDirs::from("dev", "sous", "sous")
            .ok_or_else(|| Error::Config("could not determine home directory".to_string()))?;

        let file = load_config_file(&dirs)?;

        let data_dir = dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let backend = BackendConfig {
            groq_api_key: std::env::var("GROQ_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .or(file.api_keys.groq),
            model: file.backend.model.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            base_url: file.backend.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };

        let defaults = VoiceConfig::default();
        let env_disable = std::env::var("SOUS_DISABLE_VOICE").is_ok_and(|v| v != "0");
        let voice = VoiceConfig {
            enabled: !disable_voice
                && !env_disable
                && file.voice.enabled.unwrap_or(defaults.enabled),
            stt_model: file.voice.stt_model.unwrap_or(defaults.stt_model),
            tts_model: file.voice.tts_model.unwrap_or(defaults.tts_model),
            tts_voice: file.voice.tts_voice.unwrap_or(defaults.tts_voice),
            tts_speed: file.voice.tts_speed.unwrap_or(defaults.tts_speed),
            language: file.voice.language.unwrap_or(defaults.language),
            prompt_delay_ms: file.voice.prompt_delay_ms.unwrap_or(defaults.prompt_delay_ms),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .or(file.api_keys.openai),
        };

        let mut keywords = CommandKeywords::default();
        let kw = file.keywords;
        if let Some(v) = kw.previous {
            keywords.previous = v;
        }
        if let Some(v) = kw.next {
            keywords.next = v;
        }
        if let Some(v) = kw.repeat {
            keywords.repeat = v;
        }
        if let Some(v) = kw.timer {
            keywords.timer = v;
        }
        if let Some(v) = kw.home {
            keywords.home = v;
        }
        if let Some(v) = kw.save {
            keywords.save = v;
        }
        if let Some(v) = kw.minutes_pattern {
            keywords.minutes_pattern = v;
        }

        Ok(Self {
            data_dir,
            backend,
            voice,
            keywords,
            default_servings: file.session.servings.unwrap_or(2).max(1),
        })
    }

    /// Path to the config file, if a home directory can be resolved
    #[must_use]
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "sous", "sous").map(|d| d.config_dir().join("config.toml"))
    }
}

/// Read and parse the TOML config file; absent file means all-defaults
fn load_config_file(dirs: &ProjectDirs) -> Result<SousConfigFile> {
    let path = dirs.config_dir().join("config.toml");
    if !path.exists() {
        return Ok(SousConfigFile::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let file = toml::from_str(&contents)?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(file)
}
