//! TOML configuration file loading
//!
//! Supports `~/.config/sous/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SousConfigFile {
    /// LLM backend configuration
    #[serde(default)]
    pub backend: BackendFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Voice command keyword overrides
    #[serde(default)]
    pub keywords: KeywordsFileConfig,

    /// Cooking session defaults
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// LLM backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct BackendFileConfig {
    /// Chat completions model (e.g. "llama-3.3-70b-versatile")
    pub model: Option<String>,

    /// Base URL override for the OpenAI-compatible API
    pub base_url: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// STT model (e.g. "whisper-large-v3")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,

    /// Recognition/synthesis language (e.g. "ko")
    pub language: Option<String>,

    /// Delay before the "move to next step?" prompt, in milliseconds
    pub prompt_delay_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    /// Groq API key (chat completions and Whisper STT)
    pub groq: Option<String>,

    /// `OpenAI` API key (TTS)
    pub openai: Option<String>,
}

/// Voice command keyword overrides.
///
/// Keyword sets are configuration, not hardcoded logic: deployments in a
/// different language replace these lists without touching the interpreter.
#[derive(Debug, Default, Deserialize)]
pub struct KeywordsFileConfig {
    pub previous: Option<Vec<String>>,
    pub next: Option<Vec<String>>,
    pub repeat: Option<Vec<String>>,
    pub timer: Option<Vec<String>>,
    pub home: Option<Vec<String>>,
    pub save: Option<Vec<String>>,
    /// Regex with one capture group extracting the number of minutes
    pub minutes_pattern: Option<String>,
}

/// Cooking session defaults
#[derive(Debug, Default, Deserialize)]
pub struct SessionFileConfig {
    /// Default serving count for step generation
    pub servings: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_parses_to_defaults() {
        let file: SousConfigFile = toml::from_str("").unwrap();
        assert!(file.backend.model.is_none());
        assert!(file.voice.enabled.is_none());
        assert!(file.keywords.next.is_none());
    }

    #[test]
    fn partial_overlay_parses() {
        let file: SousConfigFile = toml::from_str(
            r#"
            [voice]
            enabled = false
            tts_voice = "nova"

            [keywords]
            next = ["다음", "넘겨"]
            "#,
        )
        .unwrap();
        assert_eq!(file.voice.enabled, Some(false));
        assert_eq!(file.voice.tts_voice.as_deref(), Some("nova"));
        assert_eq!(
            file.keywords.next.as_deref(),
            Some(&["다음".to_string(), "넘겨".to_string()][..])
        );
    }
}
