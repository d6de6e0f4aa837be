//! Interactive first-run setup wizard (`sous setup`)

use std::path::Path;

use dialoguer::{Confirm, Input};

use crate::config::Config;
use crate::config::file::SousConfigFile;

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("sous Setup\n");

    let config_path = Config::config_file_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    let existing: SousConfigFile = if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
        toml::from_str(&std::fs::read_to_string(&config_path)?)?
    } else {
        SousConfigFile::default()
    };

    // 1. Groq API key (recipes + Whisper STT)
    let groq_key = prompt_api_key(
        "Groq API key (recipes and speech recognition, GROQ_API_KEY)",
        existing.api_keys.groq.as_deref(),
    )?;

    // 2. Chat model
    let model: String = Input::new()
        .with_prompt("Recipe model")
        .default(
            existing
                .backend
                .model
                .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string()),
        )
        .interact_text()?;

    // 3. Voice output (optional)
    let enable_voice = Confirm::new()
        .with_prompt("Enable voice guidance (STT/TTS)?")
        .default(existing.voice.enabled.unwrap_or(true))
        .interact()?;

    let openai_key = if enable_voice {
        prompt_api_key(
            "OpenAI API key (speech synthesis, OPENAI_API_KEY)",
            existing.api_keys.openai.as_deref(),
        )?
    } else {
        existing.api_keys.openai
    };

    // 4. Language
    let language: String = Input::new()
        .with_prompt("Voice language code")
        .default(existing.voice.language.unwrap_or_else(|| "ko".to_string()))
        .interact_text()?;

    write_config(
        &config_path,
        groq_key.as_deref(),
        openai_key.as_deref(),
        &model,
        enable_voice,
        &language,
    )?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `sous suggest 김치 두부` to get started.");

    Ok(())
}

/// Prompt for an API key, keeping the existing one when left blank
fn prompt_api_key(label: &str, existing: Option<&str>) -> anyhow::Result<Option<String>> {
    let masked = existing.map(|k| {
        if k.len() > 8 {
            format!("{}...{}", &k[..4], &k[k.len() - 4..])
        } else {
            "****".to_string()
        }
    });

    let prompt = masked.map_or_else(
        || label.to_string(),
        |m| format!("{label} (current: {m}, leave blank to keep)"),
    );

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    Ok(if input.is_empty() {
        existing.map(str::to_string)
    } else {
        Some(input)
    })
}

/// Serialize and write the config file
fn write_config(
    path: &Path,
    groq_key: Option<&str>,
    openai_key: Option<&str>,
    model: &str,
    voice_enabled: bool,
    language: &str,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = String::new();

    out.push_str("[backend]\n");
    out.push_str(&format!("model = \"{model}\"\n\n"));

    out.push_str("[voice]\n");
    out.push_str(&format!("enabled = {voice_enabled}\n"));
    out.push_str(&format!("language = \"{language}\"\n\n"));

    if groq_key.is_some() || openai_key.is_some() {
        out.push_str("[api_keys]\n");
        if let Some(key) = groq_key {
            out.push_str(&format!("groq = \"{key}\"\n"));
        }
        if let Some(key) = openai_key {
            out.push_str(&format!("openai = \"{key}\"\n"));
        }
    }

    std::fs::write(path, out)?;
    Ok(())
}
