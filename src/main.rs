use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use sous::db::{self, SaveOutcome, SavedRecipeRepo, SavedTimerRepo};
use sous::session::{CookingSessionController, EngineFactory, SessionEvent, SessionSignal};
use sous::timer::format_remaining;
use sous::voice::{
    AudioCapture, AudioPlayback, SpeakCancel, Speaker, SpeechOutputChannel, StepNarrator,
    TextToSpeech, VoiceCommandInterpreter, VoiceSpeaker, mic_engine_factory, rms_energy,
};
use sous::{Config, Error, GroqClient, RecipeService, Result};

/// Spoken after each instruction while voice mode is on
const NEXT_STEP_PROMPT: &str = "다음 단계로 넘어갈까요?";

/// sous - Voice-guided cooking assistant
#[derive(Parser)]
#[command(name = "sous", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (for hosts without audio hardware)
    #[arg(long, env = "SOUS_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Suggest recipes for a set of ingredients
    Suggest {
        /// Ingredients on hand (e.g. 김치 두부 돼지고기)
        ingredients: Vec<String>,
    },
    /// Start a guided cooking session
    Cook {
        /// Recipe identifier (slug from `suggest`, or a free-form name)
        recipe_id: String,

        /// Recipe title, if different from the identifier
        #[arg(short, long)]
        title: Option<String>,

        /// Number of servings
        #[arg(short, long)]
        servings: Option<u32>,
    },
    /// List or delete saved recipes
    Saved {
        /// Delete the saved recipe with this id
        #[arg(long)]
        delete: Option<String>,
    },
    /// List or manage timer presets
    Timers {
        /// Add a preset: label and duration in seconds
        #[arg(long, num_args = 2, value_names = ["LABEL", "SECONDS"])]
        add: Option<Vec<String>>,

        /// Delete the preset with this id
        #[arg(long)]
        delete: Option<String>,

        /// Run a countdown from the preset with this id
        #[arg(long)]
        start: Option<String>,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "안녕하세요! 음성 안내 테스트입니다.")]
        text: String,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,sous=info",
        1 => "info,sous=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Suggest { ingredients } => suggest(cli.disable_voice, ingredients).await,
        Command::Cook {
            recipe_id,
            title,
            servings,
        } => cook(cli.disable_voice, recipe_id, title, servings).await,
        Command::Saved { delete } => cmd_saved(delete),
        Command::Timers { add, delete, start } => cmd_timers(add, delete, start).await,
        Command::TestMic { duration } => test_mic(duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&text).await,
        Command::Setup => sous::setup::run_setup(),
    }
}

/// Suggest recipes for the given ingredients
async fn suggest(disable_voice: bool, ingredients: Vec<String>) -> anyhow::Result<()> {
    if ingredients.is_empty() {
        anyhow::bail!("give at least one ingredient, e.g. `sous suggest 김치 두부`");
    }

    let config = Config::load_with_options(disable_voice)?;
    let backend = GroqClient::new(&config.backend)?;

    println!("Looking for recipes with: {}\n", ingredients.join(", "));
    let recipes = backend.suggest_recipes(&ingredients).await;

    if recipes.is_empty() {
        println!("No suggestions found. Try different ingredients.");
        return Ok(());
    }

    for recipe in &recipes {
        let cook_time = recipe.cook_time.as_deref().unwrap_or("-");
        println!("  {} — {} ({})", recipe.id, recipe.title, cook_time);
        if !recipe.description.is_empty() {
            println!("      {}", recipe.description);
        }
    }
    println!("\nStart cooking with: sous cook <id>");

    Ok(())
}

/// Run an interactive cooking session
#[allow(clippy::future_not_send, clippy::too_many_lines)]
async fn cook(
    disable_voice: bool,
    recipe_id: String,
    title: Option<String>,
    servings: Option<u32>,
) -> anyhow::Result<()> {
    let config = Config::load_with_options(disable_voice)?;
    let backend: Arc<dyn RecipeService> = Arc::new(GroqClient::new(&config.backend)?);
    let pool = db::init(config.data_dir.join("sous.db"))?;

    let title = title.unwrap_or_else(|| recipe_id.clone());
    let servings = servings.unwrap_or(config.default_servings).max(1);

    println!("Preparing steps for {title} ({servings}인분)...");
    let steps = backend.recipe_steps(&recipe_id, Some(&title), servings).await;

    let narrator = StepNarrator::new(
        SpeechOutputChannel::new(build_speaker(&config)?),
        NEXT_STEP_PROMPT.to_string(),
        Duration::from_millis(config.voice.prompt_delay_ms),
    );
    let interpreter = VoiceCommandInterpreter::new(config.keywords.clone())?;
    let engine_factory: EngineFactory = Box::new(mic_engine_factory(&config));
    let (events_tx, mut events_rx) = mpsc::channel(32);

    let mut controller = match CookingSessionController::new(
        recipe_id,
        title,
        steps,
        servings,
        narrator,
        interpreter,
        backend,
        SavedRecipeRepo::new(pool),
        engine_factory,
        events_tx,
    ) {
        Ok(controller) => controller,
        // No steps means the recipe does not exist; show the not-found
        // view instead of failing
        Err(Error::EmptyRecipe(id)) => {
            println!("레시피를 찾을 수 없습니다: {id}");
            println!("`sous suggest <재료>`로 먼저 레시피를 찾아보세요.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    print_help();
    print_step(&controller);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                controller.tick();
            }

            event = events_rx.recv() => {
                match event {
                    Some(SessionEvent::Transcript(text)) => {
                        println!("  (들림: {text})");
                        match controller.handle_transcript(&text)? {
                            SessionSignal::Continue => print_step(&controller),
                            SessionSignal::ExitToHome => break,
                        }
                    }
                    Some(SessionEvent::Substitutes(result)) => {
                        controller.apply_substitutes(result);
                        print_substitutes(&controller);
                    }
                    None => break,
                }
            }

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_keyboard(&mut controller, line.trim())? {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    // Teardown is unconditional regardless of which exit path was taken
    controller.teardown();
    println!("세션을 종료합니다.");
    Ok(())
}

/// Handle a keyboard command line; returns false when the session should end
fn handle_keyboard(controller: &mut CookingSessionController, line: &str) -> Result<bool> {
    let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));

    match cmd {
        "n" | "next" => controller.advance(),
        "p" | "prev" => controller.retreat(),
        "r" | "repeat" => {
            print_step(controller);
            return Ok(true);
        }
        "v" | "voice" => match controller.toggle_voice_mode() {
            Ok(()) => {
                let state = if controller.session().voice_mode { "켜짐" } else { "꺼짐" };
                println!("음성 모드: {state}");
            }
            Err(e) => println!("음성 모드를 켤 수 없습니다: {e}"),
        },
        "t" | "timer" => match arg.parse::<u32>() {
            Ok(minutes) if minutes > 0 => controller.start_timer(minutes),
            _ => println!("사용법: t <분>"),
        },
        "s" | "save" => match controller.save_session()? {
            SaveOutcome::Saved => println!("레시피가 저장되었습니다"),
            SaveOutcome::AlreadySaved => println!("이미 저장된 레시피입니다"),
        },
        "sub" => {
            if arg.is_empty() {
                println!("사용법: sub <재료>");
            } else {
                controller.request_substitutes(arg.to_string());
                println!("대체 재료를 찾는 중...");
            }
            return Ok(true);
        }
        "x" | "dismiss" => controller.dismiss_substitutes(),
        "q" | "quit" => return Ok(false),
        "h" | "help" => {
            print_help();
            return Ok(true);
        }
        "" => return Ok(true),
        other => {
            println!("모르는 명령입니다: {other} (h = 도움말)");
            return Ok(true);
        }
    }

    print_step(controller);
    Ok(true)
}

/// Print the current step (or the completed view)
fn print_step(controller: &CookingSessionController) {
    let session = controller.session();

    if session.completed {
        println!("\n★ 요리 완성! \"홈\"(q) 또는 \"저장\"(s)을 사용할 수 있습니다.");
        return;
    }

    let step = controller.current_step();
    println!(
        "\n[{} / {}] {}",
        session.current_step + 1,
        session.steps.len(),
        step.instruction
    );
    if let Some(tip) = &step.tip {
        println!("  팁: {tip}");
    }
    if controller.timer_remaining() > 0 {
        println!("  타이머: {}", format_remaining(controller.timer_remaining()));
    }
}

/// Print the current substitute result
fn print_substitutes(controller: &CookingSessionController) {
    match controller.substitutes() {
        Some(result) => {
            println!("\n{} 대체 재료:", result.ingredient);
            for substitute in &result.substitutes {
                println!("  - {substitute}");
            }
            if !result.advice.is_empty() {
                println!("  {}", result.advice);
            }
        }
        None => println!("대체 재료를 찾지 못했습니다."),
    }
}

fn print_help() {
    println!("명령: n 다음 | p 이전 | r 다시 | v 음성 | t <분> 타이머 | s 저장 | sub <재료> | q 종료");
}

/// Build the speech output backend: real TTS when configured, console echo
/// otherwise so spoken prompts are still visible
fn build_speaker(config: &Config) -> Result<Arc<dyn Speaker>> {
    if config.voice.enabled {
        if let Some(api_key) = config.voice.openai_api_key.clone() {
            match AudioPlayback::new() {
                Ok(playback) => {
                    let tts = TextToSpeech::new(
                        api_key,
                        config.voice.tts_voice.clone(),
                        config.voice.tts_speed,
                        config.voice.tts_model.clone(),
                    )?;
                    return Ok(Arc::new(VoiceSpeaker::new(tts, playback)));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "no audio output, falling back to console");
                }
            }
        } else {
            tracing::warn!("no OpenAI API key, spoken output falls back to console");
        }
    }

    Ok(Arc::new(ConsoleSpeaker))
}

/// Fallback speaker that prints instead of playing audio
struct ConsoleSpeaker;

#[async_trait]
impl Speaker for ConsoleSpeaker {
    async fn say(&self, text: &str, _cancel: &SpeakCancel) -> Result<()> {
        println!("  » {text}");
        Ok(())
    }
}

/// List or delete saved recipes
fn cmd_saved(delete: Option<String>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = db::init(config.data_dir.join("sous.db"))?;
    let repo = SavedRecipeRepo::new(pool);

    if let Some(id) = delete {
        if repo.delete(&id)? {
            println!("Deleted saved recipe {id}");
        } else {
            println!("No saved recipe with id {id}");
        }
        return Ok(());
    }

    let saved = repo.list()?;
    if saved.is_empty() {
        println!("No saved recipes yet. Save one from a cooking session.");
        return Ok(());
    }

    for recipe in saved {
        println!(
            "  {} — {} ({} steps, saved {})",
            recipe.id,
            recipe.title,
            recipe.steps.len(),
            recipe.date.format("%Y-%m-%d")
        );
    }

    Ok(())
}

/// List or manage timer presets
#[allow(clippy::future_not_send)]
async fn cmd_timers(
    add: Option<Vec<String>>,
    delete: Option<String>,
    start: Option<String>,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pool = db::init(config.data_dir.join("sous.db"))?;
    let repo = SavedTimerRepo::new(pool);

    if let Some(id) = start {
        let preset = repo
            .list()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("no preset with id {id}"))?;
        return run_countdown(&preset.label, preset.seconds).await;
    }

    if let Some(args) = add {
        let label = &args[0];
        let seconds: u32 = args[1]
            .parse()
            .map_err(|_| anyhow::anyhow!("seconds must be a positive integer"))?;
        let timer = repo.add(label, seconds)?;
        println!("Added preset {} ({})", timer.label, format_remaining(timer.seconds));
        return Ok(());
    }

    if let Some(id) = delete {
        if repo.delete(&id)? {
            println!("Deleted preset {id}");
        } else {
            println!("No preset with id {id}");
        }
        return Ok(());
    }

    for timer in repo.list()? {
        println!(
            "  {} — {} ({})",
            timer.id,
            timer.label,
            format_remaining(timer.seconds)
        );
    }

    Ok(())
}

/// Run a standalone countdown in the terminal
async fn run_countdown(label: &str, seconds: u32) -> anyhow::Result<()> {
    use sous::timer::{CookingTimer, TimerTick};

    println!("{label}: {}", format_remaining(seconds));

    let mut timer = CookingTimer::new();
    timer.start_seconds(seconds);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await; // completes immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => match timer.tick() {
                TimerTick::Running(remaining) => {
                    println!("{label}: {}", format_remaining(remaining));
                }
                TimerTick::Finished => {
                    println!("\n{label}: 타이머가 끝났습니다!\x07");
                    return Ok(());
                }
                TimerTick::Inactive => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n타이머를 취소했습니다.");
                return Ok(());
            }
        }
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Listening for {duration} seconds. Speak into the microphone.\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;
    println!("Sample rate: {} Hz", capture.sample_rate());

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = rms_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
        capture.clear_buffer();
    }

    capture.stop();
    println!("\nA flat meter means no signal reached the input device.");
    println!("음성 명령을 쓰려면 마이크 연결과 입력 권한을 확인하세요.");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Playing a 440 Hz tone for 2 seconds...\n");

    let mut playback = AudioPlayback::new()?;

    let sample_rate = 24000_f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_samples = (sample_rate * 2.0) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    playback.play(samples, &SpeakCancel::never()).await?;
    println!("No tone means the output device is missing or muted.");

    Ok(())
}

/// Test TTS output
async fn test_tts(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let api_key = config
        .voice
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY required for TTS"))?;

    let tts = TextToSpeech::new(
        api_key,
        config.voice.tts_voice.clone(),
        config.voice.tts_speed,
        config.voice.tts_model.clone(),
    )?;

    println!("Synthesizing: \"{text}\"");
    let mp3_data = tts.synthesize(text).await?;
    println!("Playing {} bytes of audio...", mp3_data.len());

    let mut playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data, &SpeakCancel::never()).await?;

    Ok(())
}
