//! Speech output channel and step narration
//!
//! [`SpeechOutputChannel`] serializes utterances and enforces the
//! at-most-one-outstanding-utterance invariant: every `speak` supersedes
//! whatever is queued or currently playing, and a superseded utterance's
//! completion is silently dropped rather than reported as an error. A
//! [`SpeakCancel`] handle rides along with each utterance so the speaker
//! can stop audio mid-playback the moment it is superseded.
//!
//! [`StepNarrator`] is the two-phase "read the instruction, pause, ask to
//! continue" sequence expressed as an explicit state machine so that
//! cancellation and re-entry on step change stay deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, oneshot};

use crate::Result;
use crate::voice::playback::AudioPlayback;
use crate::voice::tts::TextToSpeech;

/// Cancellation handle that rides along with one utterance. It flips once
/// the utterance is superseded by newer speech or an explicit cancel, and
/// speakers poll it to abandon playback early.
#[derive(Clone)]
pub struct SpeakCancel {
    generation: Arc<AtomicU64>,
    epoch: u64,
}

impl SpeakCancel {
    /// Whether this utterance has been superseded or cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.epoch
    }

    /// Handle that never cancels, for standalone playback outside the
    /// speech channel (hardware diagnostics)
    #[must_use]
    pub fn never() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            epoch: 0,
        }
    }
}

/// Something that can speak a line of text, returning once playback ends
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Synthesize and play `text`, returning when playback completes.
    /// Implementations must stop playback promptly once `cancel` flips;
    /// returning early on cancellation is not an error.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn say(&self, text: &str, cancel: &SpeakCancel) -> Result<()>;
}

/// Real speaker: `OpenAI` TTS synthesis played through cpal
pub struct VoiceSpeaker {
    tts: TextToSpeech,
    playback: Mutex<AudioPlayback>,
}

impl VoiceSpeaker {
    /// Create a speaker from a TTS client and a playback device
    #[must_use]
    pub fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self {
            tts,
            playback: Mutex::new(playback),
        }
    }
}

#[async_trait]
impl Speaker for VoiceSpeaker {
    async fn say(&self, text: &str, cancel: &SpeakCancel) -> Result<()> {
        let audio = self.tts.synthesize(text).await?;
        // Superseded during synthesis: skip playback entirely
        if cancel.is_cancelled() {
            return Ok(());
        }
        let mut playback = self.playback.lock().await;
        playback.play_mp3(&audio, cancel).await
    }
}

/// Serializes spoken output; new speech supersedes pending speech
#[derive(Clone)]
pub struct SpeechOutputChannel {
    speaker: Arc<dyn Speaker>,
    generation: Arc<AtomicU64>,
    // Serializes utterances so at most one plays at a time
    slot: Arc<Mutex<()>>,
}

impl SpeechOutputChannel {
    /// Create a channel over a speaker implementation
    #[must_use]
    pub fn new(speaker: Arc<dyn Speaker>) -> Self {
        Self {
            speaker,
            generation: Arc::new(AtomicU64::new(0)),
            slot: Arc::new(Mutex::new(())),
        }
    }

    /// Speak `text`, superseding any queued or currently playing utterance.
    ///
    /// The returned receiver resolves when playback completed without being
    /// superseded; it is dropped (recv error) when a later `speak` or
    /// [`cancel`](Self::cancel) took over. Superseding is a silent
    /// cancellation, not an error.
    #[must_use]
    pub fn speak(&self, text: impl Into<String>) -> oneshot::Receiver<()> {
        let text = text.into();
        let cancel = SpeakCancel {
            generation: Arc::clone(&self.generation),
            epoch: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        };
        let (done_tx, done_rx) = oneshot::channel();

        let speaker = Arc::clone(&self.speaker);
        let slot = Arc::clone(&self.slot);

        tokio::spawn(async move {
            let _speaking = slot.lock().await;

            // Superseded while waiting for the slot: skip entirely
            if cancel.is_cancelled() {
                tracing::trace!("utterance superseded before playback");
                return;
            }

            if let Err(e) = speaker.say(&text, &cancel).await {
                tracing::warn!(error = %e, "speech output failed");
                return;
            }

            if !cancel.is_cancelled() {
                let _ = done_tx.send(());
            }
        });

        done_rx
    }

    /// Cancel queued and playing speech; any in-flight completion becomes
    /// a no-op and playback stops as soon as the speaker observes the flip
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Phase of the step narration sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NarratorPhase {
    Idle = 0,
    SpeakingInstruction = 1,
    Delaying = 2,
    SpeakingPrompt = 3,
}

impl NarratorPhase {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::SpeakingInstruction,
            2 => Self::Delaying,
            3 => Self::SpeakingPrompt,
            _ => Self::Idle,
        }
    }
}

/// Reads a step instruction aloud, pauses, then asks whether to continue.
///
/// Re-entered on every step change while voice mode is on; cancelled and
/// reset immediately on manual navigation or voice-mode off.
#[derive(Clone)]
pub struct StepNarrator {
    output: SpeechOutputChannel,
    prompt: String,
    delay: Duration,
    epoch: Arc<AtomicU64>,
    phase: Arc<AtomicU8>,
}

impl StepNarrator {
    /// Create a narrator speaking through `output`, asking `prompt` after
    /// each instruction
    #[must_use]
    pub fn new(output: SpeechOutputChannel, prompt: String, delay: Duration) -> Self {
        Self {
            output,
            prompt,
            delay,
            epoch: Arc::new(AtomicU64::new(0)),
            phase: Arc::new(AtomicU8::new(NarratorPhase::Idle as u8)),
        }
    }

    /// Begin narrating a step, aborting any narration in progress
    pub fn announce(&self, instruction: String) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let output = self.output.clone();
        let prompt = self.prompt.clone();
        let delay = self.delay;
        let epochs = Arc::clone(&self.epoch);
        let phase = Arc::clone(&self.phase);

        phase.store(NarratorPhase::SpeakingInstruction as u8, Ordering::SeqCst);

        tokio::spawn(async move {
            let current = |p: NarratorPhase| {
                if epochs.load(Ordering::SeqCst) == epoch {
                    phase.store(p as u8, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            };

            if output.speak(instruction).await.is_err() {
                // Superseded mid-instruction; a newer narration owns the phase
                return;
            }
            if !current(NarratorPhase::Delaying) {
                return;
            }

            tokio::time::sleep(delay).await;
            if !current(NarratorPhase::SpeakingPrompt) {
                return;
            }

            let _ = output.speak(prompt).await;
            current(NarratorPhase::Idle);
        });
    }

    /// Speak a single line without the follow-up prompt (used for "repeat")
    pub fn say_once(&self, text: String) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.phase.store(NarratorPhase::Idle as u8, Ordering::SeqCst);
        drop(self.output.speak(text));
    }

    /// Abort narration and reset to idle; pending speech is cancelled
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.output.cancel();
        self.phase.store(NarratorPhase::Idle as u8, Ordering::SeqCst);
    }

    /// Current narration phase
    #[must_use]
    pub fn phase(&self) -> NarratorPhase {
        NarratorPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Speaker that records spoken lines and completes instantly
    struct RecordingSpeaker {
        spoken: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Speaker for RecordingSpeaker {
        async fn say(&self, text: &str, _cancel: &SpeakCancel) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// Speaker whose "playback" runs until completion or cancellation,
    /// logging which of the two happened
    struct InterruptibleSpeaker {
        log: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Speaker for InterruptibleSpeaker {
        async fn say(&self, text: &str, cancel: &SpeakCancel) -> Result<()> {
            for _ in 0..100 {
                if cancel.is_cancelled() {
                    self.log.lock().unwrap().push(format!("interrupted: {text}"));
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            self.log.lock().unwrap().push(format!("finished: {text}"));
            Ok(())
        }
    }

    fn interruptible_channel() -> (SpeechOutputChannel, Arc<StdMutex<Vec<String>>>) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let speaker = InterruptibleSpeaker {
            log: Arc::clone(&log),
        };
        (SpeechOutputChannel::new(Arc::new(speaker)), log)
    }

    fn recording_channel() -> (SpeechOutputChannel, Arc<StdMutex<Vec<String>>>) {
        let spoken = Arc::new(StdMutex::new(Vec::new()));
        let speaker = RecordingSpeaker {
            spoken: Arc::clone(&spoken),
        };
        (SpeechOutputChannel::new(Arc::new(speaker)), spoken)
    }

    #[tokio::test]
    async fn speak_completes_when_not_superseded() {
        let (output, spoken) = recording_channel();
        output.speak("물을 끓이세요").await.unwrap();
        assert_eq!(spoken.lock().unwrap().as_slice(), ["물을 끓이세요"]);
    }

    #[tokio::test]
    async fn cancel_drops_completion() {
        let (output, _spoken) = recording_channel();
        let done = output.speak("첫 번째");
        output.cancel();
        // Completion must not fire for cancelled speech
        assert!(done.await.is_err());
    }

    #[tokio::test]
    async fn newer_speak_supersedes_queued_speech() {
        let (output, spoken) = recording_channel();
        let first = output.speak("첫 번째");
        let second = output.speak("두 번째");

        second.await.unwrap();
        assert!(first.await.is_err());

        let lines = spoken.lock().unwrap();
        // The first utterance may or may not have reached the speaker before
        // being superseded, but the second one always completes last
        assert_eq!(lines.last().unwrap(), "두 번째");
    }

    #[tokio::test]
    async fn cancel_stops_audio_mid_playback() {
        let (output, log) = interruptible_channel();

        let done = output.speak("긴 안내 문장");
        // Let playback begin before cancelling
        tokio::time::sleep(Duration::from_millis(20)).await;
        output.cancel();

        assert!(done.await.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            log.lock().unwrap().as_slice(),
            ["interrupted: 긴 안내 문장"]
        );
    }

    #[tokio::test]
    async fn newer_speak_interrupts_playing_audio() {
        let (output, log) = interruptible_channel();

        let first = output.speak("첫 번째");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = output.speak("두 번째");

        second.await.unwrap();
        assert!(first.await.is_err());

        let lines = log.lock().unwrap();
        assert!(lines.contains(&"interrupted: 첫 번째".to_string()));
        assert!(lines.contains(&"finished: 두 번째".to_string()));
    }

    #[tokio::test]
    async fn narrator_reaches_prompt_phase() {
        let (output, spoken) = recording_channel();
        let narrator = StepNarrator::new(
            output,
            "다음 단계로 넘어갈까요?".to_string(),
            Duration::from_millis(10),
        );

        narrator.announce("재료를 씻으세요".to_string());

        // Wait for instruction + delay + prompt to play out
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(narrator.phase(), NarratorPhase::Idle);
        let lines = spoken.lock().unwrap();
        assert_eq!(
            lines.as_slice(),
            ["재료를 씻으세요", "다음 단계로 넘어갈까요?"]
        );
    }

    #[tokio::test]
    async fn cancelled_narration_never_prompts() {
        let (output, spoken) = recording_channel();
        let narrator = StepNarrator::new(
            output,
            "다음 단계로 넘어갈까요?".to_string(),
            Duration::from_millis(50),
        );

        narrator.announce("재료를 씻으세요".to_string());
        narrator.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(narrator.phase(), NarratorPhase::Idle);
        let lines = spoken.lock().unwrap();
        assert!(!lines.contains(&"다음 단계로 넘어갈까요?".to_string()));
    }

    #[tokio::test]
    async fn reannounce_restarts_sequence() {
        let (output, spoken) = recording_channel();
        let narrator = StepNarrator::new(
            output,
            "다음 단계로 넘어갈까요?".to_string(),
            Duration::from_millis(10),
        );

        narrator.announce("1단계".to_string());
        narrator.announce("2단계".to_string());

        tokio::time::sleep(Duration::from_millis(200)).await;

        let lines = spoken.lock().unwrap();
        // The second announcement always completes its full sequence
        assert!(lines.contains(&"2단계".to_string()));
        assert_eq!(lines.last().unwrap(), "다음 단계로 넘어갈까요?");
    }
}
