//! Speech input channel — continuous voice command recognition
//!
//! Wraps a [`RecognitionEngine`] in a restart loop gated by an explicit
//! liveness flag: engine-level session ends are masked from the user by
//! auto-restarting, while an explicit [`SpeechInputChannel::stop`] clears
//! the flag, halts recognition, and guarantees no further transcripts —
//! including suppressing an in-flight restart race.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::voice::capture::{AudioCapture, samples_to_wav};
use crate::voice::segmenter::UtteranceSegmenter;
use crate::voice::stt::SpeechToText;
use crate::{Error, Result};

/// Capture poll interval while listening
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Inactivity window after which the engine reports a session end
/// (mirrors recognition engines that time out between utterances)
const ENGINE_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Backoff after a transient engine error
const ERROR_BACKOFF: Duration = Duration::from_millis(300);

/// Event from an underlying recognition engine
#[derive(Debug)]
pub enum EngineEvent {
    /// A finalized utterance transcript (interim results are never surfaced)
    Transcript(String),
    /// The engine's recognition session ended; the channel decides whether
    /// to restart
    Ended,
}

/// Continuous speech recognition engine
#[async_trait]
pub trait RecognitionEngine: Send {
    /// Wait for the next finalized utterance or a session end
    ///
    /// # Errors
    ///
    /// Returns error on a transient recognition failure; the channel
    /// backs off and retries
    async fn next_utterance(&mut self) -> Result<EngineEvent>;
}

#[async_trait]
impl<E: RecognitionEngine + ?Sized> RecognitionEngine for Box<E> {
    async fn next_utterance(&mut self) -> Result<EngineEvent> {
        (**self).next_utterance().await
    }
}

/// Real engine: microphone capture, energy endpointing, Whisper transcription
pub struct MicEngine {
    capture: AudioCapture,
    segmenter: UtteranceSegmenter,
    stt: SpeechToText,
    last_speech: Instant,
}

impl MicEngine {
    /// Create a microphone-backed engine
    ///
    /// # Errors
    ///
    /// Returns `CapabilityUnavailable` if no microphone is present
    pub fn new(stt: SpeechToText) -> Result<Self> {
        Ok(Self {
            capture: AudioCapture::new()?,
            segmenter: UtteranceSegmenter::new(),
            stt,
            last_speech: Instant::now(),
        })
    }
}

#[async_trait]
impl RecognitionEngine for MicEngine {
    async fn next_utterance(&mut self) -> Result<EngineEvent> {
        self.capture.start()?;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let samples = self.capture.take_buffer();
            if let Some(utterance) = self.segmenter.push(&samples) {
                self.last_speech = Instant::now();
                let wav = samples_to_wav(&utterance, self.capture.sample_rate())?;
                let transcript = self.stt.transcribe(&wav).await?;
                return Ok(EngineEvent::Transcript(transcript));
            }

            if self.last_speech.elapsed() > ENGINE_IDLE_TIMEOUT {
                self.last_speech = Instant::now();
                self.capture.stop();
                return Ok(EngineEvent::Ended);
            }
        }
    }
}

/// Capability-gated wrapper around continuous recognition.
///
/// Emits one lower-cased, trimmed transcript per finalized utterance on the
/// receiver returned by [`start`](Self::start).
pub struct SpeechInputChannel {
    listening: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl SpeechInputChannel {
    /// Begin continuous listening on `engine`
    #[must_use]
    pub fn start<E>(mut engine: E) -> (Self, mpsc::Receiver<String>)
    where
        E: RecognitionEngine + 'static,
    {
        let listening = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel(16);
        let flag = Arc::clone(&listening);

        let handle = tokio::spawn(async move {
            loop {
                if !flag.load(Ordering::SeqCst) {
                    break;
                }

                match engine.next_utterance().await {
                    Ok(EngineEvent::Transcript(text)) => {
                        let text = text.trim().to_lowercase();
                        if text.is_empty() {
                            continue;
                        }
                        // A stop may have landed while recognition was in
                        // flight; the stale result must become a no-op
                        if !flag.load(Ordering::SeqCst) {
                            break;
                        }
                        tracing::debug!(transcript = %text, "voice command heard");
                        if tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(EngineEvent::Ended) => {
                        if flag.load(Ordering::SeqCst) {
                            tracing::debug!("recognition session ended, restarting");
                            continue;
                        }
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "recognition error");
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
            }
            tracing::debug!("speech input loop stopped");
        });

        (Self { listening, handle }, rx)
    }

    /// Stop listening. No transcript events are delivered after this
    /// returns, including results from an in-flight recognition.
    pub fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
        self.handle.abort();
        tracing::debug!("speech input stopped");
    }

    /// Whether the channel should currently be listening
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

impl Drop for SpeechInputChannel {
    fn drop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
        self.handle.abort();
    }
}

/// Build a [`MicEngine`] factory from voice configuration, failing early
/// with `CapabilityUnavailable` when voice is disabled or unconfigured
#[must_use]
pub fn mic_engine_factory(
    config: &crate::config::Config,
) -> impl Fn() -> Result<Box<dyn RecognitionEngine>> + Send + 'static {
    let voice = config.voice.clone();
    let backend = config.backend.clone();

    move || {
        if !voice.enabled {
            return Err(Error::CapabilityUnavailable(
                "voice is disabled in configuration".to_string(),
            ));
        }
        let api_key = backend.groq_api_key.clone().ok_or_else(|| {
            Error::CapabilityUnavailable("no STT API key configured".to_string())
        })?;
        let stt = SpeechToText::new(
            api_key,
            voice.stt_model.clone(),
            voice.language.clone(),
            backend.base_url.clone(),
        )?;
        Ok(Box::new(MicEngine::new(stt)?) as Box<dyn RecognitionEngine>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Engine that replays a fixed script of events
    struct ScriptedEngine {
        events: Vec<EngineEvent>,
    }

    #[async_trait]
    impl RecognitionEngine for ScriptedEngine {
        async fn next_utterance(&mut self) -> Result<EngineEvent> {
            if self.events.is_empty() {
                // Script exhausted: behave like a silent engine
                std::future::pending::<()>().await;
                unreachable!()
            }
            // Simulate recognition latency so stop() can land between events
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(self.events.remove(0))
        }
    }

    #[tokio::test]
    async fn transcripts_are_normalized() {
        let engine = ScriptedEngine {
            events: vec![EngineEvent::Transcript("  다음 단계  ".to_string())],
        };
        let (channel, mut rx) = SpeechInputChannel::start(engine);

        assert_eq!(rx.recv().await.unwrap(), "다음 단계");
        channel.stop();
    }

    #[tokio::test]
    async fn engine_end_restarts_while_listening() {
        let engine = ScriptedEngine {
            events: vec![
                EngineEvent::Transcript("이전".to_string()),
                EngineEvent::Ended,
                EngineEvent::Transcript("다음".to_string()),
            ],
        };
        let (channel, mut rx) = SpeechInputChannel::start(engine);

        // The Ended event is masked; both transcripts arrive
        assert_eq!(rx.recv().await.unwrap(), "이전");
        assert_eq!(rx.recv().await.unwrap(), "다음");
        channel.stop();
    }

    #[tokio::test]
    async fn stop_suppresses_further_transcripts() {
        let engine = ScriptedEngine {
            events: vec![
                EngineEvent::Transcript("하나".to_string()),
                EngineEvent::Transcript("둘".to_string()),
            ],
        };
        let (channel, mut rx) = SpeechInputChannel::start(engine);

        assert_eq!(rx.recv().await.unwrap(), "하나");
        channel.stop();
        assert!(!channel.is_listening());

        // The loop is aborted; the second transcript never arrives
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn empty_transcripts_are_dropped() {
        let engine = ScriptedEngine {
            events: vec![
                EngineEvent::Transcript("   ".to_string()),
                EngineEvent::Transcript("저장".to_string()),
            ],
        };
        let (channel, mut rx) = SpeechInputChannel::start(engine);

        assert_eq!(rx.recv().await.unwrap(), "저장");
        channel.stop();
    }
}
