//! Utterance endpointing
//!
//! Splits a continuous microphone stream into discrete utterances using
//! RMS energy: speech starts when energy crosses the threshold, and the
//! utterance is finalized after a trailing window of silence.

/// Minimum audio energy to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum utterance length to hand to the recognizer (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence that finalizes an utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Endpointing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Accumulating an utterance
    Speaking,
}

/// Splits captured audio into finalized utterances
pub struct UtteranceSegmenter {
    state: SegmenterState,
    speech_buffer: Vec<f32>,
    silence_counter: usize,
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl UtteranceSegmenter {
    /// Create a new segmenter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            speech_buffer: Vec::new(),
            silence_counter: 0,
        }
    }

    /// Feed captured samples. Returns a finalized utterance once enough
    /// speech has been followed by the silence window; otherwise `None`.
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let energy = rms_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    self.state = SegmenterState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                }
                None
            }
            SegmenterState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                if self.silence_counter > SILENCE_SAMPLES {
                    let utterance = std::mem::take(&mut self.speech_buffer);
                    self.reset();

                    if utterance.len() > MIN_SPEECH_SAMPLES {
                        tracing::debug!(samples = utterance.len(), "utterance finalized");
                        return Some(utterance);
                    }
                    // Too short to be a command; likely a noise burst
                    tracing::trace!(samples = utterance.len(), "discarded short segment");
                }
                None
            }
        }
    }

    /// Reset to idle, discarding any partial utterance
    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }

    /// Current endpointing state
    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }
}

/// RMS energy of audio samples (also used by the mic diagnostic)
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(duration_samples: usize, amplitude: f32) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let t = i as f32 / 16000.0;
                amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn energy_of_silence_is_near_zero() {
        let silence = vec![0.0f32; 100];
        assert!(rms_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(rms_energy(&loud) > 0.4);
    }

    #[test]
    fn silence_never_starts_an_utterance() {
        let mut seg = UtteranceSegmenter::new();
        assert!(seg.push(&vec![0.0f32; 8000]).is_none());
        assert_eq!(seg.state(), SegmenterState::Idle);
    }

    #[test]
    fn speech_then_silence_finalizes_utterance() {
        let mut seg = UtteranceSegmenter::new();

        // 0.5s of speech
        assert!(seg.push(&tone(8000, 0.3)).is_none());
        assert_eq!(seg.state(), SegmenterState::Speaking);

        // 0.6s of silence finalizes
        let utterance = seg.push(&vec![0.0f32; 9600]);
        assert!(utterance.is_some());
        assert!(utterance.unwrap().len() > MIN_SPEECH_SAMPLES);
        assert_eq!(seg.state(), SegmenterState::Idle);
    }

    #[test]
    fn short_noise_burst_is_discarded() {
        let mut seg = UtteranceSegmenter::new();

        // 0.1s blip, below the minimum utterance length
        seg.push(&tone(1600, 0.3));
        let result = seg.push(&vec![0.0f32; 9600]);
        assert!(result.is_none());
        assert_eq!(seg.state(), SegmenterState::Idle);
    }

    #[test]
    fn reset_discards_partial_utterance() {
        let mut seg = UtteranceSegmenter::new();
        seg.push(&tone(8000, 0.3));
        assert_eq!(seg.state(), SegmenterState::Speaking);

        seg.reset();
        assert_eq!(seg.state(), SegmenterState::Idle);
        assert!(seg.push(&vec![0.0f32; 9600]).is_none());
    }
}
