//! Voice pipeline: capture, endpointing, STT, TTS, playback, and the
//! higher-level input/output channels the cooking session drives.

pub mod capture;
pub mod commands;
pub mod input;
pub mod output;
pub mod playback;
pub mod segmenter;
pub mod stt;
pub mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use commands::{CommandKeywords, VoiceCommand, VoiceCommandInterpreter};
pub use input::{
    EngineEvent, MicEngine, RecognitionEngine, SpeechInputChannel, mic_engine_factory,
};
pub use output::{
    NarratorPhase, SpeakCancel, Speaker, SpeechOutputChannel, StepNarrator, VoiceSpeaker,
};
pub use playback::AudioPlayback;
pub use segmenter::{UtteranceSegmenter, rms_energy};
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
