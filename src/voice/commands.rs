//! Voice command interpretation
//!
//! Maps a raw transcript (already lower-cased and trimmed by the input
//! channel) to a [`VoiceCommand`] by substring matching against configured
//! keyword sets. Matching order is fixed so ambiguous utterances resolve
//! deterministically: an utterance containing both a "previous" and a
//! "next" keyword navigates backwards, and the timer keyword is checked
//! after navigation so step numbers spoken in passing never start timers.

use regex::Regex;

use crate::{Error, Result};

/// A recognized voice command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Go back one step (or return from the completed view)
    PreviousStep,
    /// Advance one step, or complete the session on the last step
    NextStepOrComplete,
    /// Read the current step instruction again
    RepeatCurrentStep,
    /// Start a countdown for the given number of minutes
    StartTimer(u32),
    /// Leave the session and return home (final step only)
    GoHome,
    /// Save the recipe (final step only)
    SaveRecipe,
    /// No actionable command; silently ignored
    Unrecognized,
}

/// Keyword sets for voice commands.
///
/// Language-specific vocabulary is configuration, not logic. The defaults
/// are Korean. The "next" set deliberately includes short affirmatives
/// because the narrator asks "move to next step?" after each instruction.
#[derive(Debug, Clone)]
pub struct CommandKeywords {
    pub previous: Vec<String>,
    pub next: Vec<String>,
    pub repeat: Vec<String>,
    pub timer: Vec<String>,
    pub home: Vec<String>,
    pub save: Vec<String>,
    /// Regex with one capture group extracting the number of minutes
    pub minutes_pattern: String,
}

impl Default for CommandKeywords {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(ToString::to_string).collect();
        Self {
            previous: owned(&["이전", "뒤로"]),
            next: owned(&["다음", "넘겨", "가자", "네", "응", "어", "그래"]),
            repeat: owned(&["다시", "읽어", "뭐라고"]),
            timer: owned(&["타이머"]),
            home: owned(&["홈", "처음"]),
            save: owned(&["저장"]),
            minutes_pattern: r"(\d+)\s*분".to_string(),
        }
    }
}

/// Compiled transcript-to-command mapper
pub struct VoiceCommandInterpreter {
    keywords: CommandKeywords,
    minutes: Regex,
}

impl VoiceCommandInterpreter {
    /// Compile an interpreter from keyword configuration
    ///
    /// # Errors
    ///
    /// Returns error if the minutes pattern is not a valid regex
    pub fn new(keywords: CommandKeywords) -> Result<Self> {
        let minutes = Regex::new(&keywords.minutes_pattern)
            .map_err(|e| Error::Config(format!("invalid minutes pattern: {e}")))?;
        Ok(Self { keywords, minutes })
    }

    /// Map a transcript to a command.
    ///
    /// `on_last_step` gates the home/save commands, which are only offered
    /// when the session is on its final step.
    #[must_use]
    pub fn interpret(&self, transcript: &str, on_last_step: bool) -> VoiceCommand {
        let contains_any =
            |words: &[String]| words.iter().any(|w| transcript.contains(w.as_str()));

        if contains_any(&self.keywords.previous) {
            return VoiceCommand::PreviousStep;
        }
        if contains_any(&self.keywords.next) {
            return VoiceCommand::NextStepOrComplete;
        }
        if contains_any(&self.keywords.repeat) {
            return VoiceCommand::RepeatCurrentStep;
        }
        if contains_any(&self.keywords.timer) {
            // Timer keyword without a parseable duration is a silent no-op
            return self.parse_minutes(transcript).map_or(
                VoiceCommand::Unrecognized,
                VoiceCommand::StartTimer,
            );
        }
        if on_last_step {
            if contains_any(&self.keywords.home) {
                return VoiceCommand::GoHome;
            }
            if contains_any(&self.keywords.save) {
                return VoiceCommand::SaveRecipe;
            }
        }

        VoiceCommand::Unrecognized
    }

    /// Extract a positive minute count from the transcript
    fn parse_minutes(&self, transcript: &str) -> Option<u32> {
        let captures = self.minutes.captures(transcript)?;
        let minutes: u32 = captures.get(1)?.as_str().parse().ok()?;
        (minutes > 0).then_some(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> VoiceCommandInterpreter {
        VoiceCommandInterpreter::new(CommandKeywords::default()).unwrap()
    }

    #[test]
    fn previous_keywords_match() {
        let i = interpreter();
        assert_eq!(i.interpret("이전 단계로", false), VoiceCommand::PreviousStep);
        assert_eq!(i.interpret("뒤로 가줘", false), VoiceCommand::PreviousStep);
    }

    #[test]
    fn affirmatives_advance() {
        let i = interpreter();
        for word in ["다음", "넘겨줘", "네", "응", "그래"] {
            assert_eq!(
                i.interpret(word, false),
                VoiceCommand::NextStepOrComplete,
                "expected '{word}' to advance"
            );
        }
    }

    #[test]
    fn timer_with_minutes_parses() {
        let i = interpreter();
        assert_eq!(i.interpret("5분 타이머", false), VoiceCommand::StartTimer(5));
        assert_eq!(
            i.interpret("타이머 10분 맞춰줘", false),
            VoiceCommand::StartTimer(10)
        );
    }

    #[test]
    fn timer_without_minutes_is_unrecognized() {
        let i = interpreter();
        assert_eq!(i.interpret("타이머", false), VoiceCommand::Unrecognized);
        assert_eq!(i.interpret("타이머 0분", false), VoiceCommand::Unrecognized);
    }

    #[test]
    fn home_and_save_require_last_step() {
        let i = interpreter();
        assert_eq!(i.interpret("홈으로", false), VoiceCommand::Unrecognized);
        assert_eq!(i.interpret("저장해줘", false), VoiceCommand::Unrecognized);
        assert_eq!(i.interpret("홈으로", true), VoiceCommand::GoHome);
        assert_eq!(i.interpret("처음으로", true), VoiceCommand::GoHome);
        assert_eq!(i.interpret("저장해줘", true), VoiceCommand::SaveRecipe);
    }

    #[test]
    fn precedence_resolves_ambiguous_utterances() {
        let i = interpreter();
        // Every adjacent pair in the precedence order: first match wins
        let cases = [
            ("이전 말고 다음", VoiceCommand::PreviousStep),
            ("뒤로 다시", VoiceCommand::PreviousStep),
            ("이전 5분 타이머", VoiceCommand::PreviousStep),
            ("이전 홈", VoiceCommand::PreviousStep),
            ("이전 저장", VoiceCommand::PreviousStep),
            ("다음 다시", VoiceCommand::NextStepOrComplete),
            ("다음 5분 타이머", VoiceCommand::NextStepOrComplete),
            ("다음 홈", VoiceCommand::NextStepOrComplete),
            ("다음 저장", VoiceCommand::NextStepOrComplete),
            ("다시 5분 타이머", VoiceCommand::RepeatCurrentStep),
            ("다시 홈", VoiceCommand::RepeatCurrentStep),
            ("다시 저장", VoiceCommand::RepeatCurrentStep),
            ("5분 타이머 홈", VoiceCommand::StartTimer(5)),
            ("5분 타이머 저장", VoiceCommand::StartTimer(5)),
            ("홈 저장", VoiceCommand::GoHome),
        ];
        for (utterance, expected) in cases {
            assert_eq!(
                i.interpret(utterance, true),
                expected,
                "utterance: {utterance}"
            );
        }
    }

    #[test]
    fn noise_is_unrecognized() {
        let i = interpreter();
        assert_eq!(i.interpret("음 글쎄요", false), VoiceCommand::Unrecognized);
        assert_eq!(i.interpret("", false), VoiceCommand::Unrecognized);
    }

    #[test]
    fn keyword_sets_are_configurable() {
        let keywords = CommandKeywords {
            previous: vec!["back".to_string()],
            next: vec!["next".to_string(), "yes".to_string()],
            repeat: vec!["again".to_string()],
            timer: vec!["timer".to_string()],
            home: vec!["home".to_string()],
            save: vec!["save".to_string()],
            minutes_pattern: r"(\d+)\s*minute".to_string(),
        };
        let i = VoiceCommandInterpreter::new(keywords).unwrap();
        assert_eq!(i.interpret("go back", false), VoiceCommand::PreviousStep);
        assert_eq!(
            i.interpret("timer for 3 minutes", false),
            VoiceCommand::StartTimer(3)
        );
    }

    #[test]
    fn invalid_minutes_pattern_is_a_config_error() {
        let keywords = CommandKeywords {
            minutes_pattern: "(".to_string(),
            ..CommandKeywords::default()
        };
        assert!(VoiceCommandInterpreter::new(keywords).is_err());
    }
}
