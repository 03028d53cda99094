//! **Emotion** tags and the keyword classifier that drives the avatar's face.
//!
//! The classifier is a deliberately cheap heuristic: lower-case, split on whitespace,
//! and check each keyword set for an exact token hit. Scores are presence-only (0 or 1),
//! and ties go to the earlier tag in [`Emotion::ALL`], so `Happy` wins every all-zero case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Expression shown on the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    #[default]
    Happy,
    Sad,
    Surprised,
    ClosedEyes,
}

impl Emotion {
    /// Tie-break order for [`classify`].
    pub const ALL: [Emotion; 4] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprised,
        Emotion::ClosedEyes,
    ];

    /// Wire name (`"happy"`, `"closed_eyes"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprised => "surprised",
            Emotion::ClosedEyes => "closed_eyes",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Emotion::Happy => HAPPY_WORDS,
            Emotion::Sad => SAD_WORDS,
            Emotion::Surprised => SURPRISE_WORDS,
            Emotion::ClosedEyes => SLEEPY_WORDS,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown emotion: {}", s))
    }
}

// Portuguese, English and French. Single tokens only: the tokenizer never produces spaces.
const HAPPY_WORDS: &[&str] = &[
    "feliz", "alegre", "ótimo", "excelente", "perfeito", "maravilhoso", "fantástico", "yes",
    "great", "awesome", "wonderful", "amazing", "happy", "glad", "joy", "delighted", "joyeux",
    "heureux", "ravi", "super",
];

const SAD_WORDS: &[&str] = &[
    "triste", "deprimido", "chorar", "choro", "lágrimas", "melancolia", "desesperado", "infeliz",
    "misérable", "sad", "unhappy", "crying", "tears", "melancholy", "depressed",
];

const SURPRISE_WORDS: &[&str] = &[
    "uau", "wow", "surpresa", "surpreso", "incrédulo", "chocado", "really", "seriously",
    "unbelievable", "incredible", "surprising", "surprise", "surpris", "étonnant", "surprenant",
];

const SLEEPY_WORDS: &[&str] = &[
    "sono", "cansado", "dormir", "descansar", "sonolento", "tired", "sleep", "rest", "exhausted",
    "fatigué", "sommeil", "sleepy",
];

/// Classify `text` into a single [`Emotion`].
pub fn classify(text: &str) -> Emotion {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    let score = |emotion: Emotion| -> u8 {
        let words = emotion.keywords();
        u8::from(tokens.iter().any(|t| words.contains(t)))
    };

    let mut best = Emotion::Happy;
    let mut best_score = 0;
    for emotion in Emotion::ALL {
        let s = score(emotion);
        if s > best_score {
            best = emotion;
            best_score = s;
        }
    }
    best
}

/// Pick the emotion shown for a turn: strong user affect (sad or surprised) is mirrored,
/// otherwise the avatar wears the tone of its own reply.
pub fn resolve(input: Emotion, reply: Emotion) -> Emotion {
    match input {
        Emotion::Sad | Emotion::Surprised => input,
        _ => reply,
    }
}
