//! Emotion category definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Closed set of emotion labels attached to timeline and effect segments.
///
/// Deserialization never fails on a string: labels outside the set read as
/// [`EmotionCategory::Neutral`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum EmotionCategory {
    /// High positive arousal (labels `joy`, `optimism` and `humor` land here)
    Excitement,
    /// Anger, rendered as tension downstream
    Anger,
    /// Sadness
    Sadness,
    /// No detected emotion; also the value for uncovered time
    #[default]
    Neutral,
}

impl EmotionCategory {
    /// All categories, in declaration order.
    pub const ALL: &'static [EmotionCategory] = &[
        EmotionCategory::Excitement,
        EmotionCategory::Anger,
        EmotionCategory::Sadness,
        EmotionCategory::Neutral,
    ];

    /// Returns the category name as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionCategory::Excitement => "excitement",
            EmotionCategory::Anger => "anger",
            EmotionCategory::Sadness => "sadness",
            EmotionCategory::Neutral => "neutral",
        }
    }

    /// Map a raw classifier label onto the closed set.
    ///
    /// Labels outside the set fall back to [`EmotionCategory::Neutral`].
    pub fn from_classifier_label(label: &str) -> Self {
        label.parse().unwrap_or(EmotionCategory::Neutral)
    }

    /// Whether this is the neutral category.
    pub fn is_neutral(&self) -> bool {
        matches!(self, EmotionCategory::Neutral)
    }
}

impl fmt::Display for EmotionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionCategory {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "excitement" | "joy" | "optimism" | "humor" => Ok(EmotionCategory::Excitement),
            "anger" | "tension" => Ok(EmotionCategory::Anger),
            "sadness" => Ok(EmotionCategory::Sadness),
            "neutral" => Ok(EmotionCategory::Neutral),
            _ => Err(ModelError::UnknownCategory(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for EmotionCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::from_classifier_label(&label))
    }
}
