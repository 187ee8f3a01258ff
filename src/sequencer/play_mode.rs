use super::error::SequencerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    #[default]
    Sequential,
    Reverse,
    Random,
    /// Repeat the current item.
    Single,
}

impl PlayMode {
    /// The mode reached by one press of the play-mode toggle:
    /// sequential, random, single, reverse, then back to sequential.
    pub fn toggled(self) -> Self {
        match self {
            Self::Sequential => Self::Random,
            Self::Random => Self::Single,
            Self::Single => Self::Reverse,
            Self::Reverse => Self::Sequential,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Reverse => "reverse",
            Self::Random => "random",
            Self::Single => "single",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayMode {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "reverse" => Ok(Self::Reverse),
            "random" | "shuffle" => Ok(Self::Random),
            "single" | "repeat_one" => Ok(Self::Single),
            other => Err(SequencerError::UnknownPlayMode(other.to_string())),
        }
    }
}
