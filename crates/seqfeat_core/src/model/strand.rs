//! Strand orientation of a feature relative to its reference sequence.

use serde::{Deserialize, Serialize};

/// Orientation of a feature on its reference sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strand {
    Forward,
    Reverse,
    /// Unset or not applicable. Treated as "no value" by defaulting rules.
    #[default]
    Unknown,
}

impl Strand {
    /// Numeric form used in the `features.strand` column.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
            Self::Unknown => 0,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Forward),
            -1 => Some(Self::Reverse),
            0 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Parses the textual spellings found in annotation files and options.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "+" | "+1" | "1" | "forward" | "plus" => Some(Self::Forward),
            "-" | "-1" | "reverse" | "minus" => Some(Self::Reverse),
            "" | "." | "?" | "0" | "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
            Self::Unknown => '.',
        }
    }
}
