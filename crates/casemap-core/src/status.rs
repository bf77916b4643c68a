use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Result recorded for a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Status {
    #[default]
    Untested,
    Pass,
    Fail,
    Blocked,
}

/// Click order. Cycling wraps from the last entry back to the first.
pub const CYCLE: [Status; 4] = [
    Status::Untested,
    Status::Pass,
    Status::Fail,
    Status::Blocked,
];

impl Status {
    /// The glyph written into visible labels and status files.
    #[must_use]
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Untested => "\u{26AA}\u{FE0F}",
            Self::Pass => "\u{2705}",
            Self::Fail => "\u{274C}",
            Self::Blocked => "\u{1F7E1}",
        }
    }

    /// Lower-case name, accepted as an alternative spelling on input.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Untested => "untested",
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Blocked => "blocked",
        }
    }

    /// The status that follows `self` in [`CYCLE`].
    #[must_use]
    pub fn next(self) -> Self {
        let index = CYCLE.iter().position(|s| *s == self).unwrap_or(0);
        CYCLE[(index + 1) % CYCLE.len()]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Error returned when a status value is not one of the four known spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    pub got: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid status: '{}'", self.got)
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(status) = CYCLE.iter().find(|st| st.glyph() == trimmed) {
            return Ok(*status);
        }
        // Bare circle without the emoji variation selector.
        if trimmed == "\u{26AA}" {
            return Ok(Self::Untested);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "untested" => Ok(Self::Untested),
            "pass" => Ok(Self::Pass),
            "fail" => Ok(Self::Fail),
            "blocked" => Ok(Self::Blocked),
            _ => Err(ParseStatusError { got: s.to_string() }),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.glyph())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
