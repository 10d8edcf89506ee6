//! Player tier (level) classification.
//!
//! A tier gates which pools a wager may contribute to. Tiers may be ordinal
//! (`1`, `2`, ...) or named (`"gold"`); both are stored in canonical string
//! form so configuration files can use either.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A player classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Tier(String);

impl Tier {
    /// Create a named tier. Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tier name is empty after trimming.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for Tier {
    fn from(level: u32) -> Self {
        Self(level.to_string())
    }
}

impl From<&str> for Tier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Tier {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        tier.0
    }
}
