//! Permission masks and the strategies used to compare them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit set of capabilities. See [`MaskBuilder`](crate::permission::MaskBuilder)
/// for the standard bits.
pub type Mask = u32;

/// How an entry's mask is compared with a required mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantingStrategy {
    /// Every required bit must be present in the entry mask.
    All,
    /// At least one required bit must be present in the entry mask.
    Any,
    /// The entry mask must equal the required mask exactly.
    Equal,
}

impl GrantingStrategy {
    /// Default strategy for a new entry: `All` for grants, `Any` for denials.
    pub fn default_for(granting: bool) -> Self {
        if granting { Self::All } else { Self::Any }
    }

    /// Returns whether `entry_mask` satisfies `required` under this strategy.
    ///
    /// # Examples
    ///
    /// ```
    /// use custos_acl::GrantingStrategy;
    ///
    /// assert!(GrantingStrategy::All.matches(0b011, 0b001));
    /// assert!(!GrantingStrategy::Equal.matches(0b011, 0b001));
    /// ```
    pub fn matches(self, entry_mask: Mask, required: Mask) -> bool {
        match self {
            Self::All => entry_mask & required == required,
            Self::Any => entry_mask & required != 0,
            Self::Equal => entry_mask == required,
        }
    }

    /// Lowercase name as stored.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::Equal => "equal",
        }
    }
}

impl fmt::Display for GrantingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrantingStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            "equal" => Ok(Self::Equal),
            other => Err(Error::invalid_state(format!(
                "The strategy \"{other}\" is not supported"
            ))),
        }
    }
}
