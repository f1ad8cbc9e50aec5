//! Identity format rules applied at login.

use std::fmt;
use std::str::FromStr;

/// Which identity strings a session accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityRule {
    /// A `0` followed by exactly 10 ASCII digits.
    #[default]
    Phone,
    /// Any non-blank string.
    Any,
}

impl IdentityRule {
    pub fn accepts(&self, identity: &str) -> bool {
        match self {
            Self::Phone => {
                identity.len() == 11
                    && identity.starts_with('0')
                    && identity.bytes().all(|b| b.is_ascii_digit())
            }
            Self::Any => !identity.trim().is_empty(),
        }
    }
}

impl FromStr for IdentityRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phone" => Ok(Self::Phone),
            "any" => Ok(Self::Any),
            other => Err(format!("unknown identity rule: {other}")),
        }
    }
}

impl fmt::Display for IdentityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phone => write!(f, "phone"),
            Self::Any => write!(f, "any"),
        }
    }
}
