//! Namespaced Identifier (NSID) type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated AT Protocol Namespaced Identifier (NSID).
///
/// NSIDs use reverse-DNS notation to identify lexicon types and collections,
/// e.g. `social.coves.feed.vote`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nsid(String);

impl Nsid {
    /// Create a new NSID from a string, validating the format.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the NSID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        let segments: Vec<&str> = s.split('.').collect();

        if segments.len() < 3 {
            return Err(InvalidInputError::Nsid {
                value: s.to_string(),
                reason: "must have at least 3 dot-separated segments".to_string(),
            }
            .into());
        }

        for segment in &segments {
            if segment.is_empty() {
                return Err(InvalidInputError::Nsid {
                    value: s.to_string(),
                    reason: "segments must be non-empty".to_string(),
                }
                .into());
            }

            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
            {
                return Err(InvalidInputError::Nsid {
                    value: s.to_string(),
                    reason: format!("invalid characters in segment '{}'", segment),
                }
                .into());
            }
        }

        Ok(())
    }
}

impl fmt::Display for Nsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Nsid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Nsid {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Nsid> for String {
    fn from(nsid: Nsid) -> Self {
        nsid.0
    }
}

impl AsRef<str> for Nsid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_vote_nsid() {
        let nsid = Nsid::new("social.coves.feed.vote").unwrap();
        assert_eq!(nsid.as_str(), "social.coves.feed.vote");
    }

    #[test]
    fn invalid_too_few_segments() {
        assert!(Nsid::new("social.coves").is_err());
    }

    #[test]
    fn invalid_empty_segment() {
        assert!(Nsid::new("social..vote").is_err());
    }
}
