//! The `social.coves.feed.vote` record shape.

use serde::{Deserialize, Serialize};

use crate::error::{Error, InvalidInputError};

use super::StrongRef;

/// The NSID of the vote collection.
pub const VOTE_COLLECTION: &str = "social.coves.feed.vote";

/// The `$type` discriminator stamped on every vote record.
const VOTE_RECORD_TYPE: &str = "social.coves.feed.vote";

/// A vote's direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Parse a direction from the wire string `"up"` / `"down"`. Anything
    /// else is rejected by the caller as `InvalidDirection`, not by this
    /// parser.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            _ => None,
        }
    }

    /// The wire string for this direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

/// The typed body of a `social.coves.feed.vote` record.
///
/// Round-trips through `serde_json::Value` for transport, but exposes typed
/// `subject`/`direction`/`created_at` accessors because the vote service and
/// locator need them directly rather than re-parsing a generic JSON value on
/// every access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecordValue {
    #[serde(rename = "$type")]
    type_: String,
    pub subject: StrongRef,
    pub direction: Direction,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl VoteRecordValue {
    /// Construct a new vote record body, stamping the collection's `$type`
    /// and the current UTC time.
    pub fn new(subject: StrongRef, direction: Direction) -> Self {
        Self {
            type_: VOTE_RECORD_TYPE.to_string(),
            subject,
            direction,
            created_at: chrono::Utc::now(),
        }
    }

    /// Serialize to the raw JSON body a `createRecord` call sends.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("VoteRecordValue always serializes")
    }

    /// Parse a vote record body out of a raw JSON record value.
    ///
    /// Callers walking a listing should treat `Err` as "skip this record"
    /// rather than propagate it; a record missing a required field is not
    /// a fatal condition for the walk as a whole.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value.clone()).map_err(|e| {
            InvalidInputError::Other {
                message: format!("not a valid vote record: {}", e),
            }
            .into()
        })
    }
}
