//! Repository operations and wire types.

mod types;
mod vote_record;

pub use types::{ListRecordsOutput, Record, StrongRef};
pub use vote_record::{Direction, VoteRecordValue, VOTE_COLLECTION};
