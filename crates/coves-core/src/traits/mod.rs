//! Capability traits implemented against a PDS.

mod pds_client;

pub use pds_client::{CreatedRecord, PdsClient};
