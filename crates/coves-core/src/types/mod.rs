//! Core value types: identifiers and addresses used throughout the subsystem.

mod at_uri;
mod did;
mod nsid;
mod pds_url;
mod rkey;
mod tid;

pub use at_uri::AtUri;
pub use did::Did;
pub use nsid::Nsid;
pub use pds_url::PdsUrl;
pub use rkey::Rkey;
pub use tid::TidGenerator;
