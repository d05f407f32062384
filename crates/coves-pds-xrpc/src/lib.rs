//! Network-backed `PdsClient` implementations: proof-of-possession OAuth
//! (DPoP) and static bearer token, both speaking XRPC over HTTPS.

mod endpoints;
mod transport;

pub mod bearer;
pub mod dpop;
pub mod oauth;

pub use bearer::BearerPdsClient;
pub use dpop::DpopKey;
pub use oauth::OAuthPdsClient;
