//! DPoP (Demonstrating Proof-of-Possession, RFC 9449) proof generation for
//! the proof-of-possession OAuth [`PdsClient`](coves_core::traits::PdsClient)
//! implementation.
//!
//! There is no ready-made crate in this ecosystem that emits JWK-embedded
//! compact JWTs, so the proof is hand-framed here from its primitives: a
//! P-256 keypair signs a small header/payload pair with ES256, the same way
//! a real AT-Proto PDS verifies proofs server-side.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use serde_json::json;
use sha2::{Digest, Sha256};

use coves_core::error::PdsError;

/// A P-256 keypair used to sign DPoP proofs for one authenticated session.
///
/// Holding the key here (rather than per-request) is what lets the same
/// proof key be reused across a session's lifetime, as the DPoP spec
/// requires: the PDS binds the access token to this key's JWK thumbprint at
/// token-issuance time.
pub struct DpopKey {
    signing_key: SigningKey,
    jwk: serde_json::Value,
}

impl DpopKey {
    /// Generate a fresh P-256 keypair for a new session.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let jwk = jwk_from_signing_key(&signing_key);
        Self { signing_key, jwk }
    }

    /// Reconstruct a key from its PKCS#8 DER encoding, for resuming a
    /// session whose key was persisted across process restarts.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, PdsError> {
        use p256::pkcs8::DecodePrivateKey;
        let signing_key = SigningKey::from_pkcs8_der(der)
            .map_err(|e| PdsError::Other(format!("invalid DPoP key: {e}")))?;
        let jwk = jwk_from_signing_key(&signing_key);
        Ok(Self { signing_key, jwk })
    }

    /// Serialize this key to PKCS#8 DER for persistence across restarts.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, PdsError> {
        use p256::pkcs8::EncodePrivateKey;
        self.signing_key
            .to_pkcs8_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| PdsError::Other(format!("encoding DPoP key: {e}")))
    }

    /// Build a compact DPoP proof JWT for one HTTP request.
    ///
    /// `nonce` is the server-issued `DPoP-Nonce` from a prior response, if
    /// any; `access_token` is included to bind the proof to a specific
    /// bearer token via the `ath` claim once a session is established.
    pub fn proof(&self, htm: &str, htu: &str, nonce: Option<&str>, access_token: Option<&str>) -> String {
        let header = json!({
            "typ": "dpop+jwt",
            "alg": "ES256",
            "jwk": self.jwk,
        });

        let mut payload = json!({
            "jti": random_jti(),
            "htm": htm,
            "htu": htu,
            "iat": chrono::Utc::now().timestamp(),
        });
        if let Some(nonce) = nonce {
            payload["nonce"] = json!(nonce);
        }
        if let Some(token) = access_token {
            payload["ath"] = json!(URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes())));
        }

        let signing_input = format!(
            "{}.{}",
            b64_json(&header),
            b64_json(&payload),
        );
        let signature: Signature = self.signing_key.sign(signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
    }
}

fn jwk_from_signing_key(key: &SigningKey) -> serde_json::Value {
    let point = key.verifying_key().to_encoded_point(false);
    let x = point.x().expect("uncompressed point has x");
    let y = point.y().expect("uncompressed point has y");
    json!({
        "kty": "EC",
        "crv": "P-256",
        "x": URL_SAFE_NO_PAD.encode(x),
        "y": URL_SAFE_NO_PAD.encode(y),
    })
}

fn b64_json(value: &serde_json::Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("value always serializes"))
}

fn random_jti() -> String {
    let mut bytes = [0u8; 12];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
