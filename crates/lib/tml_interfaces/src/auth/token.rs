//! Session token generation.
//!
//! Tokens are opaque strings compared for exact equality; no signature or
//! expiry is embedded.

use base64::Engine;
use uuid::Uuid;

/// Generate a fresh session token: a base64-encoded UUIDv4.
pub fn generate_session_token() -> String {
    base64::engine::general_purpose::STANDARD.encode(Uuid::new_v4().to_string())
}
