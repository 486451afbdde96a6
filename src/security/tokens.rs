//! Opaque random tokens for refresh, password reset and invitations.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{thread_rng, RngCore};

/// Number of random bytes behind every opaque token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a URL-safe token from [`TOKEN_BYTES`] random bytes.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
