//! Credentials and signatures: password hashes, access tokens, opaque
//! tokens and telephony webhook signatures.

pub mod jwt;
pub mod password;
pub mod tokens;
pub mod webhook;

pub use jwt::{AccessClaims, JwtKeys, TokenInfo, TokenType};
pub use password::{hash_password, verify_password};
pub use tokens::generate_token;
pub use webhook::{compute_twilio_signature, verify_twilio_signature};
