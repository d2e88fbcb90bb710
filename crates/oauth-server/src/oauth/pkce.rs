//! PKCE (Proof Key for Code Exchange) verification.
//!
//! Implements `plain` and `S256` code challenges per RFC 7636.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::error::OAuthError;

/// Code challenge transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeChallengeMethod {
    /// The challenge is the verifier itself. Default when no method is sent.
    #[default]
    Plain,
    /// `BASE64URL(SHA256(code_verifier))`.
    S256,
}

impl FromStr for CodeChallengeMethod {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "S256" => Ok(Self::S256),
            other => Err(OAuthError::invalid_request(format!(
                "code_challenge_method '{other}' is not supported"
            ))),
        }
    }
}

/// Check the RFC 7636 §4.1 shape: 43 to 128 unreserved characters.
///
/// Applies to both verifiers and challenges.
pub fn is_well_formed(value: &str) -> bool {
    (43..=128).contains(&value.len())
        && value.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

/// Verify a code verifier against the stored challenge.
pub fn verify(method: CodeChallengeMethod, code_verifier: &str, code_challenge: &str) -> bool {
    match method {
        CodeChallengeMethod::Plain => code_verifier == code_challenge,
        CodeChallengeMethod::S256 => verify_s256(code_verifier, code_challenge),
    }
}

/// Verify a PKCE S256 code challenge.
///
/// Computes `BASE64URL(SHA256(code_verifier))` and compares to the stored challenge.
pub fn verify_s256(code_verifier: &str, code_challenge: &str) -> bool {
    let hash = Sha256::digest(code_verifier.as_bytes());
    let computed = URL_SAFE_NO_PAD.encode(hash);
    computed == code_challenge
}
