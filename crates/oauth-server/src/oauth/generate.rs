//! Token and authorization code generation.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// What a generated value will be used as. Mixed into the digest so that
/// codes, access tokens and refresh tokens never collide.
#[derive(Debug, Clone, Copy)]
pub enum TokenKind {
    Code,
    Access,
    Refresh,
}

impl TokenKind {
    const fn tag(self) -> &'static [u8] {
        match self {
            Self::Code => b"code",
            Self::Access => b"access",
            Self::Refresh => b"refresh",
        }
    }
}

/// Generate an opaque value bound to a client and user.
///
/// `BASE64URL(SHA256(uuid_v4 || client_id || user_id || now_nanos || kind))`,
/// 43 characters.
pub fn generate(kind: TokenKind, client_id: &str, user_id: &str) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(client_id.as_bytes());
    hasher.update(user_id.as_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(kind.tag());

    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
