use std::fmt;

use serde::{Deserialize, Serialize};

pub mod cipher;
pub mod cookie;
pub mod jwt;
pub mod store;

pub use cipher::TokenCipher;
pub use cookie::{CookieJar, HeaderCookieJar, MemoryCookieJar};
pub use jwt::{Claims, decode_claims};
pub use store::TokenStore;

/// Every value the client persists in a cookie.
///
/// Cookie names are short and non-descriptive. That is cosmetic obfuscation only, not a
/// security boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    EmailVerification,
    ResetPassword,
    AgeVerified,
    LocationVerified,
    FirstTimeUser,
    ProfileCompleted,
}

impl TokenKind {
    pub const ALL: [TokenKind; 8] = [
        TokenKind::Access,
        TokenKind::Refresh,
        TokenKind::EmailVerification,
        TokenKind::ResetPassword,
        TokenKind::AgeVerified,
        TokenKind::LocationVerified,
        TokenKind::FirstTimeUser,
        TokenKind::ProfileCompleted,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Access => "_ib_a",
            TokenKind::Refresh => "_ib_r",
            TokenKind::EmailVerification => "_ib_v",
            TokenKind::ResetPassword => "_ib_p",
            TokenKind::AgeVerified => "_ib_fa",
            TokenKind::LocationVerified => "_ib_fl",
            TokenKind::FirstTimeUser => "_ib_ff",
            TokenKind::ProfileCompleted => "_ib_fc",
        }
    }

    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            TokenKind::AgeVerified
                | TokenKind::LocationVerified
                | TokenKind::FirstTimeUser
                | TokenKind::ProfileCompleted
        )
    }
}

/// Access and refresh token issued together by the API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}
