use std::{sync::Arc, time::Duration};

use chrono::Utc;

use crate::{
    config::TokenConfig,
    services::auth::{CookieJar, CredentialPair, TokenCipher, TokenKind, decode_claims},
};

const FLAG_VALUE: &str = "true";

/// Encrypted, cookie-backed token persistence.
///
/// Reads never fail: an absent cookie and a cookie that does not decrypt are both "no token".
#[derive(Clone)]
pub struct TokenStore {
    jar: Arc<dyn CookieJar>,
    cipher: Arc<TokenCipher>,
    ttls: TokenConfig,
}

impl TokenStore {
    pub fn new(jar: Arc<dyn CookieJar>, cipher: Arc<TokenCipher>, ttls: TokenConfig) -> Self {
        Self { jar, cipher, ttls }
    }

    pub fn set_token(&self, kind: TokenKind, value: &str, ttl: Duration) {
        let sealed = match self.cipher.encrypt(value) {
            Ok(sealed) => sealed,
            Err(e) => {
                tracing::warn!(kind = ?kind, error = %e, "Failed to encrypt token");
                return;
            }
        };

        if let Err(e) = self.jar.set(kind.name(), &sealed, ttl) {
            tracing::warn!(kind = ?kind, error = %e, "Failed to write token cookie");
        }
    }

    pub fn get_token(&self, kind: TokenKind) -> Option<String> {
        let sealed = self.jar.get(kind.name())?;

        match self.cipher.decrypt(&sealed) {
            Some(value) if !value.is_empty() => Some(value),
            _ => {
                tracing::debug!(kind = ?kind, "Ignoring undecryptable token cookie");
                None
            }
        }
    }

    pub fn remove_token(&self, kind: TokenKind) {
        self.jar.remove(kind.name());
    }

    pub fn clear_all_tokens(&self) {
        for kind in TokenKind::ALL {
            self.jar.remove(kind.name());
        }
    }

    pub fn default_ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.ttls.access_token_ttl,
            TokenKind::Refresh => self.ttls.refresh_token_ttl,
            TokenKind::EmailVerification | TokenKind::ResetPassword => self.ttls.aux_token_ttl,
            TokenKind::AgeVerified
            | TokenKind::LocationVerified
            | TokenKind::FirstTimeUser
            | TokenKind::ProfileCompleted => self.ttls.flag_ttl,
        }
    }

    /// Cookie lifetime for a JWT: its own `exp` when readable, the configured default otherwise.
    fn jwt_ttl(&self, kind: TokenKind, token: &str) -> Duration {
        decode_claims(token)
            .and_then(|claims| claims.expires_in(Utc::now()))
            .unwrap_or_else(|| self.default_ttl(kind))
    }

    pub fn store_access_token(&self, token: &str) {
        self.set_token(TokenKind::Access, token, self.jwt_ttl(TokenKind::Access, token));
    }

    pub fn store_refresh_token(&self, token: &str) {
        self.set_token(
            TokenKind::Refresh,
            token,
            self.jwt_ttl(TokenKind::Refresh, token),
        );
    }

    pub fn store_credentials(&self, pair: &CredentialPair) {
        self.store_access_token(&pair.access_token);
        self.store_refresh_token(&pair.refresh_token);
    }

    pub fn access_token(&self) -> Option<String> {
        self.get_token(TokenKind::Access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get_token(TokenKind::Refresh)
    }

    /// Both halves, or `None` when either is missing or unreadable.
    pub fn credentials(&self) -> Option<CredentialPair> {
        Some(CredentialPair {
            access_token: self.access_token()?,
            refresh_token: self.refresh_token()?,
        })
    }

    pub fn has_any_credential(&self) -> bool {
        self.access_token().is_some() || self.refresh_token().is_some()
    }

    pub fn set_flag(&self, kind: TokenKind) {
        debug_assert!(kind.is_flag());
        self.set_token(kind, FLAG_VALUE, self.default_ttl(kind));
    }

    pub fn flag(&self, kind: TokenKind) -> bool {
        self.get_token(kind).as_deref() == Some(FLAG_VALUE)
    }
}
