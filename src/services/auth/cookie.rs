use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};

/// Browsers drop cookies larger than this.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// Storage backend for the token store.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&self, name: &str, value: &str, max_age: Duration) -> Result<()>;

    /// Expires the cookie immediately.
    fn remove(&self, name: &str);
}

pub fn create_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> Result<HeaderValue> {
    let secure_flag = if secure { "; Secure" } else { "" };
    let cookie_value = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax{}",
        name, value, max_age_secs, secure_flag
    );

    HeaderValue::from_str(&cookie_value)
        .map_err(|_| AppError::InvalidParams(format!("Invalid cookie value for {name}")))
}

pub fn clear_cookie(name: &str, secure: bool) -> HeaderValue {
    let secure_flag = if secure { "; Secure" } else { "" };
    let cookie_value = format!("{}=; Path=/; Max-Age=0; SameSite=Lax{}", name, secure_flag);

    // Cookie names are static ASCII identifiers.
    HeaderValue::from_str(&cookie_value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|val| val.to_str().ok())
        .find_map(|val| {
            val.split(';').find_map(|cookie| {
                cookie
                    .trim()
                    .strip_prefix(&format!("{}=", name))
                    .map(|cookie_str| cookie_str.to_string())
            })
        })
}

/// Process-local jar used by the API client.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, StoredCookie>>,
}

struct StoredCookie {
    value: String,
    expires_at: DateTime<Utc>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cookie| cookie.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes a raw value, bypassing encryption. Lets callers simulate a hand-edited cookie.
    pub fn insert_raw(&self, name: &str, value: &str) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                StoredCookie {
                    value: value.to_string(),
                    expires_at: DateTime::<Utc>::MAX_UTC,
                },
            );
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = match cookies.get(name) {
            Some(cookie) if cookie.expires_at > Utc::now() => return Some(cookie.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            cookies.remove(name);
        }
        None
    }

    fn set(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
        if name.len() + value.len() > MAX_COOKIE_BYTES {
            return Err(AppError::InvalidParams(format!(
                "Cookie {name} exceeds {MAX_COOKIE_BYTES} bytes"
            )));
        }

        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| AppError::InvalidParams(e.to_string()))?;
        let expires_at = Utc::now()
            .checked_add_signed(max_age)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.to_string(),
                StoredCookie {
                    value: value.to_string(),
                    expires_at,
                },
            );
        Ok(())
    }

    fn remove(&self, name: &str) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

/// Jar over a single HTTP exchange: reads the request's `Cookie` header and records writes as
/// `Set-Cookie` values for the response.
pub struct HeaderCookieJar {
    incoming: Mutex<HashMap<String, String>>,
    outgoing: Mutex<Vec<HeaderValue>>,
    secure: bool,
}

impl HeaderCookieJar {
    pub fn from_headers(headers: &HeaderMap, names: &[&str], secure: bool) -> Self {
        let incoming = names
            .iter()
            .filter_map(|name| extract_cookie(headers, name).map(|value| (name.to_string(), value)))
            .collect();

        Self {
            incoming: Mutex::new(incoming),
            outgoing: Mutex::new(Vec::new()),
            secure,
        }
    }

    pub fn take_set_cookies(&self) -> Vec<HeaderValue> {
        std::mem::take(&mut *self.outgoing.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl CookieJar for HeaderCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
        let header_value = create_cookie(name, value, max_age.as_secs(), self.secure)?;

        self.incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(header_value);
        Ok(())
    }

    fn remove(&self, name: &str) {
        self.incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(clear_cookie(name, self.secure));
    }
}
