use url::form_urlencoded;

/// Paths reachable without a session. A pattern is either an exact path or `prefix/*`, which
/// matches the prefix itself and everything below it.
#[derive(Debug, Clone)]
pub struct PublicPaths {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut exact = Vec::new();
        let mut prefixes = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            match pattern.strip_suffix("/*") {
                Some(prefix) => prefixes.push(prefix.trim_end_matches('/').to_string()),
                None => exact.push(normalize(pattern).to_string()),
            }
        }

        Self { exact, prefixes }
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(strip_query(path));

        self.exact.iter().any(|exact| exact == path)
            || self.prefixes.iter().any(|prefix| {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

/// `<login_path>?redirect=<path_and_query>` with the target form-encoded.
pub fn login_redirect(login_path: &str, path_and_query: &str) -> String {
    let encoded: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", path_and_query)
        .finish();
    format!("{login_path}?{encoded}")
}

/// Where to send the user when their session ends while on `current_path`. `None` when they are
/// already on the login surface.
pub fn session_end_target(
    login_path: &str,
    public_paths: &PublicPaths,
    current_path: &str,
) -> Option<String> {
    if normalize(strip_query(current_path)) == normalize(login_path) {
        return None;
    }

    if public_paths.is_public(current_path) {
        Some(login_path.to_string())
    } else {
        Some(login_redirect(login_path, current_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PUBLIC_PATHS;

    #[test]
    fn test_default_patterns() {
        let public = PublicPaths::new(DEFAULT_PUBLIC_PATHS);

        assert!(public.is_public("/"));
        assert!(public.is_public("/about"));
        assert!(public.is_public("/about/"));
        assert!(public.is_public("/auth"));
        assert!(public.is_public("/auth/verify-email?token=x"));
        assert!(public.is_public("/explore/lisbon"));

        assert!(!public.is_public("/feed"));
        assert!(!public.is_public("/aboutus"));
        assert!(!public.is_public("/authors"));
        assert!(!public.is_public("/messages/42"));
    }

    #[test]
    fn test_login_redirect_encodes_target() {
        assert_eq!(
            login_redirect("/auth", "/groups/7?tab=events&sort=new"),
            "/auth?redirect=%2Fgroups%2F7%3Ftab%3Devents%26sort%3Dnew"
        );
    }

    #[test]
    fn test_session_end_target() {
        let public = PublicPaths::new(DEFAULT_PUBLIC_PATHS);

        assert_eq!(
            session_end_target("/auth", &public, "/feed"),
            Some("/auth?redirect=%2Ffeed".to_string())
        );
        assert_eq!(
            session_end_target("/auth", &public, "/about"),
            Some("/auth".to_string())
        );
        assert_eq!(session_end_target("/auth", &public, "/auth?redirect=%2Ffeed"), None);
    }
}
