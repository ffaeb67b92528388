const MASKED_PARAMS: &[&str] = &["token=", "refreshToken=", "code="];

/// Replaces the value of every credential-bearing query parameter with `***`.
pub fn mask_uri_token(uri: &str) -> String {
    let Some(query_start) = uri.find('?') else {
        return uri.to_string();
    };

    let (path, query) = uri.split_at(query_start + 1);
    let masked = query
        .split('&')
        .map(|pair| {
            match MASKED_PARAMS
                .iter()
                .find(|param| pair.starts_with(**param))
            {
                Some(param) => format!("{param}***"),
                None => pair.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{path}{masked}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_token_values() {
        assert_eq!(
            mask_uri_token("/auth/verify-email?token=abc.def&lang=pt"),
            "/auth/verify-email?token=***&lang=pt"
        );
        assert_eq!(
            mask_uri_token("/auth?redirect=%2Ffeed&refreshToken=xyz"),
            "/auth?redirect=%2Ffeed&refreshToken=***"
        );
    }

    #[test]
    fn test_leaves_other_params_alone() {
        assert_eq!(mask_uri_token("/posts/feed?page=2&limit=10"), "/posts/feed?page=2&limit=10");
        assert_eq!(mask_uri_token("/health"), "/health");
        assert_eq!(mask_uri_token("/search?mytoken=1"), "/search?mytoken=1");
    }
}
