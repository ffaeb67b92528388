pub struct CacheKey;

impl CacheKey {
    pub fn request(path: &str, query: &[(String, String)]) -> String {
        if query.is_empty() {
            return format!("GET {path}");
        }

        let query = query
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("GET {path}?{query}")
    }
}
