use serde::Deserialize;

/// Application settings, read from the Rocket figment (`Rocket.toml` or
/// `ROCKET_*` environment variables).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Used to build absolute links in emails.
    #[serde(default = "default_site_url")]
    pub site_url: String,
    #[serde(default = "default_page_cache_ttl_secs")]
    pub page_cache_ttl_secs: u64,
}

fn default_site_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_page_cache_ttl_secs() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            page_cache_ttl_secs: default_page_cache_ttl_secs(),
        }
    }
}

impl AppConfig {
    pub fn link(&self, path: &str) -> String {
        format!("{}{path}", self.site_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::AppConfig;

    #[test]
    fn defaults_apply_when_unset() {
        let config: AppConfig = Figment::new()
            .merge(Serialized::default("port", 8000))
            .extract()
            .unwrap();
        assert_eq!(config.page_cache_ttl_secs, 300);
        assert_eq!(config.link("/reset/abc"), "http://localhost:8000/reset/abc");
    }

    #[test]
    fn site_url_may_have_trailing_slash() {
        let config = AppConfig {
            site_url: "https://playone.example/".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.link("/events"), "https://playone.example/events");
    }
}
