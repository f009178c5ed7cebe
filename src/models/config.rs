//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Untappd API connection settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Brewery activity feed settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Word lists used to hide or drop checkins
    #[serde(default)]
    pub moderation: ModerationConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Missing credentials are not a validation failure: they leave the
    /// core in its "not configured" state instead.
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.trim().is_empty() {
            let url = Url::parse(&self.api.base_url)?;
            if url.cannot_be_a_base() {
                return Err(AppError::config("api.base_url cannot be a base URL"));
            }
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::config("api.timeout_secs must be > 0"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(AppError::config("cache.ttl_secs must be > 0"));
        }
        if self.feed.max_pages == 0 {
            return Err(AppError::config("feed.max_pages must be > 0"));
        }
        if self.feed.page_size == 0 {
            return Err(AppError::config("feed.page_size must be > 0"));
        }
        Ok(())
    }
}

/// Untappd API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Sent as the User-Agent so Untappd can identify the application
    #[serde(default = "defaults::app_name")]
    pub app_name: String,

    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Credentials, or `None` when any of them is blank.
    pub fn credentials(&self) -> Option<ApiCredentials> {
        let fields = [
            &self.client_id,
            &self.client_secret,
            &self.app_name,
            &self.base_url,
        ];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return None;
        }

        Some(ApiCredentials {
            client_id: self.client_id.trim().to_string(),
            client_secret: self.client_secret.trim().to_string(),
            app_identifier: self.app_name.trim().to_string(),
            base_url: self.base_url.trim().to_string(),
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            app_name: defaults::app_name(),
            base_url: defaults::base_url(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Everything needed to sign a request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub app_identifier: String,
    pub base_url: String,
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a computed result stays fresh, in seconds
    #[serde(default = "defaults::cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: defaults::cache_ttl(),
        }
    }
}

/// Brewery activity feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Upper bound on pages fetched per feed
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Checkins the API returns per page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// "lat,lng" used for checkins at the Untappd at Home venue
    #[serde(default)]
    pub home_coordinates: String,

    /// chrono format for checkin dates at the presentation boundary
    #[serde(default = "defaults::date_format")]
    pub date_format: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::max_pages(),
            page_size: defaults::page_size(),
            home_coordinates: String::new(),
            date_format: defaults::date_format(),
        }
    }
}

/// Line-delimited word lists.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModerationConfig {
    /// Matching checkins are dropped from feeds
    #[serde(default)]
    pub disallowed: String,

    /// Matching checkins keep their venue but hide rating and comment
    #[serde(default)]
    pub moderation: String,
}

mod defaults {
    pub fn app_name() -> String {
        concat!("Untappd Ratings - Ver. ", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn base_url() -> String {
        "https://api.untappd.com/v4/".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn cache_ttl() -> u64 {
        3 * 60 * 60
    }
    pub fn max_pages() -> u32 {
        12
    }
    pub fn page_size() -> u32 {
        25
    }
    pub fn date_format() -> String {
        "%B %-d, %Y".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.base_url, "https://api.untappd.com/v4/");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.cache.ttl_secs, 10_800);
        assert_eq!(config.feed.max_pages, 12);
        assert_eq!(config.feed.page_size, 25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_require_every_field() {
        let mut api = ApiConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            ..ApiConfig::default()
        };
        assert!(api.credentials().is_some());

        api.client_secret = "  ".into();
        assert!(api.credentials().is_none());
    }

    #[test]
    fn test_parse_sections() {
        let config: Config = toml::from_str(
            r#"
            [api]
            client_id = "abc"
            client_secret = "def"

            [feed]
            max_pages = 4
            home_coordinates = "40.4,-3.7"

            [moderation]
            disallowed = "spam\nscam"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.client_id, "abc");
        assert_eq!(config.feed.max_pages, 4);
        assert_eq!(config.feed.home_coordinates, "40.4,-3.7");
        assert_eq!(config.moderation.disallowed.lines().count(), 2);
    }

    #[test]
    fn test_validate_rejects_zero_pages() {
        let mut config = Config::default();
        config.feed.max_pages = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
