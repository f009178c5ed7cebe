//! Persistence backends for cached results and durable options.
//!
//! The core never talks to a database directly. Hosts hand it two stores:
//!
//! - [`TransientStore`]: expiring JSON values keyed by operation fingerprint
//! - [`OptionStore`]: small durable strings (cache health, rate limit,
//!   registered map shortcodes)
//!
//! ## Directory Structure ([`LocalStore`])
//!
//! ```text
//! {root}/
//! ├── options.json          # Durable options, one flat object
//! └── transients/
//!     ├── urwc_feed_<hash>.json
//!     └── urwc_beer_<hash>.json
//! ```

pub mod local;
pub mod memory;

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Expiring key/value storage for computed results.
pub trait TransientStore: Send + Sync {
    /// Fetch a live value. Expired entries read as `None`.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` for `ttl`.
    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;

    /// Remove one entry. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry whose key starts with `prefix`, returning how many.
    fn purge(&self, prefix: &str) -> Result<usize>;
}

/// Durable string options.
pub trait OptionStore: Send + Sync {
    fn get_option(&self, key: &str) -> Result<Option<String>>;
    fn set_option(&self, key: &str, value: &str) -> Result<()>;
    fn delete_option(&self, key: &str) -> Result<()>;
}

/// A stored transient with its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
    /// `None` when the ttl does not fit in a timestamp
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn new(value: Value, ttl: Duration) -> Self {
        let stored_at = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| stored_at.checked_add_signed(delta));
        Self {
            value,
            stored_at,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
