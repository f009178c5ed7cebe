//! HTTP client utilities.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::Result;
use crate::models::ApiCredentials;

/// Response header carrying the remaining hourly call budget.
pub const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

/// Create a configured blocking HTTP client.
pub fn create_client(credentials: &ApiCredentials, timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&credentials.app_identifier)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}
