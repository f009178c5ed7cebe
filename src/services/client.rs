// src/services/client.rs

//! Untappd HTTP client.
//!
//! [`ApiTransport`] is the seam between the core and the network: the
//! reqwest-backed [`UntappdClient`] signs every call with the client
//! credentials and turns transport failures and non-2xx answers into
//! typed errors. The typed endpoint helpers at the bottom decode the
//! `response` envelope into the wire structs of [`crate::models::api`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::ApiCredentials;
use crate::models::api::{
    BeerInfoResponse, BeerSearchResponse, BreweryCheckinsResponse, BrewerySearchResponse, Meta,
};
use crate::utils::http::{RATE_LIMIT_HEADER, create_client};

/// A successful (2xx) API answer.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Value,
}

/// Issues one GET against the rating API.
pub trait ApiTransport: Send + Sync {
    /// Call `endpoint` with `params`. Credentials are added by the transport.
    fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<RawResponse>;

    /// Remaining call budget reported by the API, shared with the transport.
    fn rate_limit(&self) -> RateLimitState;
}

const UNKNOWN: u64 = u64::MAX;

/// Remaining-calls counter, updated after every response that carries it.
///
/// Advisory only: nothing throttles on it locally.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    remaining: Arc<AtomicU64>,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self {
            remaining: Arc::new(AtomicU64::new(UNKNOWN)),
        }
    }

    /// Last reported budget, `None` before the first response.
    pub fn remaining(&self) -> Option<u64> {
        match self.remaining.load(Ordering::Relaxed) {
            UNKNOWN => None,
            value => Some(value),
        }
    }

    pub fn record(&self, remaining: u64) {
        self.remaining.store(remaining.min(UNKNOWN - 1), Ordering::Relaxed);
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking reqwest implementation of [`ApiTransport`].
pub struct UntappdClient {
    http: Client,
    credentials: ApiCredentials,
    base: Url,
    rate_limit: RateLimitState,
}

impl UntappdClient {
    /// Build a client for the given credentials and per-request timeout.
    pub fn new(credentials: ApiCredentials, timeout_secs: u64) -> Result<Self> {
        let mut base = Url::parse(&credentials.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            http: create_client(&credentials, timeout_secs)?,
            credentials,
            base,
            rate_limit: RateLimitState::new(),
        })
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base.join(endpoint.trim_start_matches('/'))?)
    }
}

impl ApiTransport for UntappdClient {
    fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<RawResponse> {
        let url = self.endpoint_url(endpoint)?;
        log::debug!("GET {} {:?}", url, params);

        let mut query: Vec<(&str, &str)> = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        query.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self.http.get(url).query(&query).send()?;

        let status = response.status().as_u16();
        if let Some(remaining) = response
            .headers()
            .get(RATE_LIMIT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.rate_limit.record(remaining);
        }

        let text = response.text()?;

        if !(200..300).contains(&status) {
            return Err(remote_error(status, &text));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            AppError::remote("malformed_response", e.to_string(), status)
        })?;

        if let Some(err) = embedded_error(status, &body) {
            return Err(err);
        }

        Ok(RawResponse { status, body })
    }

    fn rate_limit(&self) -> RateLimitState {
        self.rate_limit.clone()
    }
}

fn meta_of(body: &Value) -> Meta {
    body.get("meta")
        .cloned()
        .and_then(|m| serde_json::from_value(m).ok())
        .unwrap_or_default()
}

fn error_from_meta(status: u16, meta: Meta) -> AppError {
    let code = meta
        .error_type
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| format!("http_{status}"));
    let message = meta
        .error_detail
        .or(meta.developer_friendly)
        .unwrap_or_default();
    AppError::remote(code, message, status)
}

/// Build the error for a non-2xx answer, using the `meta` block when present.
fn remote_error(status: u16, text: &str) -> AppError {
    let meta = serde_json::from_str::<Value>(text)
        .map(|body| meta_of(&body))
        .unwrap_or_default();
    error_from_meta(status, meta)
}

/// Some errors arrive with a 200 status and a failing `meta.code`.
fn embedded_error(status: u16, body: &Value) -> Option<AppError> {
    let meta = meta_of(body);
    match meta.code {
        Some(code) if code >= 400 => {
            let code = u16::try_from(code).unwrap_or(status);
            Some(error_from_meta(code, meta))
        }
        _ if meta.error_type.as_deref().is_some_and(|t| !t.is_empty()) => {
            Some(error_from_meta(status, meta))
        }
        _ => None,
    }
}

/// Decode the `response` envelope, treating a missing or non-object
/// envelope as empty.
fn decode<T: DeserializeOwned + Default>(raw: RawResponse) -> Result<T> {
    match raw.body.get("response") {
        Some(inner) if inner.is_object() => serde_json::from_value(inner.clone())
            .map_err(|e| AppError::remote("malformed_response", e.to_string(), raw.status)),
        _ => Ok(T::default()),
    }
}

// --- Typed endpoints ---

/// One page of a brewery's activity feed.
pub fn brewery_checkins(
    api: &dyn ApiTransport,
    brewery_id: u64,
    cursor: Option<&str>,
    limit: Option<u32>,
) -> Result<BreweryCheckinsResponse> {
    let mut params = Vec::new();
    if let Some(max_id) = cursor {
        params.push(("max_id", max_id.to_string()));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    decode(api.call(&format!("brewery/checkins/{brewery_id}"), &params)?)
}

pub fn beer_info(api: &dyn ApiTransport, bid: u64) -> Result<BeerInfoResponse> {
    decode(api.call(&format!("beer/info/{bid}"), &[("compact", "false".to_string())])?)
}

pub fn search_beer(api: &dyn ApiTransport, term: &str) -> Result<BeerSearchResponse> {
    decode(api.call("search/beer", &[("q", term.to_string())])?)
}

pub fn search_brewery(api: &dyn ApiTransport, term: &str) -> Result<BrewerySearchResponse> {
    decode(api.call("search/brewery", &[("q", term.to_string())])?)
}
