//! Service layer for the ratings core.
//!
//! This module contains:
//! - The Untappd HTTP client (`UntappdClient`)
//! - Wire to domain mapping
//! - Word-list moderation (`ContentModerator`)
//! - The public facade (`RatingsService`)

pub mod client;
pub mod mapper;
pub mod moderation;
mod ratings;

pub use client::{ApiTransport, RateLimitState, UntappdClient};
pub use moderation::{ContentModerator, ListKind, Visibility};
pub use ratings::{NoCatalog, ProductCatalog, RATE_LIMIT_OPTION, RatingsService};
