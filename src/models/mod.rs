// src/models/mod.rs

//! Domain models for the ratings core.
//!
//! `api` holds the wire payloads; everything else is what callers see.

pub mod api;
mod beer;
mod checkin;
mod config;
mod viewer;

// Re-export all public types
pub use beer::{
    AggregateRating, BeerCheckin, BeerRecord, Brand, BreweryMatch, ProductRating, Review,
    ReviewAuthor, ReviewRating, SearchKind, SearchResults, StructuredData,
};
pub(crate) use beer::display_name;
pub use checkin::{
    BeerRef, Checkin, CheckinUser, Feed, FeedEntry, RenderedEntry, Venue, render_feed,
};
pub use config::{ApiConfig, ApiCredentials, CacheConfig, Config, FeedConfig, ModerationConfig};
pub use viewer::{Locale, Viewer};

/// Options a caller sets per brewery feed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedRequest {
    pub brewery_id: u64,
    /// 0 means "as many as allowed"
    pub max_checkins: u32,
    /// Link checkins to shop products selling the same beer
    pub add_product_link: bool,
    /// Hide ratings and comments from viewers who cannot moderate
    pub show_ratings_to_admin_only: bool,
}

impl FeedRequest {
    pub fn new(brewery_id: u64, max_checkins: u32) -> Self {
        Self {
            brewery_id,
            max_checkins,
            add_product_link: true,
            show_ratings_to_admin_only: false,
        }
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Untappd HQ, used when no home coordinates are configured.
    pub const UNTAPPD_HQ: Coordinates = Coordinates {
        lat: 34.2346598,
        lng: -77.9482096,
    };

    /// Parse `"lat,lng"`, falling back to [`Coordinates::UNTAPPD_HQ`].
    pub fn parse_or_default(input: &str) -> Self {
        let mut parts = input.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(lat), Some(lng), None) => {
                match (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
                    (Ok(lat), Ok(lng)) if lat.is_finite() && lng.is_finite() => {
                        Coordinates { lat, lng }
                    }
                    _ => Self::UNTAPPD_HQ,
                }
            }
            _ => Self::UNTAPPD_HQ,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_parse() {
        let c = Coordinates::parse_or_default("40.4168, -3.7038");
        assert_eq!(c, Coordinates { lat: 40.4168, lng: -3.7038 });
    }

    #[test]
    fn test_coordinates_fallback() {
        assert_eq!(Coordinates::parse_or_default(""), Coordinates::UNTAPPD_HQ);
        assert_eq!(Coordinates::parse_or_default("1,2,3"), Coordinates::UNTAPPD_HQ);
        assert_eq!(Coordinates::parse_or_default("north,south"), Coordinates::UNTAPPD_HQ);
    }
}
