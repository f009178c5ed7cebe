//! Checkins and the venue-grouped brewery feed.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::Locale;

/// A single logged consumption event, mapped from the API.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkin {
    pub id: u64,
    pub beer: BeerRef,
    pub venue: Venue,
    pub user: CheckinUser,
    /// Comment as posted, HTML included
    pub comment: String,
    /// Rounded to 2 decimals; `None` when the checkin was not rated
    pub rating_score: Option<f64>,
    pub created_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BeerRef {
    pub id: u64,
    pub name: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub id: u64,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub foursquare_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckinUser {
    pub name: String,
    pub location: String,
}

/// Venue id → checkin id → projection.
pub type Feed = BTreeMap<u64, BTreeMap<u64, FeedEntry>>;

/// What a map marker needs to know about one checkin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub lat: f64,
    pub lng: f64,
    pub beer_name: String,
    pub beer_label: String,
    pub user_name: String,
    /// Empty when hidden from this viewer
    pub comment: String,
    pub permalink: String,
    pub location: String,
    pub venue_name: String,
    pub foursquare_url: String,
    pub checkin_date: Option<DateTime<FixedOffset>>,
    /// Raw value; `None` when unrated or hidden from this viewer
    pub rating_score: Option<f64>,
}

/// A feed entry with dates and numbers formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEntry {
    pub lat: f64,
    pub lng: f64,
    pub beer_name: String,
    pub beer_label: String,
    pub user_name: String,
    pub comment: String,
    pub permalink: String,
    pub location: String,
    pub venue_name: String,
    pub foursquare_url: String,
    pub checkin_date: String,
    pub rating_score: String,
}

impl FeedEntry {
    /// Format for the presentation boundary.
    pub fn render(&self, locale: &Locale, date_format: &str) -> RenderedEntry {
        RenderedEntry {
            lat: self.lat,
            lng: self.lng,
            beer_name: self.beer_name.clone(),
            beer_label: self.beer_label.clone(),
            user_name: self.user_name.clone(),
            comment: self.comment.clone(),
            permalink: self.permalink.clone(),
            location: self.location.clone(),
            venue_name: self.venue_name.clone(),
            foursquare_url: self.foursquare_url.clone(),
            checkin_date: self
                .checkin_date
                .map(|d| d.format(date_format).to_string())
                .unwrap_or_default(),
            rating_score: self
                .rating_score
                .map(|r| locale.format_decimal(r, 2))
                .unwrap_or_default(),
        }
    }
}

/// Render a whole feed, keeping the venue/checkin grouping.
pub fn render_feed(
    feed: &Feed,
    locale: &Locale,
    date_format: &str,
) -> BTreeMap<u64, BTreeMap<u64, RenderedEntry>> {
    feed.iter()
        .map(|(venue_id, checkins)| {
            let rendered = checkins
                .iter()
                .map(|(id, entry)| (*id, entry.render(locale, date_format)))
                .collect();
            (*venue_id, rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> FeedEntry {
        FeedEntry {
            lat: 40.0,
            lng: -3.0,
            beer_name: "Hazy IPA".into(),
            beer_label: String::new(),
            user_name: "alice".into(),
            comment: "Great".into(),
            permalink: String::new(),
            location: String::new(),
            venue_name: "Taproom".into(),
            foursquare_url: String::new(),
            checkin_date: DateTime::parse_from_rfc2822("Sat, 17 Feb 2024 12:00:00 +0000").ok(),
            rating_score: Some(3.75),
        }
    }

    #[test]
    fn test_render_formats_rating_and_date() {
        let rendered = sample_entry().render(&Locale::new("de_DE"), "%Y-%m-%d");
        assert_eq!(rendered.rating_score, "3,75");
        assert_eq!(rendered.checkin_date, "2024-02-17");
    }

    #[test]
    fn test_render_hidden_rating_is_empty() {
        let mut entry = sample_entry();
        entry.rating_score = None;
        entry.checkin_date = None;

        let rendered = entry.render(&Locale::default(), "%Y-%m-%d");
        assert_eq!(rendered.rating_score, "");
        assert_eq!(rendered.checkin_date, "");
    }
}
