//! Beer, brewery and search result records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A beer as returned by the beer info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeerRecord {
    pub bid: u64,
    pub beer_name: String,
    pub beer_slug: String,
    pub beer_label: String,
    pub brewery_name: String,
    /// Rounded to 2 decimals
    pub rating_score: Option<f64>,
    pub rating_count: u64,
    /// Recent checkins embedded in the beer info response
    #[serde(default)]
    pub recent_checkins: Vec<BeerCheckin>,
}

impl BeerRecord {
    /// `"<beer> - <brewery> (#<bid>)"`, as shown in product pickers.
    pub fn display_name(&self) -> String {
        display_name(&self.beer_name, &self.brewery_name, self.bid)
    }
}

pub(crate) fn display_name(beer_name: &str, brewery_name: &str, bid: u64) -> String {
    format!("{beer_name} - {brewery_name} (#{bid})")
}

/// A checkin embedded in beer info, used for product reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeerCheckin {
    pub author: String,
    pub comment: String,
    pub rating_score: Option<f64>,
    /// `YYYY-MM-DD`, empty when the API date was unparsable
    pub date_published: String,
    pub beer_name: String,
}

/// Which catalogue a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Beer,
    Brewery,
}

impl SearchKind {
    /// Shortest accepted non-numeric search term.
    pub fn min_term_chars(self) -> usize {
        match self {
            Self::Beer => 6,
            Self::Brewery => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beer => "beer",
            Self::Brewery => "brewery",
        }
    }
}

/// Search hits keyed by remote id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "lowercase")]
pub enum SearchResults {
    /// bid → display name
    Beers(BTreeMap<u64, String>),
    Breweries(BTreeMap<u64, BreweryMatch>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            Self::Beers(items) => items.len(),
            Self::Breweries(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreweryMatch {
    /// `"(#<id>) - <name>"`
    pub text: String,
    pub brewery_id: u64,
    pub beer_count: u64,
    pub brewery_name: String,
    pub brewery_slug: String,
    pub brewery_page_url: String,
    pub brewery_label: String,
    pub country_name: String,
}

/// Rating summary stored alongside a shop product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRating {
    pub average_rating: f64,
    pub rating_count: u64,
    pub beer_slug: String,
}

/// schema.org fragments describing a beer product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredData {
    #[serde(rename = "aggregateRating", skip_serializing_if = "Option::is_none")]
    pub aggregate_rating: Option<AggregateRating>,
    pub brand: Brand,
    /// Manufacturer part number, `URWC<bid>`
    #[serde(rename = "MPN")]
    pub mpn: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub review: Vec<Review>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRating {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "ratingValue")]
    pub rating_value: f64,
    #[serde(rename = "reviewCount")]
    pub review_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "@type")]
    pub kind: String,
    pub author: ReviewAuthor,
    #[serde(rename = "datePublished")]
    pub date_published: String,
    pub description: String,
    pub name: String,
    #[serde(rename = "reviewRating")]
    pub review_rating: ReviewRating,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAuthor {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRating {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "bestRating")]
    pub best_rating: String,
    #[serde(rename = "ratingValue")]
    pub rating_value: f64,
    #[serde(rename = "worstRating")]
    pub worst_rating: String,
}
