//! Untappd v4 wire payloads.
//!
//! Every field is optional or defaulted. Untappd is loose with its types
//! (ids as strings, `[]` where an object is expected, `""` for a missing
//! cursor), so the lenient deserializers below turn anything unexpected
//! into "absent" instead of failing the whole page.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// The `meta` block present on every response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub code: Option<u64>,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_detail: Option<String>,
    #[serde(default)]
    pub developer_friendly: Option<String>,
}

/// A counted list of items, as returned by checkin and search endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct ItemList<T> {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self {
            count: None,
            items: Vec::new(),
        }
    }
}

// --- brewery/checkins ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BreweryCheckinsResponse {
    #[serde(default, deserialize_with = "object_or_default")]
    pub pagination: Pagination,
    #[serde(default, deserialize_with = "object_or_default")]
    pub checkins: ItemList<RawCheckin>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// Cursor for the next (older) page; absent means no more pages.
    #[serde(default, deserialize_with = "lenient_cursor")]
    pub max_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCheckin {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub checkin_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub checkin_comment: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating_score: Option<f64>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub user: RawUser,
    #[serde(default, deserialize_with = "object_or_default")]
    pub beer: RawBeer,
    #[serde(default, deserialize_with = "object_or_none")]
    pub venue: Option<RawVenue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBeer {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub beer_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub beer_label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub beer_slug: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVenue {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub venue_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub venue_name: String,
    #[serde(default, deserialize_with = "object_or_none")]
    pub location: Option<RawLocation>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub foursquare: Option<RawFoursquare>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocation {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFoursquare {
    #[serde(default, deserialize_with = "lenient_string")]
    pub foursquare_url: String,
}

// --- beer/info ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeerInfoResponse {
    #[serde(default, deserialize_with = "object_or_none")]
    pub beer: Option<RawBeerInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBeerInfo {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub bid: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub beer_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub beer_slug: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub beer_label: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub rating_count: Option<u64>,
    #[serde(default, deserialize_with = "object_or_default")]
    pub brewery: RawBrewery,
    #[serde(default, deserialize_with = "object_or_default")]
    pub checkins: ItemList<RawCheckin>,
}

// --- search/beer and search/brewery ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeerSearchResponse {
    #[serde(default, deserialize_with = "object_or_default")]
    pub beers: ItemList<BeerSearchItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeerSearchItem {
    #[serde(default, deserialize_with = "object_or_default")]
    pub beer: RawBeer,
    #[serde(default, deserialize_with = "object_or_default")]
    pub brewery: RawBrewery,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrewerySearchResponse {
    #[serde(default, deserialize_with = "object_or_default")]
    pub brewery: ItemList<BrewerySearchItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrewerySearchItem {
    #[serde(default, deserialize_with = "object_or_default")]
    pub brewery: RawBrewery,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBrewery {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub brewery_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brewery_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brewery_slug: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brewery_page_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brewery_label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country_name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub beer_count: Option<u64>,
}

// --- lenient field decoders ---

fn object_or_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn object_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(object_or_none(deserializer)?.unwrap_or_default())
}

/// Items that fail to decode are dropped individually.
fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite()))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_cursor<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let cursor = match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };

    Ok(match cursor.as_str() {
        "" | "0" => None,
        _ => Some(cursor),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkin_without_venue_decodes() {
        let raw: RawCheckin = serde_json::from_value(json!({
            "checkin_id": 1001,
            "venue": [],
            "user": { "user_name": "alice" },
        }))
        .unwrap();

        assert_eq!(raw.checkin_id, Some(1001));
        assert!(raw.venue.is_none());
        assert_eq!(raw.user.user_name, "alice");
    }

    #[test]
    fn test_numbers_as_strings() {
        let raw: RawCheckin = serde_json::from_value(json!({
            "checkin_id": "77",
            "rating_score": "3.75",
            "venue": { "venue_id": "12", "location": { "lat": "40.1", "lng": -3.5 } },
        }))
        .unwrap();

        let venue = raw.venue.unwrap();
        let location = venue.location.unwrap();
        assert_eq!(raw.checkin_id, Some(77));
        assert_eq!(raw.rating_score, Some(3.75));
        assert_eq!(venue.venue_id, Some(12));
        assert_eq!(location.lat, Some(40.1));
        assert_eq!(location.lng, Some(-3.5));
    }

    #[test]
    fn test_cursor_normalization() {
        let empty: Pagination = serde_json::from_value(json!({ "max_id": "" })).unwrap();
        let number: Pagination = serde_json::from_value(json!({ "max_id": 98765 })).unwrap();
        let missing: Pagination = serde_json::from_value(json!({})).unwrap();

        assert_eq!(empty.max_id, None);
        assert_eq!(number.max_id.as_deref(), Some("98765"));
        assert_eq!(missing.max_id, None);
    }

    #[test]
    fn test_bad_items_are_dropped() {
        let list: ItemList<RawBrewery> = serde_json::from_value(json!({
            "count": 2,
            "items": [ { "brewery_id": 5 }, "garbage" ],
        }))
        .unwrap();

        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].brewery_id, Some(5));
    }
}
