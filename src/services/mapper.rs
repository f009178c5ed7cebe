// src/services/mapper.rs

//! Wire payload → domain record mapping.

use std::collections::BTreeMap;

use chrono::DateTime;

use crate::models::api::{
    BeerInfoResponse, BeerSearchResponse, BrewerySearchResponse, RawCheckin,
};
use crate::models::{
    BeerCheckin, BeerRecord, BeerRef, BreweryMatch, Checkin, CheckinUser, Coordinates, Venue,
    display_name,
};
use crate::utils::text::{sanitize_text, sanitize_textarea};

/// Venue id Untappd uses for checkins logged "at home".
pub const AT_HOME_VENUE_ID: u64 = 9_917_985;

/// Round to two decimals, treating zero as "not rated".
pub fn round_rating(score: Option<f64>) -> Option<f64> {
    score
        .map(|s| (s * 100.0).round() / 100.0)
        .filter(|s| *s != 0.0)
}

/// Map a raw checkin into the domain.
///
/// Returns `None` for records that cannot be placed on a map: no venue,
/// no id, or a zero/absent latitude or longitude. Checkins at the
/// "at home" venue are moved to `home`.
pub fn map_checkin(raw: &RawCheckin, home: Coordinates) -> Option<Checkin> {
    let venue = raw.venue.as_ref()?;
    let location = venue.location.as_ref()?;
    let lat = location.lat.filter(|v| *v != 0.0)?;
    let lng = location.lng.filter(|v| *v != 0.0)?;
    let id = raw.checkin_id?;
    let venue_id = venue.venue_id?;

    let (lat, lng) = if venue_id == AT_HOME_VENUE_ID {
        (home.lat, home.lng)
    } else {
        (lat, lng)
    };

    Some(Checkin {
        id,
        beer: BeerRef {
            id: raw.beer.bid.unwrap_or(0),
            name: raw.beer.beer_name.clone(),
            label: raw.beer.beer_label.clone(),
        },
        venue: Venue {
            id: venue_id,
            name: venue.venue_name.clone(),
            lat,
            lng,
            foursquare_url: venue
                .foursquare
                .as_ref()
                .map(|f| f.foursquare_url.clone())
                .unwrap_or_default(),
        },
        user: CheckinUser {
            name: raw.user.user_name.clone(),
            location: raw.user.location.clone(),
        },
        comment: raw.checkin_comment.clone(),
        rating_score: round_rating(raw.rating_score),
        created_at: DateTime::parse_from_rfc2822(raw.created_at.trim()).ok(),
    })
}

/// Map a beer info payload; `None` when the payload carries no beer.
pub fn map_beer_info(response: BeerInfoResponse) -> Option<BeerRecord> {
    let beer = response.beer?;
    let bid = beer.bid?;
    if beer.beer_name.trim().is_empty() {
        return None;
    }

    let recent_checkins = beer
        .checkins
        .items
        .iter()
        .map(|c| BeerCheckin {
            author: sanitize_text(&c.user.first_name),
            comment: sanitize_textarea(&c.checkin_comment),
            rating_score: round_rating(c.rating_score),
            date_published: DateTime::parse_from_rfc2822(c.created_at.trim())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            beer_name: sanitize_text(&c.beer.beer_name),
        })
        .collect();

    Some(BeerRecord {
        bid,
        beer_name: sanitize_text(&beer.beer_name),
        beer_slug: sanitize_text(&beer.beer_slug),
        beer_label: sanitize_text(&beer.beer_label),
        brewery_name: sanitize_text(&beer.brewery.brewery_name),
        rating_score: round_rating(beer.rating_score),
        rating_count: beer.rating_count.unwrap_or(0),
        recent_checkins,
    })
}

/// bid → `"<beer> - <brewery> (#<bid>)"`.
pub fn map_beer_search(response: BeerSearchResponse) -> BTreeMap<u64, String> {
    response
        .beers
        .items
        .iter()
        .filter_map(|item| {
            let bid = item.beer.bid?;
            let name = display_name(
                &sanitize_text(&item.beer.beer_name),
                &sanitize_text(&item.brewery.brewery_name),
                bid,
            );
            Some((bid, name))
        })
        .collect()
}

pub fn map_brewery_search(response: BrewerySearchResponse) -> BTreeMap<u64, BreweryMatch> {
    response
        .brewery
        .items
        .iter()
        .filter_map(|item| {
            let b = &item.brewery;
            let brewery_id = b.brewery_id?;
            let brewery_name = sanitize_text(&b.brewery_name);
            Some((
                brewery_id,
                BreweryMatch {
                    text: format!("(#{brewery_id}) - {brewery_name}"),
                    brewery_id,
                    beer_count: b.beer_count.unwrap_or(0),
                    brewery_name,
                    brewery_slug: sanitize_text(&b.brewery_slug),
                    brewery_page_url: sanitize_text(&b.brewery_page_url),
                    brewery_label: sanitize_text(&b.brewery_label),
                    country_name: sanitize_text(&b.country_name),
                },
            ))
        })
        .collect()
}
