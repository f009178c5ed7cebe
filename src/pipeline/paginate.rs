//! Cursor-paginated brewery activity feed.
//!
//! Pages are fetched sequentially: the first page carries a `limit`, every
//! later page only the `max_id` cursor returned by the previous one. Each
//! page is mapped, moderated and deep-merged into the running feed.

use crate::error::{AppError, Result};
use crate::models::api::RawCheckin;
use crate::models::{Checkin, Coordinates, Feed, FeedEntry, FeedRequest, Viewer};
use crate::pipeline::merge::DeepMerge;
use crate::services::client::{ApiTransport, brewery_checkins};
use crate::services::mapper::map_checkin;
use crate::services::moderation::{CheckinText, ContentModerator, Visibility};
use crate::services::ProductCatalog;
use crate::utils::text::{sanitize_text, sanitize_textarea, valid_url};

/// Checkins returned per page by the API.
pub const PAGE_SIZE: u32 = 25;

/// Target used when the caller asks for "as many as allowed".
pub const DEFAULT_CHECKINS: u32 = 300;

/// Pages needed for `desired` checkins, capped at `max_pages`.
pub fn pages_for(desired: u32, page_size: u32, max_pages: u32) -> u32 {
    let desired = if desired == 0 { DEFAULT_CHECKINS } else { desired };
    desired.div_ceil(page_size.max(1)).clamp(1, max_pages.max(1))
}

/// Everything a feed fetch reads but does not own.
pub struct FeedContext<'a> {
    pub api: &'a dyn ApiTransport,
    pub moderator: &'a ContentModerator,
    pub catalog: &'a dyn ProductCatalog,
    pub home: Coordinates,
    pub max_pages: u32,
    pub page_size: u32,
}

/// Fetch up to `request.max_checkins` checkins as a venue-grouped feed.
///
/// A failing first page is an error. A failing later page ends
/// pagination with what was already collected.
pub fn fetch_feed(ctx: &FeedContext<'_>, request: &FeedRequest, viewer: &Viewer) -> Result<Feed> {
    let page_size = ctx.page_size.max(1);
    let pages = pages_for(request.max_checkins, page_size, ctx.max_pages);
    let first_limit = match request.max_checkins {
        0 => page_size,
        n => n.min(page_size),
    };

    log::info!(
        "Fetching brewery {} feed: up to {} pages",
        request.brewery_id,
        pages
    );

    let mut feed = Feed::new();
    let mut cursor: Option<String> = None;

    for page in 1..=pages {
        let response = if page == 1 {
            brewery_checkins(ctx.api, request.brewery_id, None, Some(first_limit))?
        } else {
            let Some(max_id) = cursor.as_deref() else {
                break;
            };
            match brewery_checkins(ctx.api, request.brewery_id, Some(max_id), None) {
                Ok(response) => response,
                Err(e) => {
                    log::warn!(
                        "Brewery {} page {} failed, keeping {} venues: {}",
                        request.brewery_id,
                        page,
                        feed.len(),
                        e
                    );
                    break;
                }
            }
        };

        let page_feed = build_page(ctx, &response.checkins.items, request, viewer);
        log::debug!(
            "Brewery {} page {}: {} raw checkins, {} venues kept",
            request.brewery_id,
            page,
            response.checkins.items.len(),
            page_feed.len()
        );

        if page == 1 && page_feed.is_empty() {
            return Err(AppError::empty("Empty feed."));
        }

        feed.deep_merge(page_feed);

        cursor = response
            .pagination
            .max_id
            .filter(|c| !c.trim().is_empty());
        if cursor.is_none() {
            break;
        }
    }

    Ok(feed)
}

fn build_page(
    ctx: &FeedContext<'_>,
    raw: &[RawCheckin],
    request: &FeedRequest,
    viewer: &Viewer,
) -> Feed {
    let mut feed = Feed::new();

    for checkin in raw.iter().filter_map(|c| map_checkin(c, ctx.home)) {
        let text = CheckinText::from_checkin(&checkin);
        let visibility = Visibility::decide(
            ctx.moderator,
            &text,
            request.show_ratings_to_admin_only,
            viewer.can_moderate,
        );

        let Visibility::Shown { show_rating } = visibility else {
            log::debug!("Checkin {} dropped by disallowed list", checkin.id);
            continue;
        };

        let permalink = if request.add_product_link {
            ctx.catalog.permalink(checkin.beer.id).unwrap_or_default()
        } else {
            String::new()
        };

        feed.entry(checkin.venue.id)
            .or_default()
            .insert(checkin.id, entry_for(&checkin, show_rating, permalink));
    }

    feed
}

fn entry_for(checkin: &Checkin, show_rating: bool, permalink: String) -> FeedEntry {
    let (comment, rating_score) = if show_rating {
        (sanitize_textarea(&checkin.comment), checkin.rating_score)
    } else {
        (String::new(), None)
    };

    FeedEntry {
        lat: checkin.venue.lat,
        lng: checkin.venue.lng,
        beer_name: sanitize_text(&checkin.beer.name),
        beer_label: sanitize_text(&checkin.beer.label),
        user_name: sanitize_text(&checkin.user.name),
        comment,
        permalink,
        location: sanitize_text(&checkin.user.location),
        venue_name: sanitize_text(&checkin.venue.name),
        foursquare_url: valid_url(&checkin.venue.foursquare_url),
        checkin_date: checkin.created_at,
        rating_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModerationConfig;
    use crate::services::NoCatalog;
    use crate::services::client::{RateLimitState, RawResponse};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    /// Replays canned answers and records every call.
    struct ScriptedApi {
        answers: Mutex<Vec<Result<Value>>>,
        calls: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl ScriptedApi {
        fn new(answers: Vec<Result<Value>>) -> Self {
            Self {
                answers: Mutex::new(answers.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<(String, String)>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ApiTransport for ScriptedApi {
        fn call(&self, _endpoint: &str, params: &[(&str, String)]) -> Result<RawResponse> {
            self.calls.lock().unwrap().push(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            let next = self
                .answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(AppError::transport("no more answers")));
            next.map(|body| RawResponse { status: 200, body })
        }

        fn rate_limit(&self) -> RateLimitState {
            RateLimitState::new()
        }
    }

    struct FixedCatalog;

    impl ProductCatalog for FixedCatalog {
        fn permalink(&self, beer_id: u64) -> Option<String> {
            (beer_id == 7).then(|| "https://shop.example/hazy".to_string())
        }
    }

    fn checkin(id: u64, venue_id: u64, comment: &str) -> Value {
        json!({
            "checkin_id": id,
            "created_at": "Sat, 17 Feb 2024 12:00:00 +0000",
            "checkin_comment": comment,
            "rating_score": 4.25,
            "user": { "user_name": "bob", "location": "Madrid" },
            "beer": { "bid": 7, "beer_name": "Hazy IPA" },
            "venue": {
                "venue_id": venue_id,
                "venue_name": "Taproom",
                "location": { "lat": 40.0, "lng": -3.0 },
                "foursquare": { "foursquare_url": "https://4sq.com/x" }
            }
        })
    }

    fn page(cursor: &str, items: Vec<Value>) -> Result<Value> {
        Ok(json!({
            "meta": { "code": 200 },
            "response": {
                "pagination": { "max_id": cursor },
                "checkins": { "count": items.len(), "items": items }
            }
        }))
    }

    fn run(api: &ScriptedApi, moderator: &ContentModerator, request: &FeedRequest) -> Result<Feed> {
        let ctx = FeedContext {
            api,
            moderator,
            catalog: &FixedCatalog,
            home: Coordinates::UNTAPPD_HQ,
            max_pages: 12,
            page_size: PAGE_SIZE,
        };
        fetch_feed(&ctx, request, &Viewer::default())
    }

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(0, 25, 12), 12);
        assert_eq!(pages_for(1, 25, 12), 1);
        assert_eq!(pages_for(25, 25, 12), 1);
        assert_eq!(pages_for(26, 25, 12), 2);
        assert_eq!(pages_for(5000, 25, 12), 12);
        assert_eq!(pages_for(100, 25, 2), 2);
    }

    #[test]
    fn test_first_page_sends_limit_later_pages_only_cursor() {
        let api = ScriptedApi::new(vec![
            page("100", vec![checkin(1, 10, "")]),
            page("", vec![checkin(2, 11, "")]),
        ]);

        let feed = run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 40)).unwrap();
        assert_eq!(feed.len(), 2);

        let calls = api.calls();
        assert_eq!(calls[0], vec![("limit".to_string(), "25".to_string())]);
        assert_eq!(calls[1], vec![("max_id".to_string(), "100".to_string())]);
    }

    #[test]
    fn test_small_request_limits_first_page() {
        let api = ScriptedApi::new(vec![page("100", vec![checkin(1, 10, "")])]);

        run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 5)).unwrap();
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec![("limit".to_string(), "5".to_string())]);
    }

    #[test]
    fn test_stops_on_empty_cursor() {
        let api = ScriptedApi::new(vec![page("0", vec![checkin(1, 10, "")])]);

        let feed = run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 0)).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn test_later_page_error_keeps_collected_checkins() {
        let api = ScriptedApi::new(vec![
            page("100", vec![checkin(1, 10, "")]),
            Err(AppError::remote("http_500", "boom", 500)),
        ]);

        let feed = run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 100)).unwrap();
        assert!(feed[&10].contains_key(&1));
        assert_eq!(api.calls().len(), 2);
    }

    #[test]
    fn test_first_page_error_propagates() {
        let api = ScriptedApi::new(vec![Err(AppError::remote("invalid_auth", "nope", 500))]);

        let err = run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 0)).unwrap_err();
        assert!(err.has_remote_code("invalid_auth"));
    }

    #[test]
    fn test_empty_first_page_is_empty_result() {
        let api = ScriptedApi::new(vec![page("", vec![])]);

        let err = run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 0)).unwrap_err();
        assert!(matches!(err, AppError::EmptyResult(_)));
    }

    #[test]
    fn test_same_venue_across_pages_is_merged() {
        let api = ScriptedApi::new(vec![
            page("100", vec![checkin(1, 10, "")]),
            page("", vec![checkin(2, 10, "")]),
        ]);

        let feed = run(&api, &ContentModerator::empty(), &FeedRequest::new(42, 50)).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[&10].len(), 2);
    }

    #[test]
    fn test_moderation_applies_on_every_page() {
        let moderator = ContentModerator::new(&ModerationConfig {
            disallowed: "spam".into(),
            moderation: "rude".into(),
        })
        .unwrap();
        let api = ScriptedApi::new(vec![
            page("100", vec![checkin(1, 10, "nice"), checkin(2, 10, "spam here")]),
            page("", vec![checkin(3, 11, "<b>rude</b> stuff")]),
        ]);

        let feed = run(&api, &moderator, &FeedRequest::new(42, 50)).unwrap();

        assert!(!feed[&10].contains_key(&2));
        let shown = &feed[&10][&1];
        assert_eq!(shown.comment, "nice");
        assert_eq!(shown.rating_score, Some(4.25));
        assert_eq!(shown.permalink, "https://shop.example/hazy");

        let hidden = &feed[&11][&3];
        assert_eq!(hidden.comment, "");
        assert_eq!(hidden.rating_score, None);
    }

    #[test]
    fn test_product_link_can_be_disabled() {
        let api = ScriptedApi::new(vec![page("", vec![checkin(1, 10, "")])]);
        let mut request = FeedRequest::new(42, 10);
        request.add_product_link = false;

        let feed = run(&api, &ContentModerator::empty(), &request).unwrap();
        assert_eq!(feed[&10][&1].permalink, "");
    }

    #[test]
    fn test_no_catalog_links_nothing() {
        let api = ScriptedApi::new(vec![page("", vec![checkin(1, 10, "")])]);
        let ctx = FeedContext {
            api: &api,
            moderator: &ContentModerator::empty(),
            catalog: &NoCatalog,
            home: Coordinates::UNTAPPD_HQ,
            max_pages: 12,
            page_size: PAGE_SIZE,
        };

        let feed = fetch_feed(&ctx, &FeedRequest::new(42, 10), &Viewer::default()).unwrap();
        assert_eq!(feed[&10][&1].permalink, "");
    }
}
