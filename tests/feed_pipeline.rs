//! End-to-end feed fetch against a mock Untappd server.

use std::sync::Arc;

use httpmock::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use untappd_ratings::models::{Config, FeedRequest, Viewer};
use untappd_ratings::services::RatingsService;
use untappd_ratings::storage::LocalStore;
use untappd_ratings::AppError;

fn checkin(id: u64, venue_id: u64, comment: &str) -> Value {
    json!({
        "checkin_id": id,
        "created_at": "Sat, 17 Feb 2024 12:00:00 +0000",
        "checkin_comment": comment,
        "rating_score": 3.5,
        "user": { "user_name": "bob", "first_name": "Bob", "location": "Madrid" },
        "beer": { "bid": 16630, "beer_name": "Hazy IPA", "beer_label": "https://x/l.png" },
        "venue": {
            "venue_id": venue_id,
            "venue_name": "Taproom",
            "location": { "lat": 40.4, "lng": -3.7 },
            "foursquare": { "foursquare_url": "https://4sq.com/x" }
        }
    })
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.api.client_id = "cid".into();
    config.api.client_secret = "secret".into();
    config.api.base_url = server.url("/v4/");
    config.api.timeout_secs = 5;
    config.moderation.disallowed = "spam".into();
    config
}

#[test]
fn test_second_page_failure_returns_first_page() {
    let server = MockServer::start();
    let page1 = server.mock(|when, then| {
        when.method(GET)
            .path("/v4/brewery/checkins/42")
            .query_param("client_id", "cid")
            .query_param("limit", "25");
        then.status(200)
            .header("content-type", "application/json")
            .header("X-Ratelimit-Remaining", "99")
            .body(
                json!({
                    "meta": { "code": 200 },
                    "response": {
                        "pagination": { "max_id": "100" },
                        "checkins": { "count": 3, "items": [
                            checkin(1, 10, "Great"),
                            checkin(2, 11, "spam spam"),
                            checkin(3, 10, "")
                        ] }
                    }
                })
                .to_string(),
            );
    });
    let page2 = server.mock(|when, then| {
        when.method(GET)
            .path("/v4/brewery/checkins/42")
            .query_param("max_id", "100");
        then.status(500).body(
            json!({ "meta": { "code": 500, "error_detail": "Server error", "error_type": "server_error" } })
                .to_string(),
        );
    });

    let tmp = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(tmp.path()));
    let service = RatingsService::connect(config_for(&server), store.clone(), store).unwrap();

    let request = FeedRequest::new(42, 50);
    let feed = service.brewery_feed(&request, &Viewer::default()).unwrap();

    assert_eq!(feed.len(), 1);
    assert_eq!(feed[&10].len(), 2);
    assert_eq!(feed[&10][&1].comment, "Great");
    assert_eq!(feed[&10][&1].rating_score, Some(3.5));
    assert_eq!(page1.calls(), 1);
    assert_eq!(page2.calls(), 1);
    assert_eq!(service.rate_limit_remaining(), Some(99));

    // Served from the cache on the second call.
    let again = service.brewery_feed(&request, &Viewer::default()).unwrap();
    assert_eq!(again, feed);
    assert_eq!(page1.calls(), 1);
    assert!(!service.cache_is_degraded());
}

#[test]
fn test_unknown_brewery_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v4/brewery/checkins/7");
        then.status(404).body(
            json!({ "meta": { "code": 404, "error_detail": "Brewery not found", "error_type": "invalid_resource" } })
                .to_string(),
        );
    });

    let tmp = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(tmp.path()));
    let service = RatingsService::connect(config_for(&server), store.clone(), store).unwrap();

    let err = service
        .brewery_feed(&FeedRequest::new(7, 0), &Viewer::default())
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(err.to_payload().error, "Brewery with id 7 does not exist.");
}

#[test]
fn test_first_page_server_error_is_remote() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v4/brewery/checkins/7");
        then.status(500).body(
            json!({ "meta": { "code": 500, "error_detail": "Server error", "error_type": "server_error" } })
                .to_string(),
        );
    });

    let tmp = TempDir::new().unwrap();
    let store = Arc::new(LocalStore::new(tmp.path()));
    let service = RatingsService::connect(config_for(&server), store.clone(), store).unwrap();

    let err = service
        .brewery_feed(&FeedRequest::new(7, 0), &Viewer::default())
        .unwrap_err();
    assert!(matches!(err, AppError::Remote { http_status: 500, .. }));
    assert_eq!(err.to_payload().error, "API not working: Server error");
}
