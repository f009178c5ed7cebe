// src/services/ratings.rs

//! Public entry point of the ratings core.
//!
//! [`RatingsService`] validates caller input, derives a cache fingerprint
//! from everything that shapes the answer, and delegates to the cache,
//! which only reaches the API on a miss.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{AppError, INVALID_RESOURCE, Result};
use crate::models::{
    AggregateRating, BeerRecord, Brand, Config, Coordinates, Feed, FeedRequest, ModerationConfig,
    ProductRating, Review, ReviewAuthor, ReviewRating, SearchKind, SearchResults, StructuredData,
    Viewer,
};
use crate::pipeline::cache::{CacheHealth, ResponseCache};
use crate::pipeline::paginate::{FeedContext, fetch_feed};
use crate::services::client::{self, ApiTransport, UntappdClient};
use crate::services::mapper::{map_beer_info, map_beer_search, map_brewery_search};
use crate::services::moderation::{ContentModerator, ListKind};
use crate::storage::{OptionStore, TransientStore};
use crate::utils::text::{char_len, sanitize_text};
use crate::utils::{KEY_PREFIX, fingerprint, short_id};

/// Option holding the last reported API call budget.
pub const RATE_LIMIT_OPTION: &str = "urwc_ratelimit_remaining";

/// Option holding a digest of the word lists the cache was filled with.
pub const MODERATION_DIGEST_OPTION: &str = "urwc_moderation_digest";

const RATE_LIMIT_UNKNOWN: u64 = u64::MAX;

/// Looks up shop products linked to a beer.
pub trait ProductCatalog: Send + Sync {
    /// URL of a published product selling `beer_id`, if any.
    fn permalink(&self, beer_id: u64) -> Option<String>;

    /// Brand name used when the API does not name the brewery.
    fn shop_name(&self) -> Option<String> {
        None
    }
}

/// A catalog with no products.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCatalog;

impl ProductCatalog for NoCatalog {
    fn permalink(&self, _beer_id: u64) -> Option<String> {
        None
    }
}

/// Facade over client, pagination, moderation and cache.
pub struct RatingsService {
    config: Config,
    api: Option<Arc<dyn ApiTransport>>,
    options: Arc<dyn OptionStore>,
    cache: ResponseCache,
    moderator: ContentModerator,
    catalog: Arc<dyn ProductCatalog>,
    home: Coordinates,
    persisted_rate_limit: AtomicU64,
}

impl RatingsService {
    /// Assemble a service from explicit parts.
    ///
    /// `api` is `None` when no credentials are configured; every remote
    /// operation then fails with [`AppError::NotConfigured`].
    ///
    /// Cached results are purged when the word lists differ from the ones
    /// recorded by the previous run on the same stores.
    pub fn new(
        config: Config,
        api: Option<Arc<dyn ApiTransport>>,
        transients: Arc<dyn TransientStore>,
        options: Arc<dyn OptionStore>,
    ) -> Result<Self> {
        config.validate()?;

        let moderator = ContentModerator::new(&config.moderation)?;
        let health = CacheHealth::restore(options.as_ref());
        let cache = ResponseCache::new(
            transients,
            options.clone(),
            health,
            Duration::from_secs(config.cache.ttl_secs),
        );
        let home = Coordinates::parse_or_default(&config.feed.home_coordinates);
        let persisted_rate_limit = options
            .get_option(RATE_LIMIT_OPTION)
            .ok()
            .flatten()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(RATE_LIMIT_UNKNOWN);

        let service = Self {
            config,
            api,
            options,
            cache,
            moderator,
            catalog: Arc::new(NoCatalog),
            home,
            persisted_rate_limit: AtomicU64::new(persisted_rate_limit),
        };
        service.sync_moderation_digest();
        Ok(service)
    }

    /// Build the HTTP client from the configured credentials.
    pub fn connect(
        config: Config,
        transients: Arc<dyn TransientStore>,
        options: Arc<dyn OptionStore>,
    ) -> Result<Self> {
        let api: Option<Arc<dyn ApiTransport>> = match config.api.credentials() {
            Some(credentials) => Some(Arc::new(UntappdClient::new(
                credentials,
                config.api.timeout_secs,
            )?)),
            None => {
                log::warn!("Untappd credentials missing, API calls disabled");
                None
            }
        };
        Self::new(config, api, transients, options)
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ProductCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.api.is_some()
    }

    fn api(&self) -> Result<&dyn ApiTransport> {
        self.api.as_deref().ok_or(AppError::NotConfigured)
    }

    // --- Brewery feed ---

    /// Venue-grouped checkins of a brewery, moderated for `viewer`.
    pub fn brewery_feed(&self, request: &FeedRequest, viewer: &Viewer) -> Result<Feed> {
        let api = self.api()?;
        if request.brewery_id == 0 {
            return Err(AppError::invalid_input("Invalid brewery id."));
        }

        let key = fingerprint(
            "feed",
            &[
                &request.brewery_id.to_string(),
                &request.max_checkins.to_string(),
                viewer.role(),
                viewer.locale.code(),
                bool_part(request.show_ratings_to_admin_only),
                bool_part(request.add_product_link),
                &format!("{},{}", self.home.lat, self.home.lng),
                &self.config.feed.page_size.to_string(),
                &self.config.feed.max_pages.to_string(),
            ],
        );

        let result = self.cache.get_or_compute(&key, || {
            let ctx = FeedContext {
                api,
                moderator: &self.moderator,
                catalog: self.catalog.as_ref(),
                home: self.home,
                max_pages: self.config.feed.max_pages,
                page_size: self.config.feed.page_size,
            };
            fetch_feed(&ctx, request, viewer).map_err(|e| {
                if e.has_remote_code(INVALID_RESOURCE) {
                    AppError::not_found(format!(
                        "Brewery with id {} does not exist.",
                        request.brewery_id
                    ))
                } else {
                    e
                }
            })
        });
        self.persist_rate_limit();

        result.inspect_err(|e| {
            log::warn!("Brewery {} feed failed: {}", request.brewery_id, e);
        })
    }

    /// Register a brewery map and return its short id.
    pub fn register_map(&self, brewery_id: u64, max_checkins: u32) -> Result<String> {
        self.api()?;
        if brewery_id == 0 {
            return Err(AppError::invalid_input("Invalid brewery id."));
        }

        let scid = short_id(&format!("{brewery_id}_{max_checkins}"));
        self.options
            .set_option(&map_option("scid", &scid), &brewery_id.to_string())?;
        self.options
            .set_option(&map_option("max_checkins", &scid), &max_checkins.to_string())?;

        log::info!(
            "Registered map {} for brewery {} ({} checkins)",
            scid,
            brewery_id,
            max_checkins
        );
        Ok(scid)
    }

    /// Feed of a map registered with [`RatingsService::register_map`].
    pub fn brewery_feed_for_map(
        &self,
        scid: &str,
        add_product_link: bool,
        show_ratings_to_admin_only: bool,
        viewer: &Viewer,
    ) -> Result<Feed> {
        self.api()?;
        let unknown = || AppError::invalid_input(format!("Unknown map id {scid}."));

        let brewery_id = self
            .options
            .get_option(&map_option("scid", scid))?
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(unknown)?;
        let max_checkins = self
            .options
            .get_option(&map_option("max_checkins", scid))?
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(0);

        let request = FeedRequest {
            brewery_id,
            max_checkins,
            add_product_link,
            show_ratings_to_admin_only,
        };
        self.brewery_feed(&request, viewer)
    }

    // --- Beers ---

    /// Details of one beer.
    pub fn beer_info(&self, beer_id: u64) -> Result<BeerRecord> {
        let api = self.api()?;
        if beer_id == 0 {
            return Err(AppError::invalid_input("Invalid beer id."));
        }

        let key = fingerprint("beer", &[&beer_id.to_string()]);
        let result = self.cache.get_or_compute(&key, || {
            let not_found = || AppError::not_found(format!("Beer with id {beer_id} does not exist."));
            let response = client::beer_info(api, beer_id).map_err(|e| {
                if e.has_remote_code(INVALID_RESOURCE) {
                    not_found()
                } else {
                    e
                }
            })?;
            map_beer_info(response).ok_or_else(not_found)
        });
        self.persist_rate_limit();

        result.inspect_err(|e| log::warn!("Beer {} info failed: {}", beer_id, e))
    }

    /// Rating summary stored on a shop product.
    pub fn product_rating(&self, beer_id: u64) -> Result<ProductRating> {
        let beer = self.beer_info(beer_id)?;
        Ok(ProductRating {
            average_rating: beer.rating_score.unwrap_or(0.0),
            rating_count: beer.rating_count,
            beer_slug: beer.beer_slug,
        })
    }

    /// schema.org product fragments for a beer.
    ///
    /// With `comments_only`, checkins without a comment are not turned into
    /// reviews.
    pub fn structured_data(&self, beer_id: u64, comments_only: bool) -> Result<StructuredData> {
        let beer = self.beer_info(beer_id)?;
        Ok(build_structured_data(
            &beer,
            comments_only,
            self.catalog.shop_name().unwrap_or_default(),
        ))
    }

    // --- Search ---

    /// Search beers or breweries by name.
    ///
    /// A purely numeric beer term is taken as a beer id and echoed back
    /// without a remote call.
    pub fn search(&self, kind: SearchKind, term: &str) -> Result<SearchResults> {
        let api = self.api()?;
        let term = sanitize_text(term);

        if kind == SearchKind::Beer && !term.is_empty() && term.chars().all(|c| c.is_ascii_digit())
        {
            let bid = term
                .parse::<u64>()
                .map_err(|_| AppError::invalid_input("Invalid beer id."))?;
            return Ok(SearchResults::Beers([(bid, term)].into_iter().collect()));
        }

        if char_len(&term) < kind.min_term_chars() {
            return Err(AppError::invalid_input(format!(
                "Search term must be at least {} characters.",
                kind.min_term_chars()
            )));
        }

        let key = fingerprint("search", &[kind.as_str(), &term]);
        let result = self.cache.get_or_compute(&key, || {
            let results = match kind {
                SearchKind::Beer => SearchResults::Beers(map_beer_search(client::search_beer(api, &term)?)),
                SearchKind::Brewery => {
                    SearchResults::Breweries(map_brewery_search(client::search_brewery(api, &term)?))
                }
            };
            if results.is_empty() {
                return Err(AppError::empty("No matches found"));
            }
            Ok(results)
        });
        self.persist_rate_limit();

        result.inspect_err(|e| log::warn!("{} search {:?} failed: {}", kind.as_str(), term, e))
    }

    // --- Maintenance ---

    /// Replace a word list, recompile and drop every cached result.
    pub fn set_moderation_list(&mut self, kind: ListKind, words: &str) -> Result<()> {
        let mut moderation = self.config.moderation.clone();
        match kind {
            ListKind::Disallowed => moderation.disallowed = words.to_string(),
            ListKind::Moderation => moderation.moderation = words.to_string(),
        }

        self.moderator = ContentModerator::new(&moderation)?;
        self.config.moderation = moderation;
        self.purge_cache()?;
        self.options
            .set_option(MODERATION_DIGEST_OPTION, &moderation_digest(&self.config.moderation))
    }

    pub fn purge_cache(&self) -> Result<usize> {
        self.cache.purge()
    }

    /// Last API call budget, from this process or a previous one.
    pub fn rate_limit_remaining(&self) -> Option<u64> {
        if let Some(remaining) = self.api.as_ref().and_then(|api| api.rate_limit().remaining()) {
            return Some(remaining);
        }
        match self.options.get_option(RATE_LIMIT_OPTION) {
            Ok(value) => value.and_then(|v| v.trim().parse().ok()),
            Err(e) => {
                log::warn!("Could not read rate limit: {}", e);
                None
            }
        }
    }

    pub fn cache_is_degraded(&self) -> bool {
        self.cache.health().is_degraded()
    }

    fn persist_rate_limit(&self) {
        let Some(remaining) = self.api.as_ref().and_then(|api| api.rate_limit().remaining()) else {
            return;
        };
        if self.persisted_rate_limit.load(Ordering::Relaxed) == remaining {
            return;
        }
        match self
            .options
            .set_option(RATE_LIMIT_OPTION, &remaining.to_string())
        {
            Ok(()) => self.persisted_rate_limit.store(remaining, Ordering::Relaxed),
            Err(e) => log::warn!("Could not persist rate limit: {}", e),
        }
    }

    /// Purge the cache when the word lists changed since the last run.
    fn sync_moderation_digest(&self) {
        let digest = moderation_digest(&self.config.moderation);
        let stored = match self.options.get_option(MODERATION_DIGEST_OPTION) {
            Ok(stored) => stored,
            Err(e) => {
                log::warn!("Could not read moderation digest: {}", e);
                None
            }
        };
        if stored.as_deref() == Some(digest.as_str()) {
            return;
        }

        log::info!("Moderation lists changed, purging cached results");
        if let Err(e) = self.cache.purge() {
            log::warn!("Could not purge cache after list change: {}", e);
            return;
        }
        if let Err(e) = self.options.set_option(MODERATION_DIGEST_OPTION, &digest) {
            log::warn!("Could not persist moderation digest: {}", e);
        }
    }
}

fn moderation_digest(moderation: &ModerationConfig) -> String {
    fingerprint("lists", &[&moderation.disallowed, &moderation.moderation])
}

fn bool_part(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

fn map_option(name: &str, scid: &str) -> String {
    format!("{KEY_PREFIX}map_{name}_{scid}")
}

fn build_structured_data(beer: &BeerRecord, comments_only: bool, shop_name: String) -> StructuredData {
    let aggregate_rating = beer
        .rating_score
        .filter(|score| *score > 0.0 && beer.rating_count > 0)
        .map(|rating_value| AggregateRating {
            kind: "AggregateRating".into(),
            rating_value,
            review_count: beer.rating_count,
        });

    let brand_name = if beer.brewery_name.trim().is_empty() {
        shop_name
    } else {
        beer.brewery_name.clone()
    };

    let review = if beer.recent_checkins.len() > 1 {
        beer.recent_checkins
            .iter()
            .filter(|c| !(comments_only && c.comment.trim().is_empty()))
            .filter_map(|c| {
                let rating_value = c.rating_score?;
                let author = c.author.trim();
                let comment = c.comment.trim();
                Some(Review {
                    kind: "Review".into(),
                    author: ReviewAuthor {
                        kind: "Person".into(),
                        name: (if author.is_empty() { "Unknown Author" } else { author }).into(),
                    },
                    date_published: c.date_published.clone(),
                    description: (if comment.is_empty() { "Untappd Rating" } else { comment }).into(),
                    name: c.beer_name.clone(),
                    review_rating: ReviewRating {
                        kind: "Rating".into(),
                        best_rating: "5".into(),
                        rating_value,
                        worst_rating: "1".into(),
                    },
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    StructuredData {
        aggregate_rating,
        brand: Brand {
            kind: "Brand".into(),
            name: brand_name,
        },
        mpn: format!("URWC{}", beer.bid),
        review,
    }
}
