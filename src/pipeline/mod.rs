//! Feed assembly and result caching.
//!
//! - `paginate`: Fetch a brewery feed page by page
//! - `merge`: Deep-merge page results
//! - `cache`: Fingerprint-keyed read-through cache with health tracking

pub mod cache;
pub mod merge;
pub mod paginate;

pub use cache::{CacheHealth, ResponseCache, StoreOutcome};
pub use merge::DeepMerge;
pub use paginate::{FeedContext, fetch_feed, pages_for};
