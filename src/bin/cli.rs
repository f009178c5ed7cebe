//! Untappd ratings CLI
//!
//! Local entry point for inspecting feeds, beers and searches. Results are
//! printed as pretty JSON on stdout; failures as `{"error": ...}`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use untappd_ratings::{
    config::load_config,
    error::Result,
    models::{Feed, FeedRequest, Locale, SearchKind, Viewer, render_feed},
    services::RatingsService,
    storage::LocalStore,
};

/// untappd - Untappd ratings for storefronts
#[derive(Parser, Debug)]
#[command(
    name = "untappd",
    version,
    about = "Brewery activity feeds, beer info and search from Untappd"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "storage/config.toml")]
    config: PathBuf,

    /// Directory holding cached results and options
    #[arg(short, long, default_value = "storage")]
    store_dir: PathBuf,

    /// Locale used to format ratings and dates
    #[arg(long, default_value = "en_US")]
    locale: String,

    /// Act as a viewer who may see moderated ratings and comments
    #[arg(long)]
    editor: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a brewery activity feed
    Feed {
        brewery_id: u64,

        /// Number of checkins to collect (0 = as many as allowed)
        #[arg(short, long, default_value_t = 25)]
        max_checkins: u32,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Register or show brewery maps
    #[command(subcommand)]
    Map(MapCommand),

    /// Show one beer
    Beer { beer_id: u64 },

    /// Search beers or breweries
    Search {
        #[arg(value_enum)]
        kind: Kind,
        term: String,
    },

    /// Show the rating summary or schema.org data of a beer
    Rating {
        beer_id: u64,

        /// Print schema.org structured data instead of the summary
        #[arg(long)]
        structured: bool,

        /// Only turn checkins with a comment into reviews
        #[arg(long)]
        comments_only: bool,
    },

    /// Validate configuration
    Validate,

    /// Show configuration and cache state
    Info,

    /// Delete every cached result
    Purge,
}

#[derive(Subcommand, Debug)]
enum MapCommand {
    /// Register a brewery map and print its id
    Register {
        brewery_id: u64,
        #[arg(short, long, default_value_t = 25)]
        max_checkins: u32,
    },

    /// Fetch the feed of a registered map
    Feed {
        scid: String,

        #[command(flatten)]
        display: DisplayArgs,
    },
}

#[derive(clap::Args, Debug)]
struct DisplayArgs {
    /// Do not link checkins to shop products
    #[arg(long)]
    no_product_link: bool,

    /// Hide ratings and comments from non-editors
    #[arg(long)]
    admin_only_ratings: bool,

    /// Print raw values instead of formatted ones
    #[arg(long)]
    raw: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Beer,
    Brewery,
}

impl From<Kind> for SearchKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Beer => SearchKind::Beer,
            Kind::Brewery => SearchKind::Brewery,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Main entry point for the CLI application.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            match serde_json::to_string_pretty(&e.to_payload()) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{{\"error\": \"{}\"}}", e.user_message()),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    let store = Arc::new(LocalStore::new(&cli.store_dir));
    let service = RatingsService::connect(config, store.clone(), store)?;

    let locale = Locale::new(cli.locale.as_str());
    let viewer = if cli.editor {
        Viewer::editor(locale.clone())
    } else {
        Viewer::public(locale.clone())
    };
    let date_format = service.config().feed.date_format.clone();

    let print_feed = |feed: Feed, raw: bool| -> Result<()> {
        if raw {
            print_json(&feed)
        } else {
            print_json(&render_feed(&feed, &locale, &date_format))
        }
    };

    match cli.command {
        Command::Feed {
            brewery_id,
            max_checkins,
            display,
        } => {
            let request = FeedRequest {
                brewery_id,
                max_checkins,
                add_product_link: !display.no_product_link,
                show_ratings_to_admin_only: display.admin_only_ratings,
            };
            let feed = service.brewery_feed(&request, &viewer)?;
            print_feed(feed, display.raw)?;
        }

        Command::Map(MapCommand::Register {
            brewery_id,
            max_checkins,
        }) => {
            let scid = service.register_map(brewery_id, max_checkins)?;
            print_json(&serde_json::json!({ "scid": scid }))?;
        }

        Command::Map(MapCommand::Feed { scid, display }) => {
            let feed = service.brewery_feed_for_map(
                &scid,
                !display.no_product_link,
                display.admin_only_ratings,
                &viewer,
            )?;
            print_feed(feed, display.raw)?;
        }

        Command::Beer { beer_id } => {
            let beer = service.beer_info(beer_id)?;
            print_json(&serde_json::json!({
                "display_name": beer.display_name(),
                "beer": beer,
            }))?;
        }

        Command::Search { kind, term } => {
            print_json(&service.search(kind.into(), &term)?)?;
        }

        Command::Rating {
            beer_id,
            structured,
            comments_only,
        } => {
            if structured {
                print_json(&service.structured_data(beer_id, comments_only)?)?;
            } else {
                print_json(&service.product_rating(beer_id)?)?;
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            service.config().validate()?;
            if !service.is_configured() {
                log::warn!("API credentials are not set");
            }
            log::info!("All validations passed!");
            print_json(&serde_json::json!({ "valid": true, "configured": service.is_configured() }))?;
        }

        Command::Info => {
            print_json(&serde_json::json!({
                "configured": service.is_configured(),
                "base_url": service.config().api.base_url,
                "store_dir": cli.store_dir.display().to_string(),
                "cache_ttl_secs": service.config().cache.ttl_secs,
                "cache_degraded": service.cache_is_degraded(),
                "rate_limit_remaining": service.rate_limit_remaining(),
            }))?;
        }

        Command::Purge => {
            let removed = service.purge_cache()?;
            print_json(&serde_json::json!({ "purged": removed }))?;
        }
    }

    Ok(())
}
