//! # News Atlas CLI (`atlas`)
//!
//! The `atlas` binary turns a directory of conflict-report PDF exports into
//! keyword-searchable map markers, and can serve the same queries over a
//! JSON HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! atlas --config ./config/atlas.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `atlas load` | Parse all corpus documents and report field validity |
//! | `atlas search "<키워드>"` | Keyword search — print markers and counts |
//! | `atlas resolve "<장소>"` | Run the resolution chain for one place string |
//! | `atlas related "<키워드>"` | Similar-article web search (Serper) |
//! | `atlas serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Parse the corpus, print how many records were extracted
//! atlas load --config ./config/atlas.toml
//!
//! # Search for protest articles, emit JSON markers for the map page
//! atlas search "시위" --json
//!
//! # Check what a tricky place string resolves to
//! atlas resolve "푸노 & 훌리아카, 페루"
//!
//! # Machine-readable progress on stderr
//! atlas --progress json search "파업"
//! ```
//!
//! API keys come from the environment, never from config: `OPENAI_API_KEY`
//! enables the coordinate-inference tier, `SERPER_API_KEY` enables `related`.

mod config;
mod corpus;
mod extract;
mod fields;
mod geocode;
mod models;
mod overrides;
mod progress;
mod query;
mod record;
mod related;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::geocode::{
    Clock, CoordinateInference, LocationResolver, NominatimGeocoder, OpenAiInference,
    ResolverDeps, SystemClock,
};
use crate::progress::{ProgressMode, ProgressReporter};

/// How much of the first document's raw text to show when extraction fails
/// corpus-wide.
const DIAGNOSTIC_EXCERPT_CHARS: usize = 2000;

/// News Atlas CLI — extract article records from report PDFs and place them
/// on a map.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/atlas.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "atlas",
    about = "News Atlas — keyword-searchable map markers from conflict-report PDFs",
    version,
    long_about = "News Atlas parses a directory of PDF exports of a fixed conflict-monitoring \
    report template, extracts the labeled Korean fields from each document, resolves free-text \
    place names to coordinates through a tiered fallback chain, and presents keyword-filtered \
    map markers via a CLI and a JSON HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/atlas.toml`. Corpus, geocoding, inference,
    /// related-search, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/atlas.toml")]
    config: PathBuf,

    /// Progress reporting on stderr: `off`, `human`, or `json`.
    ///
    /// Defaults to `human` when stderr is a terminal, `off` otherwise.
    #[arg(long, global = true)]
    progress: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Parse all corpus documents and report field validity.
    ///
    /// Extracts every matching PDF under `[corpus].dir`, builds one record
    /// per document, and prints how many records were extracted and which
    /// required fields (if any) are missing corpus-wide. When extraction
    /// fails across the board, prints an excerpt of the first document's raw
    /// text so the template mismatch can be diagnosed.
    Load {
        /// List the files that would be loaded without extracting them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Keyword search over the loaded corpus.
    ///
    /// Matches the keyword (case-insensitive) against the classification
    /// levels, both titles, and the location strings of each record, resolves
    /// the matched locations to coordinates, and prints one marker per
    /// record-location pair.
    Search {
        /// The search keyword.
        keyword: String,

        /// Emit markers as a JSON array instead of the human-readable table.
        #[arg(long)]
        json: bool,
    },

    /// Run the resolution chain for a single place string.
    ///
    /// Useful for checking how a tricky location description resolves:
    /// override table first, then geocoding, coordinate inference, and the
    /// country-token fallback.
    Resolve {
        /// Place description, e.g. `"페루, 리마"` or `"푸노 & 훌리아카, 페루"`.
        place: String,
    },

    /// Search the web for articles similar to a keyword.
    ///
    /// Requires the `SERPER_API_KEY` environment variable.
    Related {
        /// The search keyword.
        keyword: String,
    },

    /// Start the JSON HTTP server.
    ///
    /// Loads the corpus once, then serves `/search` and `/related` on the
    /// address configured in `[server].bind`.
    Serve,
}

/// Build the resolution chain from config and environment.
///
/// The inference tier is present only when `[inference].provider` is enabled
/// and `OPENAI_API_KEY` is set; otherwise the chain skips straight from
/// geocoding to the country fallback.
fn build_resolver(cfg: &Config) -> anyhow::Result<LocationResolver> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let geocoder = Arc::new(NominatimGeocoder::new(&cfg.geocoding, clock)?);

    let inference: Option<Arc<dyn CoordinateInference>> = if cfg.inference.is_enabled() {
        match OpenAiInference::new(&cfg.inference) {
            Ok(inference) => Some(Arc::new(inference)),
            Err(err) => {
                eprintln!("note: coordinate inference disabled: {}", err);
                None
            }
        }
    } else {
        None
    };

    Ok(LocationResolver::new(ResolverDeps {
        overrides: overrides::override_table(&cfg.overrides),
        geocoder,
        inference,
    }))
}

/// Print the record count and, when required fields are missing corpus-wide,
/// the invalid field names plus a raw-text excerpt for diagnosis.
fn print_load_summary(load: &corpus::CorpusLoad) {
    println!("Extracted {} record(s).", load.records.len());

    let invalid = load.records.validity.invalid_fields();
    if invalid.is_empty() {
        println!("All required fields present in at least one record.");
        return;
    }

    println!("Missing across the whole corpus: {}", invalid.join(", "));
    if let Some(text) = &load.diagnostic {
        let excerpt: String = text.chars().take(DIAGNOSTIC_EXCERPT_CHARS).collect();
        println!("--- first document text (excerpt) ---");
        println!("{}", excerpt);
        if text.chars().count() > DIAGNOSTIC_EXCERPT_CHARS {
            println!("... (truncated)");
        }
    }
}

async fn run_search(
    cfg: &Config,
    keyword: &str,
    json: bool,
    reporter: &dyn ProgressReporter,
) -> anyhow::Result<()> {
    let load = corpus::load_corpus(&cfg.corpus, reporter)?;
    let resolver = build_resolver(cfg)?;
    let outcome = query::run_query(&load.records, keyword, &resolver, reporter).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.markers)?);
        return Ok(());
    }

    println!(
        "{} matching record(s), {} distinct location(s), {} resolved.",
        outcome.matched_records, outcome.distinct_locations, outcome.resolved_locations
    );
    if let Some(center) = outcome.center {
        println!("Map center: {:.4}, {:.4}", center.latitude, center.longitude);
    }
    for marker in &outcome.markers {
        println!(
            "[{}] {} — {} ({:.4}, {:.4}) <{}>",
            marker.color,
            marker.location,
            marker.title,
            marker.latitude,
            marker.longitude,
            marker.filename
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mode = ProgressMode::parse(cli.progress.as_deref());
    let reporter = mode.reporter();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Load { dry_run } => {
            if dry_run {
                let paths = corpus::list_documents(&cfg.corpus)?;
                for path in &paths {
                    println!("{}", path.display());
                }
                println!("{} document(s) would be loaded.", paths.len());
                return Ok(());
            }
            let load = corpus::load_corpus(&cfg.corpus, reporter.as_ref())?;
            print_load_summary(&load);
        }
        Commands::Search { keyword, json } => {
            run_search(&cfg, &keyword, json, reporter.as_ref()).await?;
        }
        Commands::Resolve { place } => {
            let resolver = build_resolver(&cfg)?;
            let mechanism = if resolver.has_override(&place) {
                "override"
            } else {
                "computed"
            };
            match resolver.resolve(&place).await {
                Some(coords) => println!(
                    "{} → {:.4}, {:.4} ({})",
                    place, coords.latitude, coords.longitude, mechanism
                ),
                None => println!("{} → unresolved", place),
            }
        }
        Commands::Related { keyword } => {
            let client = related::SerperClient::new(&cfg.related)?;
            let articles = client.search(&keyword).await?;
            if articles.is_empty() {
                println!("No related articles found.");
            }
            for (i, article) in articles.iter().enumerate() {
                println!("{}. {}", i + 1, article.title);
                println!("   {}", article.link);
                if !article.snippet.is_empty() {
                    println!("   {}", article.snippet);
                }
            }
        }
        Commands::Serve => {
            let load = corpus::load_corpus(&cfg.corpus, reporter.as_ref())?;
            print_load_summary(&load);
            let resolver = Arc::new(build_resolver(&cfg)?);
            server::run_server(&cfg, Arc::new(load.records), resolver).await?;
        }
    }

    Ok(())
}
