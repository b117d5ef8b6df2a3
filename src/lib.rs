//! # News Atlas
//!
//! Turns PDF exports of a fixed conflict-monitoring report template into
//! keyword-searchable map markers.
//!
//! Each report page carries labeled Korean fields (classification, location,
//! titles, event date, source URL, summary). News Atlas extracts those fields
//! with layout-tolerant patterns, resolves the free-text place names to
//! coordinates through a tiered fallback chain, and serves the resulting
//! markers from a CLI or a small JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐
//! │  PDFs    │──▶│  Extraction  │──▶│ RecordSet  │
//! │ (corpus) │   │ fields+record│   │ + validity │
//! └──────────┘   └──────────────┘   └─────┬──────┘
//!                                         │ keyword query
//!                                         ▼
//!                  ┌─────────────────────────────┐
//!                  │ LocationResolver            │
//!                  │ override ▸ geocode ▸ infer  │
//!                  │ ▸ country (rate-gated)      │
//!                  └─────────────┬───────────────┘
//!                                ▼
//!                     ┌──────────┐  ┌──────────┐
//!                     │   CLI    │  │   HTTP   │
//!                     │ (atlas)  │  │ (JSON)   │
//!                     └──────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! atlas load                       # parse the corpus, report field validity
//! atlas search "시위"              # keyword search, print markers
//! atlas resolve "페루, 리마"        # run the resolution chain for one place
//! atlas related "볼리비아 시위"     # similar-article web search
//! atlas serve                      # start the JSON HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types (records, validity, markers) |
//! | [`extract`] | PDF text extraction and page-break normalization |
//! | [`fields`] | Layout-tolerant field matchers |
//! | [`record`] | Document text → structured record |
//! | [`corpus`] | Corpus discovery and loading |
//! | [`overrides`] | Curated coordinate override table |
//! | [`geocode`] | Tiered location resolution with a global rate gate |
//! | [`query`] | Keyword search and marker assembly |
//! | [`related`] | Similar-article web search |
//! | [`server`] | JSON HTTP server |
//! | [`progress`] | Progress reporting (human / JSON / off) |

pub mod config;
pub mod corpus;
pub mod extract;
pub mod fields;
pub mod geocode;
pub mod models;
pub mod overrides;
pub mod progress;
pub mod query;
pub mod record;
pub mod related;
pub mod server;
