//! # Vibes Only Served
//!
//! A small idea service: an HTTP API with liveness, readiness, and version
//! probes, placeholder idea generation, and two SQLite-backed idea stores
//! fed by JSON seed loaders.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌─────────────────────┐
//! │ JSON seeds  │──▶│ seed         │──▶│ IdeaStore           │
//! │ (*.json)    │   │ seed_content │   │ (in-memory + image) │
//! └─────────────┘   └──────────────┘   │ ContentStore (WAL)  │
//!                                      └─────────┬───────────┘
//!                                                │
//!                      ┌─────────────────────────┤
//!                      ▼                         ▼
//!                 ┌──────────┐             ┌──────────┐
//!                 │   CLI    │             │   HTTP   │
//!                 │ (vibes)  │             │  (axum)  │
//!                 └──────────┘             └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vibes init                                   # create data/app.db
//! vibes seed-content ./seeds                   # load content ideas
//! vibes seed -d ./seeds -f ./data/ideas.sqlite # load structured ideas
//! IDEAS_BACKEND=content vibes serve            # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Defaults, TOML file, and environment overrides |
//! | [`models`] | Idea and page types |
//! | [`db`] | SQLite pool construction |
//! | [`migrate`] | Table creation for both stores |
//! | [`store`] | Structured idea store with file image persistence |
//! | [`content_store`] | Free-text idea store on a native database file |
//! | [`seed`] | Record-store seed pipeline |
//! | [`seed_content`] | Content-store seed pipeline |
//! | [`generator`] | Idea generation providers |
//! | [`server`] | HTTP routes and handlers |
//! | [`openapi`] | OpenAPI document |

pub mod config;
pub mod content_store;
pub mod db;
pub mod generator;
pub mod migrate;
pub mod models;
pub mod openapi;
pub mod seed;
pub mod seed_content;
pub mod server;
pub mod store;
