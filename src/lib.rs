//! # feedbridge
//!
//! Site bridges that turn web pages, JSON APIs and teaser feeds into
//! normalized feed items.
//!
//! ## Architecture
//!
//! ```text
//! name + parameters → BridgeRegistry → select_context → Invocation
//!     → Pipeline (Fetcher → Cache → Normalizer) → Collected { items, identity }
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Show bridges and their parameters
//! feedbridge list
//!
//! # Run one
//! feedbridge run AO3 -p id=18181853
//! feedbridge run UberNewsroom -p region=en-GB
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`bridge`]: Bridge contract, contexts and registry
//! - [`bridges`]: The shipped site bridges
//! - [`cache`]: Cache backends and the name-resolving factory
//! - [`expander`]: Feed expansion with per-entry enrichment
//! - [`pipeline`]: Per-run fetch helpers and bounded worker pool

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires registry, cache backend and fetcher
/// together and runs bridges under a deadline.
pub mod app;

/// The bridge contract.
///
/// - [`Bridge`](bridge::Bridge): typed site integration
/// - [`DynBridge`](bridge::DynBridge): object-safe form held by the registry
/// - [`select_context`](bridge::select_context): parameter set → context
pub mod bridge;

pub mod bridges;

/// Cache backends with TTL expiry.
///
/// Backends are only ever created through
/// [`CacheFactory`](cache::CacheFactory), which resolves operator-supplied
/// names against a fixed registration table.
pub mod cache;

/// Command-line interface using clap.
///
/// - `run <bridge> -p key=value` - Run a bridge, print items as JSON
/// - `list` - List bridges and their contexts
/// - `caches` - List known cache backends
/// - `prune` - Remove expired cache entries
pub mod cli;

/// Configuration loaded from `~/.config/feedbridge/config.toml`.
pub mod config;

/// Core domain model: [`Item`](domain::Item).
pub mod domain;

pub mod expander;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for page fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`HostLimiter`](fetcher::HostLimiter): per-host concurrency cap
pub mod fetcher;

/// Feed parsing, date parsing, link resolution and HTML helpers.
pub mod normalizer;

pub mod pipeline;
