//! Client-side caching layer for the Radium permission authority.
//!
//! Radium owns player profiles and rank definitions in a shared Redis
//! store and broadcasts invalidation events when they change. This crate
//! keeps that state available locally with low latency: TTL read-through
//! caches for both entity types, an invalidation listener that evicts
//! ahead of TTL expiry, rank/permission resolution on top, and a
//! fire-and-forget command forwarder back to the authority.
//!
//! Every query surface is fail-open-to-default: when the backend is
//! unreachable or a record is malformed, resolution degrades to the
//! least-privileged fallback values rather than surfacing an error to the
//! game loop.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod store;

#[cfg(test)]
pub mod test_helpers;

pub use cache::{InvalidationListener, KeyBuilder, TtlCache};
pub use client::RadiumClient;
pub use config::Config;
pub use error::{Error, Result};
pub use forwarder::CommandForwarder;
pub use models::{Profile, Rank};
pub use resolver::Resolver;
