//! TMDB catalog access
//!
//! - `client` - upstream trait and reqwest implementation
//! - `cached` - read-through cache wrapping any upstream
//! - `keys` - deterministic cache keys and tags
//! - `types` - request parameter types

pub mod cached;
pub mod client;
pub mod error;
pub mod keys;
pub mod types;

pub use cached::{CachedTmdb, InvalidationTargets};
pub use client::{TmdbApi, TmdbClient};
pub use error::TmdbError;
pub use types::{DetailsOptions, DiscoverKind, DiscoverOptions, MediaType, TimeWindow};
