//! Domain logic for the movie and TV catalog

pub mod tmdb;

pub use tmdb::{CachedTmdb, TmdbApi, TmdbClient, TmdbError};
