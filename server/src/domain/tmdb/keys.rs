//! Cache keys and tags for catalog responses
//!
//! Keys are deterministic: equal requests always map to the same key, and the
//! key never depends on option insertion order or query casing.

use super::types::{DetailsOptions, DiscoverKind, DiscoverOptions, MediaType, TimeWindow};

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn with_append(base: String, options: &DetailsOptions) -> String {
    if options.is_empty() {
        base
    } else {
        format!("{base}:append:{}", options.normalized())
    }
}

pub fn trending(media_type: MediaType, time_window: TimeWindow) -> String {
    format!("trending:{media_type}:{time_window}")
}

pub fn search(query: &str, page: u32) -> String {
    format!("search:{}:page:{page}", normalize_query(query))
}

pub fn keyword(query: &str) -> String {
    format!("keyword:{}", normalize_query(query))
}

pub fn movie(id: u64, options: &DetailsOptions) -> String {
    with_append(format!("movie:{id}"), options)
}

pub fn tv(id: u64, options: &DetailsOptions) -> String {
    with_append(format!("tv:{id}"), options)
}

pub fn tv_season(id: u64, season_number: u32) -> String {
    format!("tv:{id}:season:{season_number}")
}

/// `discover:{kind}` followed by `:{name}:{value}` for each option in name order
pub fn discover(kind: DiscoverKind, options: &DiscoverOptions) -> String {
    let mut key = format!("discover:{}", kind.as_str());
    for (name, value) in options.iter() {
        key.push(':');
        key.push_str(name);
        key.push(':');
        key.push_str(value);
    }
    key
}

/// Tag builders; the `tag:` store prefix is added by the cache
pub mod tags {
    use super::{DiscoverKind, MediaType};

    pub const TRENDING: &str = "trending";
    pub const SEARCH: &str = "search";
    pub const KEYWORD: &str = "keyword";
    pub const MOVIE: &str = "movie";
    pub const TV: &str = "tv";
    pub const DISCOVER: &str = "discover";

    pub fn trending(media_type: MediaType) -> Vec<String> {
        vec![TRENDING.to_string(), format!("{TRENDING}:{media_type}")]
    }

    pub fn search() -> Vec<String> {
        vec![SEARCH.to_string()]
    }

    pub fn keyword() -> Vec<String> {
        vec![SEARCH.to_string(), KEYWORD.to_string()]
    }

    pub fn movie_id(id: u64) -> String {
        format!("{MOVIE}:{id}")
    }

    pub fn tv_id(id: u64) -> String {
        format!("{TV}:{id}")
    }

    pub fn tv_seasons(id: u64) -> String {
        format!("{TV}:{id}:seasons")
    }

    pub fn movie(id: u64) -> Vec<String> {
        vec![MOVIE.to_string(), movie_id(id)]
    }

    pub fn tv(id: u64) -> Vec<String> {
        vec![TV.to_string(), tv_id(id)]
    }

    pub fn tv_season(id: u64) -> Vec<String> {
        vec![TV.to_string(), tv_id(id), tv_seasons(id)]
    }

    pub fn discover(kind: DiscoverKind) -> Vec<String> {
        vec![DISCOVER.to_string(), format!("{DISCOVER}:{}", kind.as_str())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trending_key() {
        assert_eq!(trending(MediaType::All, TimeWindow::Day), "trending:all:day");
        assert_eq!(trending(MediaType::Tv, TimeWindow::Week), "trending:tv:week");
    }

    #[test]
    fn test_search_key_normalizes_query() {
        assert_eq!(search("  The Matrix ", 1), "search:the matrix:page:1");
        assert_eq!(search("the matrix", 1), search("THE MATRIX", 1));
        assert_ne!(search("matrix", 1), search("matrix", 2));
    }

    #[test]
    fn test_keyword_key() {
        assert_eq!(keyword(" Heist "), "keyword:heist");
    }

    #[test]
    fn test_details_keys() {
        let none = DetailsOptions::default();
        assert_eq!(movie(550, &none), "movie:550");
        assert_eq!(tv(1399, &none), "tv:1399");
        assert_eq!(tv_season(1399, 3), "tv:1399:season:3");
    }

    #[test]
    fn test_details_keys_with_append() {
        let a = DetailsOptions::from_append(Some("videos,credits"));
        let b = DetailsOptions::from_append(Some("credits,videos"));
        assert_eq!(movie(550, &a), "movie:550:append:credits,videos");
        assert_eq!(movie(550, &a), movie(550, &b));
        assert_eq!(tv(1399, &a), "tv:1399:append:credits,videos");
    }

    #[test]
    fn test_discover_key_is_order_independent() {
        let first = DiscoverOptions::new()
            .with("with_genres", "28")
            .with("page", "1")
            .with("sort_by", "popularity.desc");
        let second: DiscoverOptions = [
            ("sort_by", "popularity.desc"),
            ("page", "1"),
            ("with_genres", "28"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            discover(DiscoverKind::Movies, &first),
            "discover:movies:page:1:sort_by:popularity.desc:with_genres:28"
        );
        assert_eq!(
            discover(DiscoverKind::Movies, &first),
            discover(DiscoverKind::Movies, &second)
        );
        assert_ne!(
            discover(DiscoverKind::Movies, &first),
            discover(DiscoverKind::Tv, &first)
        );
    }

    #[test]
    fn test_discover_key_without_options() {
        assert_eq!(
            discover(DiscoverKind::Tv, &DiscoverOptions::new()),
            "discover:tv"
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(tags::trending(MediaType::Movie), vec!["trending", "trending:movie"]);
        assert_eq!(tags::keyword(), vec!["search", "keyword"]);
        assert_eq!(tags::movie(550), vec!["movie", "movie:550"]);
        assert_eq!(tags::tv_season(1399), vec!["tv", "tv:1399", "tv:1399:seasons"]);
        assert_eq!(tags::discover(DiscoverKind::Tv), vec!["discover", "discover:tv"]);
    }
}
