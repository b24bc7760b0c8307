//! Request parameter types for catalog calls

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::TmdbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    All,
    Movie,
    Tv,
    Person,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::All => "all",
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Person => "person",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = TmdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(MediaType::All),
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            "person" => Ok(MediaType::Person),
            other => Err(TmdbError::invalid(format!("unknown media type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = TmdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            other => Err(TmdbError::invalid(format!("unknown time window '{other}'"))),
        }
    }
}

/// Which catalog a discover query runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverKind {
    Movies,
    Tv,
}

impl DiscoverKind {
    /// Name used in cache keys and tags
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverKind::Movies => "movies",
            DiscoverKind::Tv => "tv",
        }
    }

    /// Upstream path segment (`/discover/{segment}`)
    pub fn path_segment(&self) -> &'static str {
        match self {
            DiscoverKind::Movies => "movie",
            DiscoverKind::Tv => "tv",
        }
    }
}

impl FromStr for DiscoverKind {
    type Err = TmdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movies" | "movie" => Ok(DiscoverKind::Movies),
            "tv" => Ok(DiscoverKind::Tv),
            other => Err(TmdbError::invalid(format!("unknown discover kind '{other}'"))),
        }
    }
}

/// Discover filters, kept sorted by name so equal option sets produce equal
/// cache keys regardless of insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscoverOptions(BTreeMap<String, String>);

impl DiscoverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Options in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DiscoverOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Extra sections requested alongside movie or TV details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailsOptions {
    pub append_to_response: Vec<String>,
}

impl DetailsOptions {
    /// Parse a comma separated `append_to_response` value
    pub fn from_append(raw: Option<&str>) -> Self {
        let append_to_response = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        Self { append_to_response }
    }

    pub fn is_empty(&self) -> bool {
        self.append_to_response.is_empty()
    }

    /// Sorted, de-duplicated, comma joined sections
    pub fn normalized(&self) -> String {
        let mut parts: Vec<&str> = self.append_to_response.iter().map(String::as_str).collect();
        parts.sort_unstable();
        parts.dedup();
        parts.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse() {
        assert_eq!("tv".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("film".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_time_window_parse() {
        assert_eq!("week".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert!("month".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_discover_kind_parse() {
        assert_eq!("movies".parse::<DiscoverKind>().unwrap(), DiscoverKind::Movies);
        assert_eq!("movie".parse::<DiscoverKind>().unwrap(), DiscoverKind::Movies);
        assert_eq!(DiscoverKind::Movies.path_segment(), "movie");
        assert!("people".parse::<DiscoverKind>().is_err());
    }

    #[test]
    fn test_discover_options_sorted() {
        let options = DiscoverOptions::new()
            .with("with_genres", "28")
            .with("page", "2")
            .with("sort_by", "popularity.desc");
        let names: Vec<&str> = options.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["page", "sort_by", "with_genres"]);
    }

    #[test]
    fn test_details_options_from_append() {
        let options = DetailsOptions::from_append(Some("videos, credits,,videos"));
        assert_eq!(options.append_to_response, vec!["videos", "credits", "videos"]);
        assert_eq!(options.normalized(), "credits,videos");

        assert!(DetailsOptions::from_append(None).is_empty());
        assert!(DetailsOptions::from_append(Some(" ")).is_empty());
    }
}
