//! Store configuration
//!
//! Defaults match a production deployment: five-minute refresh, 500 results
//! per category search, 10 suggestions over song, vocalist and producer.

use crate::interface::Category;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);
pub const DEFAULT_SEARCH_LIMIT: usize = 500;
pub const DEFAULT_SUGGEST_LIMIT: usize = 10;
/// Each category is searched for `limit * overfetch` hits before merging
pub const DEFAULT_SUGGEST_OVERFETCH: usize = 3;

const ENV_REFRESH_INTERVAL_SECS: &str = "YOMI_REFRESH_INTERVAL_SECS";
const ENV_SEARCH_LIMIT: &str = "YOMI_SEARCH_LIMIT";
const ENV_SUGGEST_LIMIT: &str = "YOMI_SUGGEST_LIMIT";
const ENV_SUGGEST_CATEGORIES: &str = "YOMI_SUGGEST_CATEGORIES";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub refresh_interval: Duration,
    pub default_limit: usize,
    pub suggest_limit: usize,
    pub suggest_overfetch: usize,
    pub default_suggest_categories: Vec<Category>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            default_limit: DEFAULT_SEARCH_LIMIT,
            suggest_limit: DEFAULT_SUGGEST_LIMIT,
            suggest_overfetch: DEFAULT_SUGGEST_OVERFETCH,
            default_suggest_categories: vec![
                Category::Song,
                Category::Vocalist,
                Category::Producer,
            ],
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `YOMI_*` environment variables. Missing or
    /// unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        match parse_number::<u64>(&lookup, ENV_REFRESH_INTERVAL_SECS) {
            Some(0) => warn!(key = ENV_REFRESH_INTERVAL_SECS, "ignoring zero refresh interval"),
            Some(secs) => config.refresh_interval = Duration::from_secs(secs),
            None => {}
        }
        if let Some(limit) = parse_number(&lookup, ENV_SEARCH_LIMIT) {
            config.default_limit = limit;
        }
        if let Some(limit) = parse_number(&lookup, ENV_SUGGEST_LIMIT) {
            config.suggest_limit = limit;
        }
        if let Some(raw) = lookup(ENV_SUGGEST_CATEGORIES) {
            let categories: Vec<Category> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| s.parse().ok())
                .collect();
            if !categories.is_empty() {
                config.default_suggest_categories = categories;
            }
        }

        config
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn suggest_limit(mut self, limit: usize) -> Self {
        self.suggest_limit = limit;
        self
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
