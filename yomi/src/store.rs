//! SearchStore - collaborator-facing search service
//!
//! Owns one refreshing `SearchIndex` per category, built lazily from an
//! `EntitySource` on first use and rebuilt on the configured interval.
//!
//! Concurrency model:
//! - Index builds and query matching are CPU-bound and run on tokio's
//!   blocking pool; builds additionally fan form generation out over rayon
//! - A query holds an `Arc` to the snapshot it started with, so a refresh
//!   swapping the index mid-query is invisible to it
//! - Dropping a query future cancels its matcher through a DropGuard

use crate::cache::{loader_fn, LoadError, Loader, RefreshingCache};
use crate::config::StoreConfig;
use crate::database::EntitySource;
use crate::indexer::{IndexStats, SearchIndex};
use crate::interface::{
    Category, SearchApi, SearchHit, SearchPage, Suggestion, YomiError, YomiResult,
};
use crate::search::search_in_index_cancellable;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct SearchStore {
    source: Arc<dyn EntitySource>,
    indexes: RefreshingCache<Category, SearchIndex>,
    config: StoreConfig,
}

impl SearchStore {
    pub fn new(source: Arc<dyn EntitySource>, config: StoreConfig) -> Self {
        Self {
            indexes: RefreshingCache::new(config.refresh_interval),
            source,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Loader that reads a category from the source and builds its index
    fn index_loader(&self, category: Category) -> Loader<SearchIndex> {
        let source = Arc::clone(&self.source);
        loader_fn(move || {
            let source = Arc::clone(&source);
            async move {
                info!(category = %category, "building search index");
                // Already a load error; YomiError::from adds the prefix once
                let entities = source.load_entities(category).await.map_err(|e| match e {
                    YomiError::Load(msg) => LoadError::from(msg),
                    other => LoadError::from(other),
                })?;
                let index =
                    tokio::task::spawn_blocking(move || SearchIndex::build(entities)).await?;
                Ok::<_, LoadError>(index)
            }
        })
    }

    /// Current index for `category`, building it first if needed
    pub async fn index(&self, category: Category) -> YomiResult<Arc<SearchIndex>> {
        Ok(self
            .indexes
            .get_or_register(category, self.index_loader(category))
            .await?)
    }

    /// Run the matcher off the async executor. Dropping the returned future
    /// cancels the match.
    async fn match_blocking(
        &self,
        index: Arc<SearchIndex>,
        keyword: String,
        limit: usize,
    ) -> YomiResult<Vec<SearchHit>> {
        let token = CancellationToken::new();
        let _guard = token.clone().drop_guard();

        let handle = tokio::task::spawn_blocking(move || {
            search_in_index_cancellable(&index, &keyword, limit, &token)
        });

        match handle.await {
            Ok(result) => result,
            Err(_join_error) => Err(YomiError::Cancelled),
        }
    }

    /// `search` with a category given by name; unknown names are rejected
    pub async fn search_named(
        &self,
        category: &str,
        keyword: &str,
        limit: usize,
    ) -> YomiResult<Vec<SearchHit>> {
        let category: Category = category.parse()?;
        self.search(category, keyword, limit).await
    }

    /// One 1-based page of matching ids, searched with the configured result
    /// cap. `total` counts every match; pages past the end are empty.
    pub async fn search_page(
        &self,
        category: Category,
        keyword: &str,
        page: usize,
        page_size: usize,
    ) -> YomiResult<SearchPage> {
        if page == 0 || page_size == 0 {
            return Err(YomiError::InvalidArgument(format!(
                "page and page_size must be positive (got {page}, {page_size})"
            )));
        }

        let hits = self.search(category, keyword, self.config.default_limit).await?;
        let ids = hits
            .iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .map(|hit| hit.entity_id.clone())
            .collect();

        Ok(SearchPage {
            ids,
            total: hits.len() as u64,
        })
    }

    /// `suggest` with categories given by name; any unknown name is rejected
    pub async fn suggest_named(
        &self,
        keyword: &str,
        categories: &[&str],
        limit: usize,
    ) -> YomiResult<Vec<Suggestion>> {
        let categories = categories
            .iter()
            .map(|name| name.parse())
            .collect::<YomiResult<Vec<Category>>>()?;
        self.suggest(keyword, &categories, limit).await
    }

    /// Build every category's index
    pub async fn warm_all(&self) -> YomiResult<()> {
        let started = Instant::now();
        try_join_all(Category::ALL.into_iter().map(|category| self.index(category))).await?;
        info!(
            categories = Category::ALL.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "all search indexes ready"
        );
        Ok(())
    }

    /// Counts for a built index; `None` if it has not been built
    pub fn index_stats(&self, category: Category) -> Option<IndexStats> {
        self.indexes.get(&category).ok().map(|index| index.stats())
    }

    /// When the index for `category` was last (re)published
    pub fn last_refreshed(&self, category: Category) -> Option<DateTime<Utc>> {
        self.indexes.last_refreshed(&category)
    }

    /// Stop background refreshes and wait for in-flight rebuilds
    pub async fn shutdown(&self) {
        self.indexes.shutdown().await;
    }
}

#[async_trait]
impl SearchApi for SearchStore {
    async fn search(
        &self,
        category: Category,
        keyword: &str,
        limit: usize,
    ) -> YomiResult<Vec<SearchHit>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index(category).await?;
        let started = Instant::now();
        let hits = self.match_blocking(index, keyword.to_string(), limit).await?;
        debug!(
            category = %category,
            keyword,
            hits = hits.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "search complete"
        );
        Ok(hits)
    }

    async fn suggest(
        &self,
        keyword: &str,
        categories: &[Category],
        limit: usize,
    ) -> YomiResult<Vec<Suggestion>> {
        let keyword = keyword.trim();
        if keyword.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let categories = if categories.is_empty() {
            self.config.default_suggest_categories.as_slice()
        } else {
            categories
        };
        let per_category = limit.saturating_mul(self.config.suggest_overfetch);

        let results = try_join_all(
            categories
                .iter()
                .map(|&category| async move {
                    let hits = self.search(category, keyword, per_category).await?;
                    Ok::<_, YomiError>((category, hits))
                }),
        )
        .await?;

        let mut merged: Vec<Suggestion> = results
            .into_iter()
            .flat_map(|(category, hits)| {
                hits.into_iter().map(move |hit| Suggestion {
                    category,
                    entity_id: hit.entity_id,
                    display_name: hit.display_name,
                    score: hit.score,
                })
            })
            .collect();

        // Stable: equal scores keep category order, then per-category rank.
        merged.sort_by(|a, b| b.score.cmp(&a.score));
        merged.truncate(limit);
        Ok(merged)
    }

    fn has_index(&self, category: Category) -> bool {
        self.indexes.has(&category)
    }

    async fn ensure_index(&self, category: Category) -> YomiResult<()> {
        self.index(category).await.map(|_| ())
    }
}
