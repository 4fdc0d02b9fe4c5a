//! Yomi Interface Definition
//!
//! Types handed to collaborators (the HTTP layer, the CLI). This file is the
//! source of truth for shared types.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Entity category. Each category owns one search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Song,
    Video,
    Producer,
    Vocalist,
    Synthesizer,
    Uploader,
}

/// How entity ids are stored for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Integer,
    Text,
}

/// Static table/column layout of a category in the entity database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTable {
    pub table: &'static str,
    pub id_column: &'static str,
    pub name_column: &'static str,
    pub id_kind: IdKind,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Song,
        Category::Video,
        Category::Producer,
        Category::Vocalist,
        Category::Synthesizer,
        Category::Uploader,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Song => "song",
            Category::Video => "video",
            Category::Producer => "producer",
            Category::Vocalist => "vocalist",
            Category::Synthesizer => "synthesizer",
            Category::Uploader => "uploader",
        }
    }

    pub fn table(self) -> CategoryTable {
        let (id_column, name_column, id_kind) = match self {
            Category::Video => ("bvid", "title", IdKind::Text),
            _ => ("id", "name", IdKind::Integer),
        };
        CategoryTable {
            table: self.as_str(),
            id_column,
            name_column,
            id_kind,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = YomiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| YomiError::InvalidArgument(format!("unknown category: {s}")))
    }
}

/// Opaque entity identifier: integer primary key or string key (video bvid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{id}"),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

/// Which matching phase produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchType {
    Exact,
    Prefix,
    /// Fuzzy match at the given edit distance (0..=5)
    Fuzzy(u8),
}

const FUZZY_LABELS: [&str; 6] = [
    "fuzzy_d0", "fuzzy_d1", "fuzzy_d2", "fuzzy_d3", "fuzzy_d4", "fuzzy_d5",
];

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Prefix => "prefix",
            MatchType::Fuzzy(d) => FUZZY_LABELS[(d as usize).min(FUZZY_LABELS.len() - 1)],
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MatchType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A ranked match inside one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub entity_id: EntityId,
    pub display_name: String,
    pub score: u8,
    pub match_type: MatchType,
}

/// A ranked match from a multi-category suggest query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub category: Category,
    pub entity_id: EntityId,
    pub display_name: String,
    pub score: u8,
}

/// One page of matched ids plus the total match count
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchPage {
    pub ids: Vec<EntityId>,
    pub total: u64,
}

/// Error type for Yomi operations
#[derive(Debug, Error)]
pub enum YomiError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Index load failed: {0}")]
    Load(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Store is shut down")]
    Shutdown,
    #[error("Operation cancelled")]
    Cancelled,
}

pub type YomiResult<T> = Result<T, YomiError>;

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Operations the HTTP layer (or any other collaborator) calls.
/// Implemented by `SearchStore`.
#[async_trait::async_trait]
pub trait SearchApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ranked matches in one category. Blank keywords return no hits.
    async fn search(
        &self,
        category: Category,
        keyword: &str,
        limit: usize,
    ) -> YomiResult<Vec<SearchHit>>;

    /// Ranked matches merged across categories. An empty category list means
    /// the configured defaults.
    async fn suggest(
        &self,
        keyword: &str,
        categories: &[Category],
        limit: usize,
    ) -> YomiResult<Vec<Suggestion>>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Index lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Whether the index for `category` has been built
    fn has_index(&self, category: Category) -> bool;

    /// Build the index for `category` if it is not built yet
    async fn ensure_index(&self, category: Category) -> YomiResult<()>;
}

impl From<crate::database::DatabaseError> for YomiError {
    fn from(e: crate::database::DatabaseError) -> Self {
        YomiError::Database(e.to_string())
    }
}

impl From<crate::cache::CacheError> for YomiError {
    fn from(e: crate::cache::CacheError) -> Self {
        use crate::cache::CacheError;
        match e {
            CacheError::NotFound(key) => YomiError::NotFound(key),
            CacheError::Load(msg) => YomiError::Load(msg),
            CacheError::Closed => YomiError::Shutdown,
        }
    }
}
