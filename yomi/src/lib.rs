//! Yomi - multi-script entity name search
//!
//! Finds songs, videos, producers, vocalists, synthesizers and uploaders by
//! name regardless of the script the user types in: Han characters, kana,
//! pinyin, romaji, full-width Latin, or a typo of any of those.
//!
//! Each category gets an in-memory index built from a full scan of its
//! entity source and refreshed in the background. Queries run a three-phase
//! matcher (exact, prefix/contains, bigram-filtered fuzzy) against the
//! current snapshot.

pub mod cache;
pub(crate) mod candidate;
pub mod config;
pub mod database;
pub mod indexer;
pub mod interface;
pub mod models;
pub mod search;
pub mod similarity;
mod store;
pub mod text_forms;
pub mod transliterate;

pub use config::StoreConfig;
pub use database::{Database, EntitySource, StaticEntitySource};
pub use indexer::{IndexStats, SearchIndex};
pub use interface::*;
pub use models::Entity;
pub use store::SearchStore;
