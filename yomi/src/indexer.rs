//! In-memory search index for one category
//!
//! Built wholesale from a full scan of (id, name) pairs and never mutated
//! afterwards. A refresh builds a new `SearchIndex` and swaps it in.
//!
//! Structures:
//! - exact index: form → entity slots, in scan order
//! - prefix index: first two chars of a form → (form, slot) rows
//! - n-gram index: bigram → fuzzy candidate positions
//! - fuzzy candidates: each entity's normalized name plus its other
//!   lowercase forms, so transliterated spellings are typo-tolerant too

use crate::candidate::FuzzyCandidate;
use crate::interface::EntityId;
use crate::models::{Entity, IndexedEntity, PrefixEntry, Slot};
use crate::similarity::{build_ngrams, is_mainly_cjk};
use crate::text_forms::{all_forms, normalize, FormSet};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shingle width for candidate retrieval
pub const NGRAM_SIZE: usize = 2;

/// Prefix bucket key width, in characters
pub const PREFIX_LEN: usize = 2;

/// Rows between progress log lines during a build
const PROGRESS_EVERY: usize = 5000;

/// Counts describing one index snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub entities: usize,
    pub exact_keys: usize,
    pub prefix_keys: usize,
    pub ngram_keys: usize,
    pub fuzzy_candidates: usize,
    pub built_at: DateTime<Utc>,
}

/// Immutable search index snapshot
#[derive(Debug)]
pub struct SearchIndex {
    pub(crate) entities: Vec<IndexedEntity>,
    pub(crate) exact_index: HashMap<String, Vec<Slot>>,
    pub(crate) prefix_index: HashMap<String, Vec<PrefixEntry>>,
    pub(crate) ngram_index: HashMap<String, Vec<u32>>,
    pub(crate) fuzzy_candidates: Vec<FuzzyCandidate>,
    id_to_slot: HashMap<EntityId, Slot>,
    built_at: DateTime<Utc>,
}

/// First `n` characters of `s`
pub(crate) fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Per-entity derived data, computed in parallel ahead of insertion
struct Prepared {
    entity: Entity,
    normalized: String,
    is_cjk: bool,
    forms: Arc<FormSet>,
}

impl SearchIndex {
    /// Build a snapshot from entities in scan order. Entities with an empty
    /// name are skipped.
    pub fn build(entities: Vec<Entity>) -> Self {
        let started = Instant::now();
        let total = entities.len();

        // Form generation dominates build time; do it in parallel and keep
        // scan order for the sequential insertion below.
        let prepared: Vec<Prepared> = entities
            .into_par_iter()
            .filter(|e| !e.name.is_empty())
            .map(|entity| Prepared {
                normalized: normalize(&entity.name),
                is_cjk: is_mainly_cjk(&entity.name),
                forms: all_forms(&entity.name),
                entity,
            })
            .collect();

        let mut index = Self::empty();
        for (row, item) in prepared.into_iter().enumerate() {
            if row > 0 && row % PROGRESS_EVERY == 0 {
                debug!(row, total, "indexing progress");
            }
            index.insert(item);
        }

        let stats = index.stats();
        info!(
            entities = stats.entities,
            exact_keys = stats.exact_keys,
            prefix_keys = stats.prefix_keys,
            ngram_keys = stats.ngram_keys,
            fuzzy_candidates = stats.fuzzy_candidates,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search index built"
        );
        index
    }

    fn empty() -> Self {
        Self {
            entities: Vec::new(),
            exact_index: HashMap::new(),
            prefix_index: HashMap::new(),
            ngram_index: HashMap::new(),
            fuzzy_candidates: Vec::new(),
            id_to_slot: HashMap::new(),
            built_at: Utc::now(),
        }
    }

    fn insert(&mut self, item: Prepared) {
        let Prepared { entity, normalized, is_cjk, forms } = item;
        let slot = self.entities.len() as Slot;
        self.id_to_slot.insert(entity.id.clone(), slot);

        for form in forms.iter() {
            self.exact_index.entry(form.clone()).or_default().push(slot);
            if form.chars().count() >= PREFIX_LEN {
                self.prefix_index
                    .entry(char_prefix(form, PREFIX_LEN).to_string())
                    .or_default()
                    .push(PrefixEntry { form: Arc::from(form.as_str()), slot });
            }
        }

        if normalized.chars().count() >= NGRAM_SIZE {
            self.add_candidate(normalized.clone(), slot, is_cjk);
        }

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(normalized.clone());
        for form in forms.iter() {
            let lower = form.to_lowercase();
            if lower.chars().count() >= NGRAM_SIZE && !seen.contains(&lower) {
                seen.insert(lower.clone());
                self.add_candidate(lower, slot, false);
            }
        }

        self.entities.push(IndexedEntity {
            id: entity.id,
            name: entity.name,
            normalized,
        });
    }

    fn add_candidate(&mut self, form: String, slot: Slot, is_cjk: bool) {
        let position = self.fuzzy_candidates.len() as u32;
        for gram in build_ngrams(&form, NGRAM_SIZE) {
            self.ngram_index.entry(gram).or_default().push(position);
        }
        self.fuzzy_candidates.push(FuzzyCandidate::new(form, slot, is_cjk));
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Display name of an indexed entity
    pub fn name_of(&self, id: &EntityId) -> Option<&str> {
        self.id_to_slot
            .get(id)
            .map(|&slot| self.entities[slot as usize].name.as_str())
    }

    /// Ids of the entities filed under an exact form, in scan order
    pub fn exact_ids(&self, form: &str) -> Vec<&EntityId> {
        self.exact_index
            .get(form)
            .map(|slots| slots.iter().map(|&s| &self.entity(s).id).collect())
            .unwrap_or_default()
    }

    pub fn fuzzy_candidates(&self) -> &[FuzzyCandidate] {
        &self.fuzzy_candidates
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            entities: self.entities.len(),
            exact_keys: self.exact_index.len(),
            prefix_keys: self.prefix_index.len(),
            ngram_keys: self.ngram_index.len(),
            fuzzy_candidates: self.fuzzy_candidates.len(),
            built_at: self.built_at,
        }
    }

    pub(crate) fn entity(&self, slot: Slot) -> &IndexedEntity {
        &self.entities[slot as usize]
    }
}
