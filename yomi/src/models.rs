//! Core data models for Yomi
//!
//! `Entity` is what a source hands us; the remaining records are the
//! internal rows an index build stores.

use crate::interface::EntityId;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// SOURCE ENTITY
// ─────────────────────────────────────────────────────────────────────────────

/// An (id, name) pair read from an entity source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// INDEX ROWS (not exposed to collaborators)
// ─────────────────────────────────────────────────────────────────────────────

/// Slot of an entity inside one index snapshot, in scan order
pub(crate) type Slot = u32;

/// An entity as stored by an index: display name plus its normalized name
#[derive(Debug, Clone)]
pub(crate) struct IndexedEntity {
    pub id: EntityId,
    pub name: String,
    pub normalized: String,
}

/// Prefix bucket row: the form that landed in the bucket and its entity
#[derive(Debug, Clone)]
pub(crate) struct PrefixEntry {
    pub form: Arc<str>,
    pub slot: Slot,
}
