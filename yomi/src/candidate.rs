//! Fuzzy candidate with memoized derived state.
//!
//! Module isolation ensures no code outside this module can mutate `form`
//! after construction, so the `OnceLock` cache can never go stale.

use crate::models::Slot;
use std::sync::OnceLock;

/// A string an entity can be fuzzy-matched under.
/// `chars()` is computed on first access and cached, so repeated queries
/// against the same snapshot skip re-decoding the form.
#[derive(Debug)]
pub struct FuzzyCandidate {
    form: String,
    pub(crate) slot: Slot,
    /// True only for an entity's primary (normalized) form when the name is mostly CJK
    pub is_cjk: bool,
    chars: OnceLock<Vec<char>>,
}

impl FuzzyCandidate {
    pub(crate) fn new(form: String, slot: Slot, is_cjk: bool) -> Self {
        Self {
            form,
            slot,
            is_cjk,
            chars: OnceLock::new(),
        }
    }

    pub fn form(&self) -> &str {
        &self.form
    }

    pub fn chars(&self) -> &[char] {
        self.chars.get_or_init(|| self.form.chars().collect())
    }
}
