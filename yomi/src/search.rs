//! Query matcher: ranked keyword search against one `SearchIndex`
//!
//! Three phases, each skipping entities an earlier phase already matched:
//! 1. exact: a search variant equals an indexed form (100 for the
//!    lowercased keyword itself, 90 for any other variant)
//! 2. prefix/contains over the two-character prefix buckets (80/75/70)
//! 3. fuzzy: bigram candidate retrieval + bounded Levenshtein
//!    (70 - 8 × distance, distance ≤ 5)
//!
//! Phase 1 keeps the best score per entity. Phases 2 and 3 keep the first
//! qualifying score for an entity and skip it afterwards, so iteration order
//! (variant order, bucket order, candidate order) decides the score.
//!
//! The cancellable entry point checks its token between phases and
//! periodically inside the fuzzy scan, which dominates query time.

use crate::indexer::{char_prefix, SearchIndex, NGRAM_SIZE, PREFIX_LEN};
use crate::interface::{EntityId, MatchType, SearchHit, YomiError, YomiResult};
use crate::models::Slot;
use crate::similarity::{build_ngrams, levenshtein_distance};
use crate::text_forms::{normalize, search_variants, FormSet};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Largest edit distance the fuzzy phase accepts
pub const FUZZY_MAX_DISTANCE: usize = 5;

/// Default result cap for a category search
pub const DEFAULT_LIMIT: usize = 500;

const SCORE_EXACT_KEYWORD: u8 = 100;
const SCORE_EXACT_VARIANT: u8 = 90;
const SCORE_PREFIX: u8 = 80;
const SCORE_NORMALIZED_CONTAINS: u8 = 75;
const SCORE_CONTAINS: u8 = 70;
const SCORE_FUZZY_BASE: u8 = 70;
const SCORE_FUZZY_STEP: u8 = 8;

/// Fuzzy candidates scored between cancellation checks
const CANCEL_CHECK_EVERY: usize = 256;

#[derive(Debug, Clone, Copy)]
struct RawMatch {
    slot: Slot,
    score: u8,
    match_type: MatchType,
}

/// Matches keyed by entity id, kept in first-match order
struct MatchSet<'a> {
    matches: Vec<RawMatch>,
    by_id: HashMap<&'a EntityId, usize>,
}

impl<'a> MatchSet<'a> {
    fn new() -> Self {
        Self {
            matches: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Record a match, replacing an existing one for the same id only when
    /// the new score is higher.
    fn record(&mut self, id: &'a EntityId, slot: Slot, score: u8, match_type: MatchType) {
        let candidate = RawMatch { slot, score, match_type };
        match self.by_id.get(id).copied() {
            Some(i) if score > self.matches[i].score => self.matches[i] = candidate,
            Some(_) => {}
            None => {
                self.by_id.insert(id, self.matches.len());
                self.matches.push(candidate);
            }
        }
    }
}

/// Search one index. Blank keywords yield no results.
pub fn search_in_index(index: &SearchIndex, keyword: &str, limit: usize) -> Vec<SearchHit> {
    // A fresh token is never cancelled.
    search_in_index_cancellable(index, keyword, limit, &CancellationToken::new())
        .unwrap_or_default()
}

/// Like `search_in_index`, but gives up with `YomiError::Cancelled` once
/// `token` fires.
pub fn search_in_index_cancellable(
    index: &SearchIndex,
    keyword: &str,
    limit: usize,
    token: &CancellationToken,
) -> YomiResult<Vec<SearchHit>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Ok(Vec::new());
    }
    let variants = search_variants(keyword);
    let matches = collect_matches(index, &variants, keyword, token)?;
    Ok(finalize(index, matches, limit))
}

fn check(token: &CancellationToken) -> YomiResult<()> {
    if token.is_cancelled() {
        return Err(YomiError::Cancelled);
    }
    Ok(())
}

fn collect_matches<'a>(
    index: &'a SearchIndex,
    variants: &FormSet,
    keyword: &str,
    token: &CancellationToken,
) -> YomiResult<Vec<RawMatch>> {
    let keyword_lower = keyword.to_lowercase();
    let keyword_normalized = normalize(keyword);

    let mut matches = MatchSet::new();
    let mut seen: HashSet<&'a EntityId> = HashSet::new();

    check(token)?;
    exact_phase(index, variants, &keyword_lower, &mut matches, &mut seen);
    check(token)?;
    prefix_phase(index, variants, &keyword_normalized, &mut matches, &mut seen);
    if keyword_normalized.chars().count() >= NGRAM_SIZE {
        check(token)?;
        fuzzy_phase(index, variants, &keyword_normalized, &mut matches, &mut seen, token)?;
    }

    Ok(matches.matches)
}

fn exact_phase<'a>(
    index: &'a SearchIndex,
    variants: &FormSet,
    keyword_lower: &str,
    matches: &mut MatchSet<'a>,
    seen: &mut HashSet<&'a EntityId>,
) {
    for variant in variants {
        let Some(slots) = index.exact_index.get(variant) else {
            continue;
        };
        let score = if variant == keyword_lower {
            SCORE_EXACT_KEYWORD
        } else {
            SCORE_EXACT_VARIANT
        };
        for &slot in slots {
            let id = &index.entity(slot).id;
            matches.record(id, slot, score, MatchType::Exact);
            seen.insert(id);
        }
    }
}

fn prefix_phase<'a>(
    index: &'a SearchIndex,
    variants: &FormSet,
    keyword_normalized: &str,
    matches: &mut MatchSet<'a>,
    seen: &mut HashSet<&'a EntityId>,
) {
    let mut checked: HashSet<&str> = HashSet::new();
    for variant in variants {
        if variant.chars().count() < PREFIX_LEN {
            continue;
        }
        let key = char_prefix(variant, PREFIX_LEN);
        if checked.contains(key) {
            continue;
        }
        let Some(rows) = index.prefix_index.get(key) else {
            continue;
        };
        checked.insert(key);

        for row in rows {
            let entity = index.entity(row.slot);
            if seen.contains(&entity.id) {
                continue;
            }
            let score = if row.form.starts_with(variant.as_str()) {
                SCORE_PREFIX
            } else if row.form.contains(variant.as_str()) {
                SCORE_CONTAINS
            } else if entity.normalized.contains(keyword_normalized) {
                SCORE_NORMALIZED_CONTAINS
            } else {
                continue;
            };
            matches.record(&entity.id, row.slot, score, MatchType::Prefix);
            seen.insert(&entity.id);
        }
    }
}

fn fuzzy_phase<'a>(
    index: &'a SearchIndex,
    variants: &FormSet,
    keyword_normalized: &str,
    matches: &mut MatchSet<'a>,
    seen: &mut HashSet<&'a EntityId>,
    token: &CancellationToken,
) -> YomiResult<()> {
    let lowered: Vec<Vec<char>> = variants
        .iter()
        .filter(|v| v.chars().count() >= NGRAM_SIZE)
        .map(|v| v.to_lowercase().chars().collect())
        .collect();

    let mut grams: HashSet<String> = HashSet::new();
    for variant in &lowered {
        let text: String = variant.iter().collect();
        grams.extend(build_ngrams(&text, NGRAM_SIZE));
    }
    if grams.is_empty() {
        grams.extend(build_ngrams(keyword_normalized, NGRAM_SIZE));
    }

    // Any shared bigram makes a candidate; visit them in build order.
    let mut candidates: BTreeSet<u32> = BTreeSet::new();
    for gram in &grams {
        if let Some(positions) = index.ngram_index.get(gram) {
            candidates.extend(positions.iter().copied());
        }
    }

    for (scanned, position) in candidates.into_iter().enumerate() {
        if scanned % CANCEL_CHECK_EVERY == 0 {
            check(token)?;
        }
        let candidate = &index.fuzzy_candidates[position as usize];
        let entity = index.entity(candidate.slot);
        if seen.contains(&entity.id) {
            continue;
        }

        let best = lowered
            .iter()
            .map(|v| levenshtein_distance(v, candidate.chars(), FUZZY_MAX_DISTANCE))
            .min()
            .unwrap_or(FUZZY_MAX_DISTANCE + 1);

        if best <= FUZZY_MAX_DISTANCE {
            let distance = best as u8;
            let score = SCORE_FUZZY_BASE - SCORE_FUZZY_STEP * distance;
            matches.record(&entity.id, candidate.slot, score, MatchType::Fuzzy(distance));
            seen.insert(&entity.id);
        }
    }
    Ok(())
}

/// Sort by score descending, then display name ascending; truncate to `limit`.
fn finalize(index: &SearchIndex, mut matches: Vec<RawMatch>, limit: usize) -> Vec<SearchHit> {
    matches.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| index.entity(a.slot).name.cmp(&index.entity(b.slot).name))
    });
    matches
        .into_iter()
        .take(limit)
        .map(|m| {
            let entity = index.entity(m.slot);
            SearchHit {
                entity_id: entity.id.clone(),
                display_name: entity.name.clone(),
                score: m.score,
                match_type: m.match_type,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;

    fn build(pairs: &[(i64, &str)]) -> SearchIndex {
        SearchIndex::build(pairs.iter().map(|&(id, name)| Entity::new(id, name)).collect())
    }

    fn hit_for(hits: &[SearchHit], id: i64) -> Option<&SearchHit> {
        hits.iter().find(|h| h.entity_id == EntityId::Int(id))
    }

    #[test]
    fn test_exact_match_scores_100() {
        let index = build(&[(1, "初音ミク"), (2, "Hatsune Miku")]);
        let hits = search_in_index(&index, "初音ミク", 10);
        assert_eq!(hits[0].entity_id, EntityId::Int(1));
        assert_eq!(hits[0].score, 100);
        assert_eq!(hits[0].match_type, MatchType::Exact);
    }

    #[test]
    fn test_exact_variant_scores_90() {
        let index = build(&[(1, "Hatsune Miku")]);
        // "hatsunemiku" is the normalized variant, not the lowercased keyword
        let hits = search_in_index(&index, "Hatsune-Miku", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 90);
        assert_eq!(hits[0].match_type, MatchType::Exact);
    }

    #[test]
    fn test_exact_phase_keeps_best_score() {
        let index = build(&[(1, "Melt")]);
        // "Melt" hits via the raw variant (90) and the lowercase variant (100)
        let hits = search_in_index(&index, "Melt", 10);
        assert_eq!(hits[0].score, 100);
    }

    #[test]
    fn test_prefix_match_scores_80() {
        let index = build(&[(1, "Meltdown")]);
        let hits = search_in_index(&index, "melt", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 80);
        assert_eq!(hits[0].match_type, MatchType::Prefix);
    }

    #[test]
    fn test_contains_within_bucket_scores_70() {
        let index = build(&[(1, "abxabcd")]);
        let hits = search_in_index(&index, "abc", 10);
        assert_eq!(hits[0].score, 70);
        assert_eq!(hits[0].match_type, MatchType::Prefix);
    }

    #[test]
    fn test_prefix_phase_first_match_wins() {
        // The raw variant "Abc d" reaches the "Ab" bucket first and qualifies
        // through the normalized-name rule (75). The normalized variant
        // "abcd" would have scored 80 against "abcdef", but the entity is
        // already seen and the "ab" bucket is visited with "abc d" only.
        let index = build(&[(1, "Abcdef")]);
        let hits = search_in_index(&index, "Abc d", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 75);
        assert_eq!(hits[0].match_type, MatchType::Prefix);
    }

    #[test]
    fn test_fuzzy_phase_first_match_wins() {
        // "deco*27" is registered before the alphabetic form "deco" and is
        // scanned first at distance 4. The entity is then seen, so the
        // distance-1 match against "deco" never counts.
        let index = build(&[(1, "DECO*27")]);
        let hits = search_in_index(&index, "decp", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, EntityId::Int(1));
        assert_eq!(hits[0].score, 38);
        assert_eq!(hits[0].match_type, MatchType::Fuzzy(4));
    }

    #[test]
    fn test_fuzzy_scores_by_distance() {
        let index = build(&[(1, "abcdefghijkl")]);
        let hits = search_in_index(&index, "abcdefghijkx", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 62);
        assert_eq!(hits[0].match_type, MatchType::Fuzzy(1));
    }

    #[test]
    fn test_fuzzy_distance_five_is_the_floor() {
        let index = build(&[(1, "abcdefghijkl")]);
        let hits = search_in_index(&index, "uvwxyfghijkl", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, 30);
        assert_eq!(hits[0].match_type, MatchType::Fuzzy(5));
    }

    #[test]
    fn test_fuzzy_distance_six_is_excluded() {
        let index = build(&[(1, "abcdefghijkl")]);
        let hits = search_in_index(&index, "uvwxyzghijkl", 10);
        assert!(hit_for(&hits, 1).is_none());
    }

    #[test]
    fn test_fuzzy_phase_needs_two_normalized_chars() {
        let index = build(&[(1, "ab")]);
        assert!(search_in_index(&index, "x", 10).is_empty());
    }

    #[test]
    fn test_equal_scores_order_by_display_name() {
        let index = build(&[(1, "Miku"), (2, "MIKU"), (3, "miku")]);
        let hits = search_in_index(&index, "miku", 10);
        let names: Vec<&str> = hits.iter().map(|h| h.display_name.as_str()).collect();
        assert_eq!(names, vec!["MIKU", "Miku", "miku"]);
        assert!(hits.iter().all(|h| h.score == 100));
    }

    #[test]
    fn test_phases_never_duplicate_an_entity() {
        let index = build(&[(1, "Melt"), (2, "Meltdown"), (3, "Melty Land")]);
        let hits = search_in_index(&index, "melt", 10);
        let mut ids: Vec<&EntityId> = hits.iter().map(|h| &h.entity_id).collect();
        let before = ids.len();
        ids.dedup();
        assert_eq!(ids.len(), before);
        assert_eq!(hit_for(&hits, 1).map(|h| h.score), Some(100));
        assert_eq!(hit_for(&hits, 2).map(|h| h.score), Some(80));
        assert_eq!(hit_for(&hits, 3).map(|h| h.score), Some(80));
    }

    #[test]
    fn test_limit_truncates_after_ranking() {
        let index = build(&[(1, "Meltdown"), (2, "Melt"), (3, "Melty")]);
        let hits = search_in_index(&index, "melt", 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, EntityId::Int(2));
    }

    #[test]
    fn test_blank_keyword_returns_nothing() {
        let index = build(&[(1, "Melt")]);
        assert!(search_in_index(&index, "", 10).is_empty());
        assert!(search_in_index(&index, "   ", 10).is_empty());
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let index = build(&[(1, "Melt")]);
        let token = CancellationToken::new();
        token.cancel();
        let result = search_in_index_cancellable(&index, "melt", 10, &token);
        assert!(matches!(result, Err(YomiError::Cancelled)));
    }

    #[test]
    fn test_no_match() {
        let index = build(&[(1, "Melt")]);
        assert!(search_in_index(&index, "zzzz", 10).is_empty());
    }
}
