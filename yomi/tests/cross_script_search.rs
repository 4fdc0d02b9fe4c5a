//! End-to-end matcher behavior across scripts, through the public API.

use yomi::search::search_in_index;
use yomi::text_forms::{all_forms, normalize};
use yomi::{Entity, EntityId, MatchType, SearchIndex};

fn index(pairs: &[(i64, &str)]) -> SearchIndex {
    SearchIndex::build(pairs.iter().map(|&(id, name)| Entity::new(id, name)).collect())
}

// ============================================================
// Exact matching
// ============================================================

#[test]
fn exact_kana_han_name_ranks_first() {
    let index = index(&[(1, "初音ミク"), (2, "Hatsune Miku")]);
    let hits = search_in_index(&index, "初音ミク", 10);

    assert_eq!(hits[0].entity_id, EntityId::Int(1));
    assert_eq!(hits[0].score, 100);
    assert_eq!(hits[0].match_type, MatchType::Exact);
}

#[test]
fn fullwidth_query_matches_ascii_name() {
    let index = index(&[(1, "Melt")]);
    let hits = search_in_index(&index, "Ｍｅｌｔ", 10);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity_id, EntityId::Int(1));
    assert_eq!(hits[0].match_type, MatchType::Exact);
}

#[test]
fn bracketed_title_is_found_by_bare_words() {
    let index = index(&[(1, "【MMD】 千本桜 (Cover)")]);
    let hits = search_in_index(&index, "mmd千本桜cover", 10);
    assert_eq!(hits[0].entity_id, EntityId::Int(1));
    assert_eq!(hits[0].score, 100);
}

// ============================================================
// Cross-script matching
// ============================================================

#[test]
fn romaji_query_finds_japanese_name() {
    // kakasi reads 初音 as "hatsuoto" where pykakasi gives "hatsune", so the
    // romaji form is "hatsuotomiku" and the query lands in the fuzzy phase,
    // three edits away.
    let index = index(&[(3, "初音ミク")]);
    let hits = search_in_index(&index, "hatsune miku", 10);

    let hit = hits
        .iter()
        .find(|h| h.entity_id == EntityId::Int(3))
        .expect("romaji query should surface the kana/kanji name");
    assert_eq!(hit.match_type, MatchType::Fuzzy(3));
    assert_eq!(hit.score, 46);
}

#[test]
fn pinyin_query_finds_han_name() {
    let index = index(&[(1, "千本桜"), (2, "Melt")]);
    let hits = search_in_index(&index, "qianben", 10);
    assert_eq!(hits.first().map(|h| &h.entity_id), Some(&EntityId::Int(1)));
    assert_eq!(hits[0].match_type, MatchType::Prefix);
}

#[test]
fn katakana_query_finds_hiragana_name() {
    let index = index(&[(1, "まふまふ")]);
    let hits = search_in_index(&index, "マフマフ", 10);
    assert_eq!(hits[0].entity_id, EntityId::Int(1));
    assert_eq!(hits[0].match_type, MatchType::Exact);
}

#[test]
fn traditional_query_finds_simplified_name() {
    let index = index(&[(1, "爱")]);
    let hits = search_in_index(&index, "愛", 10);
    assert_eq!(hits.first().map(|h| &h.entity_id), Some(&EntityId::Int(1)));
}

// ============================================================
// Fuzzy bounds and ranking
// ============================================================

#[test]
fn typo_is_tolerated() {
    let index = index(&[(1, "Rolling Girl")]);
    let hits = search_in_index(&index, "roling girl", 10);
    assert_eq!(hits[0].entity_id, EntityId::Int(1));
    assert!(matches!(hits[0].match_type, MatchType::Fuzzy(d) if d <= 2));
}

#[test]
fn six_substitutions_are_not_a_fuzzy_match() {
    let index = index(&[(1, "abcdefghijkl")]);
    let hits = search_in_index(&index, "uvwxyzghijkl", 10);
    assert!(hits.iter().all(|h| h.entity_id != EntityId::Int(1)));
}

#[test]
fn equal_scores_sort_by_display_name() {
    let index = index(&[(2, "miku"), (1, "Miku")]);
    let hits = search_in_index(&index, "miku", 10);
    let names: Vec<&str> = hits.iter().map(|h| h.display_name.as_str()).collect();
    assert_eq!(names, vec!["Miku", "miku"]);
}

#[test]
fn match_types_serialize_as_labels() {
    let index = index(&[(1, "abcdefghijkl")]);
    let hits = search_in_index(&index, "abcdefghijkx", 10);
    let json = serde_json::to_value(&hits[0]).unwrap();
    assert_eq!(json["match_type"], "fuzzy_d1");
    assert_eq!(json["score"], 62);
    assert_eq!(json["entity_id"], 1);
}

// ============================================================
// Form generation properties
// ============================================================

#[test]
fn forms_always_include_lowercase_and_normalized() {
    for name in ["初音ミク", "Hatsune Miku", "ＤＥＣＯ＊２７", "「ロミオとシンデレラ」", "ryo (supercell)"] {
        let forms = all_forms(name);
        assert!(forms.contains(&name.to_lowercase()), "{name}");
        assert!(forms.contains(&normalize(name)), "{name}");
        assert_eq!(normalize(&normalize(name)), normalize(name));
    }
}
