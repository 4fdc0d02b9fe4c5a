//! Surface-form generation
//!
//! Expands a name into every spelling it should be findable under: width and
//! punctuation folding, the Han substring with its pinyin, initials and
//! simplified/traditional variants, romaji and kana conversions, and the
//! Latin-letter-only substring. Queries get a lighter expansion through
//! `search_variants`.
//!
//! Form order is insertion order and is stable for a given input; the query
//! matcher's first-match-wins phases depend on it.

use crate::similarity::{is_han, is_kana};
use crate::transliterate::{
    hira_to_kata, japanese_to_hiragana, japanese_to_romaji, kata_to_hira, to_pinyin,
    to_pinyin_initials, to_simplified, to_traditional, Memo,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Capacity of the `all_forms` memo
pub const FORMS_MEMO_CAPACITY: usize = 100_000;

static ALL_FORMS: Lazy<Memo<Arc<FormSet>>> = Lazy::new(|| Memo::new(FORMS_MEMO_CAPACITY));

/// Deduplicated, insertion-ordered set of non-empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSet {
    forms: Vec<String>,
}

impl FormSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a form unless it is empty or already present.
    pub fn insert(&mut self, form: impl Into<String>) -> bool {
        let form = form.into();
        if form.is_empty() || self.contains(&form) {
            return false;
        }
        self.forms.push(form);
        true
    }

    pub fn contains(&self, form: &str) -> bool {
        self.forms.iter().any(|f| f == form)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.forms.iter()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

impl<'a> IntoIterator for &'a FormSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.forms.iter()
    }
}

/// Separators and brackets dropped by `normalize`
fn is_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '-' | '_' | '＿' | '·' | '・' | '×' | '/' | '\\' | '【' | '】' | '[' | ']' | '「'
                | '」' | '『' | '』' | '《' | '》' | '(' | ')' | '（' | '）' | '"' | '\''
        )
}

/// Full-width Latin letters and digits to their ASCII counterparts
fn fold_width(c: char) -> char {
    match c {
        'ａ'..='ｚ' | 'Ａ'..='Ｚ' | '０'..='９' => {
            char::from_u32(c as u32 - 0xfee0).unwrap_or(c)
        }
        _ => c,
    }
}

/// Fold full-width alphanumerics, lowercase, and strip separators.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(fold_width)
        .flat_map(char::to_lowercase)
        .filter(|&c| !is_separator(c))
        .collect()
}

/// Han ideographs of `text`, in order
pub fn extract_han(text: &str) -> String {
    text.chars().filter(|&c| is_han(c)).collect()
}

/// Hiragana and katakana of `text`, in order
pub fn extract_kana(text: &str) -> String {
    text.chars().filter(|&c| is_kana(c)).collect()
}

/// ASCII letters of `text`, lowercased and concatenated
pub fn alpha_only(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Every searchable form of an entity name. Memoized.
pub fn all_forms(name: &str) -> Arc<FormSet> {
    if name.is_empty() {
        return Arc::new(FormSet::new());
    }
    ALL_FORMS.get_or_compute(name, |n| Arc::new(generate_all_forms(n)))
}

fn generate_all_forms(name: &str) -> FormSet {
    let mut forms = FormSet::new();
    forms.insert(name);
    forms.insert(name.to_lowercase());
    forms.insert(normalize(name));

    let han = extract_han(name);
    if !han.is_empty() {
        forms.insert(han.as_str());
        forms.insert(to_pinyin(&han));
        let initials = to_pinyin_initials(&han);
        if initials.chars().count() >= 2 {
            forms.insert(initials);
        }
        for variant in [to_simplified(&han), to_traditional(&han)] {
            if !variant.is_empty() && variant != han {
                forms.insert(normalize(&variant));
                forms.insert(variant);
            }
        }
        forms.insert(japanese_to_romaji(&han).to_lowercase());
    }

    if !extract_kana(name).is_empty() {
        forms.insert(japanese_to_romaji(name).to_lowercase());
        forms.insert(japanese_to_hiragana(name));
        let hira = kata_to_hira(name);
        if hira != name {
            forms.insert(hira);
        }
        let kata = hira_to_kata(name);
        if kata != name {
            forms.insert(kata);
        }
    }

    let alpha = alpha_only(name);
    if alpha.chars().count() >= 2 {
        forms.insert(alpha);
    }

    forms
}

/// Query-side expansion: the keyword, its lowercase and normalized forms, and
/// the script conversions of any Han or kana it contains. No alphabetic
/// substring extraction.
pub fn search_variants(keyword: &str) -> FormSet {
    let mut variants = FormSet::new();
    variants.insert(keyword);
    variants.insert(keyword.to_lowercase());
    variants.insert(normalize(keyword));

    let han = extract_han(keyword);
    if !han.is_empty() {
        variants.insert(to_pinyin(&han));
        let initials = to_pinyin_initials(&han);
        if initials.chars().count() >= 2 {
            variants.insert(initials);
        }
        variants.insert(to_simplified(&han));
        variants.insert(to_traditional(&han));
        variants.insert(japanese_to_romaji(&han).to_lowercase());
    }

    if !extract_kana(keyword).is_empty() {
        variants.insert(japanese_to_romaji(keyword).to_lowercase());
        variants.insert(kata_to_hira(keyword));
        variants.insert(hira_to_kata(keyword));
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "初音ミク",
        "Hatsune Miku",
        "ＡＢＣ－１２３",
        "【MMD】 千本桜 (Cover)",
        "「ロミオとシンデレラ」",
        "  spaced__out--name  ",
        "Ｍｅｌｔ／ryo",
        "",
    ];

    #[test]
    fn test_normalize_folds_width_and_case() {
        assert_eq!(normalize("ＡＢＣ１２３"), "abc123");
        assert_eq!(normalize("Hatsune Miku"), "hatsunemiku");
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(normalize("【MMD】 千本桜 (Cover)"), "mmd千本桜cover");
        assert_eq!(normalize("「ロミオとシンデレラ」"), "ロミオとシンデレラ");
        assert_eq!(normalize("a-b_c＿d·e・f×g/h\\i\"j'k"), "abcdefghijk");
        assert_eq!(normalize("（x）[y]『z』《w》"), "xyzw");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_all_forms_contains_lowercase_and_normalized() {
        for sample in SAMPLES.iter().filter(|s| !s.is_empty()) {
            let forms = all_forms(sample);
            assert!(forms.contains(&sample.to_lowercase()), "{sample:?}");
            let normalized = normalize(sample);
            if !normalized.is_empty() {
                assert!(forms.contains(&normalized), "{sample:?}");
            }
            assert!(forms.iter().all(|f| !f.is_empty()));
        }
    }

    #[test]
    fn test_all_forms_of_empty_name_is_empty() {
        assert!(all_forms("").is_empty());
    }

    #[test]
    fn test_all_forms_han_expansion() {
        let forms = all_forms("初音");
        assert!(forms.contains("初音"));
        assert!(forms.contains("chuyin"));
        assert!(forms.contains("cy"));
    }

    #[test]
    fn test_all_forms_adds_chinese_variants() {
        let forms = all_forms("愛");
        assert!(forms.contains("爱"));
        let forms = all_forms("爱");
        assert!(forms.contains("愛"));
    }

    #[test]
    fn test_all_forms_kana_conversions() {
        let forms = all_forms("ミク");
        assert!(forms.contains("ミク"));
        assert!(forms.contains("みく"));
        let forms = all_forms("みく");
        assert!(forms.contains("ミク"));
    }

    #[test]
    fn test_all_forms_alpha_substring() {
        let forms = all_forms("DECO*27");
        assert!(forms.contains("deco"));
        // single letters are not kept
        assert!(!all_forms("x7").contains("x"));
    }

    #[test]
    fn test_all_forms_order_starts_with_name() {
        let forms = all_forms("Hatsune Miku");
        let ordered: Vec<&str> = forms.iter().map(String::as_str).collect();
        assert_eq!(ordered, vec!["Hatsune Miku", "hatsune miku", "hatsunemiku"]);
    }

    #[test]
    fn test_all_forms_is_memoized() {
        let a = all_forms("ワールドイズマイン");
        let b = all_forms("ワールドイズマイン");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_search_variants_latin() {
        let variants = search_variants("Abc d");
        let ordered: Vec<&str> = variants.iter().map(String::as_str).collect();
        assert_eq!(ordered, vec!["Abc d", "abc d", "abcd"]);
    }

    #[test]
    fn test_search_variants_skip_alpha_extraction() {
        let variants = search_variants("DECO*27");
        assert!(!variants.contains("deco"));
        assert!(variants.contains("deco*27"));
    }

    #[test]
    fn test_search_variants_han_and_kana() {
        let variants = search_variants("初音ミク");
        assert!(variants.contains("初音ミク"));
        assert!(variants.contains("chuyin"));
        assert!(variants.contains("cy"));
        assert!(variants.contains("初音みく"));
    }

    #[test]
    fn test_form_set_dedups_and_skips_empty() {
        let mut set = FormSet::new();
        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert!(!set.insert(""));
        assert_eq!(set.len(), 1);
    }
}
