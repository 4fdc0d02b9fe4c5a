//! Script conversions: pinyin, romaji, kana and Chinese character variants.
//!
//! Every dictionary-backed conversion is memoized in a bounded LRU keyed by
//! the input text. The kana↔kana mappings are plain codepoint shifts and are
//! not cached.

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use pinyin::ToPinyin;
use std::num::NonZeroUsize;
use zhconv::{zhconv, Variant};

/// Capacity of each per-function transliteration memo
pub const TRANSLITERATION_MEMO_CAPACITY: usize = 50_000;

/// Thread-safe bounded memo for an expensive pure function.
pub(crate) struct Memo<V> {
    cache: Mutex<LruCache<String, V>>,
}

impl<V: Clone> Memo<V> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Return the cached value for `key`, computing it with `compute` on a miss.
    /// The lock is not held while computing.
    pub(crate) fn get_or_compute(&self, key: &str, compute: impl FnOnce(&str) -> V) -> V {
        if let Some(hit) = self.cache.lock().get(key) {
            return hit.clone();
        }
        let value = compute(key);
        self.cache.lock().put(key.to_string(), value.clone());
        value
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cache.lock().len()
    }
}

fn memo<V: Clone>() -> Memo<V> {
    Memo::new(TRANSLITERATION_MEMO_CAPACITY)
}

static PINYIN: Lazy<Memo<String>> = Lazy::new(memo::<String>);
static PINYIN_INITIALS: Lazy<Memo<String>> = Lazy::new(memo::<String>);
static SIMPLIFIED: Lazy<Memo<String>> = Lazy::new(memo::<String>);
static TRADITIONAL: Lazy<Memo<String>> = Lazy::new(memo::<String>);
/// kakasi produces both readings in one pass: (romaji, hiragana)
static KAKASI: Lazy<Memo<(String, String)>> = Lazy::new(memo::<(String, String)>);

/// Toneless pinyin reading, syllables concatenated ("初音" → "chuyin").
/// Characters without a reading are kept as-is.
pub fn to_pinyin(text: &str) -> String {
    PINYIN.get_or_compute(text, |t| {
        t.chars()
            .zip(t.to_pinyin())
            .map(|(c, p)| p.map_or_else(|| c.to_string(), |p| p.plain().to_string()))
            .collect()
    })
}

/// First letter of each pinyin syllable ("初音" → "cy").
pub fn to_pinyin_initials(text: &str) -> String {
    PINYIN_INITIALS.get_or_compute(text, |t| {
        t.chars()
            .zip(t.to_pinyin())
            .map(|(c, p)| p.map_or_else(|| c.to_string(), |p| p.first_letter().to_string()))
            .collect()
    })
}

pub fn to_simplified(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    SIMPLIFIED.get_or_compute(text, |t| zhconv(t, Variant::ZhHans))
}

pub fn to_traditional(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    TRADITIONAL.get_or_compute(text, |t| zhconv(t, Variant::ZhHant))
}

fn kakasi_readings(text: &str) -> (String, String) {
    KAKASI.get_or_compute(text, |t| {
        let converted = kakasi::convert(t);
        let romaji: String = converted.romaji.split_whitespace().collect();
        (romaji, converted.hiragana)
    })
}

/// Hepburn romaji of Japanese text, word breaks removed.
pub fn japanese_to_romaji(text: &str) -> String {
    kakasi_readings(text).0
}

/// Full hiragana reading of Japanese text (kanji included).
pub fn japanese_to_hiragana(text: &str) -> String {
    kakasi_readings(text).1
}

// Both tables cover ァ..ヴ / ぁ..ゔ; ー and everything else pass through.
const KATAKANA_START: u32 = 0x30a1;
const KATAKANA_END: u32 = 0x30f4;
const HIRAGANA_START: u32 = 0x3041;
const HIRAGANA_END: u32 = 0x3094;
const KANA_OFFSET: u32 = KATAKANA_START - HIRAGANA_START;

fn shift_char(c: char, start: u32, end: u32, to_hiragana: bool) -> char {
    let code = c as u32;
    if !(start..=end).contains(&code) {
        return c;
    }
    let shifted = if to_hiragana { code - KANA_OFFSET } else { code + KANA_OFFSET };
    char::from_u32(shifted).unwrap_or(c)
}

pub fn kata_to_hira(text: &str) -> String {
    text.chars()
        .map(|c| shift_char(c, KATAKANA_START, KATAKANA_END, true))
        .collect()
}

pub fn hira_to_kata(text: &str) -> String {
    text.chars()
        .map(|c| shift_char(c, HIRAGANA_START, HIRAGANA_END, false))
        .collect()
}
