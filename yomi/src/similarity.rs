//! String similarity primitives: n-gram shingles, bounded Levenshtein
//! distance and CJK density checks.

use std::collections::HashSet;

/// True for Han ideographs in the CJK Unified Ideographs block
pub fn is_han(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// True for hiragana or katakana
pub fn is_kana(c: char) -> bool {
    ('\u{3040}'..='\u{309f}').contains(&c) || ('\u{30a0}'..='\u{30ff}').contains(&c)
}

fn is_cjk(c: char) -> bool {
    is_han(c) || is_kana(c)
}

/// Whether the text contains any Han or kana character.
pub fn has_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// Whether more than 30% of the characters are Han or kana.
pub fn is_mainly_cjk(text: &str) -> bool {
    let mut total = 0usize;
    let mut cjk = 0usize;
    for c in text.chars() {
        total += 1;
        if is_cjk(c) {
            cjk += 1;
        }
    }
    cjk as f64 > total as f64 * 0.3
}

/// Overlapping `n`-character shingles, deduplicated in first-occurrence order.
///
/// Text shorter than `n` yields itself as the only shingle; empty text yields
/// nothing.
pub fn build_ngrams(text: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() < n {
        return if text.is_empty() { Vec::new() } else { vec![text.to_string()] };
    }

    let mut seen = HashSet::new();
    let mut grams = Vec::with_capacity(chars.len() + 1 - n);
    for window in chars.windows(n) {
        let gram: String = window.iter().collect();
        if seen.insert(gram.clone()) {
            grams.push(gram);
        }
    }
    grams
}

/// Levenshtein distance with threshold pruning.
///
/// Returns `max_dist + 1` as soon as the distance is known to exceed
/// `max_dist`: either the lengths differ by more than that, or every cell of
/// a DP row is already above it.
pub fn levenshtein_distance(a: &[char], b: &[char], max_dist: usize) -> usize {
    if a.len().abs_diff(b.len()) > max_dist {
        return max_dist + 1;
    }
    let (short, long) = if a.len() > b.len() { (b, a) } else { (a, b) };

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, &lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for (j, &sc) in short.iter().enumerate() {
            let cost = usize::from(sc != lc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            row_min = row_min.min(curr[j + 1]);
        }

        if row_min > max_dist {
            return max_dist + 1;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// `levenshtein_distance` over string slices.
pub fn levenshtein(a: &str, b: &str, max_dist: usize) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein_distance(&a, &b, max_dist)
}
