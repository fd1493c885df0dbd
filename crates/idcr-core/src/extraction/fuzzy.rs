//! Weighted fuzzy string scoring on a 0-100 scale.
//!
//! The scorers follow the usual "ratio / partial / token sort / token set"
//! family and combine into [`weighted_ratio`], which is what month correction
//! uses.

use std::collections::BTreeSet;

use super::patterns::NON_WORD;

/// Lowercase, drop non-ASCII, turn non-word characters into spaces and trim.
pub fn full_process(s: &str) -> String {
    let ascii: String = s.chars().filter(char::is_ascii).collect();
    NON_WORD
        .replace_all(&ascii, " ")
        .to_lowercase()
        .trim()
        .to_string()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn round_score(score: f64) -> u8 {
    score.round_ties_even().clamp(0.0, 100.0) as u8
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    // Indel distance: insertions and deletions cost 1, substitutions 2.
    let indel = total - 2 * lcs_len(a, b);
    (total - indel) as f64 / total as f64
}

/// Similarity of the whole strings.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    round_score(100.0 * ratio_chars(&a, &b))
}

/// Best similarity of the shorter string against any equal-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    let mut best = 0.0f64;
    for start in 0..=(long.len() - short.len()) {
        let r = ratio_chars(&short, &long[start..start + short.len()]);
        if r > best {
            best = r;
            if best >= 0.995 {
                return 100;
            }
        }
    }
    round_score(100.0 * best)
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// [`ratio`] after sorting the whitespace-separated tokens.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn partial_token_sort_ratio(a: &str, b: &str) -> u8 {
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_with(a: &str, b: &str, scorer: fn(&str, &str) -> u8) -> u8 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |set: Vec<&str>| set.join(" ");
    let intersection = join(ta.intersection(&tb).copied().collect());
    let diff_ab = join(ta.difference(&tb).copied().collect());
    let diff_ba = join(tb.difference(&ta).copied().collect());

    let combined_ab = format!("{intersection} {diff_ab}").trim().to_string();
    let combined_ba = format!("{intersection} {diff_ba}").trim().to_string();
    let intersection = intersection.trim();

    [
        scorer(intersection, &combined_ab),
        scorer(intersection, &combined_ba),
        scorer(&combined_ab, &combined_ba),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// Best [`ratio`] between the shared tokens and each side's remainder.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_with(a, b, ratio)
}

fn partial_token_set_ratio(a: &str, b: &str) -> u8 {
    token_set_with(a, b, partial_ratio)
}

/// Weighted combination of the scorers above, on processed input.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let p1 = full_process(a);
    let p2 = full_process(b);
    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    const UNBASE_SCALE: f64 = 0.95;

    let base = ratio(&p1, &p2) as f64;
    let (l1, l2) = (p1.chars().count() as f64, p2.chars().count() as f64);
    let len_ratio = l1.max(l2) / l1.min(l2);

    if len_ratio < 1.5 {
        let tsor = token_sort_ratio(&p1, &p2) as f64 * UNBASE_SCALE;
        let tser = token_set_ratio(&p1, &p2) as f64 * UNBASE_SCALE;
        return round_score(base.max(tsor).max(tser));
    }

    let partial_scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
    let partial = partial_ratio(&p1, &p2) as f64 * partial_scale;
    let ptsor = partial_token_sort_ratio(&p1, &p2) as f64 * UNBASE_SCALE * partial_scale;
    let ptser = partial_token_set_ratio(&p1, &p2) as f64 * UNBASE_SCALE * partial_scale;
    round_score(base.max(partial).max(ptsor).max(ptser))
}

/// Best-scoring choice for `query`. Ties keep the earliest choice.
pub fn extract_one<'a>(query: &str, choices: &[&'a str]) -> Option<(&'a str, u8)> {
    let mut best: Option<(&'a str, u8)> = None;
    for &choice in choices {
        let score = weighted_ratio(query, choice);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((choice, score));
        }
    }
    best
}
