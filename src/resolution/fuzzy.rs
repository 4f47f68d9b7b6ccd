//! Similarity scores on a 0..=100 scale.
//!
//! `ratio` is the normalised insert/delete distance:
//! `200 * lcs(a, b) / (len(a) + len(b))`, computed on chars.

/// Lowercase, keep letters and digits, single spaces.
pub(crate) fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c.to_lowercase().next().unwrap_or(c) } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb { prev[j] + 1 } else { row[j].max(prev[j + 1]) };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

fn score(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Plain similarity of the two strings as given.
pub(crate) fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    score(&a, &b).round() as u8
}

/// Best [`ratio`] of the shorter string against every same-length window of the longer one.
pub(crate) fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }
    let best = long.windows(short.len()).map(|w| score(&short, w)).fold(0.0_f64, f64::max);
    best.round() as u8
}

/// [`ratio`] after sorting the words of both strings.
pub(crate) fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let sorted = |s: &str| {
        let mut words: Vec<&str> = s.split_whitespace().collect();
        words.sort_unstable();
        words.join(" ")
    };
    ratio(&sorted(a), &sorted(b))
}

/// Weighted blend for free text of uneven length: normalises both sides,
/// then takes the best of the plain, word-order-insensitive and partial
/// scores, discounting the latter two.
pub(crate) fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let base = ratio(&a, &b) as f64;
    let sorted = token_sort_ratio(&a, &b) as f64 * 0.95;
    let (la, lb) = (a.chars().count() as f64, b.chars().count() as f64);
    let partial = if la.max(lb) / la.min(lb) >= 1.5 { partial_ratio(&a, &b) as f64 * 0.9 } else { 0.0 };
    base.max(sorted).max(partial).round() as u8
}
