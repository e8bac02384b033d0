//! Title similarity scoring.

use std::collections::BTreeSet;

/// Character-level similarity in `[0, 1]`: twice the number of matched
/// characters over the total length, where matches are found by taking the
/// longest common block and recursing on either side of it.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_common_block(a, b);
    if size == 0 {
        return 0;
    }
    size + matching_chars(&a[..i], &b[..j]) + matching_chars(&a[i + size..], &b[j + size..])
}

/// `(start in a, start in b, length)` of the longest common block.
/// Ties go to the earliest block in `a`, then in `b`.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let len = prev[j] + 1;
                row[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = row;
    }

    best
}

/// Word-set similarity that ignores order and rewards titles differing only
/// by extra qualifying words.
///
/// The shared words, and the shared words followed by each side's leftovers,
/// are compared pairwise with [`sequence_ratio`]; the best ratio wins.
/// "Family Storytime" vs "Bilingual Family Storytime" scores 1.0 and
/// "Community Coffee Tasting" vs "Community Yoga" about 0.78.
///
/// The score is symmetric in its arguments.
pub fn token_set_similarity(a: &str, b: &str) -> f64 {
    // sequence_ratio is not symmetric on its own
    let (a, b) = if a <= b { (a, b) } else { (b, a) };

    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let words_a: BTreeSet<&str> = lower_a.split_whitespace().collect();
    let words_b: BTreeSet<&str> = lower_b.split_whitespace().collect();

    match (words_a.is_empty(), words_b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let shared = join(words_a.intersection(&words_b));
    let combined_a = combine(&shared, &join(words_a.difference(&words_b)));
    let combined_b = combine(&shared, &join(words_b.difference(&words_a)));

    [
        sequence_ratio(&shared, &combined_a),
        sequence_ratio(&shared, &combined_b),
        sequence_ratio(&combined_a, &combined_b),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

fn join<'a>(words: impl Iterator<Item = &'a &'a str>) -> String {
    words.copied().collect::<Vec<&str>>().join(" ")
}

fn combine(shared: &str, rest: &str) -> String {
    format!("{} {}", shared, rest).trim().to_string()
}
