//! Ratcliff/Obershelp "gestalt" similarity.
//!
//! The ratio is `2 * M / T` where `T` is the combined length of both strings and
//! `M` the number of characters covered by the matching blocks: the longest common
//! contiguous block is found first, then the same search recurses into the pieces
//! left and right of it.

use rustc_hash::FxHashMap;

/// Similarity ratio in `[0.0, 1.0]`.
///
/// 1.0 for identical strings (including two empty strings), 0.0 when no character
/// is shared. The pair is put in a canonical order before matching, so the result
/// never depends on argument order.
pub fn ratio(a: &str, b: &str) -> f64 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let a_chars: Vec<char> = first.chars().collect();
    let b_chars: Vec<char> = second.chars().collect();

    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_characters(&a_chars, &b_chars);
    2.0 * matched as f64 / total as f64
}

/// Total size of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b2j: FxHashMap<char, Vec<usize>> = FxHashMap::default();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest block `a[i..i+size] == b[j..j+size]` inside the given windows.
/// Ties resolve to the earliest start in `a`, then the earliest start in `b`.
fn longest_match(
    a: &[char],
    b2j: &FxHashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // j2len[j] = length of the longest block ending at a[i - 1] and b[j]
    let mut j2len: FxHashMap<usize, usize> = FxHashMap::default();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: FxHashMap<usize, usize> = FxHashMap::default();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_size)
}
