//! Duplicated-substring back-referencing
//!
//! Each round picks one repeated substring, wraps its first occurrence in a
//! fresh marker (`m S m`) and replaces every later occurrence with a bare
//! `m`. Candidates are ranked by their cost-model weight, not by length or
//! frequency.

use tracing::trace;

use crate::cost::byte_cost;

/// Shortest substring worth a back-reference.
pub const MIN_DUPLICATE_LEN: usize = 4;

/// Bytes of the payload searched for duplicates in each round. Later
/// occurrences past this point are still replaced.
pub const MAX_SEARCH_LEN: usize = 4096;

/// A substring that occurs at least twice without overlapping itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    pub start: usize,
    pub len: usize,
    pub score: u64,
}

/// Find the non-overlapping repeated substring of at least
/// [`MIN_DUPLICATE_LEN`] bytes with the highest cost. Ties go to the earliest
/// start, which is always the substring's first occurrence.
///
/// Longest common extensions are computed row by row from the end of `data`,
/// so memory stays linear but time is quadratic in `data.len()`.
/// [`back_reference`] bounds it with [`MAX_SEARCH_LEN`].
pub fn find_best_duplicate(data: &[u8]) -> Option<Duplicate> {
    let n = data.len();
    if n < 2 * MIN_DUPLICATE_LEN {
        return None;
    }

    let mut prefix_cost = Vec::with_capacity(n + 1);
    prefix_cost.push(0u64);
    for &b in data {
        let last = *prefix_cost.last().unwrap_or(&0);
        prefix_cost.push(last + byte_cost(b));
    }

    // next[j] = common extension of (i + 1, j), cur[j] = of (i, j).
    let mut next = vec![0usize; n + 1];
    let mut cur = vec![0usize; n + 1];
    let mut best: Option<Duplicate> = None;

    for i in (0..n).rev() {
        for j in i + 1..n {
            cur[j] = if data[i] == data[j] { next[j + 1] + 1 } else { 0 };
            let len = cur[j].min(j - i);
            if len < MIN_DUPLICATE_LEN {
                continue;
            }
            let score = prefix_cost[i + len] - prefix_cost[i];
            if best.map_or(true, |b| score >= b.score) {
                best = Some(Duplicate {
                    start: i,
                    len,
                    score,
                });
            }
        }
        std::mem::swap(&mut cur, &mut next);
    }
    best
}

/// Wrap the first occurrence of `data[start..start + len]` in `marker` and
/// replace later non-overlapping occurrences with `marker` alone.
pub fn replace_duplicate(data: &[u8], dup: Duplicate, marker: u8) -> Vec<u8> {
    let Duplicate { start, len, .. } = dup;
    let pattern = &data[start..start + len];

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..start]);
    out.push(marker);
    out.extend_from_slice(pattern);
    out.push(marker);

    let mut i = start + len;
    while i < data.len() {
        if data[i..].starts_with(pattern) {
            out.push(marker);
            i += len;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

/// Run back-referencing rounds with the given markers. Returns the rewritten
/// payload and the markers consumed, in order.
///
/// A marker that already occurs in the payload is passed over. Each round
/// searches the first [`MAX_SEARCH_LEN`] bytes. The earliest start found there
/// is still the pattern's first occurrence, so every later one can be replaced.
pub fn back_reference(payload: Vec<u8>, markers: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut data = payload;
    let mut used = Vec::new();
    for &marker in markers {
        if data.contains(&marker) {
            trace!(marker, "duplicate marker occurs in payload, skipped");
            continue;
        }
        let window = &data[..data.len().min(MAX_SEARCH_LEN)];
        let Some(dup) = find_best_duplicate(window) else {
            break;
        };
        trace!(
            marker,
            start = dup.start,
            len = dup.len,
            score = dup.score,
            "back-referencing duplicate"
        );
        data = replace_duplicate(&data, dup, marker);
        used.push(marker);
    }
    (data, used)
}
