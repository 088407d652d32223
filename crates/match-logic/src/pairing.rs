//! Deterministic pairing generation for round-robin tournaments
//!
//! Every strategy meets every other strategy once and also plays itself
//! once, so `n` strategies give `n(n+1)/2` matches. Matches are numbered in
//! lexicographic pair order: (0,0), (0,1), ..., (0,n-1), (1,1), (1,2), ...
//! and any single pairing can be computed from its index without building
//! the whole list.

/// Calculate total number of matches, self-play included. O(1), no allocation.
pub fn calculate_match_count(participant_count: u32) -> u64 {
    triangular(participant_count as u64)
}

/// All pairings `(i, j)` with `i <= j`, in match-index order
pub fn generate_all_pairings(participant_count: u32) -> Vec<(u32, u32)> {
    (0..participant_count)
        .flat_map(|i| (i..participant_count).map(move |j| (i, j)))
        .collect()
}

/// Get the pairing for a specific match index. O(1) memory.
///
/// Returns `None` when `match_index` is past the last match.
pub fn get_pairing_for_match(participant_count: u32, match_index: u64) -> Option<(u32, u32)> {
    let n = participant_count as u64;
    let total = triangular(n);
    if match_index >= total {
        return None;
    }

    // Counted from the end, the last b+1 rows of the triangle hold
    // triangular(b+1) pairs, so the row is found by a triangular root.
    let rev = total - 1 - match_index;
    let row_from_end = triangular_root(rev);
    let col_from_end = rev - triangular(row_from_end);

    let i = n - 1 - row_from_end;
    let j = n - 1 - col_from_end;
    Some((i as u32, j as u32))
}

// ──────────────────────────── Internal helpers ────────────────────────────

fn triangular(k: u64) -> u64 {
    k * (k + 1) / 2
}

/// Largest `b` with `b(b+1)/2 <= r`
fn triangular_root(r: u64) -> u64 {
    // b = floor((sqrt(8r + 1) - 1) / 2)
    let mut b = ((isqrt(8 * r as u128 + 1) - 1) / 2) as u64;
    // Integer sqrt is exact, but keep the bound honest at the edges
    while triangular(b + 1) <= r {
        b += 1;
    }
    while triangular(b) > r {
        b -= 1;
    }
    b
}

/// Integer floor square root (Newton's method, no floating point).
fn isqrt(n: u128) -> u128 {
    if n <= 1 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
