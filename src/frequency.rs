use serde::Serialize;

const BYTE_VALUES: usize = 256;

/// One entry of a top-N ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankedByte {
    pub rank: usize,
    pub byte: u8,
    pub count: usize,
}

/// Returns the most frequent byte and its count.
///
/// Counts are accumulated in a single left-to-right scan and a byte only takes the
/// lead when its running count strictly exceeds the current maximum, so among
/// bytes sharing the top count the one that reached it first wins. Empty input
/// yields `(0, 0)`.
pub fn most_frequent(bytes: &[u8]) -> (u8, usize) {
    let mut counts = [0usize; BYTE_VALUES];
    let mut best = 0u8;
    let mut best_count = 0usize;

    for &b in bytes {
        let count = &mut counts[b as usize];
        *count += 1;
        if *count > best_count {
            best_count = *count;
            best = b;
        }
    }

    (best, best_count)
}

/// Copy of `bytes` without any occurrence of `target`, order preserved
pub fn remove_all(bytes: &[u8], target: u8) -> Vec<u8> {
    bytes.iter().copied().filter(|&b| b != target).collect()
}

/// Repeated max-then-remove over a private copy of `bytes`.
///
/// Once the distinct bytes run out, the remaining ranks report `(0, 0)`.
/// `n` is capped at 256, one rank per byte value.
pub fn top_n(bytes: &[u8], n: usize) -> Vec<RankedByte> {
    let n = n.min(BYTE_VALUES);
    let mut remaining = bytes.to_vec();
    let mut ranking = Vec::with_capacity(n);

    for rank in 1..=n {
        let (byte, count) = most_frequent(&remaining);
        remaining = remove_all(&remaining, byte);
        ranking.push(RankedByte { rank, byte, count });
    }

    ranking
}
