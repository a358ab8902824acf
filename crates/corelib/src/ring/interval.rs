//! Wraparound interval membership on the ring.

/// True iff `id` lies in the arc `(start, end]`, walking clockwise.
///
/// When `start == end` the arc is the whole ring: a lone node owns every id.
#[inline]
pub fn in_interval(id: u64, start: u64, end: u64) -> bool {
    if start < end {
        id > start && id <= end
    } else if start > end {
        id > start || id <= end
    } else {
        true
    }
}

/// True iff `id` lies strictly inside `(start, end)`.
///
/// When `start == end` this is every position except `start` itself.
#[inline]
pub fn in_open_interval(id: u64, start: u64, end: u64) -> bool {
    if start < end {
        id > start && id < end
    } else if start > end {
        id > start || id < end
    } else {
        id != start
    }
}

/// A node owns the keys in `(predecessor, node]`.
#[inline]
pub fn is_responsible(node: u64, predecessor: u64, key: u64) -> bool {
    in_interval(key, predecessor, node)
}
