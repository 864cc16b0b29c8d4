//! Splitting an ordered id list into per-worker partitions.

use std::num::NonZeroUsize;

/// Split `items` into at most `worker_count` contiguous, non-empty partitions.
///
/// The nominal partition size is `max(1, len / worker_count)`. Every partition but the last has
/// exactly that size; the last one absorbs the remainder, so it can be up to `worker_count - 1`
/// elements longer than the others. Concatenating the partitions in order yields `items` again.
pub fn partition<T>(items: &[T], worker_count: NonZeroUsize) -> Vec<&[T]> {
    if items.is_empty() {
        return Vec::new();
    }

    let workers = worker_count.get();
    let size = (items.len() / workers).max(1);
    let count = items.len().min(workers);

    let mut partitions = Vec::with_capacity(count);
    let mut rest = items;
    for _ in 1..count {
        let (head, tail) = rest.split_at(size);
        partitions.push(head);
        rest = tail;
    }
    partitions.push(rest);

    partitions
}
