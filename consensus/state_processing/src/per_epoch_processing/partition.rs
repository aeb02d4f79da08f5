//! Splits per-validator work into contiguous index ranges that can run on the rayon pool.
//!
//! Each worker only ever sees its own range: either a sub-slice of the output storage, or a
//! `Range<usize>` to read from. Results are returned in index order regardless of scheduling, and
//! the first error (by index) is the one reported.
use rayon::prelude::*;
use std::ops::Range;

/// Number of validators handled by a single worker.
pub const DEFAULT_CHUNK_SIZE: usize = 2_048;
/// Below this many validators all work runs on the calling thread.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 16_384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorPartition {
    chunk_size: usize,
    parallel_threshold: usize,
}

impl Default for ValidatorPartition {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_PARALLEL_THRESHOLD)
    }
}

impl ValidatorPartition {
    /// A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize, parallel_threshold: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            parallel_threshold,
        }
    }

    /// A partition that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, usize::MAX)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn is_parallel_for(&self, len: usize) -> bool {
        len >= self.parallel_threshold && len > self.chunk_size
    }

    /// The contiguous ranges covering `0..len`, in order.
    pub fn ranges(&self, len: usize) -> Vec<Range<usize>> {
        (0..len)
            .step_by(self.chunk_size)
            .map(|start| start..start.saturating_add(self.chunk_size).min(len))
            .collect()
    }

    /// Run `f` over each range of `0..len`, returning the partial results in index order.
    pub fn map_ranges<A, E, F>(&self, len: usize, f: F) -> Result<Vec<A>, E>
    where
        A: Send,
        E: Send,
        F: Fn(Range<usize>) -> Result<A, E> + Sync,
    {
        let ranges = self.ranges(len);
        let results: Vec<Result<A, E>> = if self.is_parallel_for(len) {
            ranges.into_par_iter().map(&f).collect()
        } else {
            ranges.into_iter().map(&f).collect()
        };
        results.into_iter().collect()
    }

    /// Run `f` over disjoint mutable chunks of `items`.
    ///
    /// `f` receives the index of the first element of its chunk, so that it can read the matching
    /// range of other per-validator lists. Partial results are returned in index order.
    pub fn map_chunks_mut<T, A, E, F>(&self, items: &mut [T], f: F) -> Result<Vec<A>, E>
    where
        T: Send,
        A: Send,
        E: Send,
        F: Fn(usize, &mut [T]) -> Result<A, E> + Sync,
    {
        let chunk_size = self.chunk_size;
        let results: Vec<Result<A, E>> = if self.is_parallel_for(items.len()) {
            items
                .par_chunks_mut(chunk_size)
                .enumerate()
                .map(|(chunk_index, chunk)| f(chunk_index.saturating_mul(chunk_size), chunk))
                .collect()
        } else {
            items
                .chunks_mut(chunk_size)
                .enumerate()
                .map(|(chunk_index, chunk)| f(chunk_index.saturating_mul(chunk_size), chunk))
                .collect()
        };
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_without_overlap() {
        let partition = ValidatorPartition::new(4, 0);
        assert_eq!(partition.ranges(10), vec![0..4, 4..8, 8..10]);
        assert_eq!(partition.ranges(8), vec![0..4, 4..8]);
        assert!(partition.ranges(0).is_empty());

        assert_eq!(ValidatorPartition::new(0, 0).chunk_size(), 1);
    }

    #[test]
    fn parallel_threshold() {
        let partition = ValidatorPartition::new(4, 10);
        assert!(!partition.is_parallel_for(9));
        assert!(partition.is_parallel_for(10));
        assert!(!ValidatorPartition::new(64, 0).is_parallel_for(64));
        assert!(!ValidatorPartition::sequential().is_parallel_for(usize::MAX - 1));
    }

    #[test]
    fn map_ranges_merges_in_order() {
        let partition = ValidatorPartition::new(3, 0);
        let sums = partition
            .map_ranges(10, |range| Ok::<_, ()>(range.sum::<usize>()))
            .unwrap();
        assert_eq!(sums, vec![3, 12, 21, 9]);
    }

    #[test]
    fn map_chunks_mut_writes_own_range() {
        let mut items = vec![0usize; 11];
        let offsets = ValidatorPartition::new(4, 0)
            .map_chunks_mut(&mut items, |offset, chunk| {
                for (i, item) in chunk.iter_mut().enumerate() {
                    *item = offset + i;
                }
                Ok::<_, ()>(offset)
            })
            .unwrap();

        assert_eq!(items, (0..11).collect::<Vec<_>>());
        assert_eq!(offsets, vec![0, 4, 8]);
    }

    #[test]
    fn first_error_by_index_wins() {
        let partition = ValidatorPartition::new(2, 0);
        let result = partition.map_ranges(10, |range| {
            if range.start >= 4 {
                Err(range.start)
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err(4));

        let mut items = vec![0u8; 10];
        let result = partition.map_chunks_mut(&mut items, |offset, _| {
            if offset % 4 == 2 { Err(offset) } else { Ok(()) }
        });
        assert_eq!(result, Err(2));
    }

    #[test]
    fn parallel_matches_sequential() {
        let len = 10_000;
        let parallel = ValidatorPartition::new(7, 0);
        let sequential = ValidatorPartition::sequential();
        let square = |range: Range<usize>| Ok::<_, ()>(range.map(|i| i * i).collect::<Vec<_>>());

        assert_eq!(
            parallel.map_ranges(len, square).unwrap().concat(),
            sequential.map_ranges(len, square).unwrap().concat()
        );
    }
}
