//! Partitioning of a byte range into chunks.

use crate::error::{Error, Result};

/// Chunk sizes picked automatically are multiples of this grain.
pub const GRAIN_SIZE: u64 = 4 * 1024;

/// Upper bound of an automatically picked chunk size.
pub const MAX_AUTO_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Default number of chunks in flight.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// One contiguous sub-range of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Position of the chunk in its plan.
    pub index: usize,
    /// Number of chunks in the plan.
    pub count: usize,
    /// Absolute offset of the first byte.
    pub offset: u64,
    /// Number of bytes, zero only for the single chunk of an empty transfer.
    pub length: u64,
}

impl Chunk {
    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Whether this chunk supplies the final result of its transfer.
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.count
    }
}

/// An ordered partition of `[base, base + total)`.
///
/// Chunks are contiguous, never overlap, and all but the last have exactly
/// `chunk_size` bytes. An empty range yields a single zero-length chunk.
///
/// ```rust
/// use blobflow::transfer::ChunkPlan;
///
/// let plan = ChunkPlan::new(10, 4).unwrap();
/// let lengths: Vec<u64> = plan.iter().map(|c| c.length).collect();
/// assert_eq!(lengths, vec![4, 4, 2]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    base: u64,
    total: u64,
    chunk_size: u64,
    count: usize,
}

impl ChunkPlan {
    /// Plans `[0, total)`.
    pub fn new(total: u64, chunk_size: u64) -> Result<Self> {
        Self::with_offset(0, total, chunk_size)
    }

    /// Plans `[base, base + total)`.
    pub fn with_offset(base: u64, total: u64, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk size must be positive".into()));
        }
        if base.checked_add(total).is_none() {
            return Err(Error::InvalidArgument(format!(
                "range of {} bytes at offset {} overflows",
                total, base
            )));
        }
        let count = if total == 0 {
            1
        } else {
            usize::try_from(total.div_ceil(chunk_size)).map_err(|_| {
                Error::InvalidArgument(format!("{} bytes need too many chunks", total))
            })?
        };
        Ok(Self {
            base,
            total,
            chunk_size,
            count,
        })
    }

    /// Offset of the first chunk.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of bytes covered.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Size of every chunk but the last.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks, at least one.
    pub fn chunk_count(&self) -> usize {
        self.count
    }

    /// Gets the chunk at `index`.
    pub fn chunk(&self, index: usize) -> Option<Chunk> {
        if index >= self.count {
            return None;
        }
        let start = index as u64 * self.chunk_size;
        let length = self.chunk_size.min(self.total - start.min(self.total));
        Some(Chunk {
            index,
            count: self.count,
            offset: self.base + start,
            length,
        })
    }

    /// The chunks in index order.
    pub fn iter(&self) -> impl Iterator<Item = Chunk> + '_ {
        (0..self.count).filter_map(move |index| self.chunk(index))
    }
}

/// Picks a chunk size spreading `remaining` bytes over `concurrency` chunks,
/// rounded up to [`GRAIN_SIZE`] and clamped to
/// `[GRAIN_SIZE, MAX_AUTO_CHUNK_SIZE]`.
///
/// ```rust
/// use blobflow::transfer::{auto_chunk_size, GRAIN_SIZE, MAX_AUTO_CHUNK_SIZE};
///
/// assert_eq!(auto_chunk_size(0, 5), GRAIN_SIZE);
/// assert_eq!(auto_chunk_size(1 << 40, 5), MAX_AUTO_CHUNK_SIZE);
/// ```
pub fn auto_chunk_size(remaining: u64, concurrency: usize) -> u64 {
    let per_worker = remaining.div_ceil(concurrency.max(1) as u64);
    let capped = per_worker.min(MAX_AUTO_CHUNK_SIZE);
    (capped.div_ceil(GRAIN_SIZE) * GRAIN_SIZE).clamp(GRAIN_SIZE, MAX_AUTO_CHUNK_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(plan: &ChunkPlan) {
        let mut expected_offset = plan.base();
        for (i, chunk) in plan.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.offset, expected_offset);
            assert!(chunk.length > 0 || plan.total() == 0);
            expected_offset = chunk.end();
        }
        assert_eq!(expected_offset, plan.base() + plan.total());
    }

    #[test]
    fn test_plan_coverage() {
        for total in [0u64, 1, 2, 7, 8, 9, 100, 4096, 4097] {
            for chunk_size in [1u64, 2, 3, 8, 4096, 10_000] {
                let plan = ChunkPlan::new(total, chunk_size).unwrap();
                assert_covers(&plan);
                let with_base = ChunkPlan::with_offset(123, total, chunk_size).unwrap();
                assert_covers(&with_base);
            }
        }
    }

    #[test]
    fn test_empty_range_has_one_empty_chunk() {
        let plan = ChunkPlan::new(0, 4).unwrap();
        let chunks: Vec<Chunk> = plan.iter().collect();
        assert_eq!(
            chunks,
            vec![Chunk {
                index: 0,
                count: 1,
                offset: 0,
                length: 0
            }]
        );
        assert!(chunks[0].is_last());
    }

    #[test]
    fn test_documented_scenario() {
        let plan = ChunkPlan::new(10_000_000, 4_194_304).unwrap();
        let chunks: Vec<(u64, u64)> = plan.iter().map(|c| (c.offset, c.length)).collect();
        assert_eq!(
            chunks,
            vec![(0, 4_194_304), (4_194_304, 4_194_304), (8_388_608, 1_611_392)]
        );
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        assert!(matches!(
            ChunkPlan::new(10, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(ChunkPlan::with_offset(u64::MAX, 2, 1).is_err());
        assert!(ChunkPlan::new(10, 4).unwrap().chunk(3).is_none());
    }

    #[test]
    fn test_auto_chunk_size() {
        assert_eq!(auto_chunk_size(10 * GRAIN_SIZE, 5), 2 * GRAIN_SIZE);
        assert_eq!(auto_chunk_size(10 * GRAIN_SIZE + 1, 5), 3 * GRAIN_SIZE);
        assert_eq!(auto_chunk_size(100, 0), GRAIN_SIZE);
        assert_eq!(auto_chunk_size(u64::MAX, 1), MAX_AUTO_CHUNK_SIZE);
    }
}
