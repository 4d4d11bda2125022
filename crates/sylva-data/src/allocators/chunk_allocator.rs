// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Range allocator over the shared, append-only octree buffer.

use std::collections::BTreeMap;
use std::fmt;

/// Every range handed out is aligned to, and sized in multiples of, one `u32`.
const ALIGNMENT: u64 = 4;

/// The largest capacity whose word offsets fit a `u32` below the empty-chunk marker.
pub const MAX_ADDRESSABLE_CAPACITY: u64 = (u32::MAX as u64 - 1) * ALIGNMENT;

/// A byte range of the shared octree buffer owned by one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkAllocation {
    /// Byte offset of the range. Always a multiple of 4.
    pub offset: u64,
    /// Length of the range in bytes. Always a multiple of 4.
    pub size: u64,
}

impl ChunkAllocation {
    /// The offset expressed in `u32` elements, as stored in the chunks lookup.
    #[inline]
    pub fn offset_in_u32(&self) -> u32 {
        (self.offset / ALIGNMENT) as u32
    }

    /// One past the last byte of the range.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Returns `true` if the two ranges share at least one byte.
    pub fn overlaps(&self, other: &ChunkAllocation) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Errors reported by [`ChunkMemoryAllocator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocatorError {
    /// A zero-byte range was requested.
    ZeroSized,
    /// No contiguous range large enough is left.
    Exhausted {
        /// The requested size, rounded up to the alignment.
        requested: u64,
        /// The largest contiguous range still available.
        remaining: u64,
    },
    /// The range passed to `free` is not a live allocation.
    UnknownAllocation(ChunkAllocation),
}

impl fmt::Display for AllocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocatorError::ZeroSized => write!(f, "Cannot allocate a zero-sized range"),
            AllocatorError::Exhausted {
                requested,
                remaining,
            } => write!(
                f,
                "Chunk memory exhausted: requested {requested} bytes, largest free range is {remaining} bytes"
            ),
            AllocatorError::UnknownAllocation(allocation) => write!(
                f,
                "Range [{}, {}) is not a live allocation",
                allocation.offset,
                allocation.end()
            ),
        }
    }
}

impl std::error::Error for AllocatorError {}

/// A snapshot of the allocator's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkMemoryStats {
    /// Total size of the managed buffer in bytes.
    pub capacity: u64,
    /// Bytes currently handed out.
    pub bytes_used: u64,
    /// Number of live allocations.
    pub allocation_count: usize,
    /// Highest `bytes_used` ever observed.
    pub peak_bytes_used: u64,
}

impl ChunkMemoryStats {
    /// The fraction of the capacity in use, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.bytes_used as f64 / self.capacity as f64
        }
    }
}

/// Hands out non-overlapping, 4-byte aligned byte ranges of one large
/// persistent buffer.
///
/// Allocation tries a first-fit free list before advancing a bump cursor.
/// Freed ranges are coalesced with their neighbours, and a freed range that
/// touches the cursor retracts it. The allocator only does bookkeeping: it
/// never touches the device buffer itself.
#[derive(Debug)]
pub struct ChunkMemoryAllocator {
    capacity: u64,
    cursor: u64,
    /// Free ranges below the cursor, sorted by offset, never adjacent.
    free_ranges: Vec<ChunkAllocation>,
    /// Live allocations keyed by offset.
    live: BTreeMap<u64, u64>,
    bytes_used: u64,
    peak_bytes_used: u64,
}

impl ChunkMemoryAllocator {
    /// Creates an allocator managing `capacity` bytes. The capacity is
    /// truncated to a multiple of 4 and clamped to [`MAX_ADDRESSABLE_CAPACITY`].
    pub fn new(capacity: u64) -> Self {
        let capacity = if capacity > MAX_ADDRESSABLE_CAPACITY {
            log::warn!(
                "Chunk memory capacity {capacity} exceeds the addressable {MAX_ADDRESSABLE_CAPACITY} bytes, clamping"
            );
            MAX_ADDRESSABLE_CAPACITY
        } else {
            capacity - capacity % ALIGNMENT
        };
        Self {
            capacity,
            cursor: 0,
            free_ranges: Vec::new(),
            live: BTreeMap::new(),
            bytes_used: 0,
            peak_bytes_used: 0,
        }
    }

    /// The number of bytes managed.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Reserves a range of at least `size` bytes.
    ///
    /// ## Errors
    /// * `AllocatorError::ZeroSized` - If `size` is zero.
    /// * `AllocatorError::Exhausted` - If no contiguous range is large enough.
    pub fn allocate(&mut self, size: u64) -> Result<ChunkAllocation, AllocatorError> {
        if size == 0 {
            return Err(AllocatorError::ZeroSized);
        }
        let requested = size
            .checked_next_multiple_of(ALIGNMENT)
            .ok_or(AllocatorError::Exhausted {
                requested: size,
                remaining: self.largest_free_range(),
            })?;

        let allocation = match self.take_from_free_list(requested) {
            Some(allocation) => allocation,
            None => {
                if self.capacity - self.cursor < requested {
                    let remaining = self.largest_free_range();
                    log::error!(
                        "Chunk memory exhausted: requested {requested} bytes, {remaining} bytes available ({} live allocations)",
                        self.live.len()
                    );
                    return Err(AllocatorError::Exhausted {
                        requested,
                        remaining,
                    });
                }
                let allocation = ChunkAllocation {
                    offset: self.cursor,
                    size: requested,
                };
                self.cursor += requested;
                allocation
            }
        };

        self.live.insert(allocation.offset, allocation.size);
        self.bytes_used += allocation.size;
        self.peak_bytes_used = self.peak_bytes_used.max(self.bytes_used);
        log::trace!(
            "Allocated chunk range [{}, {})",
            allocation.offset,
            allocation.end()
        );
        Ok(allocation)
    }

    /// Returns a live allocation to the allocator.
    ///
    /// ## Errors
    /// * `AllocatorError::UnknownAllocation` - If `allocation` is not exactly a live range.
    pub fn free(&mut self, allocation: ChunkAllocation) -> Result<(), AllocatorError> {
        match self.live.get(&allocation.offset) {
            Some(&size) if size == allocation.size => {}
            _ => return Err(AllocatorError::UnknownAllocation(allocation)),
        }
        self.live.remove(&allocation.offset);
        self.bytes_used -= allocation.size;

        if allocation.end() == self.cursor {
            self.cursor = allocation.offset;
            // A free range that now touches the cursor is absorbed too.
            if let Some(last) = self.free_ranges.last() {
                if last.end() == self.cursor {
                    self.cursor = last.offset;
                    self.free_ranges.pop();
                }
            }
        } else {
            self.insert_free_range(allocation);
        }
        Ok(())
    }

    /// Forgets every allocation and rewinds the cursor.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.free_ranges.clear();
        self.live.clear();
        self.bytes_used = 0;
    }

    /// Returns a snapshot of the current bookkeeping.
    pub fn stats(&self) -> ChunkMemoryStats {
        ChunkMemoryStats {
            capacity: self.capacity,
            bytes_used: self.bytes_used,
            allocation_count: self.live.len(),
            peak_bytes_used: self.peak_bytes_used,
        }
    }

    /// Logs the current statistics at `info` level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        log::info!(
            "Chunk memory: {} bytes used in {} allocations, capacity {} bytes ({:.3}% utilized, peak {} bytes)",
            stats.bytes_used,
            stats.allocation_count,
            stats.capacity,
            stats.utilization() * 100.0,
            stats.peak_bytes_used
        );
    }

    /// Iterates the live allocations in offset order.
    pub fn allocations(&self) -> impl Iterator<Item = ChunkAllocation> + '_ {
        self.live
            .iter()
            .map(|(&offset, &size)| ChunkAllocation { offset, size })
    }

    fn largest_free_range(&self) -> u64 {
        self.free_ranges
            .iter()
            .map(|range| range.size)
            .fold(self.capacity - self.cursor, u64::max)
    }

    fn take_from_free_list(&mut self, requested: u64) -> Option<ChunkAllocation> {
        let index = self
            .free_ranges
            .iter()
            .position(|range| range.size >= requested)?;
        let range = &mut self.free_ranges[index];
        let allocation = ChunkAllocation {
            offset: range.offset,
            size: requested,
        };
        if range.size == requested {
            self.free_ranges.remove(index);
        } else {
            range.offset += requested;
            range.size -= requested;
        }
        Some(allocation)
    }

    fn insert_free_range(&mut self, freed: ChunkAllocation) {
        let index = self
            .free_ranges
            .partition_point(|range| range.offset < freed.offset);
        self.free_ranges.insert(index, freed);

        // Merge with the successor first so `index` stays valid.
        if index + 1 < self.free_ranges.len()
            && self.free_ranges[index].end() == self.free_ranges[index + 1].offset
        {
            let next = self.free_ranges.remove(index + 1);
            self.free_ranges[index].size += next.size;
        }
        if index > 0 && self.free_ranges[index - 1].end() == self.free_ranges[index].offset {
            let current = self.free_ranges.remove(index);
            self.free_ranges[index - 1].size += current.size;
        }
    }
}
