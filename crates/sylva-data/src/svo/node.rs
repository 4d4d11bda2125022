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

//! Octree slot encoding and a CPU decoder for finished chunk octrees.
//!
//! A chunk octree is a flat array of `u32` slots grouped in blocks of eight,
//! one block per internal node. Block 0 holds the children of the implicit
//! root. A slot is encoded as:
//!
//! | value                | meaning                                          |
//! |----------------------|--------------------------------------------------|
//! | `0`                  | empty                                            |
//! | `OCCUPIED \| LEAF \| m` | leaf voxel whose corner mask is `m`            |
//! | `OCCUPIED \| p`      | internal node whose children start at slot `p`   |
//! | `OCCUPIED`           | tagged, children not allocated yet               |
//!
//! The child index of a voxel at depth `d` takes bit `levels - 1 - d` of each
//! coordinate, `x | y << 1 | z << 2`.

use std::fmt;

/// Bit set on every non-empty slot.
pub const OCCUPIED: u32 = 1 << 31;
/// Bit set on leaf slots.
pub const LEAF: u32 = 1 << 30;
/// Mask of the child pointer of an internal slot.
pub const CHILD_POINTER_MASK: u32 = LEAF - 1;
/// Mask of the corner mask of a leaf slot.
pub const LEAF_PAYLOAD_MASK: u32 = 0xFF;
/// Number of slots in a block, and the size of the reserved root block.
pub const ROOT_BLOCK_LEN: u32 = 8;
/// Chunks lookup value of a chunk without an octree.
pub const EMPTY_CHUNK: u32 = u32::MAX;

/// The number of octree levels of a chunk `dim` voxels wide.
///
/// `dim` must be a power of two.
#[inline]
pub const fn level_count(dim: u32) -> u32 {
    dim.trailing_zeros()
}

/// The largest number of slots a chunk octree of `dim` voxels can need:
/// `8 + 8² + … + 8^levels`.
pub const fn worst_case_octree_len(dim: u32) -> u64 {
    let levels = level_count(dim);
    let mut total = 0u64;
    let mut per_level = 1u64;
    let mut level = 0;
    while level < levels {
        per_level *= 8;
        total += per_level;
        level += 1;
    }
    total
}

/// A decoded octree slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctreeSlot {
    /// Nothing below this slot.
    Empty,
    /// Occupied but without allocated children.
    Tagged,
    /// An internal node whose child block starts at `child_index`.
    Internal {
        /// Slot index of the first child.
        child_index: u32,
    },
    /// A voxel at the last level.
    Leaf {
        /// The voxel's solid-corner mask.
        corner_mask: u8,
    },
}

impl OctreeSlot {
    /// Decodes a raw slot value.
    pub const fn decode(word: u32) -> Self {
        if word & OCCUPIED == 0 {
            OctreeSlot::Empty
        } else if word & LEAF != 0 {
            OctreeSlot::Leaf {
                corner_mask: (word & LEAF_PAYLOAD_MASK) as u8,
            }
        } else if word & CHILD_POINTER_MASK == 0 {
            OctreeSlot::Tagged
        } else {
            OctreeSlot::Internal {
                child_index: word & CHILD_POINTER_MASK,
            }
        }
    }

    /// Encodes the slot as written by the compute stages.
    pub const fn encode(self) -> u32 {
        match self {
            OctreeSlot::Empty => 0,
            OctreeSlot::Tagged => OCCUPIED,
            OctreeSlot::Internal { child_index } => OCCUPIED | (child_index & CHILD_POINTER_MASK),
            OctreeSlot::Leaf { corner_mask } => OCCUPIED | LEAF | corner_mask as u32,
        }
    }
}

/// A voxel found while traversing a chunk octree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct OctreeLeaf {
    /// Voxel coordinates inside the chunk.
    pub coordinates: [u32; 3],
    /// The voxel's solid-corner mask.
    pub corner_mask: u8,
}

/// Structural defects found while decoding a chunk octree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OctreeDecodeError {
    /// The octree is shorter than the root block.
    TooShort {
        /// Number of slots present.
        len: usize,
    },
    /// A child pointer leaves the octree, is not block aligned, or points into the root block.
    InvalidPointer {
        /// Index of the offending slot.
        slot: usize,
        /// The decoded pointer.
        child_index: u32,
    },
    /// A leaf appears above the last level.
    LeafAboveLastLevel {
        /// Index of the offending slot.
        slot: usize,
        /// Level of the slot.
        level: u32,
    },
    /// An occupied slot above the last level has no child block.
    Unallocated {
        /// Index of the offending slot.
        slot: usize,
        /// Level of the slot.
        level: u32,
    },
    /// A slot at the last level is occupied but is not a leaf.
    InternalAtLastLevel {
        /// Index of the offending slot.
        slot: usize,
    },
}

impl fmt::Display for OctreeDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OctreeDecodeError::TooShort { len } => {
                write!(f, "Octree has {len} slots, fewer than the root block")
            }
            OctreeDecodeError::InvalidPointer { slot, child_index } => {
                write!(f, "Slot {slot} has invalid child pointer {child_index}")
            }
            OctreeDecodeError::LeafAboveLastLevel { slot, level } => {
                write!(f, "Slot {slot} is a leaf at inner level {level}")
            }
            OctreeDecodeError::Unallocated { slot, level } => {
                write!(f, "Slot {slot} at level {level} is tagged but has no children")
            }
            OctreeDecodeError::InternalAtLastLevel { slot } => {
                write!(f, "Slot {slot} at the last level is not a leaf")
            }
        }
    }
}

impl std::error::Error for OctreeDecodeError {}

/// A read-only view of one chunk's octree slots.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOctreeView<'a> {
    slots: &'a [u32],
    levels: u32,
}

impl<'a> ChunkOctreeView<'a> {
    /// Wraps the slots of a chunk built at `chunk_voxel_dim` resolution.
    pub fn new(slots: &'a [u32], chunk_voxel_dim: u32) -> Self {
        Self {
            slots,
            levels: level_count(chunk_voxel_dim),
        }
    }

    /// The number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the view holds no slot.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The number of levels.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Decodes the slot at `index`.
    pub fn slot(&self, index: usize) -> Option<OctreeSlot> {
        self.slots.get(index).copied().map(OctreeSlot::decode)
    }

    /// Walks the whole tree, validating its structure, and returns every leaf
    /// sorted by coordinates.
    pub fn leaves(&self) -> Result<Vec<OctreeLeaf>, OctreeDecodeError> {
        if self.slots.len() < ROOT_BLOCK_LEN as usize {
            return Err(OctreeDecodeError::TooShort {
                len: self.slots.len(),
            });
        }
        if self.levels == 0 {
            return Ok(Vec::new());
        }

        let mut leaves = Vec::new();
        // (first slot of the block, level of its slots, origin of the block)
        let mut stack = vec![(0usize, 0u32, [0u32; 3])];
        while let Some((base, level, origin)) = stack.pop() {
            let shift = self.levels - 1 - level;
            for child in 0..ROOT_BLOCK_LEN {
                let slot = base + child as usize;
                let coordinates = [
                    origin[0] | ((child & 1) << shift),
                    origin[1] | (((child >> 1) & 1) << shift),
                    origin[2] | (((child >> 2) & 1) << shift),
                ];
                let is_last_level = level + 1 == self.levels;
                match OctreeSlot::decode(self.slots[slot]) {
                    OctreeSlot::Empty => {}
                    OctreeSlot::Leaf { corner_mask } if is_last_level => {
                        leaves.push(OctreeLeaf {
                            coordinates,
                            corner_mask,
                        });
                    }
                    OctreeSlot::Leaf { .. } => {
                        return Err(OctreeDecodeError::LeafAboveLastLevel { slot, level });
                    }
                    _ if is_last_level => {
                        return Err(OctreeDecodeError::InternalAtLastLevel { slot });
                    }
                    OctreeSlot::Tagged => {
                        return Err(OctreeDecodeError::Unallocated { slot, level });
                    }
                    OctreeSlot::Internal { child_index } => {
                        let index = child_index as usize;
                        if index < ROOT_BLOCK_LEN as usize
                            || index % ROOT_BLOCK_LEN as usize != 0
                            || index + ROOT_BLOCK_LEN as usize > self.slots.len()
                        {
                            return Err(OctreeDecodeError::InvalidPointer { slot, child_index });
                        }
                        stack.push((index, level + 1, coordinates));
                    }
                }
            }
        }

        leaves.sort();
        Ok(leaves)
    }

    /// The number of voxels stored in the tree.
    pub fn voxel_count(&self) -> Result<usize, OctreeDecodeError> {
        self.leaves().map(|leaves| leaves.len())
    }
}
