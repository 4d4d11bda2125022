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

use super::{load, slot, store, write_dispatch_args, BUILD_GROUP};
use sylva_core::renderer::{ComputeKernel, KernelBindings, KernelFault};
use sylva_data::svo::node::{CHILD_POINTER_MASK, LEAF, OCCUPIED};
use sylva_data::svo::{FragmentListEntry, FragmentListInfo, OctreeBuildInfo, ROOT_BLOCK_LEN};

fn build_info(bindings: &dyn KernelBindings, word: u64) -> Result<u32, KernelFault> {
    load(bindings, slot::BUILD_INFO, word)
}

/// The slot of the current allocation window handled by invocation `x`, if any.
fn window_slot(bindings: &dyn KernelBindings, x: u32) -> Result<Option<u64>, KernelFault> {
    let alloc_num = build_info(bindings, OctreeBuildInfo::ALLOC_NUM_WORD)?;
    if x >= alloc_num {
        return Ok(None);
    }
    let alloc_begin = build_info(bindings, OctreeBuildInfo::ALLOC_BEGIN_WORD)?;
    Ok(Some(alloc_begin as u64 + x as u64))
}

/// Child index of `cell` at the depth whose coordinate bit is `bit`.
fn child_index(cell: [u32; 3], bit: u32) -> u32 {
    ((cell[0] >> bit) & 1) | (((cell[1] >> bit) & 1) << 1) | (((cell[2] >> bit) & 1) << 2)
}

/// `chunk_modify_arg`: sizes the first level's dispatches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkModifyArgKernel;

impl ComputeKernel for ChunkModifyArgKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [1, 1, 1]
    }

    fn invoke(&self, _global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let fragments = load(
            bindings,
            slot::FRAGMENT_LIST_INFO,
            FragmentListInfo::FRAGMENT_COUNT_WORD,
        )?;
        let alloc_num = build_info(bindings, OctreeBuildInfo::ALLOC_NUM_WORD)?;
        write_dispatch_args(bindings, slot::INDIRECT_FRAG_LENGTH, fragments)?;
        write_dispatch_args(bindings, slot::INDIRECT_ALLOC_NUM, alloc_num)
    }
}

/// `octree_init_node`: clears the slots of the allocation window.
///
/// The root block is never touched; it is cleared by the per-chunk reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctreeInitNodeKernel;

impl ComputeKernel for OctreeInitNodeKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [64, 1, 1]
    }

    fn invoke(&self, global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        match window_slot(bindings, global_id[0])? {
            Some(index) if index >= ROOT_BLOCK_LEN as u64 => {
                store(bindings, slot::CHUNK_OCTREE, index, 0)
            }
            _ => Ok(()),
        }
    }
}

/// `octree_tag_node`: marks, for each fragment, the slot it falls in at the current level.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctreeTagNodeKernel;

impl ComputeKernel for OctreeTagNodeKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [64, 1, 1]
    }

    fn invoke(&self, global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let fragment = global_id[0] as u64;
        let count = load(
            bindings,
            slot::FRAGMENT_LIST_INFO,
            FragmentListInfo::FRAGMENT_COUNT_WORD,
        )?;
        if fragment >= count as u64 {
            return Ok(());
        }
        let packed = load(bindings, slot::FRAGMENT_LIST, fragment * FragmentListEntry::WORDS)?;
        let mask = load(bindings, slot::FRAGMENT_LIST, fragment * FragmentListEntry::WORDS + 1)?;
        let cell = FragmentListEntry::unpack_coordinates(packed);

        let level = build_info(bindings, OctreeBuildInfo::LEVEL_WORD)?;
        let level_count = build_info(bindings, OctreeBuildInfo::LEVEL_COUNT_WORD)?;

        let mut base = 0u64;
        for depth in 0..level {
            let word = load(
                bindings,
                slot::CHUNK_OCTREE,
                base + child_index(cell, level_count - 1 - depth) as u64,
            )?;
            base = (word & CHILD_POINTER_MASK) as u64;
        }
        let target = base + child_index(cell, level_count - 1 - level) as u64;

        if level + 1 == level_count {
            store(bindings, slot::CHUNK_OCTREE, target, OCCUPIED | LEAF | (mask & 0xFF))
        } else {
            bindings
                .atomic_or_u32(BUILD_GROUP, slot::CHUNK_OCTREE, target, OCCUPIED)
                .map(|_| ())
        }
    }
}

/// `octree_alloc_node`: gives every tagged slot of the window a child block.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctreeAllocNodeKernel;

impl ComputeKernel for OctreeAllocNodeKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [64, 1, 1]
    }

    fn invoke(&self, global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let Some(index) = window_slot(bindings, global_id[0])? else {
            return Ok(());
        };
        if load(bindings, slot::CHUNK_OCTREE, index)? != OCCUPIED {
            return Ok(());
        }
        let block = bindings.atomic_add_u32(BUILD_GROUP, slot::COUNTER, 0, 1)?;
        store(bindings, slot::CHUNK_OCTREE, index, OCCUPIED | (block * ROOT_BLOCK_LEN))
    }
}

/// `octree_modify_arg`: moves the allocation window onto the blocks just allocated.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctreeModifyArgKernel;

impl ComputeKernel for OctreeModifyArgKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [1, 1, 1]
    }

    fn invoke(&self, _global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let begin = build_info(bindings, OctreeBuildInfo::ALLOC_BEGIN_WORD)?;
        let num = build_info(bindings, OctreeBuildInfo::ALLOC_NUM_WORD)?;
        let level = build_info(bindings, OctreeBuildInfo::LEVEL_WORD)?;
        let counter = load(bindings, slot::COUNTER, 0)?;

        let next_begin = begin + num;
        let end = counter * ROOT_BLOCK_LEN;
        let next_num = end - next_begin;

        store(bindings, slot::BUILD_INFO, OctreeBuildInfo::ALLOC_BEGIN_WORD, next_begin)?;
        store(bindings, slot::BUILD_INFO, OctreeBuildInfo::ALLOC_NUM_WORD, next_num)?;
        store(bindings, slot::BUILD_INFO, OctreeBuildInfo::LEVEL_WORD, level + 1)?;
        store(bindings, slot::OCTREE_LENGTH, 0, end)?;
        write_dispatch_args(bindings, slot::INDIRECT_ALLOC_NUM, next_num)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestBindings;
    use super::super::INDIRECT_GROUP;
    use super::*;
    use sylva_data::svo::{worst_case_octree_len, ChunkOctreeView};

    /// Runs the octree stages over `cells` the way the octree lane records them,
    /// with the dispatch sizes read back from the indirect buffers.
    fn build(dim: u32, cells: &[[u32; 3]]) -> TestBindings {
        let levels = dim.trailing_zeros();
        let mut fragments = Vec::new();
        for &[x, y, z] in cells {
            fragments.extend([FragmentListEntry::pack_coordinates(x, y, z), 0x01]);
        }
        let mut b = TestBindings::default()
            .with_buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO, vec![dim, cells.len() as u32])
            .with_buffer(BUILD_GROUP, slot::FRAGMENT_LIST, fragments)
            .with_buffer(BUILD_GROUP, slot::BUILD_INFO, vec![0, 8, 0, levels])
            .with_buffer(BUILD_GROUP, slot::COUNTER, vec![1])
            .with_buffer(BUILD_GROUP, slot::OCTREE_LENGTH, vec![8])
            .with_buffer(BUILD_GROUP, slot::CHUNK_OCTREE, vec![0; worst_case_octree_len(dim) as usize])
            .with_buffer(INDIRECT_GROUP, slot::INDIRECT_FRAG_LENGTH, vec![1, 1, 1])
            .with_buffer(INDIRECT_GROUP, slot::INDIRECT_ALLOC_NUM, vec![1, 1, 1]);

        let threads = |b: &TestBindings, binding| [b.buffer(INDIRECT_GROUP, binding)[0] * 64, 1, 1];

        b.run(&ChunkModifyArgKernel, [1, 1, 1]);
        for level in 0..levels {
            let t = threads(&b, slot::INDIRECT_ALLOC_NUM);
            b.run(&OctreeInitNodeKernel, t);
            let t = threads(&b, slot::INDIRECT_FRAG_LENGTH);
            b.run(&OctreeTagNodeKernel, t);
            if level + 1 != levels {
                let t = threads(&b, slot::INDIRECT_ALLOC_NUM);
                b.run(&OctreeAllocNodeKernel, t);
                b.run(&OctreeModifyArgKernel, [1, 1, 1]);
            }
        }
        b
    }

    #[test]
    fn eight_corner_voxels_build_three_full_paths() {
        let corners: Vec<_> = (0..8u32)
            .map(|i| [(i & 1) * 7, ((i >> 1) & 1) * 7, ((i >> 2) & 1) * 7])
            .collect();
        let b = build(8, &corners);

        // 8 root slots, then 8 single-child blocks per level below.
        assert_eq!(b.buffer(BUILD_GROUP, slot::OCTREE_LENGTH), &[136]);
        assert_eq!(b.buffer(BUILD_GROUP, slot::COUNTER), &[17]);
        assert_eq!(b.buffer(BUILD_GROUP, slot::BUILD_INFO), &[72, 64, 2, 3]);

        let octree = &b.buffer(BUILD_GROUP, slot::CHUNK_OCTREE)[..136];
        let mut leaves: Vec<_> = ChunkOctreeView::new(octree, 8)
            .leaves()
            .unwrap()
            .into_iter()
            .map(|leaf| leaf.coordinates)
            .collect();
        leaves.sort();
        let mut expected = corners.clone();
        expected.sort();
        assert_eq!(leaves, expected);
    }

    #[test]
    fn shared_parents_allocate_one_block() {
        // Two voxels in the same level-0 octant share one child block.
        let b = build(4, &[[0, 0, 0], [1, 1, 1]]);
        assert_eq!(b.buffer(BUILD_GROUP, slot::OCTREE_LENGTH), &[16]);

        let octree = &b.buffer(BUILD_GROUP, slot::CHUNK_OCTREE)[..16];
        assert_eq!(octree[0], OCCUPIED | 8);
        assert!(octree[1..8].iter().all(|&s| s == 0));
        assert_eq!(octree[8], OCCUPIED | LEAF | 0x01);
        assert_eq!(octree[15], OCCUPIED | LEAF | 0x01);
        assert_eq!(ChunkOctreeView::new(octree, 4).voxel_count(), Ok(2));
    }

    #[test]
    fn init_node_never_clears_the_root_block() {
        let mut b = TestBindings::default()
            .with_buffer(BUILD_GROUP, slot::BUILD_INFO, vec![0, 16, 0, 2])
            .with_buffer(BUILD_GROUP, slot::CHUNK_OCTREE, vec![7; 16]);
        b.run(&OctreeInitNodeKernel, [64, 1, 1]);
        let octree = b.buffer(BUILD_GROUP, slot::CHUNK_OCTREE);
        assert!(octree[..8].iter().all(|&s| s == 7));
        assert!(octree[8..].iter().all(|&s| s == 0));
    }

    #[test]
    fn child_index_reads_one_bit_per_axis() {
        assert_eq!(child_index([7, 0, 0], 2), 1);
        assert_eq!(child_index([0, 4, 0], 2), 2);
        assert_eq!(child_index([0, 0, 4], 2), 4);
        assert_eq!(child_index([5, 5, 5], 1), 0);
        assert_eq!(child_index([5, 5, 5], 0), 7);
    }
}
