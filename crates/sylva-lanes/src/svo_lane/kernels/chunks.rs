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

use super::{load, slot, store};
use sylva_core::renderer::{ComputeKernel, KernelBindings, KernelFault};
use sylva_data::svo::ChunksInfo;

/// `chunks_builder`: records the current chunk's octree offset in the chunks lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunksBuilderKernel;

impl ComputeKernel for ChunksBuilderKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [1, 1, 1]
    }

    fn invoke(&self, _global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let dims = ChunksInfo::CHUNKS_DIM_WORD;
        let current = ChunksInfo::CURRENT_CHUNK_WORD;
        let chunks_x = load(bindings, slot::CHUNKS_INFO, dims)? as u64;
        let chunks_y = load(bindings, slot::CHUNKS_INFO, dims + 1)? as u64;
        let x = load(bindings, slot::CHUNKS_INFO, current)? as u64;
        let y = load(bindings, slot::CHUNKS_INFO, current + 1)? as u64;
        let z = load(bindings, slot::CHUNKS_INFO, current + 2)? as u64;

        let offset = load(bindings, slot::WRITE_OFFSET, 0)?;
        store(
            bindings,
            slot::CHUNKS_LOOKUP,
            x + y * chunks_x + z * chunks_x * chunks_y,
            offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestBindings;
    use super::super::BUILD_GROUP;
    use super::*;
    use sylva_data::svo::EMPTY_CHUNK;

    fn chunks_info(dims: [u32; 3], current: [u32; 3]) -> Vec<u32> {
        bytemuck::cast::<ChunksInfo, [u32; 8]>(ChunksInfo::new(dims, current)).to_vec()
    }

    #[test]
    fn writes_offset_at_row_major_index() {
        let mut b = TestBindings::default()
            .with_buffer(BUILD_GROUP, slot::CHUNKS_INFO, chunks_info([3, 2, 2], [1, 1, 1]))
            .with_buffer(BUILD_GROUP, slot::WRITE_OFFSET, vec![4096])
            .with_buffer(BUILD_GROUP, slot::CHUNKS_LOOKUP, vec![EMPTY_CHUNK; 12]);
        b.run(&ChunksBuilderKernel, [1, 1, 1]);

        let lookup = b.buffer(BUILD_GROUP, slot::CHUNKS_LOOKUP);
        // 1 + 1 * 3 + 1 * 3 * 2
        assert_eq!(lookup[10], 4096);
        assert_eq!(lookup.iter().filter(|&&v| v == EMPTY_CHUNK).count(), 11);
    }

    #[test]
    fn chunk_outside_the_lookup_faults() {
        let mut b = TestBindings::default()
            .with_buffer(BUILD_GROUP, slot::CHUNKS_INFO, chunks_info([2, 1, 1], [0, 0, 3]))
            .with_buffer(BUILD_GROUP, slot::WRITE_OFFSET, vec![0])
            .with_buffer(BUILD_GROUP, slot::CHUNKS_LOOKUP, vec![EMPTY_CHUNK; 2]);
        let fault = ChunksBuilderKernel.invoke([0, 0, 0], &mut b).unwrap_err();
        assert!(matches!(fault, KernelFault::OutOfBounds { index: 6, len: 2, .. }));
    }
}
