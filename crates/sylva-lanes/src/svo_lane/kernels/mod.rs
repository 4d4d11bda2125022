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

//! Host reference implementations of the stage shaders.
//!
//! Each kernel implements exactly the contract of the WGSL shader of the same
//! name, one invocation per global invocation id, and is used by the software
//! device to run a chunk build without a GPU.

mod chunks;
mod fragment;
mod octree;

pub use chunks::ChunksBuilderKernel;
pub use fragment::{ChunkFieldConstructionKernel, ChunkVoxelCreationKernel};
pub use octree::{
    ChunkModifyArgKernel, OctreeAllocNodeKernel, OctreeInitNodeKernel, OctreeModifyArgKernel,
    OctreeTagNodeKernel,
};

use super::resources::{bindings as slot, BUILD_GROUP, INDIRECT_GROUP};
use super::stages::{SvoStage, OCTREE_WORKGROUP_WIDTH};
use std::sync::Arc;
use sylva_core::renderer::{ComputeKernel, KernelBindings, KernelFault};

/// Every reference kernel, keyed by the shader name it stands in for.
pub fn reference_kernels() -> Vec<(&'static str, Arc<dyn ComputeKernel>)> {
    SvoStage::ALL
        .iter()
        .map(|&stage| (stage.shader_name(), kernel_for(stage)))
        .collect()
}

/// The reference kernel of `stage`.
pub fn kernel_for(stage: SvoStage) -> Arc<dyn ComputeKernel> {
    match stage {
        SvoStage::ChunkFieldConstruction => Arc::new(ChunkFieldConstructionKernel),
        SvoStage::ChunkVoxelCreation => Arc::new(ChunkVoxelCreationKernel),
        SvoStage::ChunkModifyArg => Arc::new(ChunkModifyArgKernel),
        SvoStage::OctreeInitNode => Arc::new(OctreeInitNodeKernel),
        SvoStage::OctreeTagNode => Arc::new(OctreeTagNodeKernel),
        SvoStage::OctreeAllocNode => Arc::new(OctreeAllocNodeKernel),
        SvoStage::OctreeModifyArg => Arc::new(OctreeModifyArgKernel),
        SvoStage::ChunksBuilder => Arc::new(ChunksBuilderKernel),
    }
}

fn load(bindings: &dyn KernelBindings, binding: u32, index: u64) -> Result<u32, KernelFault> {
    bindings.load_u32(BUILD_GROUP, binding, index)
}

fn store(
    bindings: &mut dyn KernelBindings,
    binding: u32,
    index: u64,
    value: u32,
) -> Result<(), KernelFault> {
    bindings.store_u32(BUILD_GROUP, binding, index, value)
}

/// Writes `(ceil(items / 64), 1, 1)` into an indirect argument binding.
fn write_dispatch_args(
    bindings: &mut dyn KernelBindings,
    binding: u32,
    items: u32,
) -> Result<(), KernelFault> {
    let groups = items.div_ceil(OCTREE_WORKGROUP_WIDTH);
    bindings.store_u32(INDIRECT_GROUP, binding, 0, groups)?;
    bindings.store_u32(INDIRECT_GROUP, binding, 1, 1)?;
    bindings.store_u32(INDIRECT_GROUP, binding, 2, 1)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_kernel_per_stage_with_matching_workgroup_size() {
        let kernels = reference_kernels();
        assert_eq!(kernels.len(), SvoStage::ALL.len());
        for (name, kernel) in kernels {
            let stage = SvoStage::from_shader_name(name).unwrap();
            assert_eq!(kernel.workgroup_size(), stage.desc().workgroup_size, "{name}");
        }
    }

    #[test]
    fn dispatch_args_round_up_to_whole_workgroups() {
        use test_support::TestBindings;
        let mut b = TestBindings::default().with_buffer(INDIRECT_GROUP, slot::INDIRECT_ALLOC_NUM, vec![0; 3]);
        write_dispatch_args(&mut b, slot::INDIRECT_ALLOC_NUM, 65).unwrap();
        assert_eq!(b.buffer(INDIRECT_GROUP, slot::INDIRECT_ALLOC_NUM), &[2, 1, 1]);
        write_dispatch_args(&mut b, slot::INDIRECT_ALLOC_NUM, 64).unwrap();
        assert_eq!(b.buffer(INDIRECT_GROUP, slot::INDIRECT_ALLOC_NUM), &[1, 1, 1]);
        write_dispatch_args(&mut b, slot::INDIRECT_ALLOC_NUM, 0).unwrap();
        assert_eq!(b.buffer(INDIRECT_GROUP, slot::INDIRECT_ALLOC_NUM), &[0, 1, 1]);
    }
}
