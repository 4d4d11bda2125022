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

//! The data-driven table of build stages and the routine that records them.

use super::resources::{SvoResourceSet, BUILD_GROUP, INDIRECT_GROUP};
use crate::error::SvoError;
use std::borrow::Cow;
use sylva_core::renderer::api::*;
use sylva_core::renderer::{CommandEncoder, GraphicsDevice, ShaderSource};

/// Entry point every stage shader exports.
pub const ENTRY_POINT: &str = "main";

/// Workgroup width of the one-dimensional octree stages.
pub const OCTREE_WORKGROUP_WIDTH: u32 = 64;

/// One compute stage of a chunk build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SvoStage {
    /// Samples the field at every lattice point of the chunk.
    ChunkFieldConstruction,
    /// Appends a fragment for every surface cell.
    ChunkVoxelCreation,
    /// Sizes the first level's indirect dispatches.
    ChunkModifyArg,
    /// Clears the slots of the current allocation window.
    OctreeInitNode,
    /// Tags the slots of the current level touched by a fragment.
    OctreeTagNode,
    /// Allocates a child block for every tagged slot.
    OctreeAllocNode,
    /// Advances the allocation window to the next level.
    OctreeModifyArg,
    /// Records the chunk's offset in the chunks lookup.
    ChunksBuilder,
}

/// How many threads a directly dispatched stage covers, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadExtent {
    /// `(dim + 1)³` lattice points.
    LatticePoints,
    /// `dim³` voxel cells.
    Cells,
}

/// The buffer an indirect dispatch reads its workgroup counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndirectSource {
    /// Sized by the fragment count.
    FragmentLength,
    /// Sized by the allocation window.
    AllocNum,
}

/// How a stage is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    /// `ceil(threads / workgroup_size)` workgroups per axis.
    Threads(ThreadExtent),
    /// Exactly one workgroup.
    Single,
    /// Workgroup counts read from a GPU buffer.
    Indirect(IndirectSource),
}

/// A row of the stage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDesc {
    /// The stage.
    pub stage: SvoStage,
    /// Name of the shader, also used as its module and pipeline label.
    pub shader: &'static str,
    /// The shader's `@workgroup_size`.
    pub workgroup_size: [u32; 3],
    /// How the stage is dispatched.
    pub dispatch: DispatchKind,
    /// Whether the stage also binds the indirect argument buffers as storage.
    pub writes_indirect_args: bool,
}

/// Every stage of a chunk build.
pub const STAGE_TABLE: [StageDesc; 8] = [
    StageDesc {
        stage: SvoStage::ChunkFieldConstruction,
        shader: "chunk_field_construction",
        workgroup_size: [8, 8, 8],
        dispatch: DispatchKind::Threads(ThreadExtent::LatticePoints),
        writes_indirect_args: false,
    },
    StageDesc {
        stage: SvoStage::ChunkVoxelCreation,
        shader: "chunk_voxel_creation",
        workgroup_size: [8, 8, 8],
        dispatch: DispatchKind::Threads(ThreadExtent::Cells),
        writes_indirect_args: false,
    },
    StageDesc {
        stage: SvoStage::ChunkModifyArg,
        shader: "chunk_modify_arg",
        workgroup_size: [1, 1, 1],
        dispatch: DispatchKind::Single,
        writes_indirect_args: true,
    },
    StageDesc {
        stage: SvoStage::OctreeInitNode,
        shader: "octree_init_node",
        workgroup_size: [OCTREE_WORKGROUP_WIDTH, 1, 1],
        dispatch: DispatchKind::Indirect(IndirectSource::AllocNum),
        writes_indirect_args: false,
    },
    StageDesc {
        stage: SvoStage::OctreeTagNode,
        shader: "octree_tag_node",
        workgroup_size: [OCTREE_WORKGROUP_WIDTH, 1, 1],
        dispatch: DispatchKind::Indirect(IndirectSource::FragmentLength),
        writes_indirect_args: false,
    },
    StageDesc {
        stage: SvoStage::OctreeAllocNode,
        shader: "octree_alloc_node",
        workgroup_size: [OCTREE_WORKGROUP_WIDTH, 1, 1],
        dispatch: DispatchKind::Indirect(IndirectSource::AllocNum),
        writes_indirect_args: false,
    },
    StageDesc {
        stage: SvoStage::OctreeModifyArg,
        shader: "octree_modify_arg",
        workgroup_size: [1, 1, 1],
        dispatch: DispatchKind::Single,
        writes_indirect_args: true,
    },
    StageDesc {
        stage: SvoStage::ChunksBuilder,
        shader: "chunks_builder",
        workgroup_size: [1, 1, 1],
        dispatch: DispatchKind::Single,
        writes_indirect_args: false,
    },
];

impl SvoStage {
    /// Every stage, in table order.
    pub const ALL: [SvoStage; 8] = [
        SvoStage::ChunkFieldConstruction,
        SvoStage::ChunkVoxelCreation,
        SvoStage::ChunkModifyArg,
        SvoStage::OctreeInitNode,
        SvoStage::OctreeTagNode,
        SvoStage::OctreeAllocNode,
        SvoStage::OctreeModifyArg,
        SvoStage::ChunksBuilder,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// The stage's table row.
    pub const fn desc(self) -> &'static StageDesc {
        &STAGE_TABLE[self.index()]
    }

    /// The stage's shader name.
    pub const fn shader_name(self) -> &'static str {
        self.desc().shader
    }

    /// Looks a stage up by shader name.
    pub fn from_shader_name(name: &str) -> Option<SvoStage> {
        STAGE_TABLE
            .iter()
            .find(|desc| desc.shader == name)
            .map(|desc| desc.stage)
    }
}

/// `ceil(threads / workgroup_size)` on each axis.
pub fn direct_workgroups(threads: [u32; 3], workgroup_size: [u32; 3]) -> [u32; 3] {
    [
        threads[0].div_ceil(workgroup_size[0]),
        threads[1].div_ceil(workgroup_size[1]),
        threads[2].div_ceil(workgroup_size[2]),
    ]
}

/// The compiled pipeline of every stage.
#[derive(Debug)]
pub struct StagePipelines {
    modules: Vec<ShaderModuleId>,
    pipelines: Vec<ComputePipelineId>,
}

impl StagePipelines {
    /// Compiles every stage of [`STAGE_TABLE`] from `shaders`.
    ///
    /// On failure the objects created so far are destroyed before returning.
    pub fn build(
        device: &dyn GraphicsDevice,
        resources: &SvoResourceSet,
        shaders: &dyn ShaderSource,
    ) -> Result<Self, SvoError> {
        let mut built = Self {
            modules: Vec::with_capacity(STAGE_TABLE.len()),
            pipelines: Vec::with_capacity(STAGE_TABLE.len()),
        };
        for desc in &STAGE_TABLE {
            if let Err(e) = built.compile_stage(device, resources, shaders, desc) {
                log::error!("Failed to build pipeline '{}': {e}", desc.shader);
                built.destroy(device);
                return Err(e);
            }
        }
        log::debug!(
            "Built {} SVO stage pipelines from {}",
            built.pipelines.len(),
            shaders.origin()
        );
        Ok(built)
    }

    fn compile_stage(
        &mut self,
        device: &dyn GraphicsDevice,
        resources: &SvoResourceSet,
        shaders: &dyn ShaderSource,
        desc: &StageDesc,
    ) -> Result<(), SvoError> {
        let source = shaders.load(desc.shader)?;
        let module =
            device.create_shader_module(&ShaderModuleDescriptor::wgsl(desc.shader, source))?;
        self.modules.push(module);

        let layout = if desc.writes_indirect_args {
            resources.indirect_pipeline_layout()
        } else {
            resources.build_pipeline_layout()
        };
        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some(Cow::Borrowed(desc.shader)),
            layout: Some(layout),
            shader_module: module,
            entry_point: Cow::Borrowed(ENTRY_POINT),
        })?;
        self.pipelines.push(pipeline);
        Ok(())
    }

    /// Recompiles every stage and swaps the new pipelines in.
    ///
    /// The current pipelines are only destroyed once every new one has been
    /// built, so a shader error leaves `self` usable. Buffers are untouched.
    pub fn rebuild(
        &mut self,
        device: &dyn GraphicsDevice,
        resources: &SvoResourceSet,
        shaders: &dyn ShaderSource,
    ) -> Result<(), SvoError> {
        let fresh = Self::build(device, resources, shaders)?;
        let old = std::mem::replace(self, fresh);
        old.destroy(device);
        log::info!("Rebuilt SVO pipelines from {}", shaders.origin());
        Ok(())
    }

    /// The pipeline of `stage`.
    pub fn pipeline(&self, stage: SvoStage) -> &ComputePipelineId {
        &self.pipelines[stage.index()]
    }

    /// Releases every pipeline and shader module.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        for pipeline in self.pipelines {
            let _ = device.destroy_compute_pipeline(pipeline);
        }
        for module in self.modules {
            let _ = device.destroy_shader_module(module);
        }
    }
}

/// Records one stage as its own compute pass: binds its pipeline and groups,
/// then dispatches it the way the stage table says.
pub fn record_stage(
    encoder: &mut dyn CommandEncoder,
    stage: SvoStage,
    pipelines: &StagePipelines,
    resources: &SvoResourceSet,
) {
    let desc = stage.desc();
    let dim = resources.chunk_voxel_dim();
    let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
        label: Some(desc.shader),
    });
    pass.set_pipeline(pipelines.pipeline(stage));
    pass.set_bind_group(BUILD_GROUP, resources.build_group(), &[]);
    if desc.writes_indirect_args {
        pass.set_bind_group(INDIRECT_GROUP, resources.indirect_group(), &[]);
    }
    match desc.dispatch {
        DispatchKind::Threads(extent) => {
            let threads = match extent {
                ThreadExtent::LatticePoints => dim + 1,
                ThreadExtent::Cells => dim,
            };
            let [x, y, z] = direct_workgroups([threads; 3], desc.workgroup_size);
            pass.dispatch_workgroups(x, y, z);
        }
        DispatchKind::Single => pass.dispatch_workgroups(1, 1, 1),
        DispatchKind::Indirect(IndirectSource::FragmentLength) => {
            pass.dispatch_workgroups_indirect(resources.indirect_frag_args());
        }
        DispatchKind::Indirect(IndirectSource::AllocNum) => {
            pass.dispatch_workgroups_indirect(resources.indirect_alloc_args());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_stage() {
        for stage in SvoStage::ALL {
            assert_eq!(stage.desc().stage, stage);
            assert_eq!(SvoStage::from_shader_name(stage.shader_name()), Some(stage));
        }
        assert_eq!(SvoStage::from_shader_name("denoise"), None);
    }

    #[test]
    fn only_modify_arg_stages_write_indirect_args() {
        let writers: Vec<_> = STAGE_TABLE
            .iter()
            .filter(|desc| desc.writes_indirect_args)
            .map(|desc| desc.stage)
            .collect();
        assert_eq!(writers, vec![SvoStage::ChunkModifyArg, SvoStage::OctreeModifyArg]);

        for desc in &STAGE_TABLE {
            if let DispatchKind::Indirect(_) = desc.dispatch {
                assert!(!desc.writes_indirect_args, "{} reads its own args", desc.shader);
            }
        }
    }

    #[test]
    fn direct_dispatch_rounds_up() {
        assert_eq!(direct_workgroups([65; 3], [8, 8, 8]), [9, 9, 9]);
        assert_eq!(direct_workgroups([64; 3], [8, 8, 8]), [8, 8, 8]);
        assert_eq!(direct_workgroups([9; 3], [8, 8, 8]), [2, 2, 2]);
        assert_eq!(direct_workgroups([1; 3], [1, 1, 1]), [1, 1, 1]);
    }
}
