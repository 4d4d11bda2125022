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

//! Lanes recording the GPU work of one chunk build.
//!
//! A chunk build is three command buffers, each recorded by one lane:
//! the [`FragmentListLane`] voxelizes the chunk, the [`OctreeLane`] runs the
//! level-synchronous octree construction, and the [`ChunkOutputLane`] copies
//! the finished octree into the shared buffer. The agent submits them in that
//! order and waits on a fence between each.

mod chunk_output_lane;
mod fragment_list_lane;
pub mod kernels;
mod octree_lane;
pub mod resources;
pub mod stages;

pub use chunk_output_lane::*;
pub use fragment_list_lane::*;
pub use octree_lane::*;
pub use resources::SvoResourceSet;
pub use stages::{record_stage, StagePipelines, SvoStage, STAGE_TABLE};

use sylva_core::lane::{Lane, LaneError};
use sylva_core::renderer::{CommandEncoder, GraphicsDevice, TextureId};
use sylva_data::allocators::ChunkAllocation;
use sylva_data::svo::ChunkCoord;

/// Where a finished chunk octree goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkCopyOut {
    /// Length of the chunk octree in slots.
    pub octree_len: u32,
    /// The range of the shared buffer reserved for it.
    pub allocation: ChunkAllocation,
    /// The chunk's persistent field image.
    pub field_image: TextureId,
}

/// Everything a lane needs to record its part of a chunk build.
#[derive(Debug, Clone, Copy)]
pub struct SvoLaneContext<'a> {
    /// The shared GPU resources.
    pub resources: &'a SvoResourceSet,
    /// The compiled stage pipelines.
    pub pipelines: &'a StagePipelines,
    /// The chunk being built.
    pub coord: ChunkCoord,
    /// Copy-out target, set once the chunk octree has been measured.
    pub copy_out: Option<ChunkCopyOut>,
}

/// A lane that records one step of a chunk build.
pub trait SvoLane: Lane {
    /// Uploads the host-side values the recorded commands depend on.
    ///
    /// Called before the recorded command buffer is submitted.
    fn prepare(
        &self,
        _device: &dyn GraphicsDevice,
        _ctx: &SvoLaneContext<'_>,
    ) -> Result<(), LaneError> {
        Ok(())
    }

    /// Records the lane's commands into `encoder`.
    fn record(
        &self,
        ctx: &SvoLaneContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<(), LaneError>;
}
