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

use super::stages::{record_stage, SvoStage};
use super::{SvoLane, SvoLaneContext};
use sylva_core::lane::{Lane, LaneError, LaneKind};
use sylva_core::renderer::{CommandEncoder, GraphicsDevice};

/// Copies a finished chunk into persistent storage and records its placement.
///
/// Records, in one command buffer, the octree copy into the shared buffer,
/// the field image copy into the chunk's own image, and the `chunks_builder`
/// dispatch writing the chunk's word offset into the lookup.
#[derive(Debug, Default)]
pub struct ChunkOutputLane;

impl ChunkOutputLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for ChunkOutputLane {
    fn strategy_name(&self) -> &'static str {
        "ChunkOutput"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Output
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl SvoLane for ChunkOutputLane {
    fn prepare(
        &self,
        device: &dyn GraphicsDevice,
        ctx: &SvoLaneContext<'_>,
    ) -> Result<(), LaneError> {
        let target = ctx
            .copy_out
            .ok_or(LaneError::MissingResource("chunk copy-out target"))?;
        ctx.resources
            .set_write_offset(device, target.allocation.offset_in_u32())
            .map_err(|e| LaneError::ExecutionFailed(Box::new(e)))
    }

    fn record(
        &self,
        ctx: &SvoLaneContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<(), LaneError> {
        let target = ctx
            .copy_out
            .ok_or(LaneError::MissingResource("chunk copy-out target"))?;
        let resources = ctx.resources;

        encoder.copy_buffer_to_buffer(
            &resources.chunk_octree_buffer(),
            0,
            &resources.appended_octree_buffer(),
            target.allocation.offset,
            target.octree_len as u64 * 4,
        );
        encoder.copy_texture_to_texture(
            &resources.field_image(),
            &target.field_image,
            resources.field_image_extent(),
        );
        record_stage(encoder, SvoStage::ChunksBuilder, ctx.pipelines, resources);
        Ok(())
    }
}
