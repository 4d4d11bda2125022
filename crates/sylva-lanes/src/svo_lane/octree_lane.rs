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
use sylva_core::renderer::{CommandEncoder, MemoryBarrier};

/// Builds the octree of one chunk, one level per iteration.
///
/// Every dispatch after the first is sized by arguments a previous dispatch
/// wrote on the GPU, so the CPU never learns the node counts. The loop always
/// runs `level_count` iterations.
#[derive(Debug, Default)]
pub struct OctreeLane;

impl OctreeLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }

    /// Barriers separating an args-writing stage from the indirect dispatches after it.
    fn indirect_args_barrier(encoder: &mut dyn CommandEncoder) {
        encoder.memory_barrier(MemoryBarrier::ShaderReadWrite);
        encoder.memory_barrier(MemoryBarrier::IndirectCommandRead);
    }
}

impl Lane for OctreeLane {
    fn strategy_name(&self) -> &'static str {
        "LevelSynchronousOctree"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::OctreeConstruction
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl SvoLane for OctreeLane {
    fn record(
        &self,
        ctx: &SvoLaneContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<(), LaneError> {
        let SvoLaneContext {
            resources,
            pipelines,
            ..
        } = *ctx;
        let level_count = resources.level_count();

        record_stage(encoder, SvoStage::ChunkModifyArg, pipelines, resources);
        Self::indirect_args_barrier(encoder);

        for level in 0..level_count {
            record_stage(encoder, SvoStage::OctreeInitNode, pipelines, resources);
            encoder.memory_barrier(MemoryBarrier::ShaderReadWrite);
            record_stage(encoder, SvoStage::OctreeTagNode, pipelines, resources);

            if level + 1 != level_count {
                encoder.memory_barrier(MemoryBarrier::ShaderReadWrite);
                record_stage(encoder, SvoStage::OctreeAllocNode, pipelines, resources);
                encoder.memory_barrier(MemoryBarrier::ShaderReadWrite);
                record_stage(encoder, SvoStage::OctreeModifyArg, pipelines, resources);
                Self::indirect_args_barrier(encoder);
            }
        }
        log::trace!(
            "Recorded {level_count} octree levels for chunk {}",
            ctx.coord
        );
        Ok(())
    }
}
