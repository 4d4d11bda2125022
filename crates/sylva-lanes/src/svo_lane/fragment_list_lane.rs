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

/// Voxelizes the field of one chunk into the fragment list.
///
/// Field construction writes every lattice sample before voxel creation reads
/// eight of them per cell, hence the full barrier in between.
#[derive(Debug, Default)]
pub struct FragmentListLane;

impl FragmentListLane {
    /// Creates the lane.
    pub fn new() -> Self {
        Self
    }
}

impl Lane for FragmentListLane {
    fn strategy_name(&self) -> &'static str {
        "FragmentList"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Voxelization
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

impl SvoLane for FragmentListLane {
    fn record(
        &self,
        ctx: &SvoLaneContext<'_>,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<(), LaneError> {
        record_stage(
            encoder,
            SvoStage::ChunkFieldConstruction,
            ctx.pipelines,
            ctx.resources,
        );
        encoder.memory_barrier(MemoryBarrier::Full);
        record_stage(
            encoder,
            SvoStage::ChunkVoxelCreation,
            ctx.pipelines,
            ctx.resources,
        );
        Ok(())
    }
}
