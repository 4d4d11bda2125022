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

//! Defines the SvoBuilderAgent, which builds the octrees of every chunk of the scene.

use super::stats::{BuildTimingStats, ChunkBuildOutcome, SceneBuildReport};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use sylva_core::agent::{Agent, AgentStatus};
use sylva_core::renderer::{BufferId, FenceId, GraphicsDevice, ShaderSource, TextureId};
use sylva_core::Stopwatch;
use sylva_data::allocators::{ChunkMemoryAllocator, ChunkMemoryStats};
use sylva_data::config::SvoBuilderConfig;
use sylva_data::svo::{ChunkCoord, EMPTY_CHUNK, ROOT_BLOCK_LEN};
use sylva_lanes::{
    ChunkCopyOut, ChunkOutputLane, FragmentListLane, OctreeLane, StagePipelines, SvoError,
    SvoLane, SvoLaneContext, SvoResourceSet,
};

/// The GPU objects created by [`SvoBuilderAgent::init`].
#[derive(Debug)]
struct GpuState {
    resources: SvoResourceSet,
    pipelines: StagePipelines,
    fence: FenceId,
}

impl GpuState {
    fn create(
        device: &dyn GraphicsDevice,
        config: &SvoBuilderConfig,
        shaders: &dyn ShaderSource,
    ) -> Result<Self, SvoError> {
        let resources = SvoResourceSet::create(device, config)?;
        let pipelines = match StagePipelines::build(device, &resources, shaders) {
            Ok(pipelines) => pipelines,
            Err(e) => {
                resources.destroy(device);
                return Err(e);
            }
        };
        let fence = match device.create_fence() {
            Ok(fence) => fence,
            Err(e) => {
                pipelines.destroy(device);
                resources.destroy(device);
                return Err(e.into());
            }
        };
        Ok(Self {
            resources,
            pipelines,
            fence,
        })
    }

    fn destroy(self, device: &dyn GraphicsDevice) {
        let _ = device.destroy_fence(self.fence);
        self.pipelines.destroy(device);
        self.resources.destroy(device);
    }
}

/// Records a lane into its own command buffer, submits it and blocks until
/// the GPU is done with it.
fn submit_lane(
    device: &dyn GraphicsDevice,
    fence: FenceId,
    lane: &dyn SvoLane,
    ctx: &SvoLaneContext<'_>,
) -> Result<(), SvoError> {
    lane.prepare(device, ctx)?;
    let mut encoder = device.create_command_encoder(Some(lane.strategy_name()));
    lane.record(ctx, encoder.as_mut())?;
    device.submit_command_buffer(encoder.finish(), Some(fence))?;
    device.wait_for_fence(fence)?;
    device.reset_fence(fence)?;
    Ok(())
}

/// The agent that builds the sparse voxel octrees of the scene.
///
/// Chunks are built strictly one after the other. Each finished octree is
/// appended to one shared buffer through a [`ChunkMemoryAllocator`], and its
/// word offset is written into the chunks lookup. Repeated scene builds keep
/// appending: ranges of earlier builds are never reclaimed.
#[derive(Debug)]
pub struct SvoBuilderAgent {
    device: Arc<dyn GraphicsDevice>,
    config: SvoBuilderConfig,
    shaders: Box<dyn ShaderSource>,
    gpu: GpuState,
    allocator: ChunkMemoryAllocator,
    fragment_list_lane: FragmentListLane,
    octree_lane: OctreeLane,
    chunk_output_lane: ChunkOutputLane,
    /// Field images of the chunks built by the last scene build.
    field_images: HashMap<ChunkCoord, TextureId>,
    last_report: Option<SceneBuildReport>,
    pipeline_rebuild_requested: bool,
    rebuild_requested: bool,
}

impl SvoBuilderAgent {
    /// Creates the agent and all of its GPU resources.
    ///
    /// The first call to [`Agent::update`] builds the scene.
    ///
    /// ## Errors
    /// * `SvoError::Config` - If the configuration is invalid.
    /// * `SvoError::Shader` / `SvoError::Resource` - If a shader or GPU object cannot be created.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        config: SvoBuilderConfig,
        shaders: Box<dyn ShaderSource>,
    ) -> Result<Self, SvoError> {
        config.validate()?;
        let gpu = GpuState::create(device.as_ref(), &config, shaders.as_ref())?;
        let allocator = ChunkMemoryAllocator::new(config.octree_buffer_capacity);
        log::info!(
            "SVO builder ready: {} chunks of {}³ voxels, {} levels, shaders from {}",
            gpu.resources.grid().chunk_count(),
            config.chunk_voxel_dim,
            config.level_count(),
            shaders.origin()
        );
        Ok(Self {
            device,
            config,
            shaders,
            gpu,
            allocator,
            fragment_list_lane: FragmentListLane::new(),
            octree_lane: OctreeLane::new(),
            chunk_output_lane: ChunkOutputLane::new(),
            field_images: HashMap::new(),
            last_report: None,
            pipeline_rebuild_requested: false,
            rebuild_requested: true,
        })
    }

    /// Recreates every GPU resource, pipeline and the fence from scratch.
    ///
    /// Everything built so far is dropped: the allocator is reset and the
    /// next update rebuilds the scene.
    pub fn init(&mut self) -> Result<(), SvoError> {
        let device = Arc::clone(&self.device);
        let fresh = GpuState::create(device.as_ref(), &self.config, self.shaders.as_ref())?;
        let old = std::mem::replace(&mut self.gpu, fresh);
        old.destroy(device.as_ref());
        self.destroy_field_images();
        self.allocator.reset();
        self.last_report = None;
        self.pipeline_rebuild_requested = false;
        self.rebuild_requested = true;
        log::debug!("SVO builder GPU state recreated");
        Ok(())
    }

    /// Builds every chunk of the grid and returns the report of the run.
    ///
    /// Chunks are visited x fastest, then y, then z. The first failing chunk
    /// aborts the run and leaves no report behind.
    pub fn build_scene(&mut self) -> Result<&SceneBuildReport, SvoError> {
        self.last_report = None;
        let device = Arc::clone(&self.device);
        let device = device.as_ref();
        self.gpu.resources.set_write_offset(device, 0)?;
        self.gpu.resources.clear_chunks_lookup(device)?;
        self.destroy_field_images();

        let grid = self.gpu.resources.grid();
        let mut chunks = Vec::with_capacity(grid.chunk_count());
        let mut timings = BuildTimingStats::default();
        let scene_watch = Stopwatch::new();
        for coord in grid.iter() {
            let watch = Stopwatch::new();
            let outcome = self.build_chunk(coord).inspect_err(|e| {
                log::error!("Failed to build chunk {coord}: {e}");
            })?;
            if !outcome.is_empty() {
                timings.record(watch.elapsed_ms_f64());
            }
            chunks.push((coord, outcome));
        }

        let report = SceneBuildReport {
            chunks,
            timings,
            allocator: self.allocator.stats(),
        };
        log::info!(
            "Built {} chunks ({} empty) in {:.1} ms, per chunk: {}",
            report.built_count(),
            report.empty_count(),
            scene_watch.elapsed_ms_f64(),
            report.timings
        );
        self.allocator.log_stats();
        self.rebuild_requested = false;
        Ok(self.last_report.insert(report))
    }

    /// Builds the chunk at `coord` and appends its octree to the shared buffer.
    ///
    /// An empty chunk stops after voxelization: no octree dispatch, no
    /// allocation and no field image. Its lookup entry is set to empty.
    pub fn build_chunk(&mut self, coord: ChunkCoord) -> Result<ChunkBuildOutcome, SvoError> {
        let device = Arc::clone(&self.device);
        let device = device.as_ref();
        let resources = &self.gpu.resources;
        let fence = self.gpu.fence;
        let index = resources
            .grid()
            .linear_index(coord)
            .ok_or(SvoError::ChunkOutOfGrid(coord))?;

        resources.reset_for_chunk(device, coord)?;
        let mut ctx = SvoLaneContext {
            resources,
            pipelines: &self.gpu.pipelines,
            coord,
            copy_out: None,
        };
        submit_lane(device, fence, &self.fragment_list_lane, &ctx)?;

        let fragment_count = resources.read_fragment_count(device)?;
        if fragment_count == 0 {
            if let Some(image) = self.field_images.remove(&coord) {
                let _ = device.destroy_texture(image);
            }
            device.write_buffer(
                resources.chunks_lookup_buffer(),
                index as u64 * 4,
                bytemuck::bytes_of(&EMPTY_CHUNK),
            )?;
            log::trace!("Chunk {coord} is empty, skipping octree construction");
            return Ok(ChunkBuildOutcome::Empty);
        }

        let field_image = resources.create_chunk_field_image(device, coord)?;
        if let Some(previous) = self.field_images.insert(coord, field_image) {
            let _ = device.destroy_texture(previous);
        }

        submit_lane(device, fence, &self.octree_lane, &ctx)?;
        let octree_len = resources.read_octree_len(device)?;
        if octree_len < ROOT_BLOCK_LEN || octree_len as u64 > resources.chunk_octree_len() {
            let err = SvoError::OctreeOverflow {
                coord,
                len: octree_len,
                capacity: resources.chunk_octree_len(),
            };
            log::error!("{err}");
            return Err(err);
        }

        let allocation = self.allocator.allocate(octree_len as u64 * 4)?;
        ctx.copy_out = Some(ChunkCopyOut {
            octree_len,
            allocation,
            field_image,
        });
        submit_lane(device, fence, &self.chunk_output_lane, &ctx)?;

        log::debug!(
            "Chunk {coord}: {fragment_count} fragments, {octree_len} octree slots at word offset {}",
            allocation.offset_in_u32()
        );
        Ok(ChunkBuildOutcome::Built {
            fragment_count,
            octree_len,
            allocation,
        })
    }

    /// Marks the pipelines for recompilation and the scene for a rebuild on
    /// the next update. Called when shader files change.
    pub fn request_pipeline_rebuild(&mut self) {
        self.pipeline_rebuild_requested = true;
        self.rebuild_requested = true;
    }

    /// Marks the scene for a rebuild on the next update.
    pub fn request_scene_rebuild(&mut self) {
        self.rebuild_requested = true;
    }

    /// Recompiles every stage pipeline from the agent's shader source.
    ///
    /// Buffers and their contents are untouched. On failure the previous
    /// pipelines stay in use.
    pub fn rebuild_pipelines(&mut self) -> Result<(), SvoError> {
        self.pipeline_rebuild_requested = false;
        self.gpu
            .pipelines
            .rebuild(self.device.as_ref(), &self.gpu.resources, self.shaders.as_ref())
    }

    /// Reads back the octree words of a chunk from the shared buffer.
    ///
    /// Returns `None` for a chunk that was empty or has not been built by
    /// the last scene build.
    pub fn read_chunk_octree(&self, coord: ChunkCoord) -> Result<Option<Vec<u32>>, SvoError> {
        if !self.gpu.resources.grid().contains(coord) {
            return Err(SvoError::ChunkOutOfGrid(coord));
        }
        let Some(allocation) = self
            .last_report
            .as_ref()
            .and_then(|report| report.outcome(coord))
            .and_then(ChunkBuildOutcome::allocation)
        else {
            return Ok(None);
        };
        let words = self
            .gpu
            .resources
            .read_appended_words(self.device.as_ref(), allocation)?;
        Ok(Some(words))
    }

    /// Reads back the chunks lookup, one entry per chunk in row-major order.
    pub fn read_chunks_lookup(&self) -> Result<Vec<u32>, SvoError> {
        Ok(self.gpu.resources.read_chunks_lookup(self.device.as_ref())?)
    }

    /// The shared buffer holding every chunk octree.
    pub fn appended_octree_buffer(&self) -> BufferId {
        self.gpu.resources.appended_octree_buffer()
    }

    /// The buffer mapping each chunk to its octree's word offset.
    pub fn chunks_lookup_buffer(&self) -> BufferId {
        self.gpu.resources.chunks_lookup_buffer()
    }

    /// Octree levels per chunk.
    pub fn voxel_level_count(&self) -> u32 {
        self.gpu.resources.level_count()
    }

    /// Number of chunks along X, Y and Z.
    pub fn chunks_dim(&self) -> [u32; 3] {
        self.gpu.resources.grid().dims()
    }

    /// Voxels along each edge of a chunk.
    pub fn chunk_voxel_dim(&self) -> u32 {
        self.gpu.resources.chunk_voxel_dim()
    }

    /// The field image of a chunk built by the last scene build.
    pub fn chunk_field_image(&self, coord: ChunkCoord) -> Option<TextureId> {
        self.field_images.get(&coord).copied()
    }

    /// The current allocator bookkeeping.
    pub fn allocator_stats(&self) -> ChunkMemoryStats {
        self.allocator.stats()
    }

    /// The report of the last completed scene build.
    pub fn last_report(&self) -> Option<&SceneBuildReport> {
        self.last_report.as_ref()
    }

    /// The configuration the agent was created with.
    pub fn config(&self) -> &SvoBuilderConfig {
        &self.config
    }

    /// Releases every GPU object owned by the agent.
    pub fn destroy(mut self) {
        self.destroy_field_images();
        self.gpu.destroy(self.device.as_ref());
    }

    fn destroy_field_images(&mut self) {
        for (_, image) in self.field_images.drain() {
            let _ = self.device.destroy_texture(image);
        }
    }
}

impl Agent for SvoBuilderAgent {
    type Error = SvoError;

    fn name(&self) -> &'static str {
        "SvoBuilder"
    }

    /// Applies a pending pipeline rebuild, then rebuilds the scene if requested.
    fn update(&mut self) -> Result<(), SvoError> {
        if self.pipeline_rebuild_requested {
            self.rebuild_pipelines()?;
        }
        if self.rebuild_requested {
            self.build_scene()?;
        }
        Ok(())
    }

    fn report_status(&self) -> AgentStatus {
        let message = match &self.last_report {
            Some(report) => format!(
                "{} chunks built, {} empty, {:.2}% of octree memory used",
                report.built_count(),
                report.empty_count(),
                self.allocator.stats().utilization() * 100.0
            ),
            None => "no scene built yet".to_string(),
        };
        AgentStatus {
            agent: self.name(),
            ready: self.last_report.is_some(),
            message,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
