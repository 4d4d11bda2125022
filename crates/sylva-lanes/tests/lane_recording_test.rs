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

//! Checks the exact command sequence each lane records, against a device that
//! only records what it is asked to do.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sylva_core::lane::LaneError;
use sylva_core::math::Extent3D;
use sylva_core::renderer::*;
use sylva_data::allocators::ChunkAllocation;
use sylva_data::config::{FieldSource, SvoBuilderConfig};
use sylva_data::svo::ChunkCoord;
use sylva_lanes::{
    ChunkCopyOut, ChunkOutputLane, EmbeddedShaderSource, FragmentListLane, OctreeLane,
    StagePipelines, SvoError, SvoLane, SvoLaneContext, SvoResourceSet,
};

#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    Dispatch(String),
    DispatchIndirect(String, BufferId),
    Barrier(MemoryBarrier),
    CopyBuffer {
        source: BufferId,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    },
    CopyTexture {
        source: TextureId,
        destination: TextureId,
    },
}

#[derive(Debug, Default)]
struct Shared {
    log: Mutex<Vec<Recorded>>,
    pipeline_labels: Mutex<HashMap<u64, String>>,
    writes: Mutex<Vec<(BufferId, Vec<u8>)>>,
    live_pipelines: AtomicUsize,
    live_modules: AtomicUsize,
    next_id: AtomicUsize,
}

impl Shared {
    fn id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn push(&self, command: Recorded) {
        self.log.lock().unwrap().push(command);
    }
}

#[derive(Debug, Default)]
struct RecordingDevice {
    shared: Arc<Shared>,
}

impl RecordingDevice {
    fn take_log(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.shared.log.lock().unwrap())
    }
}

struct RecordingPass {
    shared: Arc<Shared>,
    pipeline: String,
}

impl<'pass> ComputePass<'pass> for RecordingPass {
    fn set_pipeline(&mut self, pipeline: &'pass ComputePipelineId) {
        self.pipeline = self.shared.pipeline_labels.lock().unwrap()[&pipeline.0].clone();
    }

    fn set_bind_group(&mut self, _index: u32, _bind_group: &'pass BindGroupId, _offsets: &[u32]) {}

    fn dispatch_workgroups(&mut self, _x: u32, _y: u32, _z: u32) {
        self.shared.push(Recorded::Dispatch(self.pipeline.clone()));
    }

    fn dispatch_workgroups_indirect(&mut self, args: &'pass IndirectArgs) {
        self.shared
            .push(Recorded::DispatchIndirect(self.pipeline.clone(), args.buffer));
    }
}

struct RecordingEncoder {
    shared: Arc<Shared>,
}

impl CommandEncoder for RecordingEncoder {
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        _descriptor: &ComputePassDescriptor<'encoder>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        Box::new(RecordingPass {
            shared: self.shared.clone(),
            pipeline: String::new(),
        })
    }

    fn memory_barrier(&mut self, barrier: MemoryBarrier) {
        self.shared.push(Recorded::Barrier(barrier));
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: &BufferId,
        _source_offset: u64,
        destination: &BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        self.shared.push(Recorded::CopyBuffer {
            source: *source,
            destination: *destination,
            destination_offset,
            size,
        });
    }

    fn copy_texture_to_texture(&mut self, source: &TextureId, destination: &TextureId, _size: Extent3D) {
        self.shared.push(Recorded::CopyTexture {
            source: *source,
            destination: *destination,
        });
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        CommandBufferId(0)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_shader_module(
        &self,
        _descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        self.shared.live_modules.fetch_add(1, Ordering::Relaxed);
        Ok(ShaderModuleId(self.shared.id()))
    }

    fn destroy_shader_module(&self, _id: ShaderModuleId) -> Result<(), ResourceError> {
        self.shared.live_modules.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    fn create_bind_group_layout(
        &self,
        _descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        Ok(BindGroupLayoutId(self.shared.id()))
    }

    fn create_bind_group(&self, _descriptor: &BindGroupDescriptor) -> Result<BindGroupId, ResourceError> {
        Ok(BindGroupId(self.shared.id()))
    }

    fn destroy_bind_group(&self, _id: BindGroupId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_pipeline_layout(
        &self,
        _descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        Ok(PipelineLayoutId(self.shared.id()))
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let id = self.shared.id() as u64;
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        self.shared.pipeline_labels.lock().unwrap().insert(id, label);
        self.shared.live_pipelines.fetch_add(1, Ordering::Relaxed);
        Ok(ComputePipelineId(id))
    }

    fn destroy_compute_pipeline(&self, _id: ComputePipelineId) -> Result<(), ResourceError> {
        self.shared.live_pipelines.fetch_sub(1, Ordering::Relaxed);
        Ok(())
    }

    fn create_buffer(&self, _descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        Ok(BufferId(self.shared.id()))
    }

    fn destroy_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, _offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        self.shared.writes.lock().unwrap().push((id, data.to_vec()));
        Ok(())
    }

    fn read_buffer(&self, _id: BufferId, _offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        Ok(vec![0; size as usize])
    }

    fn create_texture(&self, _descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        Ok(TextureId(self.shared.id()))
    }

    fn destroy_texture(&self, _id: TextureId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_texture_view(
        &self,
        _texture_id: TextureId,
        _descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        Ok(TextureViewId(self.shared.id()))
    }

    fn destroy_texture_view(&self, _id: TextureViewId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_command_encoder(&self, _label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(RecordingEncoder {
            shared: self.shared.clone(),
        })
    }

    fn submit_command_buffer(
        &self,
        _command_buffer: CommandBufferId,
        _signal: Option<FenceId>,
    ) -> Result<(), ResourceError> {
        Ok(())
    }

    fn create_fence(&self) -> Result<FenceId, ResourceError> {
        Ok(FenceId(self.shared.id() as u64))
    }

    fn wait_for_fence(&self, _fence: FenceId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn reset_fence(&self, _fence: FenceId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn destroy_fence(&self, _fence: FenceId) -> Result<(), ResourceError> {
        Ok(())
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo {
            name: "recording".to_string(),
            backend_type: GraphicsBackendType::Software,
            device_type: RendererDeviceType::Cpu,
        }
    }

    fn get_limits(&self) -> DeviceLimits {
        DeviceLimits {
            max_buffer_size: u64::MAX,
            max_storage_buffer_binding_size: u64::MAX,
            max_compute_workgroups_per_dimension: u32::MAX,
            max_texture_dimension_3d: 4096,
        }
    }
}

struct Setup {
    device: RecordingDevice,
    resources: SvoResourceSet,
    pipelines: StagePipelines,
}

fn setup(dim: u32) -> Setup {
    let device = RecordingDevice::default();
    let config = SvoBuilderConfig {
        chunk_voxel_dim: dim,
        chunk_dim: (2, 1, 1),
        octree_buffer_capacity: 1 << 20,
        field: FieldSource::Corners,
        shader_dir: None,
    };
    let resources = SvoResourceSet::create(&device, &config).unwrap();
    let pipelines = StagePipelines::build(&device, &resources, &EmbeddedShaderSource).unwrap();
    device.take_log();
    Setup {
        device,
        resources,
        pipelines,
    }
}

fn record(setup: &Setup, lane: &dyn SvoLane, copy_out: Option<ChunkCopyOut>) -> Result<Vec<Recorded>, LaneError> {
    let ctx = SvoLaneContext {
        resources: &setup.resources,
        pipelines: &setup.pipelines,
        coord: ChunkCoord::new(1, 0, 0),
        copy_out,
    };
    lane.prepare(&setup.device, &ctx)?;
    let mut encoder = setup.device.create_command_encoder(None);
    lane.record(&ctx, encoder.as_mut())?;
    encoder.finish();
    Ok(setup.device.take_log())
}

fn dispatch(shader: &str) -> Recorded {
    Recorded::Dispatch(shader.to_string())
}

#[test]
fn fragment_list_lane_separates_its_stages_with_a_full_barrier() {
    let s = setup(8);
    assert_eq!(
        record(&s, &FragmentListLane::new(), None).unwrap(),
        vec![
            dispatch("chunk_field_construction"),
            Recorded::Barrier(MemoryBarrier::Full),
            dispatch("chunk_voxel_creation"),
        ]
    );
}

#[test]
fn octree_lane_records_every_level_with_its_barriers() {
    for dim in [2, 8, 64] {
        let s = setup(dim);
        let frag = s.resources.indirect_frag_args().buffer;
        let alloc = s.resources.indirect_alloc_args().buffer;
        let indirect = |shader: &str, buffer| Recorded::DispatchIndirect(shader.to_string(), buffer);
        let shader_rw = Recorded::Barrier(MemoryBarrier::ShaderReadWrite);
        let indirect_read = Recorded::Barrier(MemoryBarrier::IndirectCommandRead);

        let levels = dim.trailing_zeros();
        let mut expected = vec![dispatch("chunk_modify_arg"), shader_rw.clone(), indirect_read.clone()];
        for level in 0..levels {
            expected.push(indirect("octree_init_node", alloc));
            expected.push(shader_rw.clone());
            expected.push(indirect("octree_tag_node", frag));
            if level + 1 != levels {
                expected.push(shader_rw.clone());
                expected.push(indirect("octree_alloc_node", alloc));
                expected.push(shader_rw.clone());
                expected.push(dispatch("octree_modify_arg"));
                expected.push(shader_rw.clone());
                expected.push(indirect_read.clone());
            }
        }

        assert_eq!(record(&s, &OctreeLane::new(), None).unwrap(), expected, "dim {dim}");
    }
}

#[test]
fn chunk_output_lane_copies_then_writes_the_lookup() {
    let s = setup(8);
    let field_image = s.device.create_texture(&TextureDescriptor {
        label: None,
        size: Extent3D::cube(9),
        dimension: TextureDimension::D3,
        format: TextureFormat::R32Uint,
        usage: TextureUsage::COPY_DST,
    })
    .unwrap();
    let copy_out = ChunkCopyOut {
        octree_len: 136,
        allocation: ChunkAllocation {
            offset: 4096,
            size: 544,
        },
        field_image,
    };
    s.device.shared.writes.lock().unwrap().clear();

    let recorded = record(&s, &ChunkOutputLane::new(), Some(copy_out)).unwrap();
    assert_eq!(
        recorded,
        vec![
            Recorded::CopyBuffer {
                source: s.resources.chunk_octree_buffer(),
                destination: s.resources.appended_octree_buffer(),
                destination_offset: 4096,
                size: 544,
            },
            Recorded::CopyTexture {
                source: s.resources.field_image(),
                destination: field_image,
            },
            dispatch("chunks_builder"),
        ]
    );

    // The word offset is uploaded before the lane's commands run.
    let writes = s.device.shared.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].1, 1024u32.to_ne_bytes().to_vec());
}

#[test]
fn chunk_output_lane_needs_a_copy_target() {
    let s = setup(8);
    assert!(matches!(
        record(&s, &ChunkOutputLane::new(), None),
        Err(LaneError::MissingResource(_))
    ));
}

#[derive(Debug)]
struct BrokenShaders;

impl ShaderSource for BrokenShaders {
    fn load(&self, name: &str) -> Result<Cow<'static, str>, ShaderError> {
        if name == "octree_tag_node" {
            Err(ShaderError::UnknownShader {
                name: name.to_string(),
            })
        } else {
            EmbeddedShaderSource.load(name)
        }
    }

    fn origin(&self) -> String {
        "broken".to_string()
    }
}

#[test]
fn failed_pipeline_build_releases_what_it_created() {
    let s = setup(8);
    let modules = s.device.shared.live_modules.load(Ordering::Relaxed);
    let pipelines = s.device.shared.live_pipelines.load(Ordering::Relaxed);

    let err = StagePipelines::build(&s.device, &s.resources, &BrokenShaders).unwrap_err();
    assert!(matches!(err, SvoError::Shader(_)), "{err}");
    assert_eq!(s.device.shared.live_modules.load(Ordering::Relaxed), modules);
    assert_eq!(s.device.shared.live_pipelines.load(Ordering::Relaxed), pipelines);
}

#[test]
fn failed_rebuild_keeps_the_current_pipelines() {
    let mut s = setup(8);
    let before = s.pipelines.pipeline(sylva_lanes::SvoStage::OctreeTagNode).clone();
    assert!(s.pipelines.rebuild(&s.device, &s.resources, &BrokenShaders).is_err());
    assert_eq!(s.pipelines.pipeline(sylva_lanes::SvoStage::OctreeTagNode), &before);

    s.pipelines
        .rebuild(&s.device, &s.resources, &EmbeddedShaderSource)
        .unwrap();
    assert_ne!(s.pipelines.pipeline(sylva_lanes::SvoStage::OctreeTagNode), &before);
    // One module and one pipeline per stage, the old set released.
    assert_eq!(s.device.shared.live_pipelines.load(Ordering::Relaxed), 8);
    assert_eq!(s.device.shared.live_modules.load(Ordering::Relaxed), 8);
}
