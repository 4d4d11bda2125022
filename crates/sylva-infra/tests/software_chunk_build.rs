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

//! Runs the builder's lanes on the software device with the reference kernels.

use sylva_core::renderer::{GraphicsDevice, MemoryBarrier, ResourceError};
use sylva_data::config::{FieldSource, SvoBuilderConfig};
use sylva_data::svo::{ChunkCoord, ChunkOctreeView};
use sylva_infra::{ExecutedCommand, SoftwareDevice};
use sylva_lanes::kernels::reference_kernels;
use sylva_lanes::{
    record_stage, EmbeddedShaderSource, FragmentListLane, OctreeLane, StagePipelines, SvoLane,
    SvoLaneContext, SvoResourceSet, SvoStage,
};

struct Harness {
    device: SoftwareDevice,
    resources: SvoResourceSet,
    pipelines: StagePipelines,
}

impl Harness {
    fn new(field: FieldSource) -> Self {
        let device = SoftwareDevice::new();
        device.register_kernels(reference_kernels());
        let config = SvoBuilderConfig {
            chunk_voxel_dim: 8,
            chunk_dim: (1, 1, 1),
            octree_buffer_capacity: 1 << 16,
            field,
            shader_dir: None,
        };
        let resources = SvoResourceSet::create(&device, &config).unwrap();
        let pipelines = StagePipelines::build(&device, &resources, &EmbeddedShaderSource).unwrap();
        Self {
            device,
            resources,
            pipelines,
        }
    }

    fn context(&self) -> SvoLaneContext<'_> {
        SvoLaneContext {
            resources: &self.resources,
            pipelines: &self.pipelines,
            coord: ChunkCoord::new(0, 0, 0),
            copy_out: None,
        }
    }

    fn submit(&self, lane: &dyn SvoLane) -> Result<(), ResourceError> {
        let mut encoder = self.device.create_command_encoder(Some(lane.strategy_name()));
        lane.record(&self.context(), encoder.as_mut()).unwrap();
        self.device.submit_command_buffer(encoder.finish(), None)
    }
}

#[test]
fn eight_corner_chunk_builds_a_three_level_octree() {
    let h = Harness::new(FieldSource::Corners);
    h.resources
        .reset_for_chunk(&h.device, ChunkCoord::new(0, 0, 0))
        .unwrap();

    h.submit(&FragmentListLane::new()).unwrap();
    assert_eq!(h.resources.read_fragment_count(&h.device).unwrap(), 8);

    h.device.clear_command_log();
    h.submit(&OctreeLane::new()).unwrap();
    let len = h.resources.read_octree_len(&h.device).unwrap();
    assert_eq!(len, 8 + 64 + 64);

    let dispatched: Vec<String> = h
        .device
        .command_log()
        .into_iter()
        .filter_map(|command| match command {
            ExecutedCommand::Dispatch { shader, .. } => Some(shader),
            _ => None,
        })
        .collect();
    let tags = dispatched.iter().filter(|s| *s == "octree_tag_node").count();
    assert_eq!(tags, 3);
    assert_eq!(dispatched.first().map(String::as_str), Some("chunk_modify_arg"));

    let words = h.resources.read_chunk_octree(&h.device, len).unwrap();
    let leaves = ChunkOctreeView::new(&words, 8).leaves().unwrap();
    let corners: Vec<[u32; 3]> = leaves.iter().map(|leaf| leaf.coordinates).collect();
    assert_eq!(
        corners,
        vec![
            [0, 0, 0],
            [0, 0, 7],
            [0, 7, 0],
            [0, 7, 7],
            [7, 0, 0],
            [7, 0, 7],
            [7, 7, 0],
            [7, 7, 7],
        ]
    );
    // The corner voxel at the origin only has its own origin corner solid.
    assert_eq!(leaves[0].corner_mask, 0x01);
    assert_eq!(leaves[7].corner_mask, 0x80);
}

#[test]
fn empty_field_produces_no_fragments() {
    let h = Harness::new(FieldSource::Empty);
    h.resources
        .reset_for_chunk(&h.device, ChunkCoord::new(0, 0, 0))
        .unwrap();
    h.submit(&FragmentListLane::new()).unwrap();
    assert_eq!(h.resources.read_fragment_count(&h.device).unwrap(), 0);
}

#[test]
fn missing_barrier_is_reported_as_a_hazard() {
    let h = Harness::new(FieldSource::Corners);
    h.resources
        .reset_for_chunk(&h.device, ChunkCoord::new(0, 0, 0))
        .unwrap();

    let mut encoder = h.device.create_command_encoder(None);
    record_stage(
        encoder.as_mut(),
        SvoStage::ChunkFieldConstruction,
        &h.pipelines,
        &h.resources,
    );
    record_stage(
        encoder.as_mut(),
        SvoStage::ChunkVoxelCreation,
        &h.pipelines,
        &h.resources,
    );
    let err = h
        .device
        .submit_command_buffer(encoder.finish(), None)
        .unwrap_err();
    match err {
        ResourceError::SynchronizationHazard(message) => {
            assert!(message.contains("chunk_field_construction"), "{message}");
            assert!(message.contains("chunk_voxel_creation"), "{message}");
        }
        other => panic!("expected a hazard, got {other}"),
    }
}

#[test]
fn indirect_args_need_an_indirect_barrier() {
    let h = Harness::new(FieldSource::Corners);
    h.resources
        .reset_for_chunk(&h.device, ChunkCoord::new(0, 0, 0))
        .unwrap();
    h.submit(&FragmentListLane::new()).unwrap();

    let mut encoder = h.device.create_command_encoder(None);
    record_stage(encoder.as_mut(), SvoStage::ChunkModifyArg, &h.pipelines, &h.resources);
    encoder.memory_barrier(MemoryBarrier::ShaderReadWrite);
    record_stage(encoder.as_mut(), SvoStage::OctreeInitNode, &h.pipelines, &h.resources);
    let err = h
        .device
        .submit_command_buffer(encoder.finish(), None)
        .unwrap_err();
    assert!(
        matches!(&err, ResourceError::SynchronizationHazard(m) if m.contains("indirect")),
        "{err}"
    );
}

#[test]
fn pipelines_can_be_rebuilt_from_a_shader_directory() {
    let mut h = Harness::new(FieldSource::Corners);
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in sylva_lanes::shaders::EMBEDDED_SHADERS {
        std::fs::write(dir.path().join(format!("{name}.wgsl")), source).unwrap();
    }
    let shaders = sylva_infra::DirectoryShaderSource::new(dir.path());
    h.pipelines
        .rebuild(&h.device, &h.resources, &shaders)
        .unwrap();

    std::fs::write(dir.path().join("octree_tag_node.wgsl"), "not wgsl").unwrap();
    assert!(h.pipelines.rebuild(&h.device, &h.resources, &shaders).is_err());

    // A failed rebuild keeps the previous pipelines usable.
    h.resources
        .reset_for_chunk(&h.device, ChunkCoord::new(0, 0, 0))
        .unwrap();
    h.submit(&FragmentListLane::new()).unwrap();
    h.submit(&OctreeLane::new()).unwrap();
    assert_eq!(h.resources.read_octree_len(&h.device).unwrap(), 136);
}
