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

//! Scene builds driven by the agent on the software device.

use std::sync::Arc;
use sylva_agents::{ChunkBuildOutcome, SvoBuilderAgent};
use sylva_core::agent::Agent;
use sylva_core::renderer::{GraphicsDevice, ShaderSource};
use sylva_data::allocators::{AllocatorError, ChunkAllocation};
use sylva_data::config::{FieldSource, SvoBuilderConfig};
use sylva_data::svo::{ChunkCoord, ChunkOctreeView, OctreeSlot, EMPTY_CHUNK, ROOT_BLOCK_LEN};
use sylva_infra::{DirectoryShaderSource, ExecutedCommand, SoftwareDevice};
use sylva_lanes::kernels::reference_kernels;
use sylva_lanes::shaders::EMBEDDED_SHADERS;
use sylva_lanes::{EmbeddedShaderSource, SvoError};

fn config(dim: u32, chunk_dim: (u32, u32, u32), field: FieldSource) -> SvoBuilderConfig {
    SvoBuilderConfig {
        chunk_voxel_dim: dim,
        chunk_dim,
        octree_buffer_capacity: 1 << 20,
        field,
        shader_dir: None,
    }
}

fn software_device() -> Arc<SoftwareDevice> {
    let device = Arc::new(SoftwareDevice::new());
    device.register_kernels(reference_kernels());
    device
}

fn agent_with(
    device: &Arc<SoftwareDevice>,
    config: SvoBuilderConfig,
    shaders: Box<dyn ShaderSource>,
) -> SvoBuilderAgent {
    let device: Arc<dyn GraphicsDevice> = device.clone();
    SvoBuilderAgent::new(device, config, shaders).unwrap()
}

fn agent(device: &Arc<SoftwareDevice>, config: SvoBuilderConfig) -> SvoBuilderAgent {
    agent_with(device, config, Box::new(EmbeddedShaderSource))
}

fn dispatch_count(device: &SoftwareDevice, shader: &str) -> usize {
    device
        .command_log()
        .iter()
        .filter(|command| matches!(command, ExecutedCommand::Dispatch { shader: s, .. } if s == shader))
        .count()
}

#[test]
fn corner_voxels_build_one_three_level_chunk() {
    let device = software_device();
    let mut agent = agent(&device, config(8, (1, 1, 1), FieldSource::Corners));
    assert_eq!(agent.voxel_level_count(), 3);

    let report = agent.build_scene().unwrap().clone();
    let origin = ChunkCoord::new(0, 0, 0);
    assert_eq!(
        report.outcome(origin),
        Some(&ChunkBuildOutcome::Built {
            fragment_count: 8,
            octree_len: 136,
            allocation: ChunkAllocation {
                offset: 0,
                size: 136 * 4,
            },
        })
    );
    assert_eq!(report.allocator.allocation_count, 1);
    assert_eq!(report.timings.samples, 1);

    assert_eq!(agent.read_chunks_lookup().unwrap(), vec![0]);
    assert!(agent.chunk_field_image(origin).is_some());

    let words = agent.read_chunk_octree(origin).unwrap().unwrap();
    let leaves = ChunkOctreeView::new(&words, 8).leaves().unwrap();
    assert_eq!(leaves.len(), 8);
    assert!(leaves
        .iter()
        .all(|leaf| leaf.coordinates.iter().all(|&c| c == 0 || c == 7)));
}

#[test]
fn root_block_is_reserved_before_any_level_runs() {
    let device = software_device();
    let mut agent = agent(&device, config(8, (1, 1, 1), FieldSource::Corners));
    agent.build_scene().unwrap();

    let words = agent
        .read_chunk_octree(ChunkCoord::new(0, 0, 0))
        .unwrap()
        .unwrap();
    let mut children: Vec<u32> = words[..ROOT_BLOCK_LEN as usize]
        .iter()
        .map(|&word| match OctreeSlot::decode(word) {
            OctreeSlot::Internal { child_index } => child_index,
            other => panic!("root slot should point at a child block, got {other:?}"),
        })
        .collect();
    children.sort_unstable();
    children.dedup();
    assert_eq!(children.len(), 8);
    assert!(children
        .iter()
        .all(|&c| c >= ROOT_BLOCK_LEN && c % ROOT_BLOCK_LEN == 0));
}

#[test]
fn empty_field_skips_octree_construction_and_allocation() {
    let device = software_device();
    let mut agent = agent(&device, config(4, (2, 1, 1), FieldSource::Empty));
    device.clear_command_log();

    let report = agent.build_scene().unwrap().clone();
    assert_eq!(report.empty_count(), 2);
    assert_eq!(report.timings.samples, 0);
    assert_eq!(agent.allocator_stats().allocation_count, 0);
    assert_eq!(agent.allocator_stats().bytes_used, 0);
    assert_eq!(agent.read_chunks_lookup().unwrap(), vec![EMPTY_CHUNK; 2]);

    assert_eq!(dispatch_count(&device, "chunk_voxel_creation"), 2);
    assert_eq!(dispatch_count(&device, "chunk_modify_arg"), 0);
    assert_eq!(dispatch_count(&device, "octree_tag_node"), 0);
    assert_eq!(dispatch_count(&device, "chunks_builder"), 0);
    assert!(agent.chunk_field_image(ChunkCoord::new(0, 0, 0)).is_none());
    assert_eq!(
        agent.read_chunk_octree(ChunkCoord::new(1, 0, 0)).unwrap(),
        None
    );
}

#[test]
fn every_chunk_gets_a_lookup_entry_and_ranges_never_overlap() {
    let device = software_device();
    // The plane cuts through the bottom row of chunks only.
    let mut agent = agent(&device, config(4, (2, 2, 2), FieldSource::Plane { height: 2.5 }));
    let report = agent.build_scene().unwrap().clone();

    let lookup = agent.read_chunks_lookup().unwrap();
    assert_eq!(lookup.len(), 8);
    assert_eq!(report.chunks.len(), 8);
    assert_eq!(report.built_count(), 4);

    let mut allocations = Vec::new();
    for (index, (coord, outcome)) in report.chunks.iter().enumerate() {
        match outcome {
            ChunkBuildOutcome::Empty => {
                assert_eq!(coord.y, 1);
                assert_eq!(lookup[index], EMPTY_CHUNK);
            }
            ChunkBuildOutcome::Built {
                fragment_count,
                allocation,
                ..
            } => {
                assert_eq!(coord.y, 0);
                assert_eq!(*fragment_count, 16);
                assert_eq!(allocation.offset % 4, 0);
                assert_eq!(lookup[index], allocation.offset_in_u32());
                allocations.push(*allocation);
            }
        }
    }
    for (i, a) in allocations.iter().enumerate() {
        for b in &allocations[i + 1..] {
            assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn terrain_chunks_decode_to_their_fragments() {
    let device = software_device();
    let terrain = FieldSource::Terrain {
        base_height: 16.0,
        amplitude: 6.0,
        frequency: 0.2,
    };
    let mut agent = agent(&device, config(16, (2, 2, 2), terrain));
    let report = agent.build_scene().unwrap().clone();

    // Heights span 10..22, so the surface crosses both rows of chunks.
    assert_eq!(report.built_count(), 8);
    let lookup = agent.read_chunks_lookup().unwrap();
    for (index, (coord, outcome)) in report.chunks.iter().enumerate() {
        let ChunkBuildOutcome::Built {
            fragment_count,
            allocation,
            ..
        } = outcome
        else {
            panic!("chunk {coord} should not be empty");
        };
        assert_eq!(lookup[index], allocation.offset_in_u32());

        let words = agent.read_chunk_octree(*coord).unwrap().unwrap();
        let leaves = ChunkOctreeView::new(&words, 16).leaves().unwrap();
        assert_eq!(leaves.len(), *fragment_count as usize, "chunk {coord}");
        assert!(leaves
            .iter()
            .all(|leaf| leaf.coordinates.iter().all(|&c| c < 16)));
    }
}

#[test]
fn chunks_are_built_x_fastest() {
    let device = software_device();
    let mut agent = agent(&device, config(2, (2, 2, 2), FieldSource::Empty));
    let report = agent.build_scene().unwrap();
    let order: Vec<[u32; 3]> = report.chunks.iter().map(|(c, _)| c.to_array()).collect();
    assert_eq!(
        order,
        vec![
            [0, 0, 0],
            [1, 0, 0],
            [0, 1, 0],
            [1, 1, 0],
            [0, 0, 1],
            [1, 0, 1],
            [0, 1, 1],
            [1, 1, 1],
        ]
    );
}

#[test]
fn level_loop_runs_log2_dim_times_whatever_the_field() {
    for (dim, field) in [
        (4, FieldSource::Corners),
        (16, FieldSource::Corners),
        (16, FieldSource::Plane { height: 3.0 }),
    ] {
        let device = software_device();
        let mut agent = agent(&device, config(dim, (1, 1, 1), field));
        device.clear_command_log();
        agent.build_scene().unwrap();

        let levels = dim.trailing_zeros() as usize;
        assert_eq!(dispatch_count(&device, "octree_init_node"), levels, "dim {dim}");
        assert_eq!(dispatch_count(&device, "octree_tag_node"), levels, "dim {dim}");
        assert_eq!(dispatch_count(&device, "octree_alloc_node"), levels - 1, "dim {dim}");
        assert_eq!(dispatch_count(&device, "octree_modify_arg"), levels - 1, "dim {dim}");
    }
}

#[test]
fn rebuilding_appends_identical_octrees() {
    let device = software_device();
    let mut agent = agent(
        &device,
        config(8, (2, 1, 1), FieldSource::Sphere { radius: 6.0 }),
    );

    let first = agent.build_scene().unwrap().clone();
    let first_words: Vec<_> = first
        .chunks
        .iter()
        .map(|(coord, _)| agent.read_chunk_octree(*coord).unwrap())
        .collect();

    let second = agent.build_scene().unwrap().clone();
    let second_words: Vec<_> = second
        .chunks
        .iter()
        .map(|(coord, _)| agent.read_chunk_octree(*coord).unwrap())
        .collect();

    assert_eq!(first_words, second_words);
    assert!(first_words.iter().all(Option::is_some));
    // Nothing is reclaimed: the second build lands after the first.
    let first_end = first.chunks.iter().filter_map(|(_, o)| o.allocation()).map(|a| a.end()).max();
    let second_start = second.chunks.iter().filter_map(|(_, o)| o.allocation()).map(|a| a.offset).min();
    assert_eq!(first_end, second_start);
    assert_eq!(
        agent.allocator_stats().bytes_used,
        2 * first.allocator.bytes_used
    );
}

#[test]
fn exhausted_octree_memory_stops_the_build() {
    let device = software_device();
    let mut small = config(8, (1, 1, 1), FieldSource::Corners);
    small.octree_buffer_capacity = 256;
    let mut agent = agent(&device, small);

    let err = agent.build_scene().unwrap_err();
    assert!(
        matches!(
            err,
            SvoError::Allocator(AllocatorError::Exhausted { requested: 544, .. })
        ),
        "{err}"
    );
    assert!(agent.last_report().is_none());
}

#[test]
fn failed_rebuild_drops_the_previous_report() {
    let device = software_device();
    let mut once = config(8, (1, 1, 1), FieldSource::Corners);
    once.octree_buffer_capacity = 544;
    let mut agent = agent(&device, once);

    agent.build_scene().unwrap();
    assert!(agent.report_status().ready);

    let err = agent.build_scene().unwrap_err();
    assert!(
        matches!(
            err,
            SvoError::Allocator(AllocatorError::Exhausted { requested: 544, .. })
        ),
        "{err}"
    );
    assert!(agent.last_report().is_none());
    let status = agent.report_status();
    assert!(!status.ready);
    assert_eq!(status.message, "no scene built yet");
    assert_eq!(agent.read_chunk_octree(ChunkCoord::new(0, 0, 0)).unwrap(), None);
}

#[test]
fn chunks_outside_the_grid_are_rejected() {
    let device = software_device();
    let mut agent = agent(&device, config(2, (1, 1, 1), FieldSource::Empty));
    let outside = ChunkCoord::new(1, 0, 0);
    assert!(matches!(
        agent.build_chunk(outside),
        Err(SvoError::ChunkOutOfGrid(c)) if c == outside
    ));
    assert!(matches!(
        agent.read_chunk_octree(outside),
        Err(SvoError::ChunkOutOfGrid(_))
    ));
}

#[test]
fn update_builds_once_until_asked_again() {
    let device = software_device();
    let mut agent = agent(&device, config(8, (1, 1, 1), FieldSource::Corners));
    assert!(!agent.report_status().ready);

    agent.update().unwrap();
    let status = agent.report_status();
    assert!(status.ready);
    assert_eq!(status.agent, "SvoBuilder");
    assert_eq!(agent.allocator_stats().allocation_count, 1);

    agent.update().unwrap();
    assert_eq!(agent.allocator_stats().allocation_count, 1);

    agent.request_scene_rebuild();
    agent.update().unwrap();
    assert_eq!(agent.allocator_stats().allocation_count, 2);
}

#[test]
fn hot_reload_recompiles_pipelines_and_keeps_them_on_error() {
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in EMBEDDED_SHADERS {
        std::fs::write(dir.path().join(format!("{name}.wgsl")), source).unwrap();
    }
    let device = software_device();
    let mut agent = agent_with(
        &device,
        config(8, (1, 1, 1), FieldSource::Corners),
        Box::new(DirectoryShaderSource::new(dir.path())),
    );
    agent.update().unwrap();

    std::fs::write(dir.path().join("octree_alloc_node.wgsl"), "// broken").unwrap();
    agent.request_pipeline_rebuild();
    assert!(agent.update().is_err());

    // The old pipelines are still in place and the scene rebuild is still pending.
    agent.update().unwrap();
    assert_eq!(agent.allocator_stats().allocation_count, 2);

    std::fs::write(
        dir.path().join("octree_alloc_node.wgsl"),
        EMBEDDED_SHADERS
            .iter()
            .find(|(name, _)| *name == "octree_alloc_node")
            .map(|(_, source)| *source)
            .unwrap(),
    )
    .unwrap();
    agent.request_pipeline_rebuild();
    agent.update().unwrap();
    let report = agent.last_report().unwrap();
    assert_eq!(report.built_count(), 1);
}

#[test]
fn init_starts_over() {
    let device = software_device();
    let mut agent = agent(&device, config(8, (1, 1, 1), FieldSource::Corners));
    agent.build_scene().unwrap();
    assert_eq!(agent.allocator_stats().allocation_count, 1);

    agent.init().unwrap();
    assert!(agent.last_report().is_none());
    assert_eq!(agent.allocator_stats().allocation_count, 0);

    agent.update().unwrap();
    assert_eq!(agent.allocator_stats().allocation_count, 1);
    agent.destroy();
    assert_eq!(device.live_resource_count(), 0);
}
