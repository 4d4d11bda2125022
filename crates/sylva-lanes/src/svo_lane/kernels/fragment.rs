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

use super::{load, slot, store, BUILD_GROUP};
use sylva_core::renderer::{ComputeKernel, KernelBindings, KernelFault};
use sylva_data::svo::{ChunksInfo, FieldParams, FragmentListEntry, FragmentListInfo};

fn chunk_voxel_dim(bindings: &dyn KernelBindings) -> Result<u32, KernelFault> {
    load(
        bindings,
        slot::FRAGMENT_LIST_INFO,
        FragmentListInfo::RESOLUTION_WORD,
    )
}

fn load_vec3(bindings: &dyn KernelBindings, binding: u32, first_word: u64) -> Result<[u32; 3], KernelFault> {
    Ok([
        load(bindings, binding, first_word)?,
        load(bindings, binding, first_word + 1)?,
        load(bindings, binding, first_word + 2)?,
    ])
}

fn load_f32(bindings: &dyn KernelBindings, word: u64) -> Result<f32, KernelFault> {
    load(bindings, slot::FIELD_PARAMS, word).map(f32::from_bits)
}

/// Evaluates the field at lattice point `local` of the current chunk.
fn is_solid(bindings: &dyn KernelBindings, local: [u32; 3], dim: u32) -> Result<bool, KernelFault> {
    let chunk = load_vec3(bindings, slot::CHUNKS_INFO, ChunksInfo::CURRENT_CHUNK_WORD)?;
    let world = [0, 1, 2].map(|axis| (chunk[axis] * dim + local[axis]) as f32);

    let source = load(bindings, slot::FIELD_PARAMS, FieldParams::SOURCE_WORD)?;
    let solid = match source {
        FieldParams::SOURCE_PLANE => {
            world[1] <= load_f32(bindings, FieldParams::PLANE_HEIGHT_WORD)?
        }
        FieldParams::SOURCE_TERRAIN => {
            let base = load_f32(bindings, FieldParams::BASE_HEIGHT_WORD)?;
            let amplitude = load_f32(bindings, FieldParams::AMPLITUDE_WORD)?;
            let frequency = load_f32(bindings, FieldParams::FREQUENCY_WORD)?;
            let height = base + amplitude * (world[0] * frequency).sin() * (world[2] * frequency).cos();
            world[1] < height
        }
        FieldParams::SOURCE_CORNERS => local.iter().all(|&c| c == 0 || c == dim),
        FieldParams::SOURCE_SPHERE => {
            let radius = load_f32(bindings, FieldParams::RADIUS_WORD)?;
            let chunks_dim = load_vec3(bindings, slot::CHUNKS_INFO, ChunksInfo::CHUNKS_DIM_WORD)?;
            let distance_sq: f32 = (0..3)
                .map(|axis| {
                    let centre = (chunks_dim[axis] * dim) as f32 * 0.5;
                    let d = world[axis] - centre;
                    d * d
                })
                .sum();
            distance_sq.sqrt() < radius
        }
        _ => false,
    };
    Ok(solid)
}

/// `chunk_field_construction`: one invocation per lattice point, `(dim + 1)³`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkFieldConstructionKernel;

impl ComputeKernel for ChunkFieldConstructionKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [8, 8, 8]
    }

    fn invoke(&self, global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let dim = chunk_voxel_dim(bindings)?;
        if global_id.iter().any(|&c| c > dim) {
            return Ok(());
        }
        let solid = is_solid(bindings, global_id, dim)?;
        bindings.texture_store_u32(BUILD_GROUP, slot::CHUNK_FIELD_IMAGE, global_id, solid as u32)
    }
}

/// `chunk_voxel_creation`: one invocation per cell, `dim³`.
///
/// Appends a fragment for every cell whose eight corners are neither all
/// solid nor all empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkVoxelCreationKernel;

impl ComputeKernel for ChunkVoxelCreationKernel {
    fn workgroup_size(&self) -> [u32; 3] {
        [8, 8, 8]
    }

    fn invoke(&self, global_id: [u32; 3], bindings: &mut dyn KernelBindings) -> Result<(), KernelFault> {
        let dim = chunk_voxel_dim(bindings)?;
        if global_id.iter().any(|&c| c >= dim) {
            return Ok(());
        }

        let mut mask = 0u32;
        for corner in 0..8u32 {
            let coord = [
                global_id[0] + (corner & 1),
                global_id[1] + ((corner >> 1) & 1),
                global_id[2] + ((corner >> 2) & 1),
            ];
            if bindings.texture_load_u32(BUILD_GROUP, slot::CHUNK_FIELD_IMAGE, coord)? != 0 {
                mask |= 1 << corner;
            }
        }
        if mask == 0 || mask == 0xFF {
            return Ok(());
        }

        let index = bindings.atomic_add_u32(
            BUILD_GROUP,
            slot::FRAGMENT_LIST_INFO,
            FragmentListInfo::FRAGMENT_COUNT_WORD,
            1,
        )? as u64;
        let [x, y, z] = global_id;
        store(
            bindings,
            slot::FRAGMENT_LIST,
            index * FragmentListEntry::WORDS,
            FragmentListEntry::pack_coordinates(x, y, z),
        )?;
        store(bindings, slot::FRAGMENT_LIST, index * FragmentListEntry::WORDS + 1, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::TestBindings;
    use super::*;
    use sylva_data::config::FieldSource;

    fn bindings_for(dim: u32, chunk: [u32; 3], source: FieldSource) -> TestBindings {
        let params = FieldParams::from(&source);
        let info = ChunksInfo::new([1, 1, 1], chunk);
        TestBindings::default()
            .with_image(dim + 1)
            .with_buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO, vec![dim, 0])
            .with_buffer(BUILD_GROUP, slot::CHUNKS_INFO, bytemuck::cast_slice(&[info]).to_vec())
            .with_buffer(BUILD_GROUP, slot::FIELD_PARAMS, bytemuck::cast_slice(&[params]).to_vec())
            .with_buffer(BUILD_GROUP, slot::FRAGMENT_LIST, vec![0; (dim * dim * dim * 2) as usize])
    }

    fn voxelize(b: &mut TestBindings, dim: u32) {
        b.run(&ChunkFieldConstructionKernel, [dim + 1; 3]);
        b.run(&ChunkVoxelCreationKernel, [dim; 3]);
    }

    #[test]
    fn corners_produce_eight_fragments() {
        let dim = 8;
        let mut b = bindings_for(dim, [0, 0, 0], FieldSource::Corners);
        voxelize(&mut b, dim);

        assert_eq!(b.image.iter().filter(|&&v| v == 1).count(), 8);
        let count = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO)[1];
        assert_eq!(count, 8);

        let list = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST);
        let mut cells: Vec<_> = (0..count as usize)
            .map(|i| (FragmentListEntry::unpack_coordinates(list[i * 2]), list[i * 2 + 1]))
            .collect();
        cells.sort();
        assert_eq!(cells[0], ([0, 0, 0], 0x01));
        assert_eq!(cells[7], ([7, 7, 7], 0x80));
    }

    #[test]
    fn plane_surface_covers_one_layer_of_cells() {
        let dim = 4;
        let mut b = bindings_for(dim, [0, 0, 0], FieldSource::Plane { height: 1.5 });
        voxelize(&mut b, dim);

        // Lattice rows y = 0 and y = 1 are solid: cells at y = 1 straddle the surface.
        let count = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO)[1];
        assert_eq!(count, dim * dim);
        let list = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST);
        for i in 0..count as usize {
            assert_eq!(FragmentListEntry::unpack_coordinates(list[i * 2])[1], 1);
            assert_eq!(list[i * 2 + 1], 0x33);
        }
    }

    #[test]
    fn flat_terrain_matches_a_plane_at_its_base_height() {
        let dim = 4;
        let flat = FieldSource::Terrain {
            base_height: 1.5,
            amplitude: 0.0,
            frequency: 0.3,
        };
        let mut b = bindings_for(dim, [0, 0, 0], flat);
        voxelize(&mut b, dim);

        let count = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO)[1];
        assert_eq!(count, dim * dim);
        let list = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST);
        for i in 0..count as usize {
            assert_eq!(FragmentListEntry::unpack_coordinates(list[i * 2])[1], 1);
            assert_eq!(list[i * 2 + 1], 0x33);
        }
    }

    #[test]
    fn rolling_terrain_emits_every_surface_cell() {
        let dim = 8;
        let (base, amplitude, frequency) = (4.0f32, 2.0f32, 0.5f32);
        let source = FieldSource::Terrain {
            base_height: base,
            amplitude,
            frequency,
        };
        let mut b = bindings_for(dim, [0, 0, 0], source);
        voxelize(&mut b, dim);

        let solid = |x: u32, y: u32, z: u32| {
            let height = base
                + amplitude * (x as f32 * frequency).sin() * (z as f32 * frequency).cos();
            (y as f32) < height
        };
        let mut expected = Vec::new();
        for z in 0..dim {
            for y in 0..dim {
                for x in 0..dim {
                    let mut mask = 0u32;
                    for corner in 0..8u32 {
                        if solid(x + (corner & 1), y + ((corner >> 1) & 1), z + ((corner >> 2) & 1)) {
                            mask |= 1 << corner;
                        }
                    }
                    if mask != 0 && mask != 0xFF {
                        expected.push(([x, y, z], mask));
                    }
                }
            }
        }
        expected.sort();

        let count = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO)[1] as usize;
        let list = b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST);
        let mut cells: Vec<_> = (0..count)
            .map(|i| (FragmentListEntry::unpack_coordinates(list[i * 2]), list[i * 2 + 1]))
            .collect();
        cells.sort();
        assert_eq!(cells, expected);

        // The surface undulates over more than one layer of cells.
        let mut layers: Vec<u32> = cells.iter().map(|(c, _)| c[1]).collect();
        layers.sort_unstable();
        layers.dedup();
        assert!(layers.len() > 1, "{layers:?}");
    }

    #[test]
    fn chunk_offset_moves_the_field() {
        let dim = 4;
        // The plane at height 1.5 lies entirely below chunk y = 1.
        let mut b = bindings_for(dim, [0, 1, 0], FieldSource::Plane { height: 1.5 });
        voxelize(&mut b, dim);
        assert_eq!(b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO)[1], 0);
    }

    #[test]
    fn empty_field_produces_nothing() {
        let dim = 4;
        let mut b = bindings_for(dim, [0, 0, 0], FieldSource::Empty);
        voxelize(&mut b, dim);
        assert!(b.image.iter().all(|&v| v == 0));
        assert_eq!(b.buffer(BUILD_GROUP, slot::FRAGMENT_LIST_INFO)[1], 0);
    }
}
