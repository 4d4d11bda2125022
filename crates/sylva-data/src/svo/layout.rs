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

//! `#[repr(C)]` structures shared with the compute shaders.
//!
//! Each structure mirrors a WGSL struct of the same name. The `*_WORD`
//! constants give the `u32` index of each field inside the bound buffer, which
//! is how the host reference kernels address them.

use crate::config::FieldSource;
use bytemuck::{Pod, Zeroable};

/// One voxel fragment produced by voxelization.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FragmentListEntry {
    /// Cell coordinates packed as `x | y << 10 | z << 20`.
    pub coordinates: u32,
    /// The 8-bit solid-corner mask of the cell.
    pub properties: u32,
}

impl FragmentListEntry {
    /// Number of `u32` words per entry.
    pub const WORDS: u64 = 2;

    /// Packs cell coordinates. Each component must be below 1024.
    pub const fn pack_coordinates(x: u32, y: u32, z: u32) -> u32 {
        x | (y << 10) | (z << 20)
    }

    /// Unpacks coordinates produced by [`Self::pack_coordinates`].
    pub const fn unpack_coordinates(packed: u32) -> [u32; 3] {
        [packed & 0x3FF, (packed >> 10) & 0x3FF, (packed >> 20) & 0x3FF]
    }

    /// The unpacked cell coordinates.
    pub const fn cell(&self) -> [u32; 3] {
        Self::unpack_coordinates(self.coordinates)
    }
}

/// Header of the fragment list.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FragmentListInfo {
    /// Voxels per chunk edge.
    pub voxel_resolution: u32,
    /// Number of fragments appended so far.
    pub voxel_fragment_count: u32,
}

impl FragmentListInfo {
    /// Word index of `voxel_resolution`.
    pub const RESOLUTION_WORD: u64 = 0;
    /// Word index of `voxel_fragment_count`.
    pub const FRAGMENT_COUNT_WORD: u64 = 1;
}

/// State of the level-synchronous octree build.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OctreeBuildInfo {
    /// First slot of the current allocation window.
    pub alloc_begin: u32,
    /// Number of slots in the current allocation window.
    pub alloc_num: u32,
    /// The level being built.
    pub level: u32,
    /// Total number of levels, `log2(chunk_voxel_dim)`.
    pub level_count: u32,
}

impl OctreeBuildInfo {
    /// Word index of `alloc_begin`.
    pub const ALLOC_BEGIN_WORD: u64 = 0;
    /// Word index of `alloc_num`.
    pub const ALLOC_NUM_WORD: u64 = 1;
    /// Word index of `level`.
    pub const LEVEL_WORD: u64 = 2;
    /// Word index of `level_count`.
    pub const LEVEL_COUNT_WORD: u64 = 3;
}

/// Grid extent and the chunk currently being built.
///
/// Both members are WGSL `vec3<u32>`, which are 16-byte aligned.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ChunksInfo {
    /// Chunks along each axis.
    pub chunks_dim: [u32; 3],
    /// Padding to the next `vec3`.
    pub _padding0: u32,
    /// Coordinates of the chunk being built.
    pub current_chunk: [u32; 3],
    /// Trailing padding.
    pub _padding1: u32,
}

impl ChunksInfo {
    /// Word index of `chunks_dim.x`.
    pub const CHUNKS_DIM_WORD: u64 = 0;
    /// Word index of `current_chunk.x`.
    pub const CURRENT_CHUNK_WORD: u64 = 4;

    /// Creates the info block for `current_chunk` in a grid of `chunks_dim`.
    pub const fn new(chunks_dim: [u32; 3], current_chunk: [u32; 3]) -> Self {
        Self {
            chunks_dim,
            _padding0: 0,
            current_chunk,
            _padding1: 0,
        }
    }
}

/// Parameters of the scalar field sampled by field construction.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FieldParams {
    /// One of the `SOURCE_*` constants.
    pub source: u32,
    /// Height of the `Plane` source.
    pub plane_height: f32,
    /// Mean height of the `Terrain` source.
    pub base_height: f32,
    /// Amplitude of the `Terrain` source.
    pub amplitude: f32,
    /// Frequency of the `Terrain` source.
    pub frequency: f32,
    /// Radius of the `Sphere` source.
    pub radius: f32,
    /// Padding to 32 bytes.
    pub _padding: [u32; 2],
}

impl FieldParams {
    /// Nothing is solid.
    pub const SOURCE_EMPTY: u32 = 0;
    /// Solid below a horizontal plane.
    pub const SOURCE_PLANE: u32 = 1;
    /// Solid below a sine/cosine height field.
    pub const SOURCE_TERRAIN: u32 = 2;
    /// Solid at the eight corner lattice points of every chunk.
    pub const SOURCE_CORNERS: u32 = 3;
    /// Solid inside a sphere centred on the chunk grid.
    pub const SOURCE_SPHERE: u32 = 4;

    /// Word index of `source`.
    pub const SOURCE_WORD: u64 = 0;
    /// Word index of `plane_height`.
    pub const PLANE_HEIGHT_WORD: u64 = 1;
    /// Word index of `base_height`.
    pub const BASE_HEIGHT_WORD: u64 = 2;
    /// Word index of `amplitude`.
    pub const AMPLITUDE_WORD: u64 = 3;
    /// Word index of `frequency`.
    pub const FREQUENCY_WORD: u64 = 4;
    /// Word index of `radius`.
    pub const RADIUS_WORD: u64 = 5;
}

impl From<&FieldSource> for FieldParams {
    fn from(source: &FieldSource) -> Self {
        let mut params = FieldParams::default();
        match *source {
            FieldSource::Empty => params.source = Self::SOURCE_EMPTY,
            FieldSource::Plane { height } => {
                params.source = Self::SOURCE_PLANE;
                params.plane_height = height;
            }
            FieldSource::Terrain {
                base_height,
                amplitude,
                frequency,
            } => {
                params.source = Self::SOURCE_TERRAIN;
                params.base_height = base_height;
                params.amplitude = amplitude;
                params.frequency = frequency;
            }
            FieldSource::Corners => params.source = Self::SOURCE_CORNERS,
            FieldSource::Sphere { radius } => {
                params.source = Self::SOURCE_SPHERE;
                params.radius = radius;
            }
        }
        params
    }
}
