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

//! RON configuration of the builder and the runtime.

use crate::allocators::MAX_ADDRESSABLE_CAPACITY;
use crate::svo::node::level_count;
use crate::svo::ChunkGrid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default size of the shared octree buffer: 2 GiB.
pub const DEFAULT_OCTREE_BUFFER_CAPACITY: u64 = 2 * 1024 * 1024 * 1024;

/// Largest supported chunk resolution. Packed fragment coordinates hold 10 bits per axis.
pub const MAX_CHUNK_VOXEL_DIM: u32 = 512;

/// The scalar field voxelized by the builder, in world voxel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FieldSource {
    /// Nothing is solid.
    Empty,
    /// Solid where `y <= height`.
    Plane {
        /// Height of the plane.
        height: f32,
    },
    /// Solid where `y < base_height + amplitude * sin(x * frequency) * cos(z * frequency)`.
    Terrain {
        /// Mean height.
        base_height: f32,
        /// Height variation.
        amplitude: f32,
        /// Spatial frequency of the variation.
        frequency: f32,
    },
    /// Solid only at the eight corner lattice points of every chunk.
    Corners,
    /// Solid inside a sphere centred on the chunk grid.
    Sphere {
        /// Radius of the sphere.
        radius: f32,
    },
}

impl Default for FieldSource {
    fn default() -> Self {
        FieldSource::Terrain {
            base_height: 64.0,
            amplitude: 24.0,
            frequency: 0.05,
        }
    }
}

/// The device backend the runtime runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// A real GPU through `wgpu`.
    #[default]
    Wgpu,
    /// The CPU reference backend.
    Software,
}

/// Parameters of the sparse voxel octree builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvoBuilderConfig {
    /// Voxels along each edge of a chunk. A power of two.
    pub chunk_voxel_dim: u32,
    /// Number of chunks along X, Y and Z.
    pub chunk_dim: (u32, u32, u32),
    /// Size in bytes of the shared buffer the finished octrees are appended to.
    pub octree_buffer_capacity: u64,
    /// The field to voxelize.
    pub field: FieldSource,
    /// Directory to load `<name>.wgsl` shaders from instead of the embedded ones.
    pub shader_dir: Option<PathBuf>,
}

impl Default for SvoBuilderConfig {
    fn default() -> Self {
        Self {
            chunk_voxel_dim: 64,
            chunk_dim: (4, 2, 4),
            octree_buffer_capacity: DEFAULT_OCTREE_BUFFER_CAPACITY,
            field: FieldSource::default(),
            shader_dir: None,
        }
    }
}

impl SvoBuilderConfig {
    /// Checks the parameters the builder depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dim = self.chunk_voxel_dim;
        if !dim.is_power_of_two() || !(2..=MAX_CHUNK_VOXEL_DIM).contains(&dim) {
            return Err(ConfigError::InvalidChunkVoxelDim(dim));
        }
        let (x, y, z) = self.chunk_dim;
        if x == 0 || y == 0 || z == 0 {
            return Err(ConfigError::InvalidChunkDim(self.chunk_dim));
        }
        let capacity = self.octree_buffer_capacity;
        // Offsets are stored as u32 word indices, and u32::MAX marks an empty chunk.
        if capacity == 0 || capacity % 4 != 0 || capacity > MAX_ADDRESSABLE_CAPACITY {
            return Err(ConfigError::InvalidCapacity(capacity));
        }
        Ok(())
    }

    /// The number of octree levels of a chunk.
    pub fn level_count(&self) -> u32 {
        level_count(self.chunk_voxel_dim)
    }

    /// The chunk grid.
    pub fn chunk_grid(&self) -> ChunkGrid {
        let (x, y, z) = self.chunk_dim;
        ChunkGrid::new([x, y, z])
    }
}

/// Top-level configuration of the runtime.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Builder parameters.
    pub svo_builder: SvoBuilderConfig,
    /// Device backend.
    pub backend: BackendKind,
    /// Rebuild pipelines and the scene when shader files change.
    pub watch_shaders: bool,
}

impl AppConfig {
    /// Parses and validates a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(text)?;
        config.svo_builder.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let reader = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = ron::de::from_reader(reader)?;
        config.svo_builder.validate()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Errors raised while loading or validating a configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be opened.
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The I/O error.
        source: std::io::Error,
    },
    /// The text is not a valid configuration.
    Parse(ron::error::SpannedError),
    /// `chunk_voxel_dim` is not a power of two in `2..=512`.
    InvalidChunkVoxelDim(u32),
    /// An axis of `chunk_dim` is zero.
    InvalidChunkDim((u32, u32, u32)),
    /// The octree buffer capacity is zero, not a multiple of 4, or too large to index.
    InvalidCapacity(u64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to open config '{}': {source}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "Failed to parse config: {err}"),
            ConfigError::InvalidChunkVoxelDim(dim) => write!(
                f,
                "chunk_voxel_dim must be a power of two between 2 and {MAX_CHUNK_VOXEL_DIM}, got {dim}"
            ),
            ConfigError::InvalidChunkDim(dims) => {
                write!(f, "chunk_dim must be at least 1 on every axis, got {dims:?}")
            }
            ConfigError::InvalidCapacity(capacity) => write!(
                f,
                "octree_buffer_capacity must be a non-zero multiple of 4 addressable with u32 words, got {capacity}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(err: ron::error::SpannedError) -> Self {
        ConfigError::Parse(err)
    }
}
