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

//! Error type of the octree builder.

use sylva_core::lane::LaneError;
use sylva_core::renderer::{ResourceError, ShaderError};
use sylva_data::allocators::AllocatorError;
use sylva_data::config::ConfigError;
use sylva_data::svo::{ChunkCoord, OctreeDecodeError};
use thiserror::Error;

/// Everything that can stop a scene build.
///
/// None of these are recovered from locally: a build run ends on the first
/// error and the caller decides what to do with it.
#[derive(Debug, Error)]
pub enum SvoError {
    /// Creating, writing, reading or submitting GPU work failed.
    #[error("GPU resource error: {0}")]
    Resource(#[from] ResourceError),

    /// The shared octree buffer has no room for a chunk.
    #[error("Chunk memory allocation failed: {0}")]
    Allocator(#[from] AllocatorError),

    /// A lane could not record its commands.
    #[error(transparent)]
    Lane(#[from] LaneError),

    /// A shader source could not be loaded.
    #[error("Shader error: {0}")]
    Shader(#[from] ShaderError),

    /// The builder configuration is invalid.
    #[error("Invalid builder configuration: {0}")]
    Config(#[from] ConfigError),

    /// A buffer would exceed a device limit.
    #[error("Buffer '{label}' needs {requested} bytes but the device allows at most {max}")]
    BufferTooLarge {
        /// The buffer's label.
        label: &'static str,
        /// The size the buffer needs.
        requested: u64,
        /// The device limit.
        max: u64,
    },

    /// A chunk could need more workgroups in one dispatch than the device supports.
    #[error("A chunk may need {workgroups} workgroups per dispatch but the device allows at most {max}")]
    DispatchTooLarge {
        /// The worst-case number of workgroups.
        workgroups: u64,
        /// The device limit.
        max: u32,
    },

    /// The GPU reported an octree longer than the per-chunk octree buffer.
    #[error("Chunk {coord} reported an octree of {len} slots, more than the {capacity} available")]
    OctreeOverflow {
        /// The chunk being built.
        coord: ChunkCoord,
        /// The reported length.
        len: u32,
        /// The per-chunk octree buffer length.
        capacity: u64,
    },

    /// A finished chunk octree failed structural validation.
    #[error("Octree of chunk {coord} is malformed: {source}")]
    Decode {
        /// The chunk whose octree was decoded.
        coord: ChunkCoord,
        /// The defect found.
        source: OctreeDecodeError,
    },

    /// The coordinate lies outside the chunk grid.
    #[error("Chunk {0} is outside the chunk grid")]
    ChunkOutOfGrid(ChunkCoord),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_lower_level_errors() {
        let err: SvoError = AllocatorError::Exhausted {
            requested: 64,
            remaining: 16,
        }
        .into();
        assert!(matches!(err, SvoError::Allocator(_)));
        assert_eq!(
            err.to_string(),
            "Chunk memory allocation failed: Chunk memory exhausted: requested 64 bytes, largest free range is 16 bytes"
        );

        let err: SvoError = ResourceError::OutOfBounds.into();
        assert_eq!(
            err.to_string(),
            "GPU resource error: access out of bounds"
        );
    }

    #[test]
    fn lane_errors_are_transparent() {
        let err: SvoError = LaneError::MissingResource("copy-out target").into();
        assert_eq!(
            err.to_string(),
            "Lane resource 'copy-out target' is not available"
        );
    }
}
