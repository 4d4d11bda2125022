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

//! Sparse voxel octree data shared between the host and the compute stages.

pub mod grid;
pub mod layout;
pub mod node;

pub use grid::{ChunkCoord, ChunkGrid};
pub use layout::{ChunksInfo, FieldParams, FragmentListEntry, FragmentListInfo, OctreeBuildInfo};
pub use node::{
    level_count, worst_case_octree_len, ChunkOctreeView, OctreeDecodeError, OctreeLeaf, OctreeSlot,
    EMPTY_CHUNK, ROOT_BLOCK_LEN,
};
