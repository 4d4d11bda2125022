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

//! # Sylva Data
//!
//! Host-side data of the sparse-voxel-octree builder: the allocator handing
//! out ranges of the shared octree buffer, the `#[repr(C)]` layouts shared
//! with the compute shaders, the octree slot encoding and its CPU decoder,
//! the chunk grid and the RON configuration.

#![warn(missing_docs)]

pub mod allocators;
pub mod config;
pub mod svo;
