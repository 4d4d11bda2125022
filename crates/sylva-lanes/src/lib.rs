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

//! # Sylva Lanes
//!
//! The hot path of the sparse voxel octree builder: the GPU resource set, the
//! stage table and its generic executor, the three lanes recording a chunk
//! build (fragment list, octree, chunk output), the embedded WGSL shaders and
//! their host reference kernels.

#![warn(missing_docs)]

pub mod error;
pub mod shaders;
pub mod svo_lane;

pub use error::SvoError;
pub use shaders::EmbeddedShaderSource;
pub use svo_lane::*;
