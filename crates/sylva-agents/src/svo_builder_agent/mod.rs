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

//! Acts as the **[A]gent** for sparse voxel octree construction.
//!
//! The agent walks the chunk grid one chunk at a time. Every chunk goes through
//! the fragment-list, octree and chunk-output lanes, each submitted on its own
//! and waited on with the agent's fence before the next one is recorded. Only
//! the final octree length decides how much of the shared buffer a chunk takes,
//! so nothing is pipelined across chunks.

mod agent;
mod stats;

pub use agent::*;
pub use stats::*;
