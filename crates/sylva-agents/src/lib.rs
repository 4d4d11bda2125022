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

//! # Sylva Agents
//!
//! Agents own GPU resources and lanes and decide when work is recorded and
//! submitted. The [`SvoBuilderAgent`] drives the chunk-by-chunk construction
//! of the scene's sparse voxel octrees.

#![warn(missing_docs)]

pub mod svo_builder_agent;

pub use svo_builder_agent::*;
