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

//! Command recording types: passes, pipelines, bind groups, indirect
//! arguments and memory barriers.

pub mod barrier;
pub mod bind_group;
pub mod compute;
pub mod indirect;

pub use self::barrier::*;
pub use self::bind_group::*;
pub use self::compute::*;
pub use self::indirect::*;

/// An opaque handle to a finished, not yet submitted, command buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandBufferId(pub u64);

/// Describes a compute pass.
#[derive(Debug, Clone, Default)]
pub struct ComputePassDescriptor<'a> {
    /// An optional debug label, shown in GPU captures.
    pub label: Option<&'a str>,
}
