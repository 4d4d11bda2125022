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

//! CPU/GPU synchronization handles.

/// An opaque handle to a fence: a CPU-waitable primitive signaled when the
/// GPU work of a submission completes.
///
/// A fence is signaled by passing it to
/// [`crate::renderer::GraphicsDevice::submit_command_buffer`], waited on with
/// [`crate::renderer::GraphicsDevice::wait_for_fence`], and must be reset
/// before it can be signaled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);
