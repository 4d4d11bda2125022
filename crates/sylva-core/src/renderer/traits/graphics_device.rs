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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::CommandEncoder;
use std::fmt::Debug;

/// A compute-only device the octree build runs on.
///
/// Objects are owned by the device and named by the ids it returns. Agents
/// hold the device as an `Arc<dyn GraphicsDevice>` and pass `&dyn
/// GraphicsDevice` down to lanes.
pub trait GraphicsDevice: Send + Sync + Debug + 'static {
    /// Compiles a module. The label is the kernel name.
    /// ## Errors
    /// * `ResourceError::Shader` - The source does not compile, or the backend has no kernel by that name.
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError>;

    /// Releases a module. Pipelines built from it stay valid.
    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError>;

    /// Declares the slots of a bind group.
    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError>;

    /// Fills the slots of a layout with buffers and texture views.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - A buffer range runs past the end of its buffer.
    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError>;

    /// Releases a bind group.
    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError>;

    /// Orders bind group layouts into `@group(0..n)`.
    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError>;

    /// Builds a compute pipeline for one entry point.
    /// ## Errors
    /// * `ResourceError::Pipeline` - The module is unknown or the backend rejects the pipeline.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError>;

    /// Releases a compute pipeline.
    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError>;

    /// Allocates a zero-initialized buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Releases a buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Uploads `data` at byte `offset`.
    ///
    /// Commands submitted after the call observe the new contents.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Copies `size` bytes starting at `offset` back to the host and blocks
    /// until they arrive.
    ///
    /// Requires `COPY_SRC` or `MAP_READ` usage.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - The range runs past the end of the buffer.
    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError>;

    /// Allocates a zero-initialized texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Releases a texture and every view of it.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a view of `texture_id` for binding.
    fn create_texture_view(
        &self,
        texture_id: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError>;

    /// Releases a view.
    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError>;

    /// Starts recording a command buffer.
    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder>;

    /// Queues a finished command buffer, optionally signaling `signal` when
    /// the work is done.
    /// ## Errors
    /// * `ResourceError::SynchronizationHazard` - Reported by backends that validate barriers.
    /// * `ResourceError::Kernel` - A host kernel faulted while executing.
    fn submit_command_buffer(
        &self,
        command_buffer: CommandBufferId,
        signal: Option<FenceId>,
    ) -> Result<(), ResourceError>;

    /// Creates a fence in the unsignaled state.
    fn create_fence(&self) -> Result<FenceId, ResourceError>;

    /// Blocks without timeout until `fence` is signaled.
    /// ## Errors
    /// * `ResourceError::FenceNeverSignaled` - Nothing pending would ever signal it.
    fn wait_for_fence(&self, fence: FenceId) -> Result<(), ResourceError>;

    /// Puts `fence` back into the unsignaled state.
    fn reset_fence(&self, fence: FenceId) -> Result<(), ResourceError>;

    /// Releases a fence.
    fn destroy_fence(&self, fence: FenceId) -> Result<(), ResourceError>;

    /// Which adapter backs the device.
    fn get_adapter_info(&self) -> RendererAdapterInfo;

    /// Size limits relevant to chunk buffers and dispatches.
    fn get_limits(&self) -> DeviceLimits;
}
