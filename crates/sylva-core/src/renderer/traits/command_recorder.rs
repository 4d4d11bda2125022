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

use crate::math::Extent3D;
use crate::renderer::api::command::{
    BindGroupId, CommandBufferId, ComputePassDescriptor, ComputePipelineId, IndirectArgs,
    MemoryBarrier,
};
use crate::renderer::api::{BufferId, TextureId};
use std::any::Any;

/// Dispatch recording inside one compute pass.
///
/// `'pass` ties the pass, and every id handed to it, to the borrow of the
/// [`CommandEncoder`] that opened it.
pub trait ComputePass<'pass> {
    /// Pipeline used by the following dispatches.
    fn set_pipeline(&mut self, pipeline: &'pass ComputePipelineId);

    /// Binds `bind_group` at `@group(index)`.
    fn set_bind_group(&mut self, index: u32, bind_group: &'pass BindGroupId, offsets: &[u32]);

    /// Runs `x * y * z` workgroups.
    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32);

    /// Runs the workgroup counts stored in `args` at execution time, as
    /// written by an earlier kernel.
    fn dispatch_workgroups_indirect(&mut self, args: &'pass IndirectArgs);
}

/// Records one command buffer of the chunk build.
///
/// Passes hold dispatches. Barriers and copies are recorded between passes.
pub trait CommandEncoder {
    /// Opens a pass. It ends when the returned box is dropped, and the
    /// encoder stays borrowed until then.
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'encoder>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder>;

    /// Orders every earlier write before the accesses `barrier` names in
    /// later passes.
    fn memory_barrier(&mut self, barrier: MemoryBarrier);

    /// Copies `size` bytes between two buffers.
    fn copy_buffer_to_buffer(
        &mut self,
        source: &BufferId,
        source_offset: u64,
        destination: &BufferId,
        destination_offset: u64,
        size: u64,
    );

    /// Copies the `size` block at the origin of `source` into `destination`.
    fn copy_texture_to_texture(
        &mut self,
        source: &TextureId,
        destination: &TextureId,
        size: Extent3D,
    );

    /// Closes the recording. Submit the id on the device that created the encoder.
    fn finish(self: Box<Self>) -> CommandBufferId;

    /// Downcast access for backend-specific encoders.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
