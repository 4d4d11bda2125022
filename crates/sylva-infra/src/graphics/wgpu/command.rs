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

use std::any::Any;

use sylva_core::math::Extent3D;
use sylva_core::renderer::api::command::{
    BindGroupId, CommandBufferId, ComputePassDescriptor, ComputePipelineId, IndirectArgs,
    MemoryBarrier,
};
use sylva_core::renderer::api::{BufferId, TextureId};
use sylva_core::renderer::traits::{CommandEncoder, ComputePass};

use super::conversions::IntoWgpu;
use super::device::WgpuDevice;

/// A `wgpu::ComputePass` resolving sylva ids through the owning device.
///
/// Unknown ids are logged and the command is skipped. wgpu validation then
/// reports the incomplete dispatch at submit time.
pub struct WgpuComputePass<'a> {
    pub(crate) pass: wgpu::ComputePass<'a>,
    pub(crate) device: &'a WgpuDevice,
}

impl<'pass> ComputePass<'pass> for WgpuComputePass<'pass> {
    fn set_pipeline(&mut self, pipeline: &'pass ComputePipelineId) {
        match self.device.get_wgpu_compute_pipeline(*pipeline) {
            Some(resolved) => self.pass.set_pipeline(&resolved),
            None => log::warn!("set_pipeline: no pipeline {}", pipeline.0),
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &'pass BindGroupId, offsets: &[u32]) {
        match self.device.get_wgpu_bind_group(*bind_group) {
            Some(resolved) => self.pass.set_bind_group(index, resolved.as_ref(), offsets),
            None => log::warn!("set_bind_group({index}): no bind group {}", bind_group.0),
        }
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.pass.dispatch_workgroups(x, y, z);
    }

    fn dispatch_workgroups_indirect(&mut self, args: &'pass IndirectArgs) {
        match self.device.get_wgpu_buffer(args.buffer) {
            Some(buffer) => self.pass.dispatch_workgroups_indirect(&buffer, args.offset),
            None => log::warn!("indirect dispatch: no argument buffer {}", args.buffer.0),
        }
    }
}

/// Records into a `wgpu::CommandEncoder`.
pub struct WgpuCommandEncoder {
    pub(crate) encoder: wgpu::CommandEncoder,
    pub(crate) device: WgpuDevice,
}

fn whole_mip0(texture: &wgpu::Texture) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    }
}

impl CommandEncoder for WgpuCommandEncoder {
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'encoder>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        let pass = self.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: descriptor.label,
            timestamp_writes: None,
        });
        Box::new(WgpuComputePass {
            pass,
            device: &self.device,
        })
    }

    fn memory_barrier(&mut self, barrier: MemoryBarrier) {
        // wgpu inserts the barrier itself at the next pass boundary.
        log::trace!("{barrier} barrier left to wgpu usage tracking");
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: &BufferId,
        source_offset: u64,
        destination: &BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        let Some(src) = self.device.get_wgpu_buffer(*source) else {
            log::warn!("buffer copy skipped: no source buffer {}", source.0);
            return;
        };
        let Some(dst) = self.device.get_wgpu_buffer(*destination) else {
            log::warn!("buffer copy skipped: no destination buffer {}", destination.0);
            return;
        };
        self.encoder
            .copy_buffer_to_buffer(&src, source_offset, &dst, destination_offset, size);
    }

    fn copy_texture_to_texture(
        &mut self,
        source: &TextureId,
        destination: &TextureId,
        size: Extent3D,
    ) {
        let Some(src) = self.device.get_wgpu_texture(*source) else {
            log::warn!("texture copy skipped: no source texture {}", source.0);
            return;
        };
        let Some(dst) = self.device.get_wgpu_texture(*destination) else {
            log::warn!("texture copy skipped: no destination texture {}", destination.0);
            return;
        };
        self.encoder
            .copy_texture_to_texture(whole_mip0(&src), whole_mip0(&dst), size.into_wgpu());
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let Self { encoder, device } = *self;
        device.register_command_buffer(encoder.finish())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
