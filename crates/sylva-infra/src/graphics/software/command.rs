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
use std::collections::BTreeMap;

use sylva_core::math::Extent3D;
use sylva_core::renderer::api::command::{
    BindGroupId, CommandBufferId, ComputePassDescriptor, ComputePipelineId, IndirectArgs,
    MemoryBarrier,
};
use sylva_core::renderer::api::{BufferId, TextureId};
use sylva_core::renderer::traits::{CommandEncoder, ComputePass};

use super::device::SoftwareDevice;

/// How many workgroups a dispatch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchSize {
    Direct([u32; 3]),
    Indirect(IndirectArgs),
}

/// A recorded command, executed when its command buffer is submitted.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    Dispatch {
        pass: Option<String>,
        pipeline: Option<ComputePipelineId>,
        /// The bind groups set when the dispatch was recorded, by group index.
        bind_groups: BTreeMap<u32, BindGroupId>,
        size: DispatchSize,
    },
    Barrier(MemoryBarrier),
    CopyBufferToBuffer {
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    },
    CopyTextureToTexture {
        source: TextureId,
        destination: TextureId,
        size: Extent3D,
    },
}

pub struct SoftwareComputePass<'a> {
    label: Option<String>,
    commands: &'a mut Vec<Command>,
    pipeline: Option<ComputePipelineId>,
    bind_groups: BTreeMap<u32, BindGroupId>,
}

impl SoftwareComputePass<'_> {
    fn dispatch(&mut self, size: DispatchSize) {
        self.commands.push(Command::Dispatch {
            pass: self.label.clone(),
            pipeline: self.pipeline,
            bind_groups: self.bind_groups.clone(),
            size,
        });
    }
}

impl<'pass> ComputePass<'pass> for SoftwareComputePass<'pass> {
    fn set_pipeline(&mut self, pipeline: &'pass ComputePipelineId) {
        self.pipeline = Some(*pipeline);
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &'pass BindGroupId, offsets: &[u32]) {
        if !offsets.is_empty() {
            log::warn!("SoftwareComputePass: dynamic offsets are not supported and were ignored.");
        }
        self.bind_groups.insert(index, *bind_group);
    }

    fn dispatch_workgroups(&mut self, x: u32, y: u32, z: u32) {
        self.dispatch(DispatchSize::Direct([x, y, z]));
    }

    fn dispatch_workgroups_indirect(&mut self, args: &'pass IndirectArgs) {
        self.dispatch(DispatchSize::Indirect(*args));
    }
}

/// Records commands for later execution by a [`SoftwareDevice`].
pub struct SoftwareCommandEncoder {
    pub(crate) label: Option<String>,
    pub(crate) commands: Vec<Command>,
    pub(crate) device: SoftwareDevice,
}

impl CommandEncoder for SoftwareCommandEncoder {
    fn begin_compute_pass<'encoder>(
        &'encoder mut self,
        descriptor: &ComputePassDescriptor<'encoder>,
    ) -> Box<dyn ComputePass<'encoder> + 'encoder> {
        Box::new(SoftwareComputePass {
            label: descriptor.label.map(str::to_string),
            commands: &mut self.commands,
            pipeline: None,
            bind_groups: BTreeMap::new(),
        })
    }

    fn memory_barrier(&mut self, barrier: MemoryBarrier) {
        self.commands.push(Command::Barrier(barrier));
    }

    fn copy_buffer_to_buffer(
        &mut self,
        source: &BufferId,
        source_offset: u64,
        destination: &BufferId,
        destination_offset: u64,
        size: u64,
    ) {
        self.commands.push(Command::CopyBufferToBuffer {
            source: *source,
            source_offset,
            destination: *destination,
            destination_offset,
            size,
        });
    }

    fn copy_texture_to_texture(
        &mut self,
        source: &TextureId,
        destination: &TextureId,
        size: Extent3D,
    ) {
        self.commands.push(Command::CopyTextureToTexture {
            source: *source,
            destination: *destination,
            size,
        });
    }

    fn finish(self: Box<Self>) -> CommandBufferId {
        let SoftwareCommandEncoder {
            label,
            commands,
            device,
        } = *self;
        log::trace!(
            "SoftwareCommandEncoder '{}': finished with {} commands",
            label.as_deref().unwrap_or_default(),
            commands.len()
        );
        device.register_command_buffer(commands)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
