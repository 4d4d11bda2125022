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

//! Resource bindings of the build kernels.
//!
//! Every kernel binds storage buffers and, for the field image, one 3D
//! storage texture. Uniform buffers and dynamic offsets are never needed.

use std::num::NonZeroU64;

use crate::renderer::api::{
    buffer::BufferId,
    texture::{TextureFormat, TextureViewDimension, TextureViewId},
};
use crate::sylva_bitflags;

sylva_bitflags! {
    /// Stages that can see a binding.
    pub struct ShaderStageFlags: u32 {
        /// Compute kernels.
        const COMPUTE = 1 << 2;
    }
}

/// Handle to a bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupLayoutId(pub usize);

/// Handle to a bind group, i.e. concrete resources filling a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindGroupId(pub usize);

/// Access a kernel has to a storage texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTextureAccess {
    /// `textureLoad` only.
    ReadOnly,
    /// `textureStore` only.
    WriteOnly,
    /// `textureLoad` and `textureStore`.
    ReadWrite,
}

/// What kind of resource a layout slot accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingType {
    /// A storage buffer.
    Buffer {
        /// `var<storage, read>` when set.
        read_only: bool,
    },
    /// A storage texture.
    StorageTexture {
        /// Allowed access.
        access: StorageTextureAccess,
        /// Texel format the view must have.
        format: TextureFormat,
        /// Dimension the view must have.
        view_dimension: TextureViewDimension,
    },
}

/// One `@binding(n)` slot of a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    /// The `n` of `@binding(n)`.
    pub binding: u32,
    /// Stages that see the slot.
    pub visibility: ShaderStageFlags,
    /// Resource kind.
    pub ty: BindingType,
}

impl BindGroupLayoutEntry {
    /// Read-write storage buffer seen by compute kernels.
    pub fn compute_storage(binding: u32) -> Self {
        Self {
            binding,
            visibility: ShaderStageFlags::COMPUTE,
            ty: BindingType::Buffer { read_only: false },
        }
    }

    /// Storage texture seen by compute kernels.
    pub fn compute_storage_texture(
        binding: u32,
        access: StorageTextureAccess,
        format: TextureFormat,
        view_dimension: TextureViewDimension,
    ) -> Self {
        Self {
            binding,
            visibility: ShaderStageFlags::COMPUTE,
            ty: BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            },
        }
    }
}

/// Input of [`crate::renderer::GraphicsDevice::create_bind_group_layout`].
#[derive(Debug, Clone)]
pub struct BindGroupLayoutDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Slots of the layout.
    pub entries: &'a [BindGroupLayoutEntry],
}

/// A byte range of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferBinding {
    /// Bound buffer.
    pub buffer: BufferId,
    /// First byte.
    pub offset: u64,
    /// Range length. `None` runs to the end of the buffer.
    pub size: Option<NonZeroU64>,
}

/// The resource placed in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    /// A buffer range.
    Buffer(BufferBinding),
    /// A texture view.
    TextureView(TextureViewId),
}

/// One filled slot of a bind group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindGroupEntry {
    /// The `n` of `@binding(n)`.
    pub binding: u32,
    /// What goes there.
    pub resource: BindingResource,
}

impl BindGroupEntry {
    /// The whole of `buffer`.
    pub fn whole_buffer(binding: u32, buffer: BufferId) -> Self {
        Self {
            binding,
            resource: BindingResource::Buffer(BufferBinding {
                buffer,
                offset: 0,
                size: None,
            }),
        }
    }

    /// A view of a storage texture.
    pub fn texture_view(binding: u32, view: TextureViewId) -> Self {
        Self {
            binding,
            resource: BindingResource::TextureView(view),
        }
    }
}

/// Input of [`crate::renderer::GraphicsDevice::create_bind_group`].
#[derive(Debug, Clone)]
pub struct BindGroupDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// Layout the entries must satisfy.
    pub layout: BindGroupLayoutId,
    /// Filled slots.
    pub entries: &'a [BindGroupEntry],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_slots_are_compute_visible_and_writable() {
        let entry = BindGroupLayoutEntry::compute_storage(6);
        assert_eq!(entry.binding, 6);
        assert!(entry.visibility.contains(ShaderStageFlags::COMPUTE));
        assert_eq!(entry.ty, BindingType::Buffer { read_only: false });
    }

    #[test]
    fn whole_buffer_covers_from_zero_to_end() {
        let BindingResource::Buffer(range) = BindGroupEntry::whole_buffer(3, BufferId(9)).resource
        else {
            panic!("expected a buffer binding");
        };
        assert_eq!((range.buffer, range.offset, range.size), (BufferId(9), 0, None));

        let view = BindGroupEntry::texture_view(0, TextureViewId(2));
        assert_eq!(view.resource, BindingResource::TextureView(TextureViewId(2)));
    }
}
