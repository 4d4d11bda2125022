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

//! Texture descriptors and handles.
//!
//! The only images the builder needs are integer 3D fields sampled on the
//! voxel lattice of a chunk.

use crate::math::dimension::Extent3D;
use crate::sylva_bitflags;
use std::borrow::Cow;

/// Handle to a texture owned by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Handle to a view of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureViewId(pub usize);

/// Texel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// `r8uint`.
    R8Uint,
    /// `r32uint`, the only format with read-write storage access.
    R32Uint,
}

impl TextureFormat {
    /// Bytes per texel.
    pub const fn bytes_per_texel(&self) -> u32 {
        match self {
            Self::R8Uint => 1,
            Self::R32Uint => 4,
        }
    }
}

/// Shape of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureDimension {
    /// Width by height.
    D2,
    /// Width by height by depth.
    D3,
}

/// Shape a view presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureViewDimension {
    /// `texture_storage_2d`.
    D2,
    /// `texture_storage_3d`.
    D3,
}

sylva_bitflags! {
    /// How a texture may be used once created. Bit values match wgpu's.
    pub struct TextureUsage: u32 {
        /// Source of `copy_texture_to_texture`.
        const COPY_SRC = 1 << 0;
        /// Destination of `copy_texture_to_texture`.
        const COPY_DST = 1 << 1;
        /// Sampled by renderers that consume the field image.
        const TEXTURE_BINDING = 1 << 2;
        /// Bindable as a storage texture.
        const STORAGE_BINDING = 1 << 3;
    }
}

/// Input of [`crate::renderer::GraphicsDevice::create_texture`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Extent in texels.
    pub size: Extent3D,
    /// Shape.
    pub dimension: TextureDimension,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
}

impl TextureDescriptor<'_> {
    /// Bytes of texel data the texture holds.
    pub fn size_in_bytes(&self) -> u64 {
        self.size.volume() * self.format.bytes_per_texel() as u64
    }
}

/// Input of [`crate::renderer::GraphicsDevice::create_texture_view`].
#[derive(Debug, Clone, Default)]
pub struct TextureViewDescriptor<'a> {
    /// Debug label.
    pub label: Option<&'a str>,
    /// View shape. `None` follows the texture.
    pub dimension: Option<TextureViewDimension>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_image_size() {
        let desc = TextureDescriptor {
            label: None,
            size: Extent3D::cube(9),
            dimension: TextureDimension::D3,
            format: TextureFormat::R32Uint,
            usage: TextureUsage::STORAGE_BINDING | TextureUsage::COPY_SRC,
        };
        assert_eq!(desc.size_in_bytes(), 9 * 9 * 9 * 4);

        let small = TextureDescriptor {
            format: TextureFormat::R8Uint,
            ..desc
        };
        assert_eq!(small.size_in_bytes(), 9 * 9 * 9);
    }
}
