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

use sylva_core::math::Extent3D;
use sylva_core::renderer::{
    BindingType, BufferUsage, GraphicsBackendType, RendererDeviceType,
    ShaderStageFlags, StorageTextureAccess, TextureDimension, TextureFormat, TextureUsage,
    TextureViewDimension,
};

/// Maps a backend-agnostic descriptor value onto its wgpu equivalent.
///
/// `From` cannot be implemented here since both sides are foreign types.
pub trait IntoWgpu<T> {
    /// The wgpu value.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth_or_array_layers,
        }
    }
}

impl IntoWgpu<wgpu::TextureFormat> for TextureFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::R8Uint => wgpu::TextureFormat::R8Uint,
            TextureFormat::R32Uint => wgpu::TextureFormat::R32Uint,
        }
    }
}

impl IntoWgpu<wgpu::TextureDimension> for TextureDimension {
    fn into_wgpu(self) -> wgpu::TextureDimension {
        match self {
            TextureDimension::D2 => wgpu::TextureDimension::D2,
            TextureDimension::D3 => wgpu::TextureDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for TextureViewDimension {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            TextureViewDimension::D2 => wgpu::TextureViewDimension::D2,
            TextureViewDimension::D3 => wgpu::TextureViewDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        // The flag values mirror wgpu's.
        wgpu::BufferUsages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::TextureUsages> for TextureUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        wgpu::TextureUsages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::ShaderStages> for ShaderStageFlags {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        wgpu::ShaderStages::from_bits_truncate(self.bits())
    }
}

impl IntoWgpu<wgpu::StorageTextureAccess> for StorageTextureAccess {
    fn into_wgpu(self) -> wgpu::StorageTextureAccess {
        match self {
            StorageTextureAccess::ReadOnly => wgpu::StorageTextureAccess::ReadOnly,
            StorageTextureAccess::WriteOnly => wgpu::StorageTextureAccess::WriteOnly,
            StorageTextureAccess::ReadWrite => wgpu::StorageTextureAccess::ReadWrite,
        }
    }
}

impl IntoWgpu<wgpu::BindingType> for BindingType {
    fn into_wgpu(self) -> wgpu::BindingType {
        match self {
            BindingType::Buffer { read_only } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingType::StorageTexture {
                access,
                format,
                view_dimension,
            } => wgpu::BindingType::StorageTexture {
                access: access.into_wgpu(),
                format: format.into_wgpu(),
                view_dimension: view_dimension.into_wgpu(),
            },
        }
    }
}

pub fn backend_type(backend: wgpu::Backend) -> GraphicsBackendType {
    match backend {
        wgpu::Backend::Vulkan => GraphicsBackendType::Vulkan,
        wgpu::Backend::Metal => GraphicsBackendType::Metal,
        wgpu::Backend::Dx12 => GraphicsBackendType::Dx12,
        wgpu::Backend::Gl => GraphicsBackendType::OpenGL,
        wgpu::Backend::BrowserWebGpu => GraphicsBackendType::WebGpu,
        wgpu::Backend::Noop => GraphicsBackendType::Unknown,
    }
}

pub fn device_type(device_type: wgpu::DeviceType) -> RendererDeviceType {
    match device_type {
        wgpu::DeviceType::IntegratedGpu => RendererDeviceType::IntegratedGpu,
        wgpu::DeviceType::DiscreteGpu => RendererDeviceType::DiscreteGpu,
        wgpu::DeviceType::VirtualGpu => RendererDeviceType::VirtualGpu,
        wgpu::DeviceType::Cpu => RendererDeviceType::Cpu,
        wgpu::DeviceType::Other => RendererDeviceType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_flags_keep_their_meaning() {
        let usage = (BufferUsage::STORAGE | BufferUsage::INDIRECT | BufferUsage::COPY_SRC).into_wgpu();
        assert_eq!(
            usage,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_SRC
        );
        assert_eq!(
            (TextureUsage::STORAGE_BINDING | TextureUsage::COPY_DST).into_wgpu(),
            wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_DST
        );
        assert_eq!(ShaderStageFlags::COMPUTE.into_wgpu(), wgpu::ShaderStages::COMPUTE);
    }

    #[test]
    fn storage_texture_binding() {
        let ty = BindingType::StorageTexture {
            access: StorageTextureAccess::ReadWrite,
            format: TextureFormat::R32Uint,
            view_dimension: TextureViewDimension::D3,
        };
        assert_eq!(
            ty.into_wgpu(),
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::ReadWrite,
                format: wgpu::TextureFormat::R32Uint,
                view_dimension: wgpu::TextureViewDimension::D3,
            }
        );
    }

    #[test]
    fn storage_buffers_have_no_dynamic_offset() {
        assert_eq!(
            BindingType::Buffer { read_only: true }.into_wgpu(),
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            }
        );
    }

    #[test]
    fn extent() {
        let e = Extent3D::cube(65).into_wgpu();
        assert_eq!((e.width, e.height, e.depth_or_array_layers), (65, 65, 65));
    }
}
