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

//! Information about the physical device behind a `GraphicsDevice`.

use std::fmt;

/// The graphics API a backend runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Apple Metal.
    Metal,
    /// DirectX 12.
    Dx12,
    /// OpenGL / GLES.
    OpenGL,
    /// WebGPU in a browser.
    WebGpu,
    /// The CPU reference backend.
    Software,
    /// Unknown or not reported.
    Unknown,
}

impl fmt::Display for GraphicsBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphicsBackendType::Vulkan => "Vulkan",
            GraphicsBackendType::Metal => "Metal",
            GraphicsBackendType::Dx12 => "DirectX 12",
            GraphicsBackendType::OpenGL => "OpenGL",
            GraphicsBackendType::WebGpu => "WebGPU",
            GraphicsBackendType::Software => "Software",
            GraphicsBackendType::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// The kind of physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererDeviceType {
    /// A GPU integrated with the CPU.
    IntegratedGpu,
    /// A dedicated GPU.
    DiscreteGpu,
    /// A virtualized GPU.
    VirtualGpu,
    /// A CPU implementation.
    Cpu,
    /// Unknown or not reported.
    Unknown,
}

/// Describes the adapter a device was created from.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererAdapterInfo {
    /// The adapter's name as reported by the driver.
    pub name: String,
    /// The graphics API in use.
    pub backend_type: GraphicsBackendType,
    /// The kind of device.
    pub device_type: RendererDeviceType,
}

/// The resource limits that matter to compute workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Largest buffer that can be created, in bytes.
    pub max_buffer_size: u64,
    /// Largest range that can be bound as a storage buffer, in bytes.
    pub max_storage_buffer_binding_size: u64,
    /// Largest workgroup count per dispatch dimension.
    pub max_compute_workgroups_per_dimension: u32,
    /// Largest 3D texture extent per dimension.
    pub max_texture_dimension_3d: u32,
}
