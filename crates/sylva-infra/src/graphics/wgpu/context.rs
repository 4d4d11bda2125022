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

use anyhow::{anyhow, Context as _, Result};

/// The headless wgpu objects a [`super::WgpuDevice`] dispatches on.
///
/// No surface is ever requested, so octree builds run on machines without a
/// display or window system.
#[derive(Debug)]
pub struct WgpuComputeContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Snapshot of the adapter description taken at startup.
    pub adapter_info: wgpu::AdapterInfo,
    /// Limits the logical device was opened with.
    pub limits: wgpu::Limits,
}

async fn pick_adapter(instance: &wgpu::Instance) -> Result<wgpu::Adapter> {
    let options = wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        force_fallback_adapter: false,
        compatible_surface: None,
    };
    instance
        .request_adapter(&options)
        .await
        .map_err(|e| anyhow!("no adapter can run compute work: {e}"))
}

async fn open_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    // The appended octree buffer can be large: ask for everything the adapter allows.
    let descriptor = wgpu::DeviceDescriptor {
        label: Some("sylva.compute_device"),
        required_features: wgpu::Features::empty(),
        required_limits: adapter.limits(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::default(),
    };
    adapter
        .request_device(&descriptor)
        .await
        .context("opening the logical device failed")
}

impl WgpuComputeContext {
    /// Picks a high-performance adapter and opens a logical device on it.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pick_adapter(&instance).await?;
        let adapter_info = adapter.get_info();
        log::info!(
            "Compute adapter: '{}' on {:?} ({:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        let (device, queue) = open_device(&adapter).await?;
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("Uncaptured wgpu error: {error}");
        }));

        let limits = device.limits();
        log::debug!(
            "Device opened: max buffer {} bytes, max storage binding {} bytes",
            limits.max_buffer_size,
            limits.max_storage_buffer_binding_size
        );

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            adapter_info,
            limits,
        })
    }

    /// Synchronous variant of [`WgpuComputeContext::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }
}
