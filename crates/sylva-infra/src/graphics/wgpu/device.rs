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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use sylva_core::renderer::api::*;
use sylva_core::renderer::traits::CommandEncoder;
use sylva_core::renderer::{GraphicsDevice, PipelineError, ResourceError, ShaderError};

use super::command::WgpuCommandEncoder;
use super::context::WgpuComputeContext;
use super::conversions::{self, IntoWgpu};

#[derive(Debug)]
struct WgpuBufferEntry {
    wgpu_buffer: Arc<wgpu::Buffer>,
    usage: BufferUsage,
}

#[derive(Debug)]
struct WgpuTextureEntry {
    wgpu_texture: Arc<wgpu::Texture>,
}

#[derive(Debug)]
struct WgpuComputePipelineEntry {
    wgpu_pipeline: Arc<wgpu::ComputePipeline>,
}

/// The internal, non-clonable state of the WgpuDevice.
#[derive(Debug)]
struct WgpuDeviceInternal {
    context: WgpuComputeContext,
    shader_modules: Mutex<HashMap<ShaderModuleId, Arc<wgpu::ShaderModule>>>,
    bind_group_layouts: Mutex<HashMap<BindGroupLayoutId, Arc<wgpu::BindGroupLayout>>>,
    bind_groups: Mutex<HashMap<BindGroupId, Arc<wgpu::BindGroup>>>,
    pipeline_layouts: Mutex<HashMap<PipelineLayoutId, Arc<wgpu::PipelineLayout>>>,
    compute_pipelines: Mutex<HashMap<ComputePipelineId, WgpuComputePipelineEntry>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    texture_views: Mutex<HashMap<TextureViewId, Arc<wgpu::TextureView>>>,
    /// Each fence remembers the submission that will signal it.
    fences: Mutex<HashMap<FenceId, Option<wgpu::SubmissionIndex>>>,

    next_shader_id: AtomicUsize,
    next_bind_group_layout_id: AtomicUsize,
    next_bind_group_id: AtomicUsize,
    next_pipeline_layout_id: AtomicUsize,
    next_compute_pipeline_id: AtomicU64,
    next_buffer_id: AtomicUsize,
    next_texture_id: AtomicUsize,
    next_texture_view_id: AtomicUsize,
    next_fence_id: AtomicU64,

    /// Command buffers that have been finished but not yet submitted.
    pending_command_buffers: Mutex<HashMap<CommandBufferId, wgpu::CommandBuffer>>,
    command_buffer_id_counter: AtomicU64,
}

/// A clonable, thread-safe handle to the WGPU compute device.
///
/// It wraps the actual device state in an Arc, allowing it to be shared
/// across threads and with command encoders.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    internal: Arc<WgpuDeviceInternal>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ResourceError> {
    mutex
        .lock()
        .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
}

fn next_id(counter: &AtomicUsize) -> usize {
    counter.fetch_add(1, Ordering::Relaxed)
}

impl WgpuDevice {
    pub fn new(context: WgpuComputeContext) -> Self {
        Self {
            internal: Arc::new(WgpuDeviceInternal {
                context,
                shader_modules: Mutex::new(HashMap::new()),
                bind_group_layouts: Mutex::new(HashMap::new()),
                bind_groups: Mutex::new(HashMap::new()),
                pipeline_layouts: Mutex::new(HashMap::new()),
                compute_pipelines: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                textures: Mutex::new(HashMap::new()),
                texture_views: Mutex::new(HashMap::new()),
                fences: Mutex::new(HashMap::new()),
                next_shader_id: AtomicUsize::new(0),
                next_bind_group_layout_id: AtomicUsize::new(0),
                next_bind_group_id: AtomicUsize::new(0),
                next_pipeline_layout_id: AtomicUsize::new(0),
                next_compute_pipeline_id: AtomicU64::new(0),
                next_buffer_id: AtomicUsize::new(0),
                next_texture_id: AtomicUsize::new(0),
                next_texture_view_id: AtomicUsize::new(0),
                next_fence_id: AtomicU64::new(0),
                pending_command_buffers: Mutex::new(HashMap::new()),
                command_buffer_id_counter: AtomicU64::new(0),
            }),
        }
    }

    fn device(&self) -> &wgpu::Device {
        &self.internal.context.device
    }

    fn queue(&self) -> &wgpu::Queue {
        &self.internal.context.queue
    }

    /// Runs `create` inside a validation error scope and turns a captured error into `Err`.
    fn validated<R>(&self, create: impl FnOnce(&wgpu::Device) -> R) -> Result<R, String> {
        let device = self.device();
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let created = create(device);
        match pollster::block_on(device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(created),
        }
    }

    /// Retrieves the internal WGPU compute pipeline. Returns `None` if the ID is invalid.
    pub fn get_wgpu_compute_pipeline(
        &self,
        id: ComputePipelineId,
    ) -> Option<Arc<wgpu::ComputePipeline>> {
        let pipelines = self.internal.compute_pipelines.lock().ok()?;
        pipelines.get(&id).map(|entry| Arc::clone(&entry.wgpu_pipeline))
    }

    /// Retrieves the internal WGPU bind group. Returns `None` if the ID is invalid.
    pub fn get_wgpu_bind_group(&self, id: BindGroupId) -> Option<Arc<wgpu::BindGroup>> {
        let groups = self.internal.bind_groups.lock().ok()?;
        groups.get(&id).cloned()
    }

    /// Retrieves the internal WGPU buffer. Returns `None` if the ID is invalid.
    pub fn get_wgpu_buffer(&self, id: BufferId) -> Option<Arc<wgpu::Buffer>> {
        let buffers = self.internal.buffers.lock().ok()?;
        buffers.get(&id).map(|entry| Arc::clone(&entry.wgpu_buffer))
    }

    /// Retrieves the internal WGPU texture. Returns `None` if the ID is invalid.
    pub fn get_wgpu_texture(&self, id: TextureId) -> Option<Arc<wgpu::Texture>> {
        let textures = self.internal.textures.lock().ok()?;
        textures.get(&id).map(|entry| Arc::clone(&entry.wgpu_texture))
    }

    /// Blocks until the queue is idle.
    pub fn poll_device_blocking(&self) {
        if let Err(e) = self.device().poll(wgpu::PollType::Wait) {
            log::warn!("Failed to poll device: {:?}", e);
        }
    }

    /// (crate-internal) Registers a finished wgpu::CommandBuffer, storing it
    /// in a map and returning an abstract ID for it.
    pub(crate) fn register_command_buffer(&self, buffer: wgpu::CommandBuffer) -> CommandBufferId {
        let id = CommandBufferId(
            self.internal
                .command_buffer_id_counter
                .fetch_add(1, Ordering::SeqCst),
        );
        match self.internal.pending_command_buffers.lock() {
            Ok(mut pending) => {
                pending.insert(id, buffer);
            }
            Err(e) => log::error!("Dropping command buffer {id:?}: {e}"),
        }
        id
    }

    pub(crate) fn raw_encoder(&self, label: Option<&str>) -> wgpu::CommandEncoder {
        self.device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label })
    }
}

impl GraphicsDevice for WgpuDevice {
    // --- Shader Module Operations ---

    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let label = descriptor.label;
        let wgpu_source = match &descriptor.source {
            ShaderSourceData::Wgsl(source) => wgpu::ShaderSource::Wgsl(source.clone()),
        };

        let module = self
            .validated(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label,
                    source: wgpu_source,
                })
            })
            .map_err(|details| ShaderError::CompilationError {
                label: label.unwrap_or_default().to_string(),
                details,
            })?;

        let id = ShaderModuleId(next_id(&self.internal.next_shader_id));
        lock(&self.internal.shader_modules, "shader_modules")?.insert(id, Arc::new(module));
        log::debug!("WgpuDevice: Created shader module {:?} with ID: {id:?}", label.unwrap_or_default());
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        match lock(&self.internal.shader_modules, "shader_modules")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ShaderError::NotFound { id }.into()),
        }
    }

    // --- Bind Groups and Layouts ---

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = descriptor
            .entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: entry.ty.clone().into_wgpu(),
                count: None,
            })
            .collect();
        let layout = self
            .validated(|device| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: descriptor.label,
                    entries: &entries,
                })
            })
            .map_err(PipelineError::LayoutCreationFailed)?;

        let id = BindGroupLayoutId(next_id(&self.internal.next_bind_group_layout_id));
        lock(&self.internal.bind_group_layouts, "bind_group_layouts")?.insert(id, Arc::new(layout));
        Ok(id)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let layout = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?
            .get(&descriptor.layout)
            .cloned()
            .ok_or(ResourceError::NotFound)?;

        // Resolve every resource first so the borrowed wgpu entries below stay valid.
        enum Resolved {
            Buffer(Arc<wgpu::Buffer>, u64, Option<std::num::NonZeroU64>),
            View(Arc<wgpu::TextureView>),
        }
        let mut resolved = Vec::with_capacity(descriptor.entries.len());
        {
            let buffers = lock(&self.internal.buffers, "buffers")?;
            let views = lock(&self.internal.texture_views, "texture_views")?;
            for entry in descriptor.entries {
                let resource = match entry.resource {
                    BindingResource::Buffer(binding) => {
                        let buffer = buffers.get(&binding.buffer).ok_or(ResourceError::NotFound)?;
                        Resolved::Buffer(Arc::clone(&buffer.wgpu_buffer), binding.offset, binding.size)
                    }
                    BindingResource::TextureView(view) => {
                        Resolved::View(views.get(&view).cloned().ok_or(ResourceError::NotFound)?)
                    }
                };
                resolved.push((entry.binding, resource));
            }
        }

        let entries: Vec<wgpu::BindGroupEntry> = resolved
            .iter()
            .map(|(binding, resource)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: match resource {
                    Resolved::Buffer(buffer, offset, size) => {
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: buffer.as_ref(),
                            offset: *offset,
                            size: *size,
                        })
                    }
                    Resolved::View(view) => wgpu::BindingResource::TextureView(view.as_ref()),
                },
            })
            .collect();

        let group = self
            .validated(|device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: descriptor.label,
                    layout: &layout,
                    entries: &entries,
                })
            })
            .map_err(|e| ResourceError::BackendError(format!("Bind group creation failed: {e}")))?;

        let id = BindGroupId(next_id(&self.internal.next_bind_group_id));
        lock(&self.internal.bind_groups, "bind_groups")?.insert(id, Arc::new(group));
        log::debug!("WgpuDevice: Created bind group {:?} with ID: {id:?}", descriptor.label);
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        match lock(&self.internal.bind_groups, "bind_groups")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Pipelines ---

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let group_layouts: Vec<Arc<wgpu::BindGroupLayout>> = {
            let layouts = lock(&self.internal.bind_group_layouts, "bind_group_layouts")?;
            descriptor
                .bind_group_layouts
                .iter()
                .map(|id| layouts.get(id).cloned().ok_or(ResourceError::NotFound))
                .collect::<Result<_, _>>()?
        };
        let refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().map(|l| l.as_ref()).collect();
        let layout = self
            .validated(|device| {
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: descriptor.label,
                    bind_group_layouts: &refs,
                    push_constant_ranges: &[],
                })
            })
            .map_err(PipelineError::LayoutCreationFailed)?;

        let id = PipelineLayoutId(next_id(&self.internal.next_pipeline_layout_id));
        lock(&self.internal.pipeline_layouts, "pipeline_layouts")?.insert(id, Arc::new(layout));
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let label = descriptor.label.as_deref();
        let module = lock(&self.internal.shader_modules, "shader_modules")?
            .get(&descriptor.shader_module)
            .cloned()
            .ok_or_else(|| PipelineError::InvalidShaderModuleForPipeline {
                id: descriptor.shader_module,
                pipeline_label: label.map(str::to_string),
            })?;
        let layout = match descriptor.layout {
            Some(id) => Some(
                lock(&self.internal.pipeline_layouts, "pipeline_layouts")?
                    .get(&id)
                    .cloned()
                    .ok_or(ResourceError::NotFound)?,
            ),
            None => None,
        };

        let pipeline = self
            .validated(|device| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label,
                    layout: layout.as_deref(),
                    module: &module,
                    entry_point: Some(descriptor.entry_point.as_ref()),
                    compilation_options: Default::default(),
                    cache: None,
                })
            })
            .map_err(|details| PipelineError::CompilationFailed {
                label: label.map(str::to_string),
                details,
            })?;

        let id = ComputePipelineId(
            self.internal
                .next_compute_pipeline_id
                .fetch_add(1, Ordering::Relaxed),
        );
        lock(&self.internal.compute_pipelines, "compute_pipelines")?.insert(
            id,
            WgpuComputePipelineEntry {
                wgpu_pipeline: Arc::new(pipeline),
            },
        );
        log::debug!("WgpuDevice: Created compute pipeline '{}' with ID: {id:?}", label.unwrap_or_default());
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        match lock(&self.internal.compute_pipelines, "compute_pipelines")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(PipelineError::InvalidComputePipeline { id }.into()),
        }
    }

    // --- Buffer Operations ---

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let wgpu_buffer = self
            .validated(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: descriptor.label.as_deref(),
                    size: descriptor.size,
                    usage: descriptor.usage.into_wgpu(),
                    mapped_at_creation: descriptor.mapped_at_creation,
                })
            })
            .map_err(ResourceError::BackendError)?;

        let id = BufferId(next_id(&self.internal.next_buffer_id));
        lock(&self.internal.buffers, "buffers")?.insert(
            id,
            WgpuBufferEntry {
                wgpu_buffer: Arc::new(wgpu_buffer),
                usage: descriptor.usage,
            },
        );
        log::debug!(
            "WgpuDevice: Created buffer '{}' with ID: {id:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        match lock(&self.internal.buffers, "buffers")?.remove(&id) {
            Some(entry) => {
                entry.wgpu_buffer.destroy();
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffer = self.get_wgpu_buffer(id).ok_or(ResourceError::NotFound)?;
        if offset + data.len() as u64 > buffer.size() {
            return Err(ResourceError::OutOfBounds);
        }
        self.queue().write_buffer(&buffer, offset, data);
        log::trace!("WgpuDevice: Wrote {} bytes to buffer {id:?} at offset {offset}", data.len());
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let (source, usage) = {
            let buffers = lock(&self.internal.buffers, "buffers")?;
            let entry = buffers.get(&id).ok_or(ResourceError::NotFound)?;
            (Arc::clone(&entry.wgpu_buffer), entry.usage)
        };
        if offset + size > source.size() {
            return Err(ResourceError::OutOfBounds);
        }
        if size == 0 {
            return Ok(Vec::new());
        }
        if !usage.contains(BufferUsage::COPY_SRC) || offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(ResourceError::BackendError(format!(
                "Buffer {id:?} cannot be read back at offset {offset} (usage {usage:?})"
            )));
        }

        let padded = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        let staging = self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_staging"),
            size: padded,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self.raw_encoder(Some("readback"));
        encoder.copy_buffer_to_buffer(&source, offset, &staging, 0, padded);
        let submission = self.queue().submit(std::iter::once(encoder.finish()));

        let (sender, receiver) = crossbeam_channel::bounded(1);
        staging
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let _ = sender.send(result);
            });
        self.device()
            .poll(wgpu::PollType::WaitForSubmissionIndex(submission))
            .map_err(|e| ResourceError::BackendError(format!("Device poll failed: {e}")))?;
        receiver
            .recv()
            .map_err(|e| ResourceError::BackendError(format!("Map callback dropped: {e}")))?
            .map_err(|e| ResourceError::BackendError(format!("WGPU map_async failed: {e:?}")))?;

        let bytes = staging.slice(..).get_mapped_range()[..size as usize].to_vec();
        staging.unmap();
        Ok(bytes)
    }

    // --- Textures ---

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let wgpu_texture = self
            .validated(|device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: descriptor.label.as_deref(),
                    size: descriptor.size.into_wgpu(),
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: descriptor.dimension.into_wgpu(),
                    format: descriptor.format.into_wgpu(),
                    usage: descriptor.usage.into_wgpu(),
                    view_formats: &[],
                })
            })
            .map_err(ResourceError::BackendError)?;

        let id = TextureId(next_id(&self.internal.next_texture_id));
        lock(&self.internal.textures, "textures")?.insert(
            id,
            WgpuTextureEntry {
                wgpu_texture: Arc::new(wgpu_texture),
            },
        );
        log::debug!(
            "WgpuDevice: Created texture '{}' with ID: {id:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            descriptor.size_in_bytes()
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        match lock(&self.internal.textures, "textures")?.remove(&id) {
            Some(entry) => {
                entry.wgpu_texture.destroy();
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_texture_view(
        &self,
        texture_id: TextureId,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let texture = self.get_wgpu_texture(texture_id).ok_or(ResourceError::NotFound)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: descriptor.label,
            dimension: descriptor.dimension.map(|d| d.into_wgpu()),
            ..Default::default()
        });
        let id = TextureViewId(next_id(&self.internal.next_texture_view_id));
        lock(&self.internal.texture_views, "texture_views")?.insert(id, Arc::new(view));
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        match lock(&self.internal.texture_views, "texture_views")?.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    // --- Commands and Synchronization ---

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(WgpuCommandEncoder {
            encoder: self.raw_encoder(label),
            device: self.clone(),
        })
    }

    fn submit_command_buffer(
        &self,
        command_buffer: CommandBufferId,
        signal: Option<FenceId>,
    ) -> Result<(), ResourceError> {
        let buffer = lock(&self.internal.pending_command_buffers, "pending_command_buffers")?
            .remove(&command_buffer)
            .ok_or(ResourceError::InvalidHandle)?;
        let submission = self.queue().submit(std::iter::once(buffer));
        if let Some(fence) = signal {
            let mut fences = lock(&self.internal.fences, "fences")?;
            let slot = fences.get_mut(&fence).ok_or(ResourceError::NotFound)?;
            *slot = Some(submission);
        }
        Ok(())
    }

    fn create_fence(&self) -> Result<FenceId, ResourceError> {
        let id = FenceId(self.internal.next_fence_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.internal.fences, "fences")?.insert(id, None);
        Ok(id)
    }

    fn wait_for_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        let submission = lock(&self.internal.fences, "fences")?
            .get(&fence)
            .ok_or(ResourceError::NotFound)?
            .clone()
            .ok_or(ResourceError::FenceNeverSignaled(fence))?;
        self.device()
            .poll(wgpu::PollType::WaitForSubmissionIndex(submission))
            .map(|_| ())
            .map_err(|e| ResourceError::BackendError(format!("Fence wait failed: {e}")))
    }

    fn reset_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        let mut fences = lock(&self.internal.fences, "fences")?;
        let slot = fences.get_mut(&fence).ok_or(ResourceError::NotFound)?;
        *slot = None;
        Ok(())
    }

    fn destroy_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        match lock(&self.internal.fences, "fences")?.remove(&fence) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        let context = &self.internal.context;
        RendererAdapterInfo {
            name: context.adapter_info.name.clone(),
            backend_type: conversions::backend_type(context.adapter_info.backend),
            device_type: conversions::device_type(context.adapter_info.device_type),
        }
    }

    fn get_limits(&self) -> DeviceLimits {
        let limits = &self.internal.context.limits;
        DeviceLimits {
            max_buffer_size: limits.max_buffer_size,
            max_storage_buffer_binding_size: limits.max_storage_buffer_binding_size as u64,
            max_compute_workgroups_per_dimension: limits.max_compute_workgroups_per_dimension,
            max_texture_dimension_3d: limits.max_texture_dimension_3d,
        }
    }
}
