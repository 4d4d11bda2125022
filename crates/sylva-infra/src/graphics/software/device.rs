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

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use sylva_core::math::Extent3D;
use sylva_core::renderer::api::*;
use sylva_core::renderer::traits::{CommandEncoder, ComputeKernel};
use sylva_core::renderer::{GraphicsDevice, PipelineError, ResourceError, ShaderError};

use super::command::{Command, DispatchSize, SoftwareCommandEncoder};
use super::hazard::{AccessSet, Hazard, HazardTracker, ResourceKey};
use super::memory::{Bound, DispatchBindings, SoftwareBuffer, SoftwareTexture};

/// A command the software device has executed, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutedCommand {
    Dispatch {
        /// Name of the shader the dispatch ran.
        shader: String,
        workgroups: [u32; 3],
    },
    Barrier(MemoryBarrier),
    CopyBuffer {
        source: BufferId,
        destination: BufferId,
        size: u64,
    },
    CopyTexture {
        source: TextureId,
        destination: TextureId,
    },
}

struct ShaderModule {
    name: String,
    source: String,
}

struct BindGroup {
    layout: BindGroupLayoutId,
    entries: Vec<(u32, BindingResource)>,
}

struct Pipeline {
    shader: String,
    kernel: Arc<dyn ComputeKernel>,
    group_layouts: Vec<BindGroupLayoutId>,
}

#[derive(Default)]
struct SoftwareState {
    next_id: u64,
    kernels: HashMap<String, Arc<dyn ComputeKernel>>,
    shader_modules: HashMap<ShaderModuleId, ShaderModule>,
    bind_group_layouts: HashMap<BindGroupLayoutId, Vec<BindGroupLayoutEntry>>,
    bind_groups: HashMap<BindGroupId, BindGroup>,
    pipeline_layouts: HashMap<PipelineLayoutId, Vec<BindGroupLayoutId>>,
    pipelines: HashMap<ComputePipelineId, Pipeline>,
    buffers: HashMap<BufferId, SoftwareBuffer>,
    textures: HashMap<TextureId, SoftwareTexture>,
    texture_views: HashMap<TextureViewId, TextureId>,
    pending_command_buffers: HashMap<CommandBufferId, Vec<Command>>,
    fences: HashMap<FenceId, bool>,
    command_log: Vec<ExecutedCommand>,
}

/// A [`GraphicsDevice`] that runs compute work on the CPU.
///
/// Shader modules are matched by label to host kernels registered with
/// [`SoftwareDevice::register_kernel`]. Command buffers execute synchronously
/// at submission, one invocation at a time, with every resource access
/// bounds-checked and every missing barrier reported as
/// [`ResourceError::SynchronizationHazard`].
#[derive(Clone)]
pub struct SoftwareDevice {
    state: Arc<Mutex<SoftwareState>>,
    limits: DeviceLimits,
}

impl fmt::Debug for SoftwareDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SoftwareDevice");
        debug.field("limits", &self.limits);
        if let Ok(state) = self.state.lock() {
            debug
                .field("kernels", &state.kernels.len())
                .field("buffers", &state.buffers.len())
                .field("textures", &state.textures.len())
                .field("pipelines", &state.pipelines.len());
        }
        debug.finish_non_exhaustive()
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareDevice {
    /// Limits generous enough for any chunk the builder accepts.
    pub const DEFAULT_LIMITS: DeviceLimits = DeviceLimits {
        max_buffer_size: 1 << 40,
        max_storage_buffer_binding_size: 1 << 40,
        max_compute_workgroups_per_dimension: 65_535,
        max_texture_dimension_3d: 2048,
    };

    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_LIMITS)
    }

    pub fn with_limits(limits: DeviceLimits) -> Self {
        log::info!("Created software compute device");
        Self {
            state: Arc::new(Mutex::new(SoftwareState::default())),
            limits,
        }
    }

    /// Registers the host kernel that stands in for the shader called `name`.
    ///
    /// Pipelines created afterwards from a module labelled `name` run `kernel`.
    pub fn register_kernel(&self, name: impl Into<String>, kernel: Arc<dyn ComputeKernel>) {
        let name = name.into();
        match self.state.lock() {
            Ok(mut state) => {
                log::trace!("SoftwareDevice: registered kernel '{name}'");
                state.kernels.insert(name, kernel);
            }
            Err(e) => log::error!("Failed to register kernel '{name}': {e}"),
        }
    }

    /// Registers every `(name, kernel)` pair.
    pub fn register_kernels(
        &self,
        kernels: impl IntoIterator<Item = (impl Into<String>, Arc<dyn ComputeKernel>)>,
    ) {
        for (name, kernel) in kernels {
            self.register_kernel(name, kernel);
        }
    }

    /// Every command executed since creation or the last [`Self::clear_command_log`].
    pub fn command_log(&self) -> Vec<ExecutedCommand> {
        self.state
            .lock()
            .map(|state| state.command_log.clone())
            .unwrap_or_default()
    }

    pub fn clear_command_log(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.command_log.clear();
        }
    }

    /// The number of live buffers, textures and texture views.
    pub fn live_resource_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.buffers.len() + s.textures.len() + s.texture_views.len())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, SoftwareState>, ResourceError> {
        self.state
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned (software state): {e}")))
    }

    pub(crate) fn register_command_buffer(&self, commands: Vec<Command>) -> CommandBufferId {
        match self.state.lock() {
            Ok(mut state) => {
                let id = CommandBufferId(state.allocate_id());
                state.pending_command_buffers.insert(id, commands);
                id
            }
            Err(e) => {
                // Submitting the returned id reports the loss as an invalid handle.
                log::error!("Dropping command buffer: {e}");
                CommandBufferId(u64::MAX)
            }
        }
    }
}

impl SoftwareState {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn label_of(&self, resource: ResourceKey) -> String {
        match resource {
            ResourceKey::Buffer(id) => self
                .buffers
                .get(&id)
                .map(|b| format!("buffer '{}'", b.label))
                .unwrap_or_else(|| format!("{id:?}")),
            ResourceKey::Texture(id) => self
                .textures
                .get(&id)
                .map(|t| format!("texture '{}'", t.label))
                .unwrap_or_else(|| format!("{id:?}")),
        }
    }

    fn hazard_error(&self, command: &str, hazard: Hazard) -> ResourceError {
        ResourceError::SynchronizationHazard(format!(
            "'{command}' accesses {} written by '{}' without a {} barrier",
            self.label_of(hazard.resource),
            hazard.writer,
            hazard.needed
        ))
    }

    fn buffer(&self, id: BufferId) -> Result<&SoftwareBuffer, ResourceError> {
        self.buffers.get(&id).ok_or(ResourceError::NotFound)
    }

    fn texture(&self, id: TextureId) -> Result<&SoftwareTexture, ResourceError> {
        self.textures.get(&id).ok_or(ResourceError::NotFound)
    }

    fn check_bind_group_entry(
        &self,
        layout_entry: &BindGroupLayoutEntry,
        resource: &BindingResource,
    ) -> Result<(), ResourceError> {
        let binding = layout_entry.binding;
        match (&layout_entry.ty, resource) {
            (BindingType::Buffer { .. }, BindingResource::Buffer(bound)) => {
                let buffer = self.buffer(bound.buffer)?;
                if !buffer.usage.contains(BufferUsage::STORAGE) {
                    return Err(ResourceError::BackendError(format!(
                        "Buffer '{}' bound at binding {binding} lacks STORAGE usage",
                        buffer.label
                    )));
                }
                let size = bound.size.map_or(buffer.size.saturating_sub(bound.offset), |s| s.get());
                if bound.offset % 4 != 0 || size % 4 != 0 || bound.offset + size > buffer.size {
                    return Err(ResourceError::OutOfBounds);
                }
                Ok(())
            }
            (BindingType::StorageTexture { format, .. }, BindingResource::TextureView(view)) => {
                let texture_id = self.texture_views.get(view).ok_or(ResourceError::NotFound)?;
                let texture = self.texture(*texture_id)?;
                if !texture.usage.contains(TextureUsage::STORAGE_BINDING) || texture.format != *format {
                    return Err(ResourceError::BackendError(format!(
                        "Texture '{}' cannot be bound as a {format:?} storage texture at binding {binding}",
                        texture.label
                    )));
                }
                Ok(())
            }
            _ => Err(ResourceError::BackendError(format!(
                "Resource bound at binding {binding} does not match its layout entry"
            ))),
        }
    }

    /// Resolves the bind groups of a dispatch into a binding table.
    fn resolve_bindings(
        &self,
        pipeline: &Pipeline,
        bind_groups: &BTreeMap<u32, BindGroupId>,
    ) -> Result<HashMap<(u32, u32), Bound>, ResourceError> {
        for (group, expected) in pipeline.group_layouts.iter().enumerate() {
            let group = group as u32;
            let bound = bind_groups
                .get(&group)
                .and_then(|id| self.bind_groups.get(id))
                .ok_or_else(|| {
                    ResourceError::BackendError(format!(
                        "'{}' dispatched without a bind group at @group({group})",
                        pipeline.shader
                    ))
                })?;
            if bound.layout != *expected {
                return Err(ResourceError::BackendError(format!(
                    "Bind group at @group({group}) does not match the layout of '{}'",
                    pipeline.shader
                )));
            }
        }

        let mut table = HashMap::new();
        for (&group, id) in bind_groups {
            let bind_group = self.bind_groups.get(id).ok_or(ResourceError::NotFound)?;
            for (binding, resource) in &bind_group.entries {
                let bound = match resource {
                    BindingResource::Buffer(buffer_binding) => {
                        let buffer = self.buffer(buffer_binding.buffer)?;
                        let size = buffer_binding
                            .size
                            .map_or(buffer.size - buffer_binding.offset, |s| s.get());
                        Bound::Buffer {
                            id: buffer_binding.buffer,
                            first_word: (buffer_binding.offset / 4) as usize,
                            len_words: (size / 4) as usize,
                        }
                    }
                    BindingResource::TextureView(view) => Bound::Texture(
                        *self.texture_views.get(view).ok_or(ResourceError::NotFound)?,
                    ),
                };
                table.insert((group, *binding), bound);
            }
        }
        Ok(table)
    }

    fn read_indirect_args(
        &self,
        args: &IndirectArgs,
        hazards: &HazardTracker,
        shader: &str,
    ) -> Result<[u32; 3], ResourceError> {
        let buffer = self.buffer(args.buffer)?;
        if !buffer.usage.contains(BufferUsage::INDIRECT) {
            return Err(ResourceError::BackendError(format!(
                "Buffer '{}' used for indirect dispatch lacks INDIRECT usage",
                buffer.label
            )));
        }
        if args.offset % 4 != 0 || args.offset + DispatchIndirect::SIZE > buffer.size {
            return Err(ResourceError::OutOfBounds);
        }
        hazards
            .check_indirect(ResourceKey::Buffer(args.buffer))
            .map_err(|hazard| self.hazard_error(shader, hazard))?;
        let first = (args.offset / 4) as usize;
        let words = &buffer.words[first..first + 3];
        Ok([words[0], words[1], words[2]])
    }

    fn execute(&mut self, commands: &[Command], limits: &DeviceLimits) -> Result<(), ResourceError> {
        let mut hazards = HazardTracker::default();
        for command in commands {
            match command {
                Command::Barrier(barrier) => {
                    hazards.barrier(*barrier);
                    self.command_log.push(ExecutedCommand::Barrier(*barrier));
                }
                Command::Dispatch {
                    pass,
                    pipeline,
                    bind_groups,
                    size,
                } => self.dispatch(pass.as_deref(), *pipeline, bind_groups, size, &mut hazards, limits)?,
                Command::CopyBufferToBuffer {
                    source,
                    source_offset,
                    destination,
                    destination_offset,
                    size,
                } => self.copy_buffer(
                    *source,
                    *source_offset,
                    *destination,
                    *destination_offset,
                    *size,
                    &mut hazards,
                )?,
                Command::CopyTextureToTexture {
                    source,
                    destination,
                    size,
                } => self.copy_texture(*source, *destination, *size, &mut hazards)?,
            }
        }
        hazards.end_submission();
        Ok(())
    }

    fn dispatch(
        &mut self,
        pass: Option<&str>,
        pipeline: Option<ComputePipelineId>,
        bind_groups: &BTreeMap<u32, BindGroupId>,
        size: &DispatchSize,
        hazards: &mut HazardTracker,
        limits: &DeviceLimits,
    ) -> Result<(), ResourceError> {
        let pipeline_id = pipeline.ok_or_else(|| {
            ResourceError::BackendError(format!(
                "Dispatch without a pipeline in pass '{}'",
                pass.unwrap_or_default()
            ))
        })?;
        let pipeline = self
            .pipelines
            .get(&pipeline_id)
            .ok_or(PipelineError::InvalidComputePipeline { id: pipeline_id })?;
        let shader = pipeline.shader.clone();
        let kernel = Arc::clone(&pipeline.kernel);
        let table = self.resolve_bindings(pipeline, bind_groups)?;

        let workgroups = match size {
            DispatchSize::Direct(counts) => *counts,
            DispatchSize::Indirect(args) => self.read_indirect_args(args, hazards, &shader)?,
        };
        if workgroups
            .iter()
            .any(|&count| count > limits.max_compute_workgroups_per_dimension)
        {
            return Err(ResourceError::BackendError(format!(
                "'{shader}' dispatched {workgroups:?} workgroups, above the limit of {}",
                limits.max_compute_workgroups_per_dimension
            )));
        }

        let mut bindings = DispatchBindings::new(&mut self.buffers, &mut self.textures, table);
        for global_id in invocations(workgroups, kernel.workgroup_size()) {
            kernel
                .invoke(global_id, &mut bindings)
                .map_err(|fault| ResourceError::Kernel {
                    shader: shader.clone(),
                    fault,
                })?;
        }
        let access = bindings.into_access();
        hazards
            .record(&shader, &access)
            .map_err(|hazard| self.hazard_error(&shader, hazard))?;

        log::trace!("SoftwareDevice: dispatched '{shader}' x {workgroups:?}");
        self.command_log.push(ExecutedCommand::Dispatch { shader, workgroups });
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
        hazards: &mut HazardTracker,
    ) -> Result<(), ResourceError> {
        if source == destination {
            return Err(ResourceError::BackendError(
                "Copy source and destination must be different buffers".into(),
            ));
        }
        let src = self.buffer(source)?;
        let dst = self.buffer(destination)?;
        if !src.usage.contains(BufferUsage::COPY_SRC) || !dst.usage.contains(BufferUsage::COPY_DST) {
            return Err(ResourceError::BackendError(format!(
                "Copy from '{}' to '{}' needs COPY_SRC and COPY_DST usage",
                src.label, dst.label
            )));
        }
        if source_offset % 4 != 0 || destination_offset % 4 != 0 || size % 4 != 0 {
            return Err(ResourceError::BackendError(format!(
                "Copy from '{}' to '{}' is not 4-byte aligned",
                src.label, dst.label
            )));
        }
        if source_offset + size > src.size || destination_offset + size > dst.size {
            return Err(ResourceError::OutOfBounds);
        }

        let access = AccessSet {
            reads: [ResourceKey::Buffer(source)].into(),
            writes: [ResourceKey::Buffer(destination)].into(),
        };
        hazards
            .record("copy_buffer_to_buffer", &access)
            .map_err(|hazard| self.hazard_error("copy_buffer_to_buffer", hazard))?;

        let words = src.words[(source_offset / 4) as usize..((source_offset + size) / 4) as usize].to_vec();
        if let Some(dst) = self.buffers.get_mut(&destination) {
            let first = (destination_offset / 4) as usize;
            dst.words[first..first + words.len()].copy_from_slice(&words);
        }
        self.command_log.push(ExecutedCommand::CopyBuffer {
            source,
            destination,
            size,
        });
        Ok(())
    }

    fn copy_texture(
        &mut self,
        source: TextureId,
        destination: TextureId,
        size: Extent3D,
        hazards: &mut HazardTracker,
    ) -> Result<(), ResourceError> {
        let src = self.texture(source)?;
        let dst = self.texture(destination)?;
        if !src.usage.contains(TextureUsage::COPY_SRC) || !dst.usage.contains(TextureUsage::COPY_DST) {
            return Err(ResourceError::BackendError(format!(
                "Copy from '{}' to '{}' needs COPY_SRC and COPY_DST usage",
                src.label, dst.label
            )));
        }
        if src.format != dst.format {
            return Err(ResourceError::BackendError(format!(
                "Copy from '{}' to '{}' between different formats",
                src.label, dst.label
            )));
        }
        let [w, h, d] = size.to_array();
        let fits = |extent: Extent3D| w <= extent.width && h <= extent.height && d <= extent.depth_or_array_layers;
        if !fits(src.extent) || !fits(dst.extent) {
            return Err(ResourceError::OutOfBounds);
        }

        let access = AccessSet {
            reads: [ResourceKey::Texture(source)].into(),
            writes: [ResourceKey::Texture(destination)].into(),
        };
        hazards
            .record("copy_texture_to_texture", &access)
            .map_err(|hazard| self.hazard_error("copy_texture_to_texture", hazard))?;

        let mut region = Vec::with_capacity(size.volume() as usize);
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    region.extend(src.index([x, y, z]).map(|i| src.texels[i]));
                }
            }
        }
        if let Some(dst) = self.textures.get_mut(&destination) {
            let mut texels = region.into_iter();
            for z in 0..d {
                for y in 0..h {
                    for x in 0..w {
                        if let (Some(i), Some(value)) = (dst.index([x, y, z]), texels.next()) {
                            dst.texels[i] = value;
                        }
                    }
                }
            }
        }
        self.command_log.push(ExecutedCommand::CopyTexture {
            source,
            destination,
        });
        Ok(())
    }
}

/// Global invocation ids of a dispatch, x fastest.
fn invocations(workgroups: [u32; 3], workgroup_size: [u32; 3]) -> impl Iterator<Item = [u32; 3]> {
    let [sx, sy, sz] = workgroup_size;
    let [gx, gy, gz] = workgroups;
    (0..gz * sz).flat_map(move |z| {
        (0..gy * sy).flat_map(move |y| (0..gx * sx).map(move |x| [x, y, z]))
    })
}

impl GraphicsDevice for SoftwareDevice {
    fn create_shader_module(
        &self,
        descriptor: &ShaderModuleDescriptor,
    ) -> Result<ShaderModuleId, ResourceError> {
        let name = descriptor.label.unwrap_or_default().to_string();
        let ShaderSourceData::Wgsl(source) = &descriptor.source;
        if !source.contains("@compute") {
            return Err(ShaderError::CompilationError {
                label: name,
                details: "no @compute entry point".into(),
            }
            .into());
        }
        let mut state = self.lock()?;
        let id = ShaderModuleId(state.allocate_id() as usize);
        state.shader_modules.insert(
            id,
            ShaderModule {
                name,
                source: source.to_string(),
            },
        );
        Ok(id)
    }

    fn destroy_shader_module(&self, id: ShaderModuleId) -> Result<(), ResourceError> {
        match self.lock()?.shader_modules.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ShaderError::NotFound { id }.into()),
        }
    }

    fn create_bind_group_layout(
        &self,
        descriptor: &BindGroupLayoutDescriptor,
    ) -> Result<BindGroupLayoutId, ResourceError> {
        let mut state = self.lock()?;
        let id = BindGroupLayoutId(state.allocate_id() as usize);
        state
            .bind_group_layouts
            .insert(id, descriptor.entries.to_vec());
        Ok(id)
    }

    fn create_bind_group(
        &self,
        descriptor: &BindGroupDescriptor,
    ) -> Result<BindGroupId, ResourceError> {
        let mut state = self.lock()?;
        let layout = state
            .bind_group_layouts
            .get(&descriptor.layout)
            .ok_or(ResourceError::NotFound)?;
        for layout_entry in layout {
            let entry = descriptor
                .entries
                .iter()
                .find(|entry| entry.binding == layout_entry.binding)
                .ok_or_else(|| {
                    ResourceError::BackendError(format!(
                        "Bind group '{}' has no resource for binding {}",
                        descriptor.label.unwrap_or_default(),
                        layout_entry.binding
                    ))
                })?;
            state.check_bind_group_entry(layout_entry, &entry.resource)?;
        }
        if descriptor.entries.len() != layout.len() {
            return Err(ResourceError::BackendError(format!(
                "Bind group '{}' has entries its layout does not declare",
                descriptor.label.unwrap_or_default()
            )));
        }

        let id = BindGroupId(state.allocate_id() as usize);
        let entries = descriptor
            .entries
            .iter()
            .map(|entry| (entry.binding, entry.resource))
            .collect();
        state.bind_groups.insert(
            id,
            BindGroup {
                layout: descriptor.layout,
                entries,
            },
        );
        Ok(id)
    }

    fn destroy_bind_group(&self, id: BindGroupId) -> Result<(), ResourceError> {
        match self.lock()?.bind_groups.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_pipeline_layout(
        &self,
        descriptor: &PipelineLayoutDescriptor,
    ) -> Result<PipelineLayoutId, ResourceError> {
        let mut state = self.lock()?;
        if let Some(missing) = descriptor
            .bind_group_layouts
            .iter()
            .find(|id| !state.bind_group_layouts.contains_key(id))
        {
            return Err(PipelineError::LayoutCreationFailed(format!(
                "unknown bind group layout {missing:?}"
            ))
            .into());
        }
        let id = PipelineLayoutId(state.allocate_id() as usize);
        state
            .pipeline_layouts
            .insert(id, descriptor.bind_group_layouts.to_vec());
        Ok(id)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor,
    ) -> Result<ComputePipelineId, ResourceError> {
        let label = descriptor.label.as_deref().map(str::to_string);
        let mut state = self.lock()?;
        let module = state
            .shader_modules
            .get(&descriptor.shader_module)
            .ok_or_else(|| PipelineError::InvalidShaderModuleForPipeline {
                id: descriptor.shader_module,
                pipeline_label: label.clone(),
            })?;
        let entry_point = format!("fn {}(", descriptor.entry_point);
        if !module.source.contains(&entry_point) {
            return Err(PipelineError::CompilationFailed {
                label,
                details: format!("entry point '{}' not found", descriptor.entry_point),
            }
            .into());
        }
        let kernel = state
            .kernels
            .get(&module.name)
            .cloned()
            .ok_or_else(|| PipelineError::CompilationFailed {
                label: label.clone(),
                details: format!("no host kernel registered for shader '{}'", module.name),
            })?;
        let shader = module.name.clone();
        let group_layouts = match descriptor.layout {
            Some(layout) => state
                .pipeline_layouts
                .get(&layout)
                .cloned()
                .ok_or(ResourceError::NotFound)?,
            None => Vec::new(),
        };

        let id = ComputePipelineId(state.allocate_id());
        state.pipelines.insert(
            id,
            Pipeline {
                shader,
                kernel,
                group_layouts,
            },
        );
        log::debug!(
            "SoftwareDevice: Created compute pipeline '{}' with ID: {id:?}",
            label.as_deref().unwrap_or_default()
        );
        Ok(id)
    }

    fn destroy_compute_pipeline(&self, id: ComputePipelineId) -> Result<(), ResourceError> {
        match self.lock()?.pipelines.remove(&id) {
            Some(_) => Ok(()),
            None => Err(PipelineError::InvalidComputePipeline { id }.into()),
        }
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if descriptor.size > self.limits.max_buffer_size {
            return Err(ResourceError::BackendError(format!(
                "Buffer '{}' of {} bytes exceeds the device limit",
                descriptor.label.as_deref().unwrap_or_default(),
                descriptor.size
            )));
        }
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        let mut state = self.lock()?;
        let id = BufferId(state.allocate_id() as usize);
        log::debug!(
            "SoftwareDevice: Created buffer '{label}' with ID: {id:?}, size: {} bytes",
            descriptor.size
        );
        state
            .buffers
            .insert(id, SoftwareBuffer::new(label, descriptor.size, descriptor.usage));
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        match self.lock()?.buffers.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.lock()?;
        let buffer = state.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if !buffer.usage.contains(BufferUsage::COPY_DST) {
            return Err(ResourceError::BackendError(format!(
                "Buffer '{}' written from the host lacks COPY_DST usage",
                buffer.label
            )));
        }
        let end = offset + data.len() as u64;
        if end > buffer.size {
            return Err(ResourceError::OutOfBounds);
        }
        buffer.bytes_mut()[offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let state = self.lock()?;
        let buffer = state.buffer(id)?;
        if !buffer.usage.contains(BufferUsage::COPY_SRC) && !buffer.usage.contains(BufferUsage::MAP_READ) {
            return Err(ResourceError::BackendError(format!(
                "Buffer '{}' read back from the host lacks COPY_SRC usage",
                buffer.label
            )));
        }
        let end = offset + size;
        if end > buffer.size {
            return Err(ResourceError::OutOfBounds);
        }
        Ok(buffer.bytes()[offset as usize..end as usize].to_vec())
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let size = descriptor.size;
        let largest = size.width.max(size.height).max(size.depth_or_array_layers);
        if largest > self.limits.max_texture_dimension_3d {
            return Err(ResourceError::BackendError(format!(
                "Texture '{}' of {largest} texels exceeds the device limit",
                descriptor.label.as_deref().unwrap_or_default()
            )));
        }
        let label = descriptor.label.as_deref().unwrap_or_default().to_string();
        let mut state = self.lock()?;
        let id = TextureId(state.allocate_id() as usize);
        state.textures.insert(
            id,
            SoftwareTexture::new(label, size, descriptor.format, descriptor.usage),
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let mut state = self.lock()?;
        match state.textures.remove(&id) {
            Some(_) => {
                state.texture_views.retain(|_, texture| *texture != id);
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_texture_view(
        &self,
        texture_id: TextureId,
        _descriptor: &TextureViewDescriptor,
    ) -> Result<TextureViewId, ResourceError> {
        let mut state = self.lock()?;
        state.texture(texture_id)?;
        let id = TextureViewId(state.allocate_id() as usize);
        state.texture_views.insert(id, texture_id);
        Ok(id)
    }

    fn destroy_texture_view(&self, id: TextureViewId) -> Result<(), ResourceError> {
        match self.lock()?.texture_views.remove(&id) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn create_command_encoder(&self, label: Option<&str>) -> Box<dyn CommandEncoder> {
        Box::new(SoftwareCommandEncoder {
            label: label.map(str::to_string),
            commands: Vec::new(),
            device: self.clone(),
        })
    }

    fn submit_command_buffer(
        &self,
        command_buffer: CommandBufferId,
        signal: Option<FenceId>,
    ) -> Result<(), ResourceError> {
        let mut state = self.lock()?;
        if let Some(fence) = signal {
            if !state.fences.contains_key(&fence) {
                return Err(ResourceError::NotFound);
            }
        }
        let commands = state
            .pending_command_buffers
            .remove(&command_buffer)
            .ok_or(ResourceError::InvalidHandle)?;
        state.execute(&commands, &self.limits)?;
        if let Some(fence) = signal {
            state.fences.insert(fence, true);
        }
        Ok(())
    }

    fn create_fence(&self) -> Result<FenceId, ResourceError> {
        let mut state = self.lock()?;
        let id = FenceId(state.allocate_id());
        state.fences.insert(id, false);
        Ok(id)
    }

    fn wait_for_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        match self.lock()?.fences.get(&fence) {
            Some(true) => Ok(()),
            Some(false) => Err(ResourceError::FenceNeverSignaled(fence)),
            None => Err(ResourceError::NotFound),
        }
    }

    fn reset_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        match self.lock()?.fences.get_mut(&fence) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(ResourceError::NotFound),
        }
    }

    fn destroy_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        match self.lock()?.fences.remove(&fence) {
            Some(_) => Ok(()),
            None => Err(ResourceError::NotFound),
        }
    }

    fn get_adapter_info(&self) -> RendererAdapterInfo {
        RendererAdapterInfo {
            name: "Sylva software device".to_string(),
            backend_type: GraphicsBackendType::Software,
            device_type: RendererDeviceType::Cpu,
        }
    }

    fn get_limits(&self) -> DeviceLimits {
        self.limits
    }
}
