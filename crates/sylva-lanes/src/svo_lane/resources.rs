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

//! The fixed set of GPU buffers and images shared by every build stage.

use crate::error::SvoError;
use sylva_core::math::Extent3D;
use sylva_core::renderer::api::*;
use sylva_core::renderer::{GraphicsDevice, ResourceError};
use sylva_data::allocators::ChunkAllocation;
use sylva_data::config::SvoBuilderConfig;
use sylva_data::svo::{
    level_count, worst_case_octree_len, ChunkCoord, ChunkGrid, ChunksInfo, FieldParams,
    FragmentListEntry, FragmentListInfo, OctreeBuildInfo, EMPTY_CHUNK, ROOT_BLOCK_LEN,
};

/// Bind group holding every resource written or read by the build stages.
pub const BUILD_GROUP: u32 = 0;
/// Bind group holding the indirect argument buffers as writable storage.
///
/// Only the modify-arg stages bind it, so an args buffer is never writable
/// storage in a dispatch that consumes it as indirect arguments.
pub const INDIRECT_GROUP: u32 = 1;

/// Binding slots. The numbering is shared with the WGSL shaders.
pub mod bindings {
    /// 3D `R32Uint` storage image of field samples, (dim+1)³ texels.
    pub const CHUNK_FIELD_IMAGE: u32 = 0;
    /// One `u32` per chunk: word offset into the shared octree buffer, or empty.
    pub const CHUNKS_LOOKUP: u32 = 1;
    /// Indirect arguments sized by the fragment count. Group 1.
    pub const INDIRECT_FRAG_LENGTH: u32 = 2;
    /// Index of the next free 8-slot block.
    pub const COUNTER: u32 = 3;
    /// The octree of the chunk being built.
    pub const CHUNK_OCTREE: u32 = 4;
    /// The fragment list of the chunk being built.
    pub const FRAGMENT_LIST: u32 = 5;
    /// `OctreeBuildInfo`.
    pub const BUILD_INFO: u32 = 6;
    /// Indirect arguments sized by the allocation window. Group 1.
    pub const INDIRECT_ALLOC_NUM: u32 = 7;
    /// `FragmentListInfo`.
    pub const FRAGMENT_LIST_INFO: u32 = 8;
    /// `ChunksInfo`.
    pub const CHUNKS_INFO: u32 = 9;
    /// Length of the chunk octree in slots.
    pub const OCTREE_LENGTH: u32 = 10;
    /// Word offset the chunk octree is copied to.
    pub const WRITE_OFFSET: u32 = 11;
    /// `FieldParams`.
    pub const FIELD_PARAMS: u32 = 12;
}

const STATE_USAGE: BufferUsage = BufferUsage::from_bits_truncate(
    BufferUsage::STORAGE.bits() | BufferUsage::COPY_DST.bits() | BufferUsage::COPY_SRC.bits(),
);
const INDIRECT_USAGE: BufferUsage =
    BufferUsage::from_bits_truncate(STATE_USAGE.bits() | BufferUsage::INDIRECT.bits());

/// Owns the buffers, images, layouts and bind groups of the octree builder.
///
/// Transient buffers are rewritten before every chunk build by
/// [`SvoResourceSet::reset_for_chunk`]. The chunks lookup and the shared
/// appended octree buffer persist across chunks and across pipeline rebuilds.
#[derive(Debug)]
pub struct SvoResourceSet {
    chunk_voxel_dim: u32,
    level_count: u32,
    grid: ChunkGrid,
    field_params: FieldParams,
    chunk_octree_len: u64,
    octree_buffer_capacity: u64,

    field_image: TextureId,
    field_image_view: TextureViewId,
    chunks_lookup: BufferId,
    indirect_frag_length: BufferId,
    counter: BufferId,
    chunk_octree: BufferId,
    fragment_list: BufferId,
    build_info: BufferId,
    indirect_alloc_num: BufferId,
    fragment_list_info: BufferId,
    chunks_info: BufferId,
    octree_length: BufferId,
    write_offset: BufferId,
    field_params_buffer: BufferId,
    appended_octree: BufferId,

    indirect_frag_args: IndirectArgs,
    indirect_alloc_args: IndirectArgs,

    build_layout: BindGroupLayoutId,
    indirect_layout: BindGroupLayoutId,
    build_group: BindGroupId,
    indirect_group: BindGroupId,
    build_pipeline_layout: PipelineLayoutId,
    indirect_pipeline_layout: PipelineLayoutId,
}

impl SvoResourceSet {
    /// Creates every resource of the builder on `device`.
    ///
    /// ## Errors
    /// * `SvoError::BufferTooLarge` - If a buffer exceeds the device limits.
    /// * `SvoError::DispatchTooLarge` - If a chunk could need more workgroups than a dispatch allows.
    /// * `SvoError::Resource` - If the device fails to create a resource.
    pub fn create(device: &dyn GraphicsDevice, config: &SvoBuilderConfig) -> Result<Self, SvoError> {
        config.validate()?;
        let limits = device.get_limits();
        let dim = config.chunk_voxel_dim;
        let grid = config.chunk_grid();
        let chunk_octree_len = worst_case_octree_len(dim);
        let cells = (dim as u64).pow(3);

        let check_storage = |label: &'static str, requested: u64| {
            if requested > limits.max_storage_buffer_binding_size {
                Err(SvoError::BufferTooLarge {
                    label,
                    requested,
                    max: limits.max_storage_buffer_binding_size,
                })
            } else {
                Ok(requested)
            }
        };
        let chunk_octree_size = check_storage("chunk_octree", chunk_octree_len * 4)?;
        let fragment_list_size = check_storage(
            "fragment_list",
            cells * std::mem::size_of::<FragmentListEntry>() as u64,
        )?;
        let lookup_size = check_storage("chunks_lookup", grid.chunk_count() as u64 * 4)?;
        if config.octree_buffer_capacity > limits.max_buffer_size {
            return Err(SvoError::BufferTooLarge {
                label: "appended_octree",
                requested: config.octree_buffer_capacity,
                max: limits.max_buffer_size,
            });
        }
        // Both the fragment count and the last level's window are bounded by dim³.
        let worst_workgroups = cells.div_ceil(64);
        if worst_workgroups > limits.max_compute_workgroups_per_dimension as u64 {
            return Err(SvoError::DispatchTooLarge {
                workgroups: worst_workgroups,
                max: limits.max_compute_workgroups_per_dimension,
            });
        }
        if dim + 1 > limits.max_texture_dimension_3d {
            return Err(SvoError::BufferTooLarge {
                label: "chunk_field_image",
                requested: (dim + 1) as u64,
                max: limits.max_texture_dimension_3d as u64,
            });
        }

        let buffer = |label: &'static str, size: u64, usage: BufferUsage| {
            device.create_buffer(&BufferDescriptor::new(label, size, usage))
        };

        let field_image = device.create_texture(&Self::field_image_descriptor(
            "chunk_field_image",
            dim,
            TextureUsage::STORAGE_BINDING | TextureUsage::COPY_SRC,
        ))?;
        let field_image_view = device.create_texture_view(
            field_image,
            &TextureViewDescriptor {
                label: Some("chunk_field_image_view"),
                dimension: Some(TextureViewDimension::D3),
            },
        )?;

        let chunks_lookup = buffer("chunks_lookup", lookup_size, STATE_USAGE)?;
        let indirect_frag_length =
            buffer("indirect_frag_length", DispatchIndirect::SIZE, INDIRECT_USAGE)?;
        let counter = buffer("counter", 4, STATE_USAGE)?;
        let chunk_octree = buffer("chunk_octree", chunk_octree_size, STATE_USAGE)?;
        let fragment_list = buffer(
            "fragment_list",
            fragment_list_size,
            BufferUsage::STORAGE | BufferUsage::COPY_SRC,
        )?;
        let build_info = buffer(
            "octree_build_info",
            std::mem::size_of::<OctreeBuildInfo>() as u64,
            STATE_USAGE,
        )?;
        let indirect_alloc_num =
            buffer("indirect_alloc_num", DispatchIndirect::SIZE, INDIRECT_USAGE)?;
        let fragment_list_info = buffer(
            "fragment_list_info",
            std::mem::size_of::<FragmentListInfo>() as u64,
            STATE_USAGE,
        )?;
        let chunks_info = buffer(
            "chunks_info",
            std::mem::size_of::<ChunksInfo>() as u64,
            STATE_USAGE,
        )?;
        let octree_length = buffer("octree_length", 4, STATE_USAGE)?;
        let write_offset = buffer("octree_write_offset", 4, STATE_USAGE)?;
        let field_params_buffer = buffer(
            "field_params",
            std::mem::size_of::<FieldParams>() as u64,
            STATE_USAGE,
        )?;
        let appended_octree = buffer(
            "appended_octree",
            config.octree_buffer_capacity,
            BufferUsage::COPY_DST | BufferUsage::COPY_SRC,
        )?;

        let build_entries = [
            BindGroupLayoutEntry::compute_storage_texture(
                bindings::CHUNK_FIELD_IMAGE,
                StorageTextureAccess::ReadWrite,
                TextureFormat::R32Uint,
                TextureViewDimension::D3,
            ),
            BindGroupLayoutEntry::compute_storage(bindings::CHUNKS_LOOKUP),
            BindGroupLayoutEntry::compute_storage(bindings::COUNTER),
            BindGroupLayoutEntry::compute_storage(bindings::CHUNK_OCTREE),
            BindGroupLayoutEntry::compute_storage(bindings::FRAGMENT_LIST),
            BindGroupLayoutEntry::compute_storage(bindings::BUILD_INFO),
            BindGroupLayoutEntry::compute_storage(bindings::FRAGMENT_LIST_INFO),
            BindGroupLayoutEntry::compute_storage(bindings::CHUNKS_INFO),
            BindGroupLayoutEntry::compute_storage(bindings::OCTREE_LENGTH),
            BindGroupLayoutEntry::compute_storage(bindings::WRITE_OFFSET),
            BindGroupLayoutEntry::compute_storage(bindings::FIELD_PARAMS),
        ];
        let build_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("svo_build_layout"),
            entries: &build_entries,
        })?;
        let indirect_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("svo_indirect_args_layout"),
            entries: &[
                BindGroupLayoutEntry::compute_storage(bindings::INDIRECT_FRAG_LENGTH),
                BindGroupLayoutEntry::compute_storage(bindings::INDIRECT_ALLOC_NUM),
            ],
        })?;

        let build_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("svo_build_group"),
            layout: build_layout,
            entries: &[
                BindGroupEntry::texture_view(bindings::CHUNK_FIELD_IMAGE, field_image_view),
                BindGroupEntry::whole_buffer(bindings::CHUNKS_LOOKUP, chunks_lookup),
                BindGroupEntry::whole_buffer(bindings::COUNTER, counter),
                BindGroupEntry::whole_buffer(bindings::CHUNK_OCTREE, chunk_octree),
                BindGroupEntry::whole_buffer(bindings::FRAGMENT_LIST, fragment_list),
                BindGroupEntry::whole_buffer(bindings::BUILD_INFO, build_info),
                BindGroupEntry::whole_buffer(bindings::FRAGMENT_LIST_INFO, fragment_list_info),
                BindGroupEntry::whole_buffer(bindings::CHUNKS_INFO, chunks_info),
                BindGroupEntry::whole_buffer(bindings::OCTREE_LENGTH, octree_length),
                BindGroupEntry::whole_buffer(bindings::WRITE_OFFSET, write_offset),
                BindGroupEntry::whole_buffer(bindings::FIELD_PARAMS, field_params_buffer),
            ],
        })?;
        let indirect_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("svo_indirect_args_group"),
            layout: indirect_layout,
            entries: &[
                BindGroupEntry::whole_buffer(bindings::INDIRECT_FRAG_LENGTH, indirect_frag_length),
                BindGroupEntry::whole_buffer(bindings::INDIRECT_ALLOC_NUM, indirect_alloc_num),
            ],
        })?;

        let build_pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("svo_build_pipeline_layout"),
            bind_group_layouts: &[build_layout],
        })?;
        let indirect_pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("svo_modify_arg_pipeline_layout"),
            bind_group_layouts: &[build_layout, indirect_layout],
        })?;

        log::debug!(
            "Created SVO resources: chunk dim {dim}, {} levels, grid {:?}, chunk octree {} slots, shared buffer {} bytes",
            level_count(dim),
            grid.dims(),
            chunk_octree_len,
            config.octree_buffer_capacity
        );

        Ok(Self {
            chunk_voxel_dim: dim,
            level_count: level_count(dim),
            grid,
            field_params: FieldParams::from(&config.field),
            chunk_octree_len,
            octree_buffer_capacity: config.octree_buffer_capacity,
            field_image,
            field_image_view,
            chunks_lookup,
            indirect_frag_length,
            counter,
            chunk_octree,
            fragment_list,
            build_info,
            indirect_alloc_num,
            fragment_list_info,
            chunks_info,
            octree_length,
            write_offset,
            field_params_buffer,
            appended_octree,
            indirect_frag_args: IndirectArgs::at_start(indirect_frag_length),
            indirect_alloc_args: IndirectArgs::at_start(indirect_alloc_num),
            build_layout,
            indirect_layout,
            build_group,
            indirect_group,
            build_pipeline_layout,
            indirect_pipeline_layout,
        })
    }

    fn field_image_descriptor(label: &str, dim: u32, usage: TextureUsage) -> TextureDescriptor<'_> {
        TextureDescriptor {
            label: Some(label.into()),
            size: Extent3D::cube(dim + 1),
            dimension: TextureDimension::D3,
            format: TextureFormat::R32Uint,
            usage,
        }
    }

    /// Rewrites every transient buffer for a build of `coord`.
    ///
    /// Block 0 is reserved for the root's children: the counter starts at 1,
    /// the octree length at 8 and the allocation window at `[0, 8)`.
    pub fn reset_for_chunk(
        &self,
        device: &dyn GraphicsDevice,
        coord: ChunkCoord,
    ) -> Result<(), ResourceError> {
        device.write_buffer(self.counter, 0, bytemuck::bytes_of(&1u32))?;
        device.write_buffer(
            self.build_info,
            0,
            bytemuck::bytes_of(&OctreeBuildInfo {
                alloc_begin: 0,
                alloc_num: ROOT_BLOCK_LEN,
                level: 0,
                level_count: self.level_count,
            }),
        )?;
        device.write_buffer(
            self.indirect_frag_length,
            0,
            bytemuck::bytes_of(&DispatchIndirect::ONE),
        )?;
        device.write_buffer(
            self.indirect_alloc_num,
            0,
            bytemuck::bytes_of(&DispatchIndirect::ONE),
        )?;
        device.write_buffer(
            self.fragment_list_info,
            0,
            bytemuck::bytes_of(&FragmentListInfo {
                voxel_resolution: self.chunk_voxel_dim,
                voxel_fragment_count: 0,
            }),
        )?;
        device.write_buffer(
            self.chunks_info,
            0,
            bytemuck::bytes_of(&ChunksInfo::new(self.grid.dims(), coord.to_array())),
        )?;
        device.write_buffer(self.octree_length, 0, bytemuck::bytes_of(&ROOT_BLOCK_LEN))?;
        device.write_buffer(
            self.chunk_octree,
            0,
            bytemuck::cast_slice(&[0u32; ROOT_BLOCK_LEN as usize]),
        )?;
        device.write_buffer(
            self.field_params_buffer,
            0,
            bytemuck::bytes_of(&self.field_params),
        )?;
        log::trace!("Reset transient SVO buffers for chunk {coord}");
        Ok(())
    }

    /// Marks every chunk of the lookup as empty.
    pub fn clear_chunks_lookup(&self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        let empty = vec![EMPTY_CHUNK; self.grid.chunk_count()];
        device.write_buffer(self.chunks_lookup, 0, bytemuck::cast_slice(&empty))
    }

    /// Sets the word offset the next chunk octree is copied to.
    pub fn set_write_offset(
        &self,
        device: &dyn GraphicsDevice,
        word_offset: u32,
    ) -> Result<(), ResourceError> {
        device.write_buffer(self.write_offset, 0, bytemuck::bytes_of(&word_offset))
    }

    /// Reads back the number of fragments produced for the current chunk.
    pub fn read_fragment_count(&self, device: &dyn GraphicsDevice) -> Result<u32, ResourceError> {
        let info: FragmentListInfo = read_pod(device, self.fragment_list_info)?;
        Ok(info.voxel_fragment_count)
    }

    /// Reads back the final length, in slots, of the current chunk octree.
    pub fn read_octree_len(&self, device: &dyn GraphicsDevice) -> Result<u32, ResourceError> {
        read_pod(device, self.octree_length)
    }

    /// Reads back the chunks lookup, one entry per chunk in row-major order.
    pub fn read_chunks_lookup(&self, device: &dyn GraphicsDevice) -> Result<Vec<u32>, ResourceError> {
        let bytes = device.read_buffer(self.chunks_lookup, 0, self.grid.chunk_count() as u64 * 4)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Reads back the words of one allocation of the shared octree buffer.
    pub fn read_appended_words(
        &self,
        device: &dyn GraphicsDevice,
        allocation: ChunkAllocation,
    ) -> Result<Vec<u32>, ResourceError> {
        let bytes = device.read_buffer(self.appended_octree, allocation.offset, allocation.size)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Reads back the first `len` slots of the per-chunk octree buffer.
    pub fn read_chunk_octree(
        &self,
        device: &dyn GraphicsDevice,
        len: u32,
    ) -> Result<Vec<u32>, ResourceError> {
        let bytes = device.read_buffer(self.chunk_octree, 0, len as u64 * 4)?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Allocates the persistent field image of a non-empty chunk.
    pub fn create_chunk_field_image(
        &self,
        device: &dyn GraphicsDevice,
        coord: ChunkCoord,
    ) -> Result<TextureId, ResourceError> {
        let label = format!("chunk_field_image_{}_{}_{}", coord.x, coord.y, coord.z);
        device.create_texture(&Self::field_image_descriptor(
            &label,
            self.chunk_voxel_dim,
            TextureUsage::COPY_DST | TextureUsage::COPY_SRC | TextureUsage::TEXTURE_BINDING,
        ))
    }

    /// Releases every resource.
    pub fn destroy(self, device: &dyn GraphicsDevice) {
        let _ = device.destroy_bind_group(self.build_group);
        let _ = device.destroy_bind_group(self.indirect_group);
        for buffer in [
            self.chunks_lookup,
            self.indirect_frag_length,
            self.counter,
            self.chunk_octree,
            self.fragment_list,
            self.build_info,
            self.indirect_alloc_num,
            self.fragment_list_info,
            self.chunks_info,
            self.octree_length,
            self.write_offset,
            self.field_params_buffer,
            self.appended_octree,
        ] {
            if let Err(e) = device.destroy_buffer(buffer) {
                log::warn!("Failed to destroy SVO buffer {buffer:?}: {e}");
            }
        }
        let _ = device.destroy_texture_view(self.field_image_view);
        let _ = device.destroy_texture(self.field_image);
    }

    /// Voxels along each chunk edge.
    pub fn chunk_voxel_dim(&self) -> u32 {
        self.chunk_voxel_dim
    }

    /// Octree levels per chunk.
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    /// The chunk grid.
    pub fn grid(&self) -> ChunkGrid {
        self.grid
    }

    /// Length, in slots, of the per-chunk octree buffer.
    pub fn chunk_octree_len(&self) -> u64 {
        self.chunk_octree_len
    }

    /// Size in bytes of the shared appended octree buffer.
    pub fn octree_buffer_capacity(&self) -> u64 {
        self.octree_buffer_capacity
    }

    /// Extent of the field images.
    pub fn field_image_extent(&self) -> Extent3D {
        Extent3D::cube(self.chunk_voxel_dim + 1)
    }

    /// The shared field image written by field construction.
    pub fn field_image(&self) -> TextureId {
        self.field_image
    }

    /// The shared, append-only buffer holding every finished chunk octree.
    pub fn appended_octree_buffer(&self) -> BufferId {
        self.appended_octree
    }

    /// The chunks lookup buffer.
    pub fn chunks_lookup_buffer(&self) -> BufferId {
        self.chunks_lookup
    }

    /// The per-chunk octree buffer.
    pub fn chunk_octree_buffer(&self) -> BufferId {
        self.chunk_octree
    }

    /// Indirect arguments sized by the fragment count.
    pub fn indirect_frag_args(&self) -> &IndirectArgs {
        &self.indirect_frag_args
    }

    /// Indirect arguments sized by the allocation window.
    pub fn indirect_alloc_args(&self) -> &IndirectArgs {
        &self.indirect_alloc_args
    }

    /// Bind group 0.
    pub fn build_group(&self) -> &BindGroupId {
        &self.build_group
    }

    /// Bind group 1.
    pub fn indirect_group(&self) -> &BindGroupId {
        &self.indirect_group
    }

    /// Pipeline layout with group 0 only.
    pub fn build_pipeline_layout(&self) -> PipelineLayoutId {
        self.build_pipeline_layout
    }

    /// Pipeline layout with groups 0 and 1.
    pub fn indirect_pipeline_layout(&self) -> PipelineLayoutId {
        self.indirect_pipeline_layout
    }

    /// The layout of bind group 0.
    pub fn build_layout(&self) -> BindGroupLayoutId {
        self.build_layout
    }

    /// The layout of bind group 1.
    pub fn indirect_layout(&self) -> BindGroupLayoutId {
        self.indirect_layout
    }
}

fn read_pod<T: bytemuck::Pod>(
    device: &dyn GraphicsDevice,
    buffer: BufferId,
) -> Result<T, ResourceError> {
    let bytes = device.read_buffer(buffer, 0, std::mem::size_of::<T>() as u64)?;
    bytemuck::try_pod_read_unaligned(&bytes).map_err(|e| {
        ResourceError::BackendError(format!("readback of {buffer:?} returned {} bytes: {e}", bytes.len()))
    })
}
