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

//! Host memory behind software buffers and textures, and the binding table a
//! kernel sees during a dispatch.

use super::hazard::{AccessSet, ResourceKey};
use std::cell::RefCell;
use std::collections::HashMap;
use sylva_core::math::Extent3D;
use sylva_core::renderer::{
    BufferId, BufferUsage, KernelBindings, KernelFault, TextureFormat, TextureId, TextureUsage,
};

#[derive(Debug)]
pub struct SoftwareBuffer {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
    /// Contents, padded up to a whole word.
    pub words: Vec<u32>,
}

impl SoftwareBuffer {
    pub fn new(label: String, size: u64, usage: BufferUsage) -> Self {
        Self {
            label,
            size,
            usage,
            words: vec![0; size.div_ceil(4) as usize],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.size as usize]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        let size = self.size as usize;
        &mut bytemuck::cast_slice_mut(&mut self.words)[..size]
    }
}

/// A texture stored as one `u32` per texel, whatever its format.
#[derive(Debug)]
pub struct SoftwareTexture {
    pub label: String,
    pub extent: Extent3D,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub texels: Vec<u32>,
}

impl SoftwareTexture {
    pub fn new(label: String, extent: Extent3D, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label,
            extent,
            format,
            usage,
            texels: vec![0; extent.volume() as usize],
        }
    }

    /// Row-major index of `coord`, `None` outside the texture.
    pub fn index(&self, coord: [u32; 3]) -> Option<usize> {
        let [w, h, d] = self.extent.to_array();
        if coord[0] >= w || coord[1] >= h || coord[2] >= d {
            return None;
        }
        Some(coord[0] as usize + w as usize * (coord[1] as usize + h as usize * coord[2] as usize))
    }
}

/// A resource bound at one `(group, binding)` slot of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// A word range of a buffer.
    Buffer {
        id: BufferId,
        first_word: usize,
        len_words: usize,
    },
    Texture(TextureId),
}

/// The binding table of one dispatch. Records which resources the kernel
/// actually touched.
pub struct DispatchBindings<'a> {
    buffers: &'a mut HashMap<BufferId, SoftwareBuffer>,
    textures: &'a mut HashMap<TextureId, SoftwareTexture>,
    bound: HashMap<(u32, u32), Bound>,
    reads: RefCell<AccessSet>,
    writes: AccessSet,
}

impl<'a> DispatchBindings<'a> {
    pub fn new(
        buffers: &'a mut HashMap<BufferId, SoftwareBuffer>,
        textures: &'a mut HashMap<TextureId, SoftwareTexture>,
        bound: HashMap<(u32, u32), Bound>,
    ) -> Self {
        Self {
            buffers,
            textures,
            bound,
            reads: RefCell::new(AccessSet::default()),
            writes: AccessSet::default(),
        }
    }

    /// Every resource read and written so far.
    pub fn into_access(self) -> AccessSet {
        AccessSet {
            reads: self.reads.into_inner().reads,
            writes: self.writes.writes,
        }
    }

    fn binding(&self, group: u32, binding: u32) -> Result<Bound, KernelFault> {
        self.bound
            .get(&(group, binding))
            .copied()
            .ok_or(KernelFault::MissingBinding { group, binding })
    }

    /// Resolves a buffer element to `(buffer, word index)`.
    fn word(&self, group: u32, binding: u32, index: u64) -> Result<(BufferId, usize), KernelFault> {
        match self.binding(group, binding)? {
            Bound::Buffer {
                id,
                first_word,
                len_words,
            } => {
                if index >= len_words as u64 {
                    return Err(KernelFault::OutOfBounds {
                        group,
                        binding,
                        index,
                        len: len_words as u64,
                    });
                }
                Ok((id, first_word + index as usize))
            }
            Bound::Texture(_) => Err(KernelFault::WrongBindingType {
                group,
                binding,
                expected: "storage buffer",
            }),
        }
    }

    fn texture_id(&self, group: u32, binding: u32) -> Result<TextureId, KernelFault> {
        match self.binding(group, binding)? {
            Bound::Texture(id) => Ok(id),
            Bound::Buffer { .. } => Err(KernelFault::WrongBindingType {
                group,
                binding,
                expected: "storage texture",
            }),
        }
    }

    fn texel(
        &self,
        group: u32,
        binding: u32,
        coord: [u32; 3],
    ) -> Result<(TextureId, usize), KernelFault> {
        let id = self.texture_id(group, binding)?;
        let texture = self
            .textures
            .get(&id)
            .ok_or(KernelFault::MissingBinding { group, binding })?;
        let index = texture.index(coord).ok_or_else(|| {
            let [w, h, _] = texture.extent.to_array();
            KernelFault::OutOfBounds {
                group,
                binding,
                index: coord[0] as u64 + w as u64 * (coord[1] as u64 + h as u64 * coord[2] as u64),
                len: texture.extent.volume(),
            }
        })?;
        Ok((id, index))
    }

    fn word_mut(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
    ) -> Result<&mut u32, KernelFault> {
        let (id, word) = self.word(group, binding, index)?;
        self.writes.writes.insert(ResourceKey::Buffer(id));
        self.buffers
            .get_mut(&id)
            .and_then(|buffer| buffer.words.get_mut(word))
            .ok_or(KernelFault::MissingBinding { group, binding })
    }
}

impl KernelBindings for DispatchBindings<'_> {
    fn load_u32(&self, group: u32, binding: u32, index: u64) -> Result<u32, KernelFault> {
        let (id, word) = self.word(group, binding, index)?;
        self.reads.borrow_mut().reads.insert(ResourceKey::Buffer(id));
        self.buffers
            .get(&id)
            .and_then(|buffer| buffer.words.get(word))
            .copied()
            .ok_or(KernelFault::MissingBinding { group, binding })
    }

    fn store_u32(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
        value: u32,
    ) -> Result<(), KernelFault> {
        *self.word_mut(group, binding, index)? = value;
        Ok(())
    }

    fn atomic_add_u32(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
        value: u32,
    ) -> Result<u32, KernelFault> {
        let slot = self.word_mut(group, binding, index)?;
        let old = *slot;
        *slot = old.wrapping_add(value);
        Ok(old)
    }

    fn atomic_or_u32(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
        value: u32,
    ) -> Result<u32, KernelFault> {
        let slot = self.word_mut(group, binding, index)?;
        let old = *slot;
        *slot = old | value;
        Ok(old)
    }

    fn array_len_u32(&self, group: u32, binding: u32) -> Result<u64, KernelFault> {
        match self.binding(group, binding)? {
            Bound::Buffer { len_words, .. } => Ok(len_words as u64),
            Bound::Texture(_) => Err(KernelFault::WrongBindingType {
                group,
                binding,
                expected: "storage buffer",
            }),
        }
    }

    fn texture_load_u32(
        &self,
        group: u32,
        binding: u32,
        coord: [u32; 3],
    ) -> Result<u32, KernelFault> {
        let (id, index) = self.texel(group, binding, coord)?;
        self.reads.borrow_mut().reads.insert(ResourceKey::Texture(id));
        self.textures
            .get(&id)
            .and_then(|texture| texture.texels.get(index))
            .copied()
            .ok_or(KernelFault::MissingBinding { group, binding })
    }

    fn texture_store_u32(
        &mut self,
        group: u32,
        binding: u32,
        coord: [u32; 3],
        value: u32,
    ) -> Result<(), KernelFault> {
        let (id, index) = self.texel(group, binding, coord)?;
        self.writes.writes.insert(ResourceKey::Texture(id));
        let texel = self
            .textures
            .get_mut(&id)
            .and_then(|texture| texture.texels.get_mut(index))
            .ok_or(KernelFault::MissingBinding { group, binding })?;
        *texel = value;
        Ok(())
    }
}
