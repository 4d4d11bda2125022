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

//! Indirect dispatch arguments.
//!
//! An indirect dispatch reads its workgroup counts from a GPU buffer at
//! execution time instead of taking them from the CPU. The counts are
//! usually written by an earlier compute pass, which therefore must be
//! separated from the dispatch by a
//! [`MemoryBarrier::IndirectCommandRead`](super::MemoryBarrier) barrier.

use crate::renderer::api::buffer::BufferId;
use bytemuck::{Pod, Zeroable};

/// The in-buffer layout of indirect dispatch arguments: three `u32`
/// workgroup counts.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchIndirect {
    /// Workgroups along x.
    pub x: u32,
    /// Workgroups along y.
    pub y: u32,
    /// Workgroups along z.
    pub z: u32,
}

impl DispatchIndirect {
    /// The size of the arguments in bytes.
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Arguments for a single workgroup.
    pub const ONE: Self = Self { x: 1, y: 1, z: 1 };

    /// Returns the counts as an `[x, y, z]` array.
    pub const fn to_array(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

/// A handle to indirect dispatch arguments living in a GPU buffer.
///
/// Command recording APIs accept this in place of literal workgroup counts.
/// The buffer must have been created with
/// [`BufferUsage::INDIRECT`](crate::renderer::BufferUsage::INDIRECT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndirectArgs {
    /// The buffer holding a [`DispatchIndirect`] value.
    pub buffer: BufferId,
    /// Byte offset of the arguments inside `buffer`. Must be a multiple of 4.
    pub offset: u64,
}

impl IndirectArgs {
    /// Arguments stored at the start of `buffer`.
    pub const fn at_start(buffer: BufferId) -> Self {
        Self { buffer, offset: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_indirect_is_three_packed_u32() {
        assert_eq!(DispatchIndirect::SIZE, 12);
        let bytes = bytemuck::bytes_of(&DispatchIndirect { x: 5, y: 1, z: 1 });
        assert_eq!(&bytes[0..4], &5u32.to_ne_bytes());
        assert_eq!(DispatchIndirect::ONE.to_array(), [1, 1, 1]);
    }

    #[test]
    fn indirect_args_at_start() {
        let args = IndirectArgs::at_start(BufferId(7));
        assert_eq!(args.buffer, BufferId(7));
        assert_eq!(args.offset, 0);
    }
}
