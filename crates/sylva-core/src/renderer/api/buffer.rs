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

//! Buffer descriptors and handles.

use crate::sylva_bitflags;
use std::borrow::Cow;

sylva_bitflags! {
    /// How a buffer may be used once created.
    ///
    /// Bit values match wgpu's `BufferUsages` so backends can pass them through.
    pub struct BufferUsage: u32 {
        /// Host readback through `read_buffer`.
        const MAP_READ = 1 << 0;
        /// Source of `copy_buffer_to_buffer`.
        const COPY_SRC = 1 << 2;
        /// Destination of copies and `write_buffer`.
        const COPY_DST = 1 << 3;
        /// Bindable as `var<storage>`.
        const STORAGE = 1 << 7;
        /// Holds `dispatch_workgroups_indirect` arguments.
        const INDIRECT = 1 << 8;
    }
}

/// Input of [`crate::renderer::GraphicsDevice::create_buffer`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Size in bytes, a multiple of 4.
    pub size: u64,
    /// Allowed usages.
    pub usage: BufferUsage,
    /// Create the buffer already mapped for a host write.
    pub mapped_at_creation: bool,
}

impl<'a> BufferDescriptor<'a> {
    /// A labelled, unmapped buffer.
    pub fn new(label: &'a str, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            usage,
            mapped_at_creation: false,
        }
    }
}

/// Handle to a buffer owned by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);
