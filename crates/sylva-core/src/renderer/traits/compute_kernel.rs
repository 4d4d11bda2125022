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

//! The contract for host-side reference implementations of compute shaders.
//!
//! A software device runs one [`ComputeKernel`] invocation per global
//! invocation id of a dispatch, giving it access to the bound resources
//! through [`KernelBindings`]. Every access is checked: an out-of-range index
//! is a [`KernelFault`], never a silent clamp.

use crate::renderer::error::KernelFault;

/// Typed access to the resources bound to a dispatch, addressed by `(group, binding)`.
///
/// Buffers are addressed in `u32` elements, textures by texel coordinate.
pub trait KernelBindings {
    /// Loads the `u32` at element `index` of a buffer binding.
    fn load_u32(&self, group: u32, binding: u32, index: u64) -> Result<u32, KernelFault>;

    /// Stores `value` at element `index` of a buffer binding.
    fn store_u32(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
        value: u32,
    ) -> Result<(), KernelFault>;

    /// Adds `value` to element `index` and returns the previous value.
    fn atomic_add_u32(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
        value: u32,
    ) -> Result<u32, KernelFault>;

    /// Ors `value` into element `index` and returns the previous value.
    fn atomic_or_u32(
        &mut self,
        group: u32,
        binding: u32,
        index: u64,
        value: u32,
    ) -> Result<u32, KernelFault>;

    /// Returns the number of `u32` elements visible through a buffer binding.
    fn array_len_u32(&self, group: u32, binding: u32) -> Result<u64, KernelFault>;

    /// Loads the texel at `coord` of a `R32Uint` storage texture binding.
    fn texture_load_u32(&self, group: u32, binding: u32, coord: [u32; 3])
        -> Result<u32, KernelFault>;

    /// Stores `value` at `coord` of a `R32Uint` storage texture binding.
    fn texture_store_u32(
        &mut self,
        group: u32,
        binding: u32,
        coord: [u32; 3],
        value: u32,
    ) -> Result<(), KernelFault>;
}

/// A host implementation of one compute shader entry point.
pub trait ComputeKernel: Send + Sync {
    /// The `@workgroup_size` the shader declares.
    fn workgroup_size(&self) -> [u32; 3];

    /// Runs the shader body for one global invocation id.
    fn invoke(&self, global_id: [u32; 3], bindings: &mut dyn KernelBindings)
        -> Result<(), KernelFault>;
}
