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

//! Compute pipeline creation inputs.

use std::borrow::Cow;

use crate::renderer::api::{pipeline::PipelineLayoutId, shader::ShaderModuleId};

/// Handle to a compute pipeline, bound with
/// [`crate::renderer::ComputePass::set_pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputePipelineId(pub u64);

/// Input of [`crate::renderer::GraphicsDevice::create_compute_pipeline`].
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor<'a> {
    /// Debug label, normally the kernel name.
    pub label: Option<Cow<'a, str>>,
    /// Explicit layout. `None` lets the backend derive it from the module.
    pub layout: Option<PipelineLayoutId>,
    /// Module holding the entry point.
    pub shader_module: ShaderModuleId,
    /// Entry point function name.
    pub entry_point: Cow<'a, str>,
}
