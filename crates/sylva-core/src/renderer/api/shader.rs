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

//! Shader modules: what goes in and the handle that comes back.

use std::borrow::Cow;

/// Source text of a module.
#[derive(Debug, Clone)]
pub enum ShaderSourceData<'a> {
    /// WGSL.
    Wgsl(Cow<'a, str>),
}

/// Input of [`crate::renderer::GraphicsDevice::create_shader_module`].
///
/// The label is the kernel name. The software backend cannot compile WGSL and
/// resolves its host kernel from it.
#[derive(Debug, Clone)]
pub struct ShaderModuleDescriptor<'a> {
    /// Kernel name, also used as the debug label.
    pub label: Option<&'a str>,
    /// Module source.
    pub source: ShaderSourceData<'a>,
}

impl<'a> ShaderModuleDescriptor<'a> {
    /// A labelled WGSL module.
    pub fn wgsl(label: &'a str, code: impl Into<Cow<'a, str>>) -> Self {
        Self {
            label: Some(label),
            source: ShaderSourceData::Wgsl(code.into()),
        }
    }
}

/// Handle to a compiled module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderModuleId(pub usize);
