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

use crate::renderer::error::ShaderError;
use std::borrow::Cow;
use std::fmt::Debug;

/// Supplies WGSL source text for named compute shaders.
///
/// Shader names are bare stage names such as `octree_tag_node`, without any
/// extension or directory.
pub trait ShaderSource: Send + Sync + Debug {
    /// Returns the WGSL source of the shader called `name`.
    fn load(&self, name: &str) -> Result<Cow<'static, str>, ShaderError>;

    /// A short human readable description of where sources come from, for logging.
    fn origin(&self) -> String;
}
