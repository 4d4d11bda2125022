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

//! Pipeline layouts.

use crate::renderer::api::command::BindGroupLayoutId;

/// An opaque handle to a pipeline layout.
///
/// A pipeline layout lists the bind group layouts a pipeline expects, in
/// group-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineLayoutId(pub usize);

/// A descriptor used to create a [`PipelineLayoutId`].
#[derive(Debug, Clone)]
pub struct PipelineLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The bind group layouts, where index `i` describes `@group(i)`.
    pub bind_group_layouts: &'a [BindGroupLayoutId],
}
