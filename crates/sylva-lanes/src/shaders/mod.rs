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

//! WGSL sources of the build stages, embedded at compile time.
//!
//! Every shader declares a single `@compute fn main` and uses the binding
//! numbers of [`crate::svo_lane::resources::bindings`].

use std::borrow::Cow;
use sylva_core::renderer::{ShaderError, ShaderSource};

/// Samples the field at every lattice point of the chunk.
pub const CHUNK_FIELD_CONSTRUCTION_WGSL: &str = include_str!("chunk_field_construction.wgsl");

/// Appends one fragment per surface cell.
pub const CHUNK_VOXEL_CREATION_WGSL: &str = include_str!("chunk_voxel_creation.wgsl");

/// Sizes the first level's indirect dispatches.
pub const CHUNK_MODIFY_ARG_WGSL: &str = include_str!("chunk_modify_arg.wgsl");

/// Clears the allocation window.
pub const OCTREE_INIT_NODE_WGSL: &str = include_str!("octree_init_node.wgsl");

/// Tags the slots touched by fragments at the current level.
pub const OCTREE_TAG_NODE_WGSL: &str = include_str!("octree_tag_node.wgsl");

/// Allocates child blocks for tagged slots.
pub const OCTREE_ALLOC_NODE_WGSL: &str = include_str!("octree_alloc_node.wgsl");

/// Advances the allocation window by one level.
pub const OCTREE_MODIFY_ARG_WGSL: &str = include_str!("octree_modify_arg.wgsl");

/// Writes the chunk's offset into the chunks lookup.
pub const CHUNKS_BUILDER_WGSL: &str = include_str!("chunks_builder.wgsl");

/// Every embedded shader, by stage name.
pub const EMBEDDED_SHADERS: [(&str, &str); 8] = [
    ("chunk_field_construction", CHUNK_FIELD_CONSTRUCTION_WGSL),
    ("chunk_voxel_creation", CHUNK_VOXEL_CREATION_WGSL),
    ("chunk_modify_arg", CHUNK_MODIFY_ARG_WGSL),
    ("octree_init_node", OCTREE_INIT_NODE_WGSL),
    ("octree_tag_node", OCTREE_TAG_NODE_WGSL),
    ("octree_alloc_node", OCTREE_ALLOC_NODE_WGSL),
    ("octree_modify_arg", OCTREE_MODIFY_ARG_WGSL),
    ("chunks_builder", CHUNKS_BUILDER_WGSL),
];

/// Serves the shaders compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedShaderSource;

impl ShaderSource for EmbeddedShaderSource {
    fn load(&self, name: &str) -> Result<Cow<'static, str>, ShaderError> {
        EMBEDDED_SHADERS
            .iter()
            .find(|(shader, _)| *shader == name)
            .map(|(_, source)| Cow::Borrowed(*source))
            .ok_or_else(|| ShaderError::UnknownShader {
                name: name.to_string(),
            })
    }

    fn origin(&self) -> String {
        "embedded WGSL".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svo_lane::{SvoStage, STAGE_TABLE};

    #[test]
    fn every_stage_has_an_embedded_compute_shader() {
        for desc in STAGE_TABLE.iter() {
            let source = EmbeddedShaderSource.load(desc.shader).unwrap();
            assert!(source.contains("@compute"), "{}", desc.shader);
            assert!(source.contains("fn main"), "{}", desc.shader);
        }
        assert_eq!(EMBEDDED_SHADERS.len(), SvoStage::ALL.len());
    }

    #[test]
    fn workgroup_sizes_match_the_stage_table() {
        for desc in STAGE_TABLE.iter() {
            let [x, y, z] = desc.workgroup_size;
            let attribute = format!("@workgroup_size({x}, {y}, {z})");
            let source = EmbeddedShaderSource.load(desc.shader).unwrap();
            assert!(source.contains(&attribute), "{} lacks {attribute}", desc.shader);
        }
    }

    #[test]
    fn only_modify_arg_stages_touch_the_indirect_group() {
        for desc in STAGE_TABLE.iter() {
            let source = EmbeddedShaderSource.load(desc.shader).unwrap();
            assert_eq!(source.contains("@group(1)"), desc.writes_indirect_args, "{}", desc.shader);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(
            EmbeddedShaderSource.load("lit_forward"),
            Err(ShaderError::UnknownShader { .. })
        ));
    }
}
