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

//! Errors raised by compute devices and the objects they own.

use crate::renderer::api::command::ComputePipelineId;
use crate::renderer::api::shader::ShaderModuleId;
use crate::renderer::api::sync::FenceId;
use std::error::Error;
use std::fmt;

/// Failure to obtain or compile the source of one of the build kernels.
#[derive(Debug)]
pub enum ShaderError {
    /// Reading the kernel source failed.
    LoadError {
        /// Where the source was expected.
        path: String,
        /// What went wrong while reading it.
        source_error: String,
    },
    /// The device rejected the source.
    CompilationError {
        /// Module label, usually the kernel name.
        label: String,
        /// Compiler diagnostics.
        details: String,
    },
    /// No live module has this id.
    NotFound {
        /// The stale or foreign id.
        id: ShaderModuleId,
    },
    /// The shader source does not provide a kernel with this name.
    UnknownShader {
        /// Kernel name that was asked for.
        name: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadError { path, source_error } => {
                write!(f, "cannot read shader '{path}': {source_error}")
            }
            Self::CompilationError { label, details } => {
                write!(f, "shader '{label}' does not compile: {details}")
            }
            Self::NotFound { id } => write!(f, "no shader module with id {}", id.0),
            Self::UnknownShader { name } => write!(f, "no shader named '{name}'"),
        }
    }
}

impl Error for ShaderError {}

/// Failure to create or look up a compute pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// The bind group layout or pipeline layout could not be created.
    LayoutCreationFailed(String),
    /// The device refused the pipeline.
    CompilationFailed {
        /// Pipeline label, if one was given.
        label: Option<String>,
        /// Backend diagnostics.
        details: String,
    },
    /// The pipeline references a module that does not exist.
    InvalidShaderModuleForPipeline {
        /// The missing module.
        id: ShaderModuleId,
        /// Label of the pipeline being built.
        pipeline_label: Option<String>,
    },
    /// No live pipeline has this id.
    InvalidComputePipeline {
        /// The stale or foreign id.
        id: ComputePipelineId,
    },
}

fn label_or_unnamed(label: &Option<String>) -> &str {
    label.as_deref().unwrap_or("<unnamed>")
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LayoutCreationFailed(reason) => write!(f, "layout creation failed: {reason}"),
            Self::CompilationFailed { label, details } => write!(
                f,
                "pipeline '{}' was rejected: {details}",
                label_or_unnamed(label)
            ),
            Self::InvalidShaderModuleForPipeline { id, pipeline_label } => write!(
                f,
                "pipeline '{}' uses missing shader module {}",
                label_or_unnamed(pipeline_label),
                id.0
            ),
            Self::InvalidComputePipeline { id } => write!(f, "no compute pipeline with id {}", id.0),
        }
    }
}

impl Error for PipelineError {}

/// An invalid binding access made by a host reference kernel.
///
/// A GPU with robust buffer access would clamp or drop these accesses. The
/// host backend reports them so that sizing mistakes are caught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelFault {
    /// Nothing is bound at `(group, binding)`.
    MissingBinding {
        /// Bind group index.
        group: u32,
        /// Binding index.
        binding: u32,
    },
    /// The binding holds another kind of resource.
    WrongBindingType {
        /// Bind group index.
        group: u32,
        /// Binding index.
        binding: u32,
        /// What the kernel tried to access it as.
        expected: &'static str,
    },
    /// Element index or linearized texel index past the end of the binding.
    OutOfBounds {
        /// Bind group index.
        group: u32,
        /// Binding index.
        binding: u32,
        /// Index that was accessed.
        index: u64,
        /// Number of addressable elements.
        len: u64,
    },
}

impl fmt::Display for KernelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBinding { group, binding } => {
                write!(f, "nothing bound at @group({group}) @binding({binding})")
            }
            Self::WrongBindingType {
                group,
                binding,
                expected,
            } => write!(f, "@group({group}) @binding({binding}) is not a {expected}"),
            Self::OutOfBounds {
                group,
                binding,
                index,
                len,
            } => write!(
                f,
                "index {index} out of bounds for @group({group}) @binding({binding}) of length {len}"
            ),
        }
    }
}

impl Error for KernelFault {}

/// Error type returned by every [`crate::renderer::GraphicsDevice`] operation.
#[derive(Debug)]
pub enum ResourceError {
    /// See [`ShaderError`].
    Shader(ShaderError),
    /// See [`PipelineError`].
    Pipeline(PipelineError),
    /// The id does not name a live object.
    NotFound,
    /// The id names an object of the wrong kind or state.
    InvalidHandle,
    /// Error reported by the backend itself.
    BackendError(String),
    /// A write or read went past the end of a buffer or texture.
    OutOfBounds,
    /// Commands were recorded without the barrier their data dependency needs.
    SynchronizationHazard(String),
    /// A host reference kernel faulted during a dispatch.
    Kernel {
        /// The shader the kernel stands in for.
        shader: String,
        /// The fault raised by the kernel.
        fault: KernelFault,
    },
    /// A fence was waited on with no submission pending that would signal it.
    FenceNeverSignaled(FenceId),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shader(err) => write!(f, "shader: {err}"),
            Self::Pipeline(err) => write!(f, "pipeline: {err}"),
            Self::NotFound => f.write_str("unknown resource id"),
            Self::InvalidHandle => f.write_str("resource id of the wrong kind"),
            Self::BackendError(msg) => write!(f, "backend: {msg}"),
            Self::OutOfBounds => f.write_str("access out of bounds"),
            Self::SynchronizationHazard(msg) => write!(f, "synchronization hazard: {msg}"),
            Self::Kernel { shader, fault } => write!(f, "kernel '{shader}' faulted: {fault}"),
            Self::FenceNeverSignaled(id) => {
                write!(f, "fence {} has no pending submission to signal it", id.0)
            }
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Shader(err) => Some(err),
            Self::Pipeline(err) => Some(err),
            Self::Kernel { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        Self::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        Self::Pipeline(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_errors_name_the_kernel() {
        let err = ShaderError::LoadError {
            path: "shaders/octree_tag_node.wgsl".into(),
            source_error: "not found".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot read shader 'shaders/octree_tag_node.wgsl': not found"
        );
        let unknown = ShaderError::UnknownShader { name: "nope".into() };
        assert_eq!(unknown.to_string(), "no shader named 'nope'");
    }

    #[test]
    fn wrapped_errors_keep_their_source() {
        let err: ResourceError = ShaderError::NotFound {
            id: ShaderModuleId(42),
        }
        .into();
        assert_eq!(err.to_string(), "shader: no shader module with id 42");
        assert!(err.source().is_some());

        let err: ResourceError = PipelineError::CompilationFailed {
            label: None,
            details: "bad entry point".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "pipeline: pipeline '<unnamed>' was rejected: bad entry point"
        );
    }

    #[test]
    fn kernel_fault_is_reported_with_shader_name() {
        let err = ResourceError::Kernel {
            shader: "octree_tag_node".into(),
            fault: KernelFault::OutOfBounds {
                group: 0,
                binding: 4,
                index: 600,
                len: 584,
            },
        };
        assert_eq!(
            err.to_string(),
            "kernel 'octree_tag_node' faulted: index 600 out of bounds for @group(0) @binding(4) of length 584"
        );
        assert!(err.source().is_some());
        assert!(ResourceError::SynchronizationHazard("x".into()).source().is_none());
    }
}
