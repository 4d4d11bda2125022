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

//! # Lane Abstraction
//!
//! A **Lane** is a reusable processing strategy driven by an agent. Each lane
//! encapsulates one step of a domain task and knows how to record its GPU
//! work; the agent decides when, and in which order, lanes run.
//!
//! The system follows a two-level trait hierarchy:
//!
//! 1. **`Lane`** (this trait): identity and classification shared by all lanes.
//! 2. **Domain-specific traits** extend `Lane` with execution methods, e.g. the
//!    octree-building lanes in `sylva-lanes`.

use std::any::Any;
use std::fmt;

/// Error type for lane operations.
#[derive(Debug)]
pub enum LaneError {
    /// The lane has not been initialized yet.
    NotInitialized,
    /// A resource the lane depends on is missing from its context.
    MissingResource(&'static str),
    /// A domain-specific error occurred during command recording or execution.
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::NotInitialized => write!(f, "Lane not initialized"),
            LaneError::MissingResource(name) => {
                write!(f, "Lane resource '{name}' is not available")
            }
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Classification of lane types, used for logging and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneKind {
    /// Turns a volumetric field into a list of occupied voxels.
    Voxelization,
    /// Builds octree nodes from a fragment list.
    OctreeConstruction,
    /// Moves finished data into persistent, shared storage.
    Output,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::Voxelization => write!(f, "Voxelization"),
            LaneKind::OctreeConstruction => write!(f, "OctreeConstruction"),
            LaneKind::Output => write!(f, "Output"),
        }
    }
}

/// The unified base trait for all lanes.
pub trait Lane: Send + Sync {
    /// A stable, human-readable name for the strategy this lane implements.
    fn strategy_name(&self) -> &'static str;

    /// The kind of work this lane performs.
    fn lane_kind(&self) -> LaneKind;

    /// Allows downcasting to the concrete lane type.
    fn as_any(&self) -> &dyn Any;

    /// Allows mutable downcasting to the concrete lane type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn lane_error_display() {
        assert_eq!(LaneError::NotInitialized.to_string(), "Lane not initialized");
        assert_eq!(
            LaneError::MissingResource("fragment list").to_string(),
            "Lane resource 'fragment list' is not available"
        );
    }

    #[test]
    fn execution_failed_exposes_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "device lost");
        let err = LaneError::ExecutionFailed(Box::new(inner));
        assert_eq!(err.to_string(), "Lane execution failed: device lost");
        assert!(err.source().is_some());
    }

    #[test]
    fn lane_kind_display() {
        assert_eq!(LaneKind::OctreeConstruction.to_string(), "OctreeConstruction");
    }
}
