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

//! # Sylva Core
//!
//! Contracts shared by every crate of the octree builder: the compute device
//! and command recording traits, the backend-agnostic GPU descriptors, and the
//! agent and lane abstractions that drive a build.
//!
//! Concrete devices live in `sylva-infra`.

#![warn(missing_docs)]

pub mod agent;
pub mod lane;
pub mod math;
pub mod renderer;
pub mod utils;

pub use utils::timer::Stopwatch;
