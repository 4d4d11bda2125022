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

//! A CPU implementation of [`GraphicsDevice`](sylva_core::renderer::GraphicsDevice).
//!
//! Used to run and test chunk builds on machines without a GPU. Command
//! buffers execute at submission, so every fence is signaled by the time
//! `submit_command_buffer` returns.

mod command;
mod device;
mod hazard;
mod memory;

pub use command::{SoftwareCommandEncoder, SoftwareComputePass};
pub use device::{ExecutedCommand, SoftwareDevice};
