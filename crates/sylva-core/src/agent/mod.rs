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

//! Traits for autonomous subsystems (Agents).

use std::any::Any;

/// A snapshot of an agent's health, suitable for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    /// The agent that produced the report.
    pub agent: &'static str,
    /// `true` once the agent has produced a complete result at least once.
    pub ready: bool,
    /// A short human-readable summary of the agent's state.
    pub message: String,
}

impl AgentStatus {
    /// Emits the status at `info` level, or `warn` if the agent is not ready.
    pub fn log(&self) {
        if self.ready {
            log::info!("[{}] {}", self.agent, self.message);
        } else {
            log::warn!("[{}] not ready: {}", self.agent, self.message);
        }
    }
}

/// The foundational interface for a subsystem agent.
///
/// An agent owns its lanes and GPU resources, and is driven by the host
/// application through [`Agent::update`].
pub trait Agent: Send {
    /// The error type returned when an update fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the agent's name, used in logs.
    fn name(&self) -> &'static str;

    /// Periodically updates the agent, performing any pending work.
    fn update(&mut self) -> Result<(), Self::Error>;

    /// Reports the current status of the agent.
    fn report_status(&self) -> AgentStatus;

    /// Allows downcasting to concrete agent types.
    fn as_any(&self) -> &dyn Any;

    /// Allows mutable downcasting to concrete agent types.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
