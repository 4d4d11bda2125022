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

//! Detection of missing memory barriers between the commands of a submission.
//!
//! Every resource written by a command stays dirty until a barrier covering
//! the next access kind is recorded. Accessing a dirty resource is a hazard:
//! on a real GPU the access could observe stale data.

use std::collections::{BTreeSet, HashMap};
use sylva_core::renderer::{BufferId, MemoryBarrier, TextureId};

/// A resource touched by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Buffer(BufferId),
    Texture(TextureId),
}

/// The resources a command read and wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSet {
    pub reads: BTreeSet<ResourceKey>,
    pub writes: BTreeSet<ResourceKey>,
}

impl AccessSet {
    fn touched(&self) -> impl Iterator<Item = &ResourceKey> {
        self.reads.union(&self.writes)
    }
}

/// An access that was not ordered after the write it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hazard {
    pub resource: ResourceKey,
    /// Name of the command that wrote the resource.
    pub writer: String,
    /// The barrier that would have ordered the access.
    pub needed: MemoryBarrier,
}

#[derive(Debug, Default)]
pub struct HazardTracker {
    /// Writes not yet made visible to shader accesses.
    shader_dirty: HashMap<ResourceKey, String>,
    /// Writes not yet made visible to indirect-argument reads.
    indirect_dirty: HashMap<ResourceKey, String>,
}

impl HazardTracker {
    pub fn barrier(&mut self, barrier: MemoryBarrier) {
        if barrier.covers_shader_access() {
            self.shader_dirty.clear();
        }
        if barrier.covers_indirect_read() {
            self.indirect_dirty.clear();
        }
    }

    /// Checks an indirect-argument read of `resource`.
    pub fn check_indirect(&self, resource: ResourceKey) -> Result<(), Hazard> {
        match self.indirect_dirty.get(&resource) {
            Some(writer) => Err(Hazard {
                resource,
                writer: writer.clone(),
                needed: MemoryBarrier::IndirectCommandRead,
            }),
            None => Ok(()),
        }
    }

    /// Checks the accesses of a command against earlier writes, then marks its
    /// writes dirty.
    pub fn record(&mut self, command: &str, access: &AccessSet) -> Result<(), Hazard> {
        for resource in access.touched() {
            if let Some(writer) = self.shader_dirty.get(resource) {
                return Err(Hazard {
                    resource: *resource,
                    writer: writer.clone(),
                    needed: MemoryBarrier::ShaderReadWrite,
                });
            }
        }
        for resource in &access.writes {
            self.shader_dirty.insert(*resource, command.to_string());
            self.indirect_dirty.insert(*resource, command.to_string());
        }
        Ok(())
    }

    /// Forgets every pending write. Submissions are ordered against each other.
    pub fn end_submission(&mut self) {
        self.shader_dirty.clear();
        self.indirect_dirty.clear();
    }
}
