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

//! Memory barriers between compute passes.

use std::fmt;

/// A memory/execution dependency recorded between two commands.
///
/// Every command recorded after the barrier observes the writes of every
/// compute shader recorded before it, for the access kind the barrier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryBarrier {
    /// Compute-shader writes become visible to compute-shader reads and writes.
    ShaderReadWrite,
    /// Compute-shader writes become visible to indirect-argument reads.
    IndirectCommandRead,
    /// Both of the above.
    Full,
}

impl MemoryBarrier {
    /// Returns `true` if the barrier orders shader writes before shader accesses.
    pub const fn covers_shader_access(&self) -> bool {
        matches!(self, MemoryBarrier::ShaderReadWrite | MemoryBarrier::Full)
    }

    /// Returns `true` if the barrier orders shader writes before indirect reads.
    pub const fn covers_indirect_read(&self) -> bool {
        matches!(self, MemoryBarrier::IndirectCommandRead | MemoryBarrier::Full)
    }
}

impl fmt::Display for MemoryBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryBarrier::ShaderReadWrite => write!(f, "shader-write -> shader-read/write"),
            MemoryBarrier::IndirectCommandRead => write!(f, "shader-write -> indirect-read"),
            MemoryBarrier::Full => write!(f, "shader-write -> all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage() {
        assert!(MemoryBarrier::ShaderReadWrite.covers_shader_access());
        assert!(!MemoryBarrier::ShaderReadWrite.covers_indirect_read());
        assert!(MemoryBarrier::IndirectCommandRead.covers_indirect_read());
        assert!(!MemoryBarrier::IndirectCommandRead.covers_shader_access());
        assert!(MemoryBarrier::Full.covers_shader_access());
        assert!(MemoryBarrier::Full.covers_indirect_read());
    }
}
