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

//! Results and timing statistics of scene builds.

use std::fmt;
use sylva_data::allocators::{ChunkAllocation, ChunkMemoryStats};
use sylva_data::svo::ChunkCoord;

/// What building one chunk produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkBuildOutcome {
    /// The chunk has no surface voxels. No octree was built or allocated.
    Empty,
    /// The chunk octree was built and copied into the shared buffer.
    Built {
        /// Number of surface voxels found.
        fragment_count: u32,
        /// Length of the chunk octree in slots.
        octree_len: u32,
        /// Where the octree lives in the shared buffer.
        allocation: ChunkAllocation,
    },
}

impl ChunkBuildOutcome {
    /// Returns `true` for [`ChunkBuildOutcome::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, ChunkBuildOutcome::Empty)
    }

    /// The shared buffer range of a built chunk.
    pub fn allocation(&self) -> Option<ChunkAllocation> {
        match self {
            ChunkBuildOutcome::Empty => None,
            ChunkBuildOutcome::Built { allocation, .. } => Some(*allocation),
        }
    }
}

/// Min, max and average wall-clock time of the built chunks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BuildTimingStats {
    /// Fastest chunk, in milliseconds.
    pub min_ms: f64,
    /// Slowest chunk, in milliseconds.
    pub max_ms: f64,
    /// Sum over every chunk, in milliseconds.
    pub total_ms: f64,
    /// Number of chunks measured.
    pub samples: usize,
}

impl BuildTimingStats {
    /// Adds the build time of one chunk.
    pub fn record(&mut self, ms: f64) {
        if self.samples == 0 {
            self.min_ms = ms;
            self.max_ms = ms;
        } else {
            self.min_ms = self.min_ms.min(ms);
            self.max_ms = self.max_ms.max(ms);
        }
        self.total_ms += ms;
        self.samples += 1;
    }

    /// Mean time per chunk, or zero without samples.
    pub fn avg_ms(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_ms / self.samples as f64
        }
    }
}

impl fmt::Display for BuildTimingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min {:.2} ms, max {:.2} ms, avg {:.2} ms",
            self.min_ms,
            self.max_ms,
            self.avg_ms()
        )
    }
}

/// The result of one `build_scene` run.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBuildReport {
    /// Every chunk of the grid with its outcome, in build order.
    pub chunks: Vec<(ChunkCoord, ChunkBuildOutcome)>,
    /// Build times of the non-empty chunks.
    pub timings: BuildTimingStats,
    /// Allocator state once the scene was built.
    pub allocator: ChunkMemoryStats,
}

impl SceneBuildReport {
    /// The outcome recorded for `coord`.
    pub fn outcome(&self, coord: ChunkCoord) -> Option<&ChunkBuildOutcome> {
        self.chunks
            .iter()
            .find(|(c, _)| *c == coord)
            .map(|(_, outcome)| outcome)
    }

    /// Number of chunks with an octree.
    pub fn built_count(&self) -> usize {
        self.chunks.iter().filter(|(_, o)| !o.is_empty()).count()
    }

    /// Number of chunks skipped as empty.
    pub fn empty_count(&self) -> usize {
        self.chunks.len() - self.built_count()
    }

    /// Total surface voxels over the scene.
    pub fn total_fragments(&self) -> u64 {
        self.chunks
            .iter()
            .map(|(_, outcome)| match outcome {
                ChunkBuildOutcome::Built { fragment_count, .. } => *fragment_count as u64,
                ChunkBuildOutcome::Empty => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_stats_track_extremes_and_mean() {
        let mut stats = BuildTimingStats::default();
        assert_eq!(stats.avg_ms(), 0.0);

        for ms in [4.0, 1.0, 7.0] {
            stats.record(ms);
        }
        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 7.0);
        assert_eq!(stats.avg_ms(), 4.0);
        assert_eq!(stats.to_string(), "min 1.00 ms, max 7.00 ms, avg 4.00 ms");
    }

    #[test]
    fn report_counts_outcomes() {
        let built = ChunkBuildOutcome::Built {
            fragment_count: 12,
            octree_len: 40,
            allocation: ChunkAllocation {
                offset: 0,
                size: 160,
            },
        };
        let report = SceneBuildReport {
            chunks: vec![
                (ChunkCoord::new(0, 0, 0), built),
                (ChunkCoord::new(1, 0, 0), ChunkBuildOutcome::Empty),
                (ChunkCoord::new(0, 1, 0), built),
            ],
            timings: BuildTimingStats::default(),
            allocator: ChunkMemoryStats::default(),
        };

        assert_eq!(report.built_count(), 2);
        assert_eq!(report.empty_count(), 1);
        assert_eq!(report.total_fragments(), 24);
        assert_eq!(
            report.outcome(ChunkCoord::new(1, 0, 0)),
            Some(&ChunkBuildOutcome::Empty)
        );
        assert_eq!(report.outcome(ChunkCoord::new(5, 0, 0)), None);
        assert_eq!(built.allocation().map(|a| a.size), Some(160));
    }
}
