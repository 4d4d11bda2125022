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

//! Wall-clock measurement helpers.

use std::time::{Duration, Instant};

/// A simple stopwatch started on creation.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start_time: Instant,
}

impl Stopwatch {
    /// Creates a stopwatch that starts counting immediately.
    #[inline]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Restarts the stopwatch and returns the time elapsed before the restart.
    #[inline]
    pub fn restart(&mut self) -> Duration {
        let elapsed = self.elapsed();
        self.start_time = Instant::now();
        elapsed
    }

    /// Returns the elapsed time since the stopwatch was started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the elapsed time in microseconds.
    #[inline]
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed().as_micros() as u64
    }

    /// Returns the elapsed time in milliseconds, with sub-millisecond precision.
    #[inline]
    pub fn elapsed_ms_f64(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
