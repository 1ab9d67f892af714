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

//! Wall-clock measurement.

use std::time::{Duration, Instant};

/// A simple stopwatch started at construction.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Creates a stopwatch and starts it immediately.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Restarts the stopwatch.
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }

    /// Time elapsed since the stopwatch was started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time elapsed since the stopwatch was started, in fractional microseconds.
    pub fn elapsed_us_f64(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1e6
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
