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

//! Provides the counter sampler capability and its snapshot types.
//!
//! A sampler is taken exactly twice per run: immediately before the timed loop
//! and immediately after it. The pipeline only ever looks at the difference.

use std::borrow::Cow;
use std::fmt::Debug;

/// A raw snapshot of monotonically increasing hardware counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HwCounterSample {
    /// GPU cycles elapsed.
    pub gpu_cycles: u64,
    /// Bytes read from external memory.
    pub bandwidth_read: u64,
    /// Bytes written to external memory.
    pub bandwidth_write: u64,
}

/// Per-frame averages computed from two [`HwCounterSample`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HwCounterDelta {
    /// Average GPU cycles per frame.
    pub gpu_cycles: u64,
    /// Average bytes read per frame.
    pub bandwidth_read: u64,
    /// Average bytes written per frame.
    pub bandwidth_write: u64,
}

impl HwCounterSample {
    /// Computes `(end - self) / frames` for every counter.
    ///
    /// Counters that went backwards (e.g. after a wrap) saturate to zero.
    /// Returns `None` when `frames` is zero.
    pub fn delta_per_frame(&self, end: &HwCounterSample, frames: u64) -> Option<HwCounterDelta> {
        if frames == 0 {
            return None;
        }
        Some(HwCounterDelta {
            gpu_cycles: end.gpu_cycles.saturating_sub(self.gpu_cycles) / frames,
            bandwidth_read: end.bandwidth_read.saturating_sub(self.bandwidth_read) / frames,
            bandwidth_write: end.bandwidth_write.saturating_sub(self.bandwidth_write) / frames,
        })
    }
}

/// A resolved hardware-counter backend.
///
/// Implementations usually live behind a dynamically loaded library. When
/// resolution fails, callers substitute [`NoopCounterSampler`] so the run loop
/// never has to check for a missing backend.
pub trait CounterSampler: Send + Debug {
    /// Returns a human-readable identifier for the backend.
    fn name(&self) -> Cow<'static, str>;

    /// Takes a blocking sample. Returns `None` if the sample failed.
    fn sample(&self) -> Option<HwCounterSample>;
}

/// The default sampler: counters are unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCounterSampler;

impl CounterSampler for NoopCounterSampler {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed("none")
    }

    fn sample(&self) -> Option<HwCounterSample> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_averaged_over_frames() {
        let start = HwCounterSample {
            gpu_cycles: 1_000,
            bandwidth_read: 500,
            bandwidth_write: 100,
        };
        let end = HwCounterSample {
            gpu_cycles: 11_000,
            bandwidth_read: 2_500,
            bandwidth_write: 1_100,
        };

        let delta = start.delta_per_frame(&end, 10).unwrap();
        assert_eq!(delta.gpu_cycles, 1_000);
        assert_eq!(delta.bandwidth_read, 200);
        assert_eq!(delta.bandwidth_write, 100);
    }

    #[test]
    fn delta_without_frames_is_none() {
        let sample = HwCounterSample::default();
        assert!(sample.delta_per_frame(&sample, 0).is_none());
    }

    #[test]
    fn counters_going_backwards_saturate() {
        let start = HwCounterSample {
            gpu_cycles: 10,
            ..Default::default()
        };
        let delta = start
            .delta_per_frame(&HwCounterSample::default(), 1)
            .unwrap();
        assert_eq!(delta.gpu_cycles, 0);
    }

    #[test]
    fn noop_sampler_never_samples() {
        assert!(NoopCounterSampler.sample().is_none());
        assert_eq!(NoopCounterSampler.name(), "none");
    }
}
