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

//! The outer run loop: poll, acquire, render, present.

use crate::pipeline::{FrameTarget, HeadlessPipeline};
use anyhow::{Context, Result};
use framepipe_core::renderer::{AdapterInfo, HeadlessDevice, SemaphoreId};
use framepipe_core::telemetry::{CounterSampler, HwCounterDelta};
use framepipe_core::Stopwatch;
use std::path::PathBuf;

/// The application driven by a [`HeadlessRunner`].
pub trait FrameApplication {
    /// Pumps pending input and returns whether the application is still alive.
    fn poll(&mut self) -> bool;

    /// Renders one frame into `target.texture`.
    ///
    /// The application must wait on `target.acquire` before writing the image.
    /// ## Returns
    /// The semaphore signaled when rendering has completed, or `None` if
    /// nothing was submitted.
    fn render_frame(
        &mut self,
        device: &dyn HeadlessDevice,
        target: &FrameTarget,
    ) -> Result<Option<SemaphoreId>>;
}

/// Options of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum number of timed frames. `None` runs until the application stops.
    pub frame_budget: Option<u64>,
    /// Writes one extra frame to this path after the timed loop.
    pub reference_path: Option<PathBuf>,
}

/// The outcome of [`HeadlessRunner::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Untimed frames rendered before the clock started.
    pub warmup_frames: u64,
    /// Timed frames, the denominator of every average.
    pub rendered_frames: u64,
    /// Average wall-clock time per timed frame, in microseconds.
    pub average_frame_time_us: f64,
    /// Per-frame counter averages, if both samples succeeded.
    pub counters: Option<HwCounterDelta>,
    /// Frame counter of the pipeline at the end of the run.
    pub total_frames: u64,
    /// The adapter that rendered the frames.
    pub adapter: AdapterInfo,
}

/// Drives a [`FrameApplication`] through a [`HeadlessPipeline`].
#[derive(Debug)]
pub struct HeadlessRunner {
    pipeline: HeadlessPipeline,
    options: RunOptions,
}

impl HeadlessRunner {
    /// Creates a runner owning `pipeline`.
    pub fn new(pipeline: HeadlessPipeline, options: RunOptions) -> Self {
        Self { pipeline, options }
    }

    /// The driven pipeline.
    pub fn pipeline(&self) -> &HeadlessPipeline {
        &self.pipeline
    }

    /// Runs one warm-up frame, the timed loop, and the optional reference frame.
    ///
    /// Workers are drained and the device idled on both sides of the timed
    /// loop, so neither warm-up costs nor disk writes reach the average.
    ///
    /// ## Errors
    /// Aborts on the first device or render-step error.
    pub fn run(
        &mut self,
        app: &mut dyn FrameApplication,
        sampler: &dyn CounterSampler,
    ) -> Result<RunReport> {
        let adapter = self.pipeline.device().adapter_info();
        let mut report = RunReport {
            warmup_frames: 0,
            rendered_frames: 0,
            average_frame_time_us: 0.0,
            counters: None,
            total_frames: 0,
            adapter,
        };

        if !app.poll() {
            log::info!("Application stopped before the first frame.");
            report.total_frames = self.pipeline.frame_count();
            return Ok(report);
        }
        self.step(app).context("warm-up frame")?;
        report.warmup_frames = 1;
        self.drain()?;

        let start = sampler.sample();
        let stopwatch = Stopwatch::new();
        while self
            .options
            .frame_budget
            .is_none_or(|budget| report.rendered_frames < budget)
            && app.poll()
        {
            self.step(app)?;
            report.rendered_frames += 1;
        }
        self.drain()?;
        let end = sampler.sample();
        let elapsed_us = stopwatch.elapsed_us_f64();

        if report.rendered_frames > 0 {
            report.average_frame_time_us = elapsed_us / report.rendered_frames as f64;
        }
        report.counters = match (start, end) {
            (Some(start), Some(end)) => start.delta_per_frame(&end, report.rendered_frames),
            _ => None,
        };
        log::info!(
            "Rendered {} timed frame(s), {:.1} us/frame (counters: {}).",
            report.rendered_frames,
            report.average_frame_time_us,
            sampler.name()
        );

        if let Some(path) = self.options.reference_path.clone() {
            self.pipeline.request_readback(path);
            self.step(app).context("reference frame")?;
        }
        self.pipeline.wait_workers();

        report.total_frames = self.pipeline.frame_count();
        Ok(report)
    }

    fn step(&mut self, app: &mut dyn FrameApplication) -> Result<()> {
        let target = self.pipeline.begin_frame()?;
        match app.render_frame(self.pipeline.device().as_ref(), &target) {
            Ok(release) => {
                self.pipeline.end_frame(release)?;
                Ok(())
            }
            Err(e) => {
                self.pipeline.end_frame(None)?;
                Err(e.context(format!("rendering frame {}", target.frame)))
            }
        }
    }

    fn drain(&mut self) -> Result<()> {
        self.pipeline.wait_workers();
        self.pipeline
            .device()
            .wait_idle()
            .context("waiting for the device to go idle")
    }
}
