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

//! The demo application: an animated gradient.

use anyhow::{Context, Result};
use framepipe_core::renderer::{HeadlessDevice, SemaphoreId};
use framepipe_headless::{FrameApplication, FrameTarget};
use std::f64::consts::TAU;

/// Renders a horizontal/vertical color ramp whose blue channel pulses with
/// simulated time. Output depends only on the fed time step, never on wall time.
#[derive(Debug)]
pub struct GradientApp {
    /// Full pulses per simulated second.
    pulse_hz: f64,
    scratch: Vec<u8>,
}

impl GradientApp {
    /// Creates the application. `args` are the forwarded command line arguments;
    /// `--pulse-hz <f>` is the only one it understands.
    pub fn new(args: &[String]) -> Self {
        let mut pulse_hz = 0.25;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            if arg == "--pulse-hz" {
                match iter.next().map(|value| value.parse::<f64>()) {
                    Some(Ok(value)) => pulse_hz = value,
                    _ => log::warn!("Ignoring invalid --pulse-hz value."),
                }
            } else {
                log::debug!("Gradient application ignores argument '{arg}'.");
            }
        }
        Self {
            pulse_hz,
            scratch: Vec::new(),
        }
    }

    fn fill(&mut self, target: &FrameTarget) {
        let width = target.extent.width.max(1);
        let height = target.extent.height.max(1);
        let phase = (target.elapsed * self.pulse_hz * TAU).sin() * 0.5 + 0.5;
        let blue = (phase * 255.0).round() as u8;

        self.scratch.clear();
        self.scratch
            .reserve(target.extent.texel_count() as usize * 4);
        for y in 0..target.extent.height {
            let green = (y * 255 / height) as u8;
            for x in 0..target.extent.width {
                let red = (x * 255 / width) as u8;
                // Alpha is left at zero: readbacks force it opaque.
                self.scratch.extend_from_slice(&[red, green, blue, 0]);
            }
        }
    }
}

impl FrameApplication for GradientApp {
    fn poll(&mut self) -> bool {
        true
    }

    fn render_frame(
        &mut self,
        device: &dyn HeadlessDevice,
        target: &FrameTarget,
    ) -> Result<Option<SemaphoreId>> {
        self.fill(target);
        let release = device
            .submit_upload(target.texture, &self.scratch, target.acquire)
            .with_context(|| format!("uploading frame {}", target.frame))?;
        Ok(Some(release))
    }
}
