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

#![allow(dead_code)]

use anyhow::Result;
use framepipe_core::renderer::{HeadlessDevice, SemaphoreId};
use framepipe_headless::{FrameApplication, FrameTarget, HeadlessPipeline, PipelineConfig};
use framepipe_infra::{SoftwareDevice, SoftwareDeviceConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Fills every frame with one color whose alpha is deliberately not opaque.
pub struct SolidApp {
    pub color: [u8; 4],
    pub polls_left: Option<u64>,
    pub frame_cost: Duration,
    pub fail_on_frame: Option<u64>,
    pub skip_render: bool,
}

impl Default for SolidApp {
    fn default() -> Self {
        Self {
            color: [200, 100, 50, 0x10],
            polls_left: None,
            frame_cost: Duration::ZERO,
            fail_on_frame: None,
            skip_render: false,
        }
    }
}

impl FrameApplication for SolidApp {
    fn poll(&mut self) -> bool {
        match &mut self.polls_left {
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
            None => true,
        }
    }

    fn render_frame(
        &mut self,
        device: &dyn HeadlessDevice,
        target: &FrameTarget,
    ) -> Result<Option<SemaphoreId>> {
        if self.fail_on_frame == Some(target.frame) {
            anyhow::bail!("synthetic render failure");
        }
        if self.skip_render {
            return Ok(None);
        }
        std::thread::sleep(self.frame_cost);
        let pixels: Vec<u8> = self
            .color
            .iter()
            .copied()
            .cycle()
            .take(target.extent.texel_count() as usize * 4)
            .collect();
        Ok(Some(device.submit_upload(
            target.texture,
            &pixels,
            target.acquire,
        )?))
    }
}

pub fn software_device(queue_latency: Duration, map_latency: Duration) -> Arc<SoftwareDevice> {
    Arc::new(
        SoftwareDevice::new(SoftwareDeviceConfig {
            queue_latency,
            map_latency,
            ..Default::default()
        })
        .unwrap(),
    )
}

pub fn small_pipeline(device: Arc<SoftwareDevice>, ring_size: usize) -> HeadlessPipeline {
    HeadlessPipeline::new(
        device,
        PipelineConfig {
            width: 16,
            height: 8,
            ring_size,
            ..Default::default()
        },
        Vec::new(),
    )
    .unwrap()
}

/// Runs one acquire/render/present cycle.
pub fn cycle(pipeline: &mut HeadlessPipeline, app: &mut SolidApp) {
    let target = pipeline.begin_frame().unwrap();
    let release = app.render_frame(pipeline.device().as_ref(), &target).unwrap();
    pipeline.end_frame(release).unwrap();
}

pub fn sorted_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn base_in(dir: &Path) -> PathBuf {
    dir.join("frame")
}
