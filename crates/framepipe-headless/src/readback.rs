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

//! Host-side completion of a frame readback.

use anyhow::{anyhow, Context, Result};
use framepipe_core::renderer::{BufferId, Extent2D, FenceId, HeadlessDevice, TextureFormat};
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Forces every RGBA8 pixel fully opaque. RGB channels are untouched.
pub fn force_opaque(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        pixel[3] = 0xFF;
    }
}

/// Returns the continuous-dump file name for `frame`: `<base>_<frame:05>.png`.
pub fn dump_file_name(base: &Path, frame: u64) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!("_{frame:05}.png"));
    PathBuf::from(name)
}

/// Everything a worker needs to finish one readback.
///
/// The job owns its destination path and fence, so nothing it references can
/// be changed by the submission thread while it runs.
#[derive(Debug)]
pub struct ReadbackJob {
    /// Device the copy was submitted to.
    pub device: Arc<dyn HeadlessDevice>,
    /// Fence signaled when the copy into `buffer` has completed.
    pub fence: FenceId,
    /// Staging buffer holding the copied image.
    pub buffer: BufferId,
    /// Extent of the copied image.
    pub extent: Extent2D,
    /// Output file.
    pub destination: PathBuf,
}

impl ReadbackJob {
    /// Runs the job. Failures are logged and never propagated.
    pub fn run(self) {
        if let Err(e) = self.execute() {
            log::error!(
                "Failed to write frame readback '{}': {e:#}",
                self.destination.display()
            );
        }
    }

    fn execute(&self) -> Result<()> {
        self.device
            .wait_fence(self.fence)
            .context("waiting for the readback fence")?;
        let mut pixels = self
            .device
            .read_host_buffer(self.buffer)
            .context("reading the staging buffer")?;

        pixels.truncate(self.extent.byte_size(TextureFormat::Rgba8Unorm) as usize);
        force_opaque(&mut pixels);

        let image = RgbaImage::from_raw(self.extent.width, self.extent.height, pixels)
            .ok_or_else(|| anyhow!("staging buffer is smaller than {}", self.extent))?;
        image
            .save_with_format(&self.destination, ImageFormat::Png)
            .with_context(|| format!("encoding {}", self.destination.display()))?;

        log::info!("Wrote frame readback '{}'.", self.destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_opaque_only_touches_alpha() {
        let mut pixels = vec![10, 20, 30, 0, 40, 50, 60, 127, 70, 80, 90, 255];
        force_opaque(&mut pixels);
        assert_eq!(
            pixels,
            vec![10, 20, 30, 255, 40, 50, 60, 255, 70, 80, 90, 255]
        );
    }

    #[test]
    fn force_opaque_round_trip_over_all_alpha_values() {
        let mut pixels: Vec<u8> = (0..=255u8).flat_map(|a| [a, a ^ 0x55, 7, a]).collect();
        let original = pixels.clone();

        force_opaque(&mut pixels);

        for (fixed, before) in pixels.chunks_exact(4).zip(original.chunks_exact(4)) {
            assert_eq!(fixed[3], 0xFF);
            assert_eq!(&fixed[..3], &before[..3]);
        }
    }

    #[test]
    fn dump_names_are_zero_padded() {
        let base = Path::new("/tmp/out/frame");
        assert_eq!(
            dump_file_name(base, 0),
            PathBuf::from("/tmp/out/frame_00000.png")
        );
        assert_eq!(
            dump_file_name(base, 42),
            PathBuf::from("/tmp/out/frame_00042.png")
        );
        assert_eq!(
            dump_file_name(base, 123456),
            PathBuf::from("/tmp/out/frame_123456.png")
        );
    }
}
