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

//! Common types shared by textures, buffers, and adapters.

use std::fmt;

/// The size of a two-dimensional image, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of texels covered by the extent.
    pub const fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Size in bytes of a tightly packed image of this extent in `format`.
    pub const fn byte_size(&self, format: TextureFormat) -> u64 {
        self.texel_count() * format.bytes_per_pixel() as u64
    }
}

impl fmt::Display for Extent2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Texel formats the headless swapchain can render into and read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized, linear.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA, normalized, sRGB-encoded.
    Rgba8UnormSrgb,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb => 4,
        }
    }
}

/// The graphics API family a device is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GraphicsBackendType {
    /// Vulkan.
    Vulkan,
    /// Apple Metal.
    Metal,
    /// Direct3D 12.
    Dx12,
    /// OpenGL / OpenGL ES.
    OpenGl,
    /// CPU implementation, no GPU involved.
    Software,
    /// Anything not covered above.
    #[default]
    Unknown,
}

/// Backend-agnostic information about the adapter a device was created from.
///
/// This is what ends up in the `gpu` and `driverVersion` fields of the stat report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Human readable adapter name (e.g. "NVIDIA GeForce RTX 4090").
    pub name: String,
    /// Driver version, packed the Vulkan way (`major << 22 | minor << 12 | patch`).
    pub driver_version: u32,
    /// The graphics API the adapter is driven through.
    pub backend: GraphicsBackendType,
}

/// Packs a `major.minor.patch` triple into the Vulkan version layout.
pub const fn pack_driver_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 22) | ((minor & 0x3ff) << 12) | (patch & 0xfff)
}
