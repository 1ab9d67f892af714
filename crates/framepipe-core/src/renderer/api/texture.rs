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

//! Defines data structures related to render-target textures.

use super::common::{Extent2D, TextureFormat};
use std::borrow::Cow;

/// An opaque handle to a texture owned by a [`HeadlessDevice`](crate::renderer::HeadlessDevice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// A set of flags describing how a texture may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUsage {
    bits: u32,
}

impl TextureUsage {
    /// No usage.
    pub const NONE: Self = Self { bits: 0 };
    /// The texture can be the source of a copy (readback).
    pub const COPY_SRC: Self = Self { bits: 1 << 0 };
    /// The texture can be the destination of a copy or upload.
    pub const COPY_DST: Self = Self { bits: 1 << 1 };
    /// The texture can be rendered into.
    pub const RENDER_ATTACHMENT: Self = Self { bits: 1 << 2 };

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks whether every flag of `other` is set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for TextureUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// The layout a texture is kept in between uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureLayout {
    /// Contents are undefined.
    #[default]
    Undefined,
    /// Ready to be the source of a transfer.
    TransferSrc,
    /// Ready to be rendered into.
    ColorAttachment,
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Dimensions of the texture.
    pub size: Extent2D,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
    /// The layout the texture is returned to after every use. Swapchain images
    /// of the headless pipeline are fixed to [`TextureLayout::TransferSrc`].
    pub resting_layout: TextureLayout,
}
