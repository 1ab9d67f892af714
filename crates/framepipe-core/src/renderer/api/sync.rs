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

//! Synchronization handles.
//!
//! Fences are host-observable completion signals; semaphores order work on the
//! device. Both are consumed opaquely by the headless pipeline, and both are
//! single-use: waiting on one consumes it.

use super::buffer::BufferId;
use super::common::Extent2D;
use super::texture::TextureId;

/// A host-observable completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(pub usize);

/// A device-side ordering primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreId(pub usize);

/// Everything needed to record one image-to-buffer readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadbackCopy {
    /// The rendered image.
    pub texture: TextureId,
    /// The host-readable destination.
    pub buffer: BufferId,
    /// Region to copy, starting at the origin.
    pub extent: Extent2D,
    /// Signal that rendering into `texture` has completed, if any.
    pub wait: Option<SemaphoreId>,
}

/// The synchronization objects produced by a readback submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadbackSubmission {
    /// Signaled once the buffer holds the image and is host visible.
    pub fence: FenceId,
    /// Signaled once the image may be written again.
    pub signal: SemaphoreId,
}
