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

//! Errors raised by the headless pipeline.

use framepipe_core::renderer::{Extent2D, ResourceError};
use thiserror::Error;

/// An error raised while building or driving a [`HeadlessPipeline`](crate::HeadlessPipeline).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The slot ring must hold at least one slot.
    #[error("Ring size must be at least 1")]
    EmptyRing,
    /// The frame extent has a zero dimension.
    #[error("Frame extent must be non-zero, got {0}")]
    EmptyExtent(Extent2D),
    /// A slot's render target or staging buffer could not be created.
    #[error("Failed to allocate frame slot {slot}: {source}")]
    SlotAllocation {
        /// Index of the failing slot.
        slot: usize,
        /// Device error.
        #[source]
        source: ResourceError,
    },
    /// A worker thread could not be spawned.
    #[error("Failed to spawn worker '{name}': {source}")]
    WorkerSpawn {
        /// Name of the worker thread.
        name: String,
        /// OS error.
        #[source]
        source: std::io::Error,
    },
    /// A device submission failed.
    #[error("Device error: {0}")]
    Device(#[from] ResourceError),
    /// The pipeline's resources were already released.
    #[error("Pipeline resources have been released")]
    Released,
}
