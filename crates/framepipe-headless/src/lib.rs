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

//! # Framepipe Headless
//!
//! A software-emulated swapchain. A fixed ring of frame slots is reused
//! round-robin; each slot owns a render target, a host-readable staging buffer,
//! and a dedicated worker thread that finishes readbacks (fence wait, alpha
//! fix-up, PNG write) off the submission thread.
//!
//! Reusing a slot always waits for its previous worker job, so at most
//! `ring_size` frames are ever in flight.

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod pipeline;
pub mod readback;
pub mod report;
pub mod worker;

pub use driver::{FrameApplication, HeadlessRunner, RunOptions, RunReport};
pub use error::PipelineError;
pub use pipeline::{FrameTarget, HeadlessPipeline, PipelineConfig};
pub use readback::{dump_file_name, force_opaque, ReadbackJob};
pub use report::StatReport;
pub use worker::FrameWorker;
