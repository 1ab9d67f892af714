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

//! The headless swapchain: slot ring, acquire/present and readback dispatch.

use crate::error::PipelineError;
use crate::readback::{dump_file_name, ReadbackJob};
use crate::worker::FrameWorker;
use framepipe_core::platform::{ApplicationLifecycle, LifecycleObserver};
use framepipe_core::renderer::{
    BufferDescriptor, BufferId, Extent2D, HeadlessDevice, MemoryDomain, ReadbackCopy,
    SemaphoreId, TextureDescriptor, TextureFormat, TextureId, TextureLayout, TextureUsage,
};
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration of a [`HeadlessPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Width of every frame, in pixels.
    pub width: u32,
    /// Height of every frame, in pixels.
    pub height: u32,
    /// Number of frames that may be in flight.
    pub ring_size: usize,
    /// Simulated time fed to the application every frame, in seconds.
    pub time_step: f64,
    /// Enables continuous frame dumping to `<base>_<frame:05>.png`.
    pub dump_base: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            ring_size: 4,
            time_step: 0.01,
            dump_base: None,
        }
    }
}

/// The frame handed to the application between `begin_frame` and `end_frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTarget {
    /// Slot index in the ring.
    pub slot: usize,
    /// Frame counter value for this frame.
    pub frame: u64,
    /// The image to render into.
    pub texture: TextureId,
    /// Size of the image.
    pub extent: Extent2D,
    /// Must be waited on before writing the image, if present.
    pub acquire: Option<SemaphoreId>,
    /// Time step to advance the simulation by.
    pub time_step: f64,
    /// Simulated time at the start of this frame.
    pub elapsed: f64,
}

#[derive(Debug)]
struct FrameSlot {
    texture: TextureId,
    staging: BufferId,
    acquire: Option<SemaphoreId>,
}

/// What `end_frame` did with the current slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Presentation {
    Readback(PathBuf),
    Handoff,
    Nothing,
}

/// A software-emulated swapchain.
///
/// Each slot owns a render target, a host-cached staging buffer and a
/// [`FrameWorker`]. Acquiring a slot waits for the worker's previous job,
/// which bounds the number of frames in flight to the ring size.
pub struct HeadlessPipeline {
    device: Arc<dyn HeadlessDevice>,
    extent: Extent2D,
    time_step: f64,
    slots: Vec<FrameSlot>,
    workers: Vec<FrameWorker>,
    index: usize,
    frames: u64,
    dump_base: Option<PathBuf>,
    requests: VecDeque<PathBuf>,
    resized: bool,
    released: bool,
    observers: Vec<Box<dyn LifecycleObserver>>,
}

impl fmt::Debug for HeadlessPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessPipeline")
            .field("extent", &self.extent)
            .field("ring_size", &self.slots.len())
            .field("index", &self.index)
            .field("frames", &self.frames)
            .field("dump_base", &self.dump_base)
            .field("pending_requests", &self.requests.len())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl HeadlessPipeline {
    /// Allocates the slot ring and its workers, then announces the pipeline
    /// as running to every observer.
    ///
    /// ## Errors
    /// Fails on an empty ring or extent, or if a slot resource or worker
    /// cannot be created. Slots created before the failure are destroyed.
    pub fn new(
        device: Arc<dyn HeadlessDevice>,
        config: PipelineConfig,
        observers: Vec<Box<dyn LifecycleObserver>>,
    ) -> Result<Self, PipelineError> {
        let extent = Extent2D::new(config.width, config.height);
        if config.ring_size == 0 {
            return Err(PipelineError::EmptyRing);
        }
        if extent.width == 0 || extent.height == 0 {
            return Err(PipelineError::EmptyExtent(extent));
        }

        let mut pipeline = Self {
            device,
            extent,
            time_step: config.time_step,
            slots: Vec::with_capacity(config.ring_size),
            workers: Vec::with_capacity(config.ring_size),
            index: 0,
            frames: 0,
            dump_base: config.dump_base,
            requests: VecDeque::new(),
            resized: false,
            released: false,
            observers: Vec::new(),
        };

        for slot in 0..config.ring_size {
            let frame_slot = pipeline.allocate_slot(slot)?;
            pipeline.slots.push(frame_slot);
            let name = format!("framepipe-worker-{slot}");
            let worker = FrameWorker::new(name.clone())
                .map_err(|source| PipelineError::WorkerSpawn { name, source })?;
            pipeline.workers.push(worker);
        }

        log::info!(
            "Headless pipeline ready: {} slots of {} on '{}'.",
            config.ring_size,
            extent,
            pipeline.device.adapter_info().name
        );

        pipeline.observers = observers;
        pipeline.notify(ApplicationLifecycle::Stopped);
        pipeline.notify(ApplicationLifecycle::Paused);
        pipeline.notify(ApplicationLifecycle::Running);
        Ok(pipeline)
    }

    fn allocate_slot(&self, slot: usize) -> Result<FrameSlot, PipelineError> {
        let texture = self
            .device
            .create_texture(&TextureDescriptor {
                label: Some(format!("Frame Slot {slot} Target").into()),
                size: self.extent,
                format: TextureFormat::Rgba8Unorm,
                usage: TextureUsage::COPY_SRC
                    | TextureUsage::RENDER_ATTACHMENT
                    | TextureUsage::COPY_DST,
                resting_layout: TextureLayout::TransferSrc,
            })
            .map_err(|source| PipelineError::SlotAllocation { slot, source })?;

        let staging = self
            .device
            .create_buffer(&BufferDescriptor {
                label: Some(format!("Frame Slot {slot} Staging").into()),
                size: self.extent.byte_size(TextureFormat::Rgba8Unorm),
                domain: MemoryDomain::CachedHost,
            })
            .map_err(|source| {
                if let Err(e) = self.device.destroy_texture(texture) {
                    log::warn!("Failed to destroy {texture:?}: {e}");
                }
                PipelineError::SlotAllocation { slot, source }
            })?;

        Ok(FrameSlot {
            texture,
            staging,
            acquire: None,
        })
    }

    fn notify(&mut self, state: ApplicationLifecycle) {
        log::debug!("Headless pipeline lifecycle: {state:?}.");
        for observer in &mut self.observers {
            observer.on_lifecycle(state);
        }
    }

    /// Acquires the current slot.
    ///
    /// Hands the slot's acquire semaphore to the caller and blocks until the
    /// slot's previous readback job has finished.
    pub fn begin_frame(&mut self) -> Result<FrameTarget, PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        let index = self.index;
        let acquire = self.slots[index].acquire.take();
        self.workers[index].wait();
        log::trace!(
            "Acquired slot {index} ({}) for frame {}.",
            self.workers[index].name(),
            self.frames
        );

        Ok(FrameTarget {
            slot: index,
            frame: self.frames,
            texture: self.slots[index].texture,
            extent: self.extent,
            acquire,
            time_step: self.time_step,
            elapsed: self.frames as f64 * self.time_step,
        })
    }

    /// Presents the current slot.
    ///
    /// `release` is the device signal that rendering into the slot's image has
    /// completed. In priority order, the frame is either copied back for the
    /// oldest explicit request, copied back for the continuous dump, or the
    /// release signal becomes the slot's next acquire. With no release signal
    /// nothing is submitted and explicit requests stay queued.
    ///
    /// The slot index and frame counter advance even if the submission fails.
    /// An explicit request is only dequeued once its copy has been submitted.
    pub fn end_frame(&mut self, release: Option<SemaphoreId>) -> Result<(), PipelineError> {
        if self.released {
            return Err(PipelineError::Released);
        }
        let result = match release {
            Some(release) => self.present(release),
            None => Ok(Presentation::Nothing),
        };
        log::trace!(
            "Presented slot {} (frame {}): {:?}.",
            self.index,
            self.frames,
            result
        );

        self.index = (self.index + 1) % self.slots.len();
        self.frames += 1;
        result.map(|_| ())
    }

    fn present(&mut self, release: SemaphoreId) -> Result<Presentation, PipelineError> {
        let explicit = !self.requests.is_empty();
        let destination = match self.requests.front() {
            Some(path) => Some(path.clone()),
            None => self
                .dump_base
                .as_deref()
                .map(|base| dump_file_name(base, self.frames)),
        };

        let Some(destination) = destination else {
            self.slots[self.index].acquire = Some(release);
            return Ok(Presentation::Handoff);
        };

        let slot = &mut self.slots[self.index];
        let submission = self.device.submit_readback(&ReadbackCopy {
            texture: slot.texture,
            buffer: slot.staging,
            extent: self.extent,
            wait: Some(release),
        })?;
        slot.acquire = Some(submission.signal);
        if explicit {
            self.requests.pop_front();
        }

        let job = ReadbackJob {
            device: self.device.clone(),
            fence: submission.fence,
            buffer: slot.staging,
            extent: self.extent,
            destination: destination.clone(),
        };
        self.workers[self.index].set_work(move || job.run());
        Ok(Presentation::Readback(destination))
    }

    /// Queues an explicit one-shot readback to `path`.
    ///
    /// Requests are served oldest first, one per presented frame, and take
    /// priority over the continuous dump for that frame.
    pub fn request_readback(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::debug!("Queued explicit readback to '{}'.", path.display());
        self.requests.push_back(path);
    }

    /// Enables continuous frame dumping to `<base>_<frame:05>.png`.
    pub fn enable_frame_dump(&mut self, base: impl Into<PathBuf>) {
        self.dump_base = Some(base.into());
    }

    /// Records a resize request. Slots are never reallocated mid-run.
    pub fn notify_resize(&mut self, width: u32, height: u32) {
        if Extent2D::new(width, height) != self.extent {
            log::warn!(
                "Headless surface asked to resize to {width}x{height}; keeping {}.",
                self.extent
            );
            self.resized = true;
        }
    }

    /// Blocks until every worker is idle.
    pub fn wait_workers(&mut self) {
        for worker in &mut self.workers {
            worker.wait();
        }
    }

    /// Number of presented frames.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Index of the slot the next `begin_frame` acquires.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Number of slots in the ring.
    pub fn ring_size(&self) -> usize {
        self.slots.len()
    }

    /// Size of every frame.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Whether a resize was requested since creation.
    pub fn is_resized(&self) -> bool {
        self.resized
    }

    /// Whether no worker has an outstanding job.
    pub fn is_idle(&self) -> bool {
        self.workers.iter().all(|worker| !worker.is_busy())
    }

    /// Explicit readback requests not yet dispatched.
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// The graphics device the pipeline submits to.
    pub fn device(&self) -> &Arc<dyn HeadlessDevice> {
        &self.device
    }

    /// Drains every worker, announces the pipeline as stopped and destroys the
    /// slot resources. Calling it again does nothing.
    pub fn release_resources(&mut self) {
        if self.released {
            return;
        }
        self.wait_workers();
        self.notify(ApplicationLifecycle::Paused);
        self.notify(ApplicationLifecycle::Stopped);

        if let Err(e) = self.device.wait_idle() {
            log::error!("Device did not go idle during teardown: {e}");
        }
        for slot in self.slots.drain(..) {
            if let Some(semaphore) = slot.acquire {
                if let Err(e) = self.device.release_semaphore(semaphore) {
                    log::warn!("Failed to release {semaphore:?}: {e}");
                }
            }
            if let Err(e) = self.device.destroy_texture(slot.texture) {
                log::warn!("Failed to destroy {:?}: {e}", slot.texture);
            }
            if let Err(e) = self.device.destroy_buffer(slot.staging) {
                log::warn!("Failed to destroy {:?}: {e}", slot.staging);
            }
        }
        if !self.requests.is_empty() {
            log::warn!(
                "{} explicit readback request(s) were never served.",
                self.requests.len()
            );
        }
        self.released = true;
    }
}

impl Drop for HeadlessPipeline {
    fn drop(&mut self) {
        self.release_resources();
    }
}
