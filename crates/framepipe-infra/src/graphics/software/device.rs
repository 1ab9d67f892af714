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

use crate::graphics::{CompletionSignal, SignalWaiter, WaitOutcome};
use crossbeam_channel::{Receiver, Sender};
use framepipe_core::renderer::{
    pack_driver_version, AdapterInfo, BufferDescriptor, BufferId, Extent2D, FenceId,
    GraphicsBackendType, HeadlessDevice, ReadbackCopy, ReadbackSubmission, ResourceError,
    SemaphoreId, TextureDescriptor, TextureFormat, TextureId,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration of a [`SoftwareDevice`].
#[derive(Debug, Clone)]
pub struct SoftwareDeviceConfig {
    /// Name reported through [`AdapterInfo`].
    pub adapter_name: String,
    /// Time the queue thread spends on every submitted operation.
    pub queue_latency: Duration,
    /// Time a host read keeps the buffer mapped.
    pub map_latency: Duration,
    /// Number of most recent events kept in the journal. Zero disables it.
    pub journal_capacity: usize,
}

impl Default for SoftwareDeviceConfig {
    fn default() -> Self {
        Self {
            adapter_name: "Software Rasterizer".to_string(),
            queue_latency: Duration::ZERO,
            map_latency: Duration::ZERO,
            journal_capacity: 4096,
        }
    }
}

/// An observable step of the software device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// An upload landed in a texture.
    UploadCompleted {
        /// Destination texture.
        texture: TextureId,
    },
    /// A readback copy was submitted to the queue.
    CopySubmitted {
        /// Destination buffer.
        buffer: BufferId,
        /// Fence signaled on completion.
        fence: FenceId,
    },
    /// A readback copy finished on the queue.
    CopyCompleted {
        /// Destination buffer.
        buffer: BufferId,
        /// Fence signaled on completion.
        fence: FenceId,
    },
    /// The host returned from waiting on a fence.
    FenceWaited {
        /// The consumed fence.
        fence: FenceId,
    },
    /// The host finished reading a buffer.
    HostRead {
        /// The buffer that was read.
        buffer: BufferId,
    },
    /// A synchronization rule was broken.
    Violation(String),
}

#[derive(Debug)]
struct SoftwareTexture {
    size: Extent2D,
    format: TextureFormat,
    pixels: Vec<u8>,
}

#[derive(Debug)]
struct SoftwareBuffer {
    data: Vec<u8>,
    pending_copies: usize,
    mapped: bool,
}

#[derive(Debug)]
enum QueueOp {
    Upload {
        texture: TextureId,
        pixels: Vec<u8>,
    },
    Copy {
        copy: ReadbackCopy,
        fence: FenceId,
        signal: CompletionSignal,
    },
    Flush(CompletionSignal),
    Shutdown,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the host-facing device and its queue thread.
#[derive(Debug, Default)]
struct DeviceState {
    textures: Mutex<HashMap<TextureId, SoftwareTexture>>,
    buffers: Mutex<HashMap<BufferId, SoftwareBuffer>>,
    fences: Mutex<HashMap<FenceId, SignalWaiter>>,
    semaphores: Mutex<HashSet<SemaphoreId>>,
    journal: Mutex<VecDeque<DeviceEvent>>,
    journal_capacity: usize,
    violations: Mutex<Vec<String>>,
}

impl DeviceState {
    fn with_journal_capacity(journal_capacity: usize) -> Self {
        Self {
            journal: Mutex::new(VecDeque::with_capacity(journal_capacity.min(4096))),
            journal_capacity,
            ..Default::default()
        }
    }

    fn record(&self, event: DeviceEvent) {
        if let DeviceEvent::Violation(message) = &event {
            log::warn!("Software device: {message}");
            lock(&self.violations).push(message.clone());
        }
        if self.journal_capacity == 0 {
            return;
        }
        let mut journal = lock(&self.journal);
        if journal.len() == self.journal_capacity {
            journal.pop_front();
        }
        journal.push_back(event);
    }

    fn execute_upload(&self, texture: TextureId, pixels: Vec<u8>) {
        match lock(&self.textures).get_mut(&texture) {
            Some(target) => target.pixels = pixels,
            None => {
                log::warn!("Upload into destroyed texture {texture:?} dropped.");
                return;
            }
        }
        self.record(DeviceEvent::UploadCompleted { texture });
    }

    fn execute_copy(&self, copy: &ReadbackCopy, fence: FenceId) {
        let texels = {
            let textures = lock(&self.textures);
            textures.get(&copy.texture).map(|texture| {
                let bpp = texture.format.bytes_per_pixel() as usize;
                let src_row = texture.size.width as usize * bpp;
                let dst_row = copy.extent.width as usize * bpp;
                let mut out = Vec::with_capacity(dst_row * copy.extent.height as usize);
                for row in texture
                    .pixels
                    .chunks_exact(src_row)
                    .take(copy.extent.height as usize)
                {
                    out.extend_from_slice(&row[..dst_row]);
                }
                out
            })
        };

        let mut mapped = false;
        match lock(&self.buffers).get_mut(&copy.buffer) {
            Some(buffer) => {
                mapped = buffer.mapped;
                if let Some(texels) = &texels {
                    buffer.data[..texels.len()].copy_from_slice(texels);
                }
                buffer.pending_copies = buffer.pending_copies.saturating_sub(1);
            }
            None => log::warn!("Copy into destroyed buffer {:?} dropped.", copy.buffer),
        }
        if mapped {
            self.record(DeviceEvent::Violation(format!(
                "copy into {:?} while the host has it mapped",
                copy.buffer
            )));
        }

        if texels.is_none() {
            log::warn!("Copy from destroyed texture {:?} skipped.", copy.texture);
        }
        self.record(DeviceEvent::CopyCompleted {
            buffer: copy.buffer,
            fence,
        });
    }

    fn consume_semaphore(&self, semaphore: Option<SemaphoreId>) -> Result<(), ResourceError> {
        match semaphore {
            Some(id) if !lock(&self.semaphores).remove(&id) => Err(ResourceError::InvalidHandle),
            _ => Ok(()),
        }
    }
}

fn run_queue(state: Arc<DeviceState>, ops: Receiver<QueueOp>, latency: Duration) {
    while let Ok(op) = ops.recv() {
        match op {
            QueueOp::Shutdown => break,
            QueueOp::Flush(signal) => signal.signal(),
            QueueOp::Upload { texture, pixels } => {
                thread::sleep(latency);
                state.execute_upload(texture, pixels);
            }
            QueueOp::Copy {
                copy,
                fence,
                signal,
            } => {
                thread::sleep(latency);
                state.execute_copy(&copy, fence);
                signal.signal();
            }
        }
    }
    log::trace!("Software queue thread exiting.");
}

/// A graphics device that executes submissions on a CPU queue thread.
#[derive(Debug)]
pub struct SoftwareDevice {
    state: Arc<DeviceState>,
    queue: Sender<QueueOp>,
    queue_thread: Option<JoinHandle<()>>,
    config: SoftwareDeviceConfig,
    next_texture_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_fence_id: AtomicUsize,
    next_semaphore_id: AtomicUsize,
}

impl SoftwareDevice {
    /// Creates a device and starts its queue thread.
    ///
    /// ## Errors
    /// * `ResourceError::BackendError` - If the queue thread cannot be spawned.
    pub fn new(config: SoftwareDeviceConfig) -> Result<Self, ResourceError> {
        let state = Arc::new(DeviceState::with_journal_capacity(config.journal_capacity));
        let (queue, ops) = crossbeam_channel::unbounded();
        let latency = config.queue_latency;
        let thread_state = state.clone();
        let queue_thread = thread::Builder::new()
            .name("framepipe-software-queue".to_string())
            .spawn(move || run_queue(thread_state, ops, latency))
            .map_err(|e| ResourceError::BackendError(format!("spawn queue thread: {e}")))?;

        log::info!(
            "Software device '{}' ready (queue latency {:?}, map latency {:?}).",
            config.adapter_name,
            config.queue_latency,
            config.map_latency
        );

        Ok(Self {
            state,
            queue,
            queue_thread: Some(queue_thread),
            config,
            next_texture_id: AtomicUsize::new(0),
            next_buffer_id: AtomicUsize::new(0),
            next_fence_id: AtomicUsize::new(0),
            next_semaphore_id: AtomicUsize::new(0),
        })
    }

    /// Returns the most recent events, oldest first, up to
    /// [`SoftwareDeviceConfig::journal_capacity`].
    pub fn journal(&self) -> Vec<DeviceEvent> {
        lock(&self.state.journal).iter().cloned().collect()
    }

    /// Returns every synchronization violation recorded so far.
    pub fn violations(&self) -> Vec<String> {
        lock(&self.state.violations).clone()
    }

    /// Number of semaphores signaled but not yet waited on or released.
    pub fn live_semaphores(&self) -> usize {
        lock(&self.state.semaphores).len()
    }

    fn new_semaphore(&self) -> SemaphoreId {
        let id = SemaphoreId(self.next_semaphore_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.state.semaphores).insert(id);
        id
    }

    fn enqueue(&self, op: QueueOp) -> Result<(), ResourceError> {
        self.queue
            .send(op)
            .map_err(|_| ResourceError::BackendError("software queue has stopped".to_string()))
    }
}

impl HeadlessDevice for SoftwareDevice {
    fn adapter_info(&self) -> AdapterInfo {
        let part = |s: &str| -> u32 { s.parse().unwrap_or(0) };
        AdapterInfo {
            name: self.config.adapter_name.clone(),
            driver_version: pack_driver_version(
                part(env!("CARGO_PKG_VERSION_MAJOR")),
                part(env!("CARGO_PKG_VERSION_MINOR")),
                part(env!("CARGO_PKG_VERSION_PATCH")),
            ),
            backend: GraphicsBackendType::Software,
        }
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let bytes = descriptor.size.byte_size(descriptor.format) as usize;
        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.state.textures).insert(
            id,
            SoftwareTexture {
                size: descriptor.size,
                format: descriptor.format,
                pixels: vec![0; bytes],
            },
        );
        log::trace!(
            "Created software texture {:?} '{}' ({}).",
            id,
            descriptor.label.as_deref().unwrap_or("unnamed"),
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        lock(&self.state.textures)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let size = usize::try_from(descriptor.size).map_err(|_| ResourceError::OutOfBounds)?;
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.state.buffers).insert(
            id,
            SoftwareBuffer {
                data: vec![0; size],
                pending_copies: 0,
                mapped: false,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        lock(&self.state.buffers)
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::NotFound)
    }

    fn submit_upload(
        &self,
        texture: TextureId,
        pixels: &[u8],
        wait: Option<SemaphoreId>,
    ) -> Result<SemaphoreId, ResourceError> {
        {
            let textures = lock(&self.state.textures);
            let target = textures.get(&texture).ok_or(ResourceError::NotFound)?;
            if pixels.len() as u64 != target.size.byte_size(target.format) {
                return Err(ResourceError::OutOfBounds);
            }
        }
        self.state.consume_semaphore(wait)?;

        let signal = self.new_semaphore();
        self.enqueue(QueueOp::Upload {
            texture,
            pixels: pixels.to_vec(),
        })?;
        Ok(signal)
    }

    fn submit_readback(&self, copy: &ReadbackCopy) -> Result<ReadbackSubmission, ResourceError> {
        {
            let textures = lock(&self.state.textures);
            let source = textures.get(&copy.texture).ok_or(ResourceError::NotFound)?;
            if copy.extent.width > source.size.width || copy.extent.height > source.size.height {
                return Err(ResourceError::OutOfBounds);
            }
            let buffers = lock(&self.state.buffers);
            let target = buffers.get(&copy.buffer).ok_or(ResourceError::NotFound)?;
            if (target.data.len() as u64) < copy.extent.byte_size(source.format) {
                return Err(ResourceError::OutOfBounds);
            }
        }
        self.state.consume_semaphore(copy.wait)?;

        let fence = FenceId(self.next_fence_id.fetch_add(1, Ordering::Relaxed));
        let (signal, waiter) = CompletionSignal::pair();
        lock(&self.state.fences).insert(fence, waiter);
        if let Some(buffer) = lock(&self.state.buffers).get_mut(&copy.buffer) {
            buffer.pending_copies += 1;
        }
        let semaphore = self.new_semaphore();

        self.state.record(DeviceEvent::CopySubmitted {
            buffer: copy.buffer,
            fence,
        });
        self.enqueue(QueueOp::Copy {
            copy: *copy,
            fence,
            signal,
        })?;

        Ok(ReadbackSubmission {
            fence,
            signal: semaphore,
        })
    }

    fn wait_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        let waiter = lock(&self.state.fences)
            .remove(&fence)
            .ok_or(ResourceError::InvalidHandle)?;
        match waiter.wait() {
            WaitOutcome::Signaled => {
                self.state.record(DeviceEvent::FenceWaited { fence });
                Ok(())
            }
            _ => Err(ResourceError::BackendError(format!(
                "{fence:?} abandoned by the queue"
            ))),
        }
    }

    fn read_host_buffer(&self, buffer: BufferId) -> Result<Vec<u8>, ResourceError> {
        {
            let mut buffers = lock(&self.state.buffers);
            let target = buffers.get_mut(&buffer).ok_or(ResourceError::NotFound)?;
            if target.pending_copies > 0 {
                drop(buffers);
                self.state.record(DeviceEvent::Violation(format!(
                    "host read of {buffer:?} before its copy completed"
                )));
                return Err(ResourceError::BufferBusy);
            }
            target.mapped = true;
        }

        thread::sleep(self.config.map_latency);

        let data = {
            let mut buffers = lock(&self.state.buffers);
            let target = buffers.get_mut(&buffer).ok_or(ResourceError::NotFound)?;
            target.mapped = false;
            target.data.clone()
        };
        self.state.record(DeviceEvent::HostRead { buffer });
        Ok(data)
    }

    fn release_semaphore(&self, semaphore: SemaphoreId) -> Result<(), ResourceError> {
        self.state.consume_semaphore(Some(semaphore))
    }

    fn wait_idle(&self) -> Result<(), ResourceError> {
        let (signal, waiter) = CompletionSignal::pair();
        self.enqueue(QueueOp::Flush(signal))?;
        match waiter.wait() {
            WaitOutcome::Signaled => Ok(()),
            _ => Err(ResourceError::BackendError(
                "software queue stopped while idling".to_string(),
            )),
        }
    }
}

impl Drop for SoftwareDevice {
    fn drop(&mut self) {
        let _ = self.queue.send(QueueOp::Shutdown);
        if let Some(handle) = self.queue_thread.take() {
            if handle.join().is_err() {
                log::error!("Software queue thread panicked.");
            }
        }
    }
}
