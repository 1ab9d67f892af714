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

use super::context::WgpuHeadlessContext;
use crate::graphics::{CompletionSignal, SignalWaiter, WaitOutcome};
use framepipe_core::renderer::{
    AdapterInfo, BufferDescriptor, BufferId, Extent2D, FenceId, HeadlessDevice, MemoryDomain,
    ReadbackCopy, ReadbackSubmission, ResourceError, SemaphoreId, TextureDescriptor,
    TextureFormat, TextureId, TextureUsage,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// How long a blocked host sleeps between two non-blocking device polls.
const POLL_INTERVAL: Duration = Duration::from_micros(250);

#[derive(Debug)]
struct WgpuTextureEntry {
    texture: Arc<wgpu::Texture>,
    size: Extent2D,
    format: TextureFormat,
}

/// Row-padded storage backing a staging buffer.
///
/// wgpu requires copy rows aligned to `COPY_BYTES_PER_ROW_ALIGNMENT`, so the
/// real allocation is sized for the first extent copied into the buffer and
/// re-created if a later copy uses a different extent.
#[derive(Debug, Clone)]
struct PaddedStaging {
    buffer: Arc<wgpu::Buffer>,
    extent: Extent2D,
    unpadded_row: u32,
    padded_row: u32,
}

#[derive(Debug)]
struct WgpuBufferEntry {
    label: Option<String>,
    capacity: u64,
    domain: MemoryDomain,
    staging: Option<PaddedStaging>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

fn texture_usages(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut usages = wgpu::TextureUsages::empty();
    if usage.contains(TextureUsage::COPY_SRC) {
        usages |= wgpu::TextureUsages::COPY_SRC;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        usages |= wgpu::TextureUsages::COPY_DST;
    }
    if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
        usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    usages
}

fn extent_3d(extent: Extent2D) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: extent.width,
        height: extent.height,
        depth_or_array_layers: 1,
    }
}

fn align_row(bytes: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    bytes.div_ceil(align) * align
}

/// A headless graphics device backed by wgpu.
///
/// Fences are emulated with `on_submitted_work_done` callbacks. Semaphores are
/// tracked for validation only, since wgpu executes submissions on a single
/// in-order queue.
#[derive(Debug)]
pub struct WgpuHeadlessDevice {
    context: WgpuHeadlessContext,
    textures: Mutex<HashMap<TextureId, WgpuTextureEntry>>,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    fences: Mutex<HashMap<FenceId, SignalWaiter>>,
    semaphores: Mutex<HashSet<SemaphoreId>>,
    next_texture_id: AtomicUsize,
    next_buffer_id: AtomicUsize,
    next_fence_id: AtomicUsize,
    next_semaphore_id: AtomicUsize,
}

impl WgpuHeadlessDevice {
    /// Creates a device on the best available adapter.
    ///
    /// ## Errors
    /// Fails if no adapter is available or device creation is rejected.
    pub fn new() -> anyhow::Result<Self> {
        let context = pollster::block_on(WgpuHeadlessContext::new())?;
        Ok(Self::from_context(context))
    }

    /// Wraps an already created context.
    pub fn from_context(context: WgpuHeadlessContext) -> Self {
        Self {
            context,
            textures: Mutex::new(HashMap::new()),
            buffers: Mutex::new(HashMap::new()),
            fences: Mutex::new(HashMap::new()),
            semaphores: Mutex::new(HashSet::new()),
            next_texture_id: AtomicUsize::new(0),
            next_buffer_id: AtomicUsize::new(0),
            next_fence_id: AtomicUsize::new(0),
            next_semaphore_id: AtomicUsize::new(0),
        }
    }

    /// Returns the underlying context.
    pub fn context(&self) -> &WgpuHeadlessContext {
        &self.context
    }

    fn new_semaphore(&self) -> SemaphoreId {
        let id = SemaphoreId(self.next_semaphore_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.semaphores).insert(id);
        id
    }

    fn consume_semaphore(&self, semaphore: Option<SemaphoreId>) -> Result<(), ResourceError> {
        match semaphore {
            Some(id) if !lock(&self.semaphores).remove(&id) => Err(ResourceError::InvalidHandle),
            _ => Ok(()),
        }
    }

    /// Blocks until `waiter` is signaled, driving device callbacks meanwhile.
    fn poll_until(&self, waiter: &SignalWaiter, what: &str) -> Result<(), ResourceError> {
        loop {
            if let Err(e) = self.context.device.poll(wgpu::PollType::Poll) {
                return Err(ResourceError::BackendError(format!(
                    "Device poll failed while waiting for {what}: {e:?}"
                )));
            }
            match waiter.wait_timeout(POLL_INTERVAL) {
                WaitOutcome::Signaled => return Ok(()),
                WaitOutcome::TimedOut => continue,
                WaitOutcome::Abandoned => {
                    return Err(ResourceError::BackendError(format!("{what} was abandoned")))
                }
            }
        }
    }

    /// Returns a fence signaled once everything submitted so far has completed.
    fn fence_after_submissions(&self) -> SignalWaiter {
        let (signal, waiter) = CompletionSignal::pair();
        self.context
            .queue
            .on_submitted_work_done(move || signal.signal());
        waiter
    }

    /// Returns staging storage able to receive `extent`, creating it on first use.
    fn prepare_staging(
        &self,
        id: BufferId,
        extent: Extent2D,
        format: TextureFormat,
    ) -> Result<PaddedStaging, ResourceError> {
        let mut buffers = lock(&self.buffers);
        let entry = buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if extent.byte_size(format) > entry.capacity {
            return Err(ResourceError::OutOfBounds);
        }
        if let Some(staging) = entry.staging.as_ref().filter(|s| s.extent == extent) {
            return Ok(staging.clone());
        }

        let unpadded_row = extent.width * format.bytes_per_pixel();
        let padded_row = align_row(unpadded_row);
        let usage = match entry.domain {
            MemoryDomain::CachedHost => wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            MemoryDomain::Device => wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: entry.label.as_deref(),
            size: padded_row as u64 * extent.height as u64,
            usage,
            mapped_at_creation: false,
        });
        log::debug!(
            "Allocated staging storage for {:?}: {} rows of {} bytes (padded from {}).",
            id,
            extent.height,
            padded_row,
            unpadded_row
        );

        let staging = PaddedStaging {
            buffer: Arc::new(buffer),
            extent,
            unpadded_row,
            padded_row,
        };
        entry.staging = Some(staging.clone());
        Ok(staging)
    }
}

impl HeadlessDevice for WgpuHeadlessDevice {
    fn adapter_info(&self) -> AdapterInfo {
        self.context.adapter_info.clone()
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let texture = self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: extent_3d(descriptor.size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(descriptor.format),
            usage: texture_usages(descriptor.usage),
            view_formats: &[],
        });
        // wgpu tracks image layouts itself; `resting_layout` needs no transition here.
        let id = TextureId(self.next_texture_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.textures).insert(
            id,
            WgpuTextureEntry {
                texture: Arc::new(texture),
                size: descriptor.size,
                format: descriptor.format,
            },
        );
        Ok(id)
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let entry = lock(&self.textures)
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        entry.texture.destroy();
        Ok(())
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.buffers).insert(
            id,
            WgpuBufferEntry {
                label: descriptor.label.as_ref().map(|l| l.to_string()),
                capacity: descriptor.size,
                domain: descriptor.domain,
                staging: None,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = lock(&self.buffers)
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        if let Some(staging) = entry.staging {
            staging.buffer.destroy();
        }
        Ok(())
    }

    fn submit_upload(
        &self,
        texture: TextureId,
        pixels: &[u8],
        wait: Option<SemaphoreId>,
    ) -> Result<SemaphoreId, ResourceError> {
        let (target, size, format) = {
            let textures = lock(&self.textures);
            let entry = textures.get(&texture).ok_or(ResourceError::NotFound)?;
            (entry.texture.clone(), entry.size, entry.format)
        };
        if pixels.len() as u64 != size.byte_size(format) {
            return Err(ResourceError::OutOfBounds);
        }
        self.consume_semaphore(wait)?;

        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size.width * format.bytes_per_pixel()),
                rows_per_image: Some(size.height),
            },
            extent_3d(size),
        );
        self.context.queue.submit(std::iter::empty());
        Ok(self.new_semaphore())
    }

    fn submit_readback(&self, copy: &ReadbackCopy) -> Result<ReadbackSubmission, ResourceError> {
        let (source, format) = {
            let textures = lock(&self.textures);
            let entry = textures.get(&copy.texture).ok_or(ResourceError::NotFound)?;
            if copy.extent.width > entry.size.width || copy.extent.height > entry.size.height {
                return Err(ResourceError::OutOfBounds);
            }
            (entry.texture.clone(), entry.format)
        };
        let staging = self.prepare_staging(copy.buffer, copy.extent, format)?;
        self.consume_semaphore(copy.wait)?;

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Framepipe Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &source,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(staging.padded_row),
                    rows_per_image: Some(copy.extent.height),
                },
            },
            extent_3d(copy.extent),
        );
        self.context.queue.submit(Some(encoder.finish()));

        let fence = FenceId(self.next_fence_id.fetch_add(1, Ordering::Relaxed));
        let waiter = self.fence_after_submissions();
        lock(&self.fences).insert(fence, waiter);

        Ok(ReadbackSubmission {
            fence,
            signal: self.new_semaphore(),
        })
    }

    fn wait_fence(&self, fence: FenceId) -> Result<(), ResourceError> {
        let waiter = lock(&self.fences)
            .remove(&fence)
            .ok_or(ResourceError::InvalidHandle)?;
        self.poll_until(&waiter, "readback fence")
    }

    fn read_host_buffer(&self, buffer: BufferId) -> Result<Vec<u8>, ResourceError> {
        let (capacity, staging) = {
            let buffers = lock(&self.buffers);
            let entry = buffers.get(&buffer).ok_or(ResourceError::NotFound)?;
            if entry.domain != MemoryDomain::CachedHost {
                return Err(ResourceError::BackendError(format!(
                    "{buffer:?} is not host visible"
                )));
            }
            (entry.capacity, entry.staging.clone())
        };
        let Some(staging) = staging else {
            return Ok(vec![0; capacity as usize]);
        };

        let slice = staging.buffer.slice(..);
        let (signal, waiter) = CompletionSignal::pair();
        slice.map_async(wgpu::MapMode::Read, move |result| match result {
            Ok(()) => signal.signal(),
            Err(e) => log::error!("Failed to map {buffer:?} for reading: {e:?}"),
        });
        self.poll_until(&waiter, "buffer mapping")?;

        let mut pixels =
            Vec::with_capacity(staging.unpadded_row as usize * staging.extent.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(staging.padded_row as usize) {
                pixels.extend_from_slice(&row[..staging.unpadded_row as usize]);
            }
        }
        staging.buffer.unmap();
        Ok(pixels)
    }

    fn release_semaphore(&self, semaphore: SemaphoreId) -> Result<(), ResourceError> {
        self.consume_semaphore(Some(semaphore))
    }

    fn wait_idle(&self) -> Result<(), ResourceError> {
        self.context.queue.submit(std::iter::empty());
        let waiter = self.fence_after_submissions();
        self.poll_until(&waiter, "device idle")
    }
}
