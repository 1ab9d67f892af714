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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// The graphics collaborator of the headless pipeline.
///
/// Every call has a synchronous-looking signature, but submissions execute
/// asynchronously on the device; completion is only observable through the
/// returned fences and semaphores. Implementations must be usable from the
/// submission thread and from every frame worker at the same time.
pub trait HeadlessDevice: Send + Sync + Debug + 'static {
    /// Returns information about the adapter backing this device.
    fn adapter_info(&self) -> AdapterInfo;

    /// Creates a render-target texture.
    /// ## Errors
    /// * `ResourceError` - If the backend rejects the descriptor.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError>;

    /// Destroys a texture.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a staging buffer.
    /// ## Errors
    /// * `ResourceError` - If the allocation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a buffer.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Writes tightly packed pixels into a texture once `wait` (if any) is signaled.
    ///
    /// This is the minimal drawing capability a renderer needs to produce a frame.
    /// ## Returns
    /// The release semaphore, signaled when the write has landed.
    fn submit_upload(
        &self,
        texture: TextureId,
        pixels: &[u8],
        wait: Option<SemaphoreId>,
    ) -> Result<SemaphoreId, ResourceError>;

    /// Records and submits a copy of an image into a host-readable buffer.
    ///
    /// The transfer waits on `copy.wait`, ends with a transfer-to-host barrier,
    /// and signals both a fence (for the host) and a semaphore (for the next
    /// writer of the image).
    fn submit_readback(&self, copy: &ReadbackCopy) -> Result<ReadbackSubmission, ResourceError>;

    /// Blocks until `fence` is signaled. The fence is consumed.
    fn wait_fence(&self, fence: FenceId) -> Result<(), ResourceError>;

    /// Maps `buffer` for reading, copies out tightly packed rows, and unmaps it.
    ///
    /// Callers must have waited on the fence of the last copy into the buffer.
    fn read_host_buffer(&self, buffer: BufferId) -> Result<Vec<u8>, ResourceError>;

    /// Discards a semaphore nobody is going to wait on.
    fn release_semaphore(&self, semaphore: SemaphoreId) -> Result<(), ResourceError>;

    /// Blocks until every submission made so far has completed.
    fn wait_idle(&self) -> Result<(), ResourceError>;
}
