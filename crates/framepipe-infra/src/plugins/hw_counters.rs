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

//! Hardware performance counters provided by a vendor plugin.
//!
//! The plugin exports a single C entry point that fills in a table of three
//! functions: create a counter context, destroy it, and block until the next
//! sample is available.

use super::PluginError;
use framepipe_core::telemetry::{CounterSampler, HwCounterSample, NoopCounterSampler};
use libloading::Library;
use std::borrow::Cow;
use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Name of the entry point every counter plugin exports.
pub const HW_COUNTER_ENTRY_POINT: &str = "get_hw_counter_interface";

/// A counter sample as laid out by the plugin.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RawHwCounter {
    /// GPU cycles elapsed.
    pub gpu_cycles: u64,
    /// Bytes read from external memory.
    pub bandwidth_read: u64,
    /// Bytes written to external memory.
    pub bandwidth_write: u64,
}

/// Function table filled in by [`HW_COUNTER_ENTRY_POINT`].
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RawHwCounterInterface {
    /// Creates a counter context. Returns null on failure.
    pub create: Option<unsafe extern "C" fn() -> *mut c_void>,
    /// Destroys a context returned by `create`.
    pub destroy: Option<unsafe extern "C" fn(*mut c_void)>,
    /// Blocks until a sample is available and writes it out.
    pub wait_sample: Option<unsafe extern "C" fn(*mut c_void, *mut RawHwCounter) -> bool>,
}

type GetInterfaceFn = unsafe extern "C" fn(*mut RawHwCounterInterface) -> bool;

type CreateFn = unsafe extern "C" fn() -> *mut c_void;
type DestroyFn = unsafe extern "C" fn(*mut c_void);
type WaitSampleFn = unsafe extern "C" fn(*mut c_void, *mut RawHwCounter) -> bool;

/// A loaded counter plugin with a live counter context.
pub struct HwCounterLibrary {
    path: PathBuf,
    context: NonNull<c_void>,
    destroy: DestroyFn,
    wait_sample: WaitSampleFn,
    // Dropped last: the function pointers above point into it.
    _library: Library,
}

// SAFETY: the plugin contract requires the context to be usable from any
// thread; it is only ever used through `&self` by one sampler owner at a time.
unsafe impl Send for HwCounterLibrary {}

impl fmt::Debug for HwCounterLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwCounterLibrary")
            .field("path", &self.path)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl HwCounterLibrary {
    /// Loads the plugin at `path` and creates its counter context.
    ///
    /// ## Errors
    /// Any failure to open the library, resolve the entry point, obtain a
    /// complete interface, or create the context.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let owned = path.to_path_buf();
        // SAFETY: loading a library runs its initializers; the user explicitly
        // asked for this plugin on the command line.
        let library = unsafe { Library::new(path) }.map_err(|source| PluginError::Load {
            path: owned.clone(),
            source,
        })?;

        let get_interface: GetInterfaceFn = unsafe {
            *library
                .get::<GetInterfaceFn>(HW_COUNTER_ENTRY_POINT.as_bytes())
                .map_err(|_| PluginError::MissingSymbol {
                    path: owned.clone(),
                    symbol: HW_COUNTER_ENTRY_POINT,
                })?
        };

        let mut interface = RawHwCounterInterface::default();
        if !unsafe { get_interface(&mut interface) } {
            return Err(PluginError::InterfaceRejected { path: owned });
        }

        let incomplete = |function| PluginError::IncompleteInterface {
            path: owned.clone(),
            function,
        };
        let create: CreateFn = interface.create.ok_or_else(|| incomplete("create"))?;
        let destroy: DestroyFn = interface.destroy.ok_or_else(|| incomplete("destroy"))?;
        let wait_sample: WaitSampleFn = interface
            .wait_sample
            .ok_or_else(|| incomplete("wait_sample"))?;

        let context = NonNull::new(unsafe { create() })
            .ok_or_else(|| PluginError::ContextCreation { path: owned.clone() })?;

        log::info!("Hardware counter plugin loaded from '{}'.", owned.display());
        Ok(Self {
            path: owned,
            context,
            destroy,
            wait_sample,
            _library: library,
        })
    }
}

impl CounterSampler for HwCounterLibrary {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("plugin:{}", self.path.display()))
    }

    fn sample(&self) -> Option<HwCounterSample> {
        let mut raw = RawHwCounter::default();
        // SAFETY: the context came from this plugin's `create` and is still live.
        if !unsafe { (self.wait_sample)(self.context.as_ptr(), &mut raw) } {
            log::warn!("Hardware counter plugin failed to produce a sample.");
            return None;
        }
        Some(HwCounterSample {
            gpu_cycles: raw.gpu_cycles,
            bandwidth_read: raw.bandwidth_read,
            bandwidth_write: raw.bandwidth_write,
        })
    }
}

impl Drop for HwCounterLibrary {
    fn drop(&mut self) {
        // SAFETY: destroyed exactly once, before the library is unloaded.
        unsafe { (self.destroy)(self.context.as_ptr()) };
    }
}

/// Returns the counter sampler for a run.
///
/// With no path the sampler is a no-op. If the plugin cannot be used the error
/// is logged and the run continues without counters.
pub fn load_counter_sampler(path: Option<&Path>) -> Box<dyn CounterSampler> {
    match path.map(HwCounterLibrary::load) {
        Some(Ok(library)) => Box::new(library),
        Some(Err(e)) => {
            log::error!("{e}; hardware counters disabled.");
            Box::new(NoopCounterSampler)
        }
        None => Box::new(NoopCounterSampler),
    }
}
