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

//! Custom presentation surfaces provided by a plugin.

use std::ffi::c_void;
use std::fmt;

/// The instance extension every custom surface builds on.
pub const BASE_SURFACE_EXTENSION: &str = "VK_KHR_surface";

/// An error raised while creating a custom surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The plugin does not export the entry point.
    MissingEntryPoint(&'static str),
    /// The plugin returned a non-success result code.
    CreationFailed(i32),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::MissingEntryPoint(name) => {
                write!(f, "Surface plugin does not export '{name}'")
            }
            SurfaceError::CreationFailed(code) => {
                write!(f, "Surface plugin failed to create a surface (result {code})")
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

/// A plugin able to create a presentation surface for an externally owned instance.
pub trait CustomSurfaceProvider: Send + Sync + fmt::Debug {
    /// Instance extensions required by the surface, always starting with
    /// [`BASE_SURFACE_EXTENSION`].
    fn instance_extensions(&self) -> Vec<String>;

    /// Creates a surface for `instance`, resolving entry points through `get_instance_proc_addr`.
    ///
    /// # Safety
    /// `instance` and `get_instance_proc_addr` must be valid handles of the same
    /// live API instance.
    unsafe fn create_surface(
        &self,
        instance: u64,
        get_instance_proc_addr: *const c_void,
        width: u32,
        height: u32,
    ) -> Result<u64, SurfaceError>;
}
