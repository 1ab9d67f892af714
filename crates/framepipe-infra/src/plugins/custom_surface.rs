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

//! Custom presentation surfaces provided by a plugin library.

use super::PluginError;
use framepipe_core::platform::{CustomSurfaceProvider, SurfaceError, BASE_SURFACE_EXTENSION};
use libloading::Library;
use std::ffi::{c_char, c_void, CStr};
use std::path::{Path, PathBuf};

/// Exported function returning the surface's instance extension name.
pub const SURFACE_EXTENSION_SYMBOL: &str = "GraniteCustomVulkanSurfaceExtension";
/// Exported function creating the surface.
pub const CREATE_SURFACE_SYMBOL: &str = "GraniteCreateCustomVulkanSurface";

type ExtensionFn = unsafe extern "C" fn() -> *const c_char;
type CreateSurfaceFn = unsafe extern "C" fn(
    instance: u64,
    get_instance_proc_addr: *const c_void,
    width: u32,
    height: u32,
    surface: *mut u64,
) -> i32;

/// A loaded custom-surface plugin.
///
/// Entry points are resolved lazily: a library missing one of them stays
/// loaded, and the corresponding feature is disabled with a logged error.
#[derive(Debug)]
pub struct CustomSurfaceLibrary {
    path: PathBuf,
    library: Library,
}

impl CustomSurfaceLibrary {
    /// Opens the plugin at `path`.
    ///
    /// ## Errors
    /// * `PluginError::Load` - If the library cannot be opened.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        // SAFETY: loading a library runs its initializers; the user explicitly
        // asked for this plugin on the command line.
        let library = unsafe { Library::new(path) }.map_err(|source| PluginError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Custom surface plugin loaded from '{}'.", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            library,
        })
    }

    fn extension_name(&self) -> Option<String> {
        let extension = match unsafe {
            self.library
                .get::<ExtensionFn>(SURFACE_EXTENSION_SYMBOL.as_bytes())
        } {
            Ok(symbol) => *symbol,
            Err(_) => {
                log::error!(
                    "Surface plugin '{}' does not export '{}'; custom surface disabled.",
                    self.path.display(),
                    SURFACE_EXTENSION_SYMBOL
                );
                return None;
            }
        };

        // SAFETY: the plugin returns a static NUL-terminated string or null.
        let name = unsafe { extension() };
        if name.is_null() {
            return None;
        }
        Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
    }
}

impl CustomSurfaceProvider for CustomSurfaceLibrary {
    fn instance_extensions(&self) -> Vec<String> {
        let mut extensions = vec![BASE_SURFACE_EXTENSION.to_string()];
        extensions.extend(self.extension_name());
        extensions
    }

    unsafe fn create_surface(
        &self,
        instance: u64,
        get_instance_proc_addr: *const c_void,
        width: u32,
        height: u32,
    ) -> Result<u64, SurfaceError> {
        let create: CreateSurfaceFn = *self
            .library
            .get::<CreateSurfaceFn>(CREATE_SURFACE_SYMBOL.as_bytes())
            .map_err(|_| {
                log::error!(
                    "Surface plugin '{}' does not export '{}'.",
                    self.path.display(),
                    CREATE_SURFACE_SYMBOL
                );
                SurfaceError::MissingEntryPoint(CREATE_SURFACE_SYMBOL)
            })?;

        let mut surface = 0u64;
        let result = create(instance, get_instance_proc_addr, width, height, &mut surface);
        if result != 0 {
            return Err(SurfaceError::CreationFailed(result));
        }
        Ok(surface)
    }
}
