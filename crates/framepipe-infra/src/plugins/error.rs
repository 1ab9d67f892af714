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

use std::path::PathBuf;
use thiserror::Error;

/// An error raised while loading a plugin library.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The dynamic library could not be opened.
    #[error("Failed to load plugin library '{path}': {source}")]
    Load {
        /// Path of the library.
        path: PathBuf,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },
    /// A required entry point is not exported.
    #[error("Plugin '{path}' does not export '{symbol}'")]
    MissingSymbol {
        /// Path of the library.
        path: PathBuf,
        /// Name of the missing entry point.
        symbol: &'static str,
    },
    /// The plugin reported failure while filling in its interface.
    #[error("Plugin '{path}' refused to provide its interface")]
    InterfaceRejected {
        /// Path of the library.
        path: PathBuf,
    },
    /// The interface is missing one of its functions.
    #[error("Plugin '{path}' provided an incomplete interface (missing '{function}')")]
    IncompleteInterface {
        /// Path of the library.
        path: PathBuf,
        /// Name of the missing function.
        function: &'static str,
    },
    /// The plugin could not create its context handle.
    #[error("Plugin '{path}' failed to create a counter context")]
    ContextCreation {
        /// Path of the library.
        path: PathBuf,
    },
}
