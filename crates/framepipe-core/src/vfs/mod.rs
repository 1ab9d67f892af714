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

//! Protocol-based path resolution.
//!
//! Paths of the form `protocol://relative/path` are resolved against a root
//! directory mounted for that protocol (`assets`, `cache`, `builtin`, ...).
//! Paths without a protocol are plain filesystem paths.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// An error raised while resolving or writing through the mount table.
#[derive(Debug)]
pub enum MountError {
    /// No root is mounted for the protocol.
    UnknownProtocol(String),
    /// The underlying filesystem operation failed.
    Io {
        /// The resolved path.
        path: PathBuf,
        /// The I/O error.
        source: std::io::Error,
    },
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::UnknownProtocol(protocol) => {
                write!(f, "No filesystem mounted for protocol '{protocol}'")
            }
            MountError::Io { path, source } => {
                write!(f, "I/O error on '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for MountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MountError::Io { source, .. } => Some(source),
            MountError::UnknownProtocol(_) => None,
        }
    }
}

/// Maps protocol names to root directories.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    roots: HashMap<String, PathBuf>,
}

impl MountTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `root` for `protocol`, replacing any previous mount.
    pub fn register_protocol(&mut self, protocol: impl Into<String>, root: impl Into<PathBuf>) {
        let protocol = protocol.into();
        let root = root.into();
        log::debug!("Mounting '{protocol}://' at '{}'", root.display());
        self.roots.insert(protocol, root);
    }

    /// Returns the root mounted for `protocol`, if any.
    pub fn root(&self, protocol: &str) -> Option<&Path> {
        self.roots.get(protocol).map(PathBuf::as_path)
    }

    /// Resolves `path` to a real filesystem path.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, MountError> {
        match path.split_once("://") {
            Some((protocol, relative)) => self
                .root(protocol)
                .map(|root| root.join(relative))
                .ok_or_else(|| MountError::UnknownProtocol(protocol.to_string())),
            None => Ok(PathBuf::from(path)),
        }
    }

    /// Resolves `path` and writes `contents` to it.
    pub fn write_string(&self, path: &str, contents: &str) -> Result<PathBuf, MountError> {
        let resolved = self.resolve(path)?;
        std::fs::write(&resolved, contents).map_err(|source| MountError::Io {
            path: resolved.clone(),
            source,
        })?;
        Ok(resolved)
    }
}
