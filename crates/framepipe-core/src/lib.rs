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

//! # Framepipe Core
//!
//! Foundational crate containing the traits, handle types, and interface contracts
//! consumed by the headless frame pipeline. Nothing in here talks to a GPU or a
//! dynamic library directly; concrete collaborators live in `framepipe-infra`.

#![warn(missing_docs)]

pub mod platform;
pub mod renderer;
pub mod telemetry;
pub mod utils;
pub mod vfs;

pub use utils::timer::Stopwatch;
