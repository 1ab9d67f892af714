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

//! A CPU implementation of the graphics collaborator.
//!
//! Submissions run on a dedicated queue thread so completion is genuinely
//! asynchronous with respect to the host, like on a real device. Every
//! observable step is appended to a bounded journal that tests use to check
//! ordering.

mod device;

pub use self::device::{DeviceEvent, SoftwareDevice, SoftwareDeviceConfig};
