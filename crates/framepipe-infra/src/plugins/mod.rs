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

//! Dynamically loaded plugins.
//!
//! Both plugin kinds are optional: a missing or broken library never aborts a
//! run, the corresponding capability is simply disabled.

mod custom_surface;
mod error;
mod hw_counters;

pub use self::custom_surface::{
    CustomSurfaceLibrary, CREATE_SURFACE_SYMBOL, SURFACE_EXTENSION_SYMBOL,
};
pub use self::error::PluginError;
pub use self::hw_counters::{
    load_counter_sampler, HwCounterLibrary, RawHwCounter, RawHwCounterInterface,
    HW_COUNTER_ENTRY_POINT,
};
