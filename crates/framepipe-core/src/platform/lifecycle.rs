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

//! Application lifecycle notifications.
//!
//! Observers are handed to whoever owns the lifecycle (the headless pipeline)
//! at construction time instead of being reached through a process-wide bus.

/// The coarse state of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationLifecycle {
    /// Frames are being produced.
    Running,
    /// Resources exist but no frames are being produced.
    Paused,
    /// Resources are gone.
    Stopped,
}

/// Receives lifecycle transitions.
pub trait LifecycleObserver: Send {
    /// Called once per transition, in order.
    fn on_lifecycle(&mut self, state: ApplicationLifecycle);
}

impl<F> LifecycleObserver for F
where
    F: FnMut(ApplicationLifecycle) + Send,
{
    fn on_lifecycle(&mut self, state: ApplicationLifecycle) {
        self(state)
    }
}
