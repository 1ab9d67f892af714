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

//! One-shot completion signals shared by the backends to implement fences.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// The signaling half of a fence.
#[derive(Debug)]
pub(crate) struct CompletionSignal(Sender<()>);

/// The host-waitable half of a fence.
#[derive(Debug)]
pub(crate) struct SignalWaiter(Receiver<()>);

impl CompletionSignal {
    /// Creates a connected signal/waiter pair.
    pub(crate) fn pair() -> (CompletionSignal, SignalWaiter) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (CompletionSignal(tx), SignalWaiter(rx))
    }

    /// Marks the work as complete. Signaling twice is a no-op.
    pub(crate) fn signal(&self) {
        let _ = self.0.try_send(());
    }
}

/// Outcome of a bounded wait.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    Signaled,
    TimedOut,
    /// The signaling half was dropped without signaling.
    Abandoned,
}

impl SignalWaiter {
    /// Blocks until signaled or abandoned.
    pub(crate) fn wait(&self) -> WaitOutcome {
        match self.0.recv() {
            Ok(()) => WaitOutcome::Signaled,
            Err(_) => WaitOutcome::Abandoned,
        }
    }

    /// Blocks for at most `timeout`.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> WaitOutcome {
        match self.0.recv_timeout(timeout) {
            Ok(()) => WaitOutcome::Signaled,
            Err(RecvTimeoutError::Timeout) => WaitOutcome::TimedOut,
            Err(RecvTimeoutError::Disconnected) => WaitOutcome::Abandoned,
        }
    }
}
