// Copyright 2024 FastLabs Developers
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

use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// A single-slot pending rotation flag owned by one logger.
///
/// Requests arriving while a rotation is already pending coalesce into it.
#[derive(Debug, Default)]
pub(crate) struct RotationTrigger {
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct State {
    pending: bool,
    closed: bool,
}

impl RotationTrigger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks a rotation as pending.
    ///
    /// Returns `false` if a rotation was already pending or the trigger is closed.
    pub(crate) fn request(&self) -> bool {
        let mut state = self.state();
        if state.pending || state.closed {
            return false;
        }
        state.pending = true;
        drop(state);
        self.cond.notify_one();
        true
    }

    /// Blocks until a rotation is pending and consumes it.
    ///
    /// Returns `false` once the trigger is closed.
    pub(crate) fn wait(&self) -> bool {
        let mut state = self.state();
        loop {
            if state.closed {
                return false;
            }
            if state.pending {
                state.pending = false;
                return true;
            }
            state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub(crate) fn close(&self) {
        self.state().closed = true;
        self.cond.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.state().pending
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_requests_coalesce() {
        let trigger = RotationTrigger::new();
        assert!(trigger.request());
        assert!(!trigger.request());
        assert!(!trigger.request());
        assert!(trigger.is_pending());

        assert!(trigger.wait());
        assert!(!trigger.is_pending());
        assert!(trigger.request());
    }

    #[test]
    fn test_close_releases_waiter() {
        let trigger = Arc::new(RotationTrigger::new());
        let handle = {
            let trigger = trigger.clone();
            thread::spawn(move || trigger.wait())
        };

        trigger.close();
        assert!(!handle.join().unwrap());
        assert!(!trigger.request());
    }

    #[test]
    fn test_wait_consumes_request_from_other_thread() {
        let trigger = Arc::new(RotationTrigger::new());
        let handle = {
            let trigger = trigger.clone();
            thread::spawn(move || trigger.wait())
        };

        trigger.request();
        assert!(handle.join().unwrap());
    }
}
