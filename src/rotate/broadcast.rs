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

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

/// A broadcast domain waking every waiting rotation watcher at once.
///
/// The broadcast does not queue events: [`broadcast`](Self::broadcast) only wakes the threads
/// currently blocked in [`wait`](Self::wait). A broadcast fired while nobody waits is lost.
///
/// Loggers built with the default settings share the process-wide instance returned by
/// [`RotationBroadcast::global`], which is also the one fired on `SIGHUP`. A logger can be bound
/// to a private domain instead, e.g. in tests.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logforth_rotate::RotationBroadcast;
///
/// let global = RotationBroadcast::global();
/// assert!(Arc::ptr_eq(&global, &RotationBroadcast::global()));
///
/// // nobody is waiting, so this is a no-op
/// RotationBroadcast::new().broadcast();
/// ```
#[derive(Debug, Default)]
pub struct RotationBroadcast {
    state: Mutex<State>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct State {
    generation: u64,
    waiters: usize,
}

/// Why [`RotationBroadcast::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// A broadcast was fired.
    Rotate,
    /// The waiter was cancelled.
    Cancelled,
}

impl RotationBroadcast {
    /// Creates a private broadcast domain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide broadcast domain, creating it on first use.
    pub fn global() -> Arc<RotationBroadcast> {
        static GLOBAL: OnceLock<Arc<RotationBroadcast>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(RotationBroadcast::new()))
            .clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wakes every thread currently waiting.
    pub fn broadcast(&self) {
        let mut state = self.state();
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.cond.notify_all();
    }

    /// Wakes every waiter without firing a broadcast, so that cancelled waiters can return.
    pub fn interrupt(&self) {
        let _state = self.state();
        self.cond.notify_all();
    }

    /// The number of threads currently blocked in [`wait`](Self::wait).
    pub fn waiters(&self) -> usize {
        self.state().waiters
    }

    /// Blocks until the next broadcast, or until `cancelled` is observed set.
    ///
    /// Only broadcasts fired after this call started count. Whoever sets `cancelled` must call
    /// [`interrupt`](Self::interrupt) afterwards to wake the waiter.
    pub fn wait(&self, cancelled: &AtomicBool) -> Wake {
        let mut state = self.state();
        let seen = state.generation;
        state.waiters += 1;

        let wake = loop {
            if state.generation != seen {
                break Wake::Rotate;
            }
            if cancelled.load(Ordering::Acquire) {
                break Wake::Cancelled;
            }
            state = self.cond.wait(state).unwrap_or_else(|e| e.into_inner());
        };

        state.waiters -= 1;
        wake
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;

    fn wait_for_waiters(broadcast: &RotationBroadcast, n: usize) {
        for _ in 0..1000 {
            if broadcast.waiters() == n {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("expected {n} waiters, found {}", broadcast.waiters());
    }

    #[test]
    fn test_global_is_created_once() {
        let handles = (0..16)
            .map(|_| thread::spawn(RotationBroadcast::global))
            .collect::<Vec<_>>();
        let instances = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        for instance in &instances {
            assert!(Arc::ptr_eq(instance, &instances[0]));
        }
        assert!(Arc::ptr_eq(&instances[0], &RotationBroadcast::global()));
    }

    #[test]
    fn test_broadcast_wakes_all_waiters() {
        let broadcast = Arc::new(RotationBroadcast::new());
        let cancelled = Arc::new(AtomicBool::new(false));

        let handles = (0..4)
            .map(|_| {
                let broadcast = broadcast.clone();
                let cancelled = cancelled.clone();
                thread::spawn(move || broadcast.wait(&cancelled))
            })
            .collect::<Vec<_>>();

        wait_for_waiters(&broadcast, 4);
        broadcast.broadcast();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Wake::Rotate);
        }
        assert_eq!(broadcast.waiters(), 0);
    }

    #[test]
    fn test_broadcast_without_waiters_is_lost() {
        let broadcast = Arc::new(RotationBroadcast::new());
        let cancelled = Arc::new(AtomicBool::new(false));
        broadcast.broadcast();

        let handle = {
            let broadcast = broadcast.clone();
            let cancelled = cancelled.clone();
            thread::spawn(move || broadcast.wait(&cancelled))
        };
        wait_for_waiters(&broadcast, 1);

        // an interrupt alone does not release a waiter that is not cancelled
        broadcast.interrupt();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(broadcast.waiters(), 1);

        cancelled.store(true, Ordering::Release);
        broadcast.interrupt();
        assert_eq!(handle.join().unwrap(), Wake::Cancelled);
    }
}
