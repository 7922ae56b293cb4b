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

//! Coordination of log file rotation.
//!
//! Every logger owns three background tasks:
//!
//! * a watcher, turning broadcasts of its [`RotationBroadcast`] into rotation requests;
//! * a monitor, requesting a rotation when the log file disappears;
//! * a consumer, calling [`Rotate::rotate`] for each pending request, one at a time.
//!
//! Requests go through a single-slot trigger, so several requests arriving before the consumer
//! catches up result in one rotation.

use std::fmt;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

pub use self::broadcast::RotationBroadcast;
pub use self::broadcast::Wake;
pub use self::monitor::DEFAULT_CHECK_INTERVAL;
#[cfg(unix)]
pub use self::signal::ROTATION_SIGNAL;
pub use self::signal::signal_daemon_started;
pub use self::task::TaskStatus;

mod broadcast;
pub(crate) mod consumer;
pub(crate) mod monitor;
pub(crate) mod signal;
pub(crate) mod task;
pub(crate) mod trigger;
pub(crate) mod watcher;

/// A writer that can close its current file and start a new one on request.
///
/// Implementations own the rotation policy: naming and retention of old files, and whether
/// writes themselves cause rotations.
pub trait Rotate: Write + fmt::Debug + Send + 'static {
    /// Closes the current file and opens a fresh one at the configured path.
    ///
    /// This must succeed if the current file was removed from the filesystem externally.
    fn rotate(&mut self) -> io::Result<()>;
}

pub(crate) type SharedRotator = Arc<Mutex<Box<dyn Rotate>>>;

pub(crate) fn lock_rotator(rotator: &SharedRotator) -> MutexGuard<'_, Box<dyn Rotate>> {
    rotator.lock().unwrap_or_else(|e| e.into_inner())
}
