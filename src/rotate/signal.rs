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

//! Forwards `SIGHUP` into the process-wide [`RotationBroadcast`].

use std::sync::Arc;
use std::sync::Once;

use crate::Trap;
#[cfg(unix)]
use crate::rotate::RotationBroadcast;

/// The signal requesting every logger of the process to rotate.
#[cfg(unix)]
pub const ROTATION_SIGNAL: i32 = signal_hook::consts::SIGHUP;

static DAEMON: Once = Once::new();

/// Installs the rotation signal handler, once per process.
///
/// Concurrent callers block until the first one is done. A registration failure is reported on
/// `trap`; rotation then still works through the file monitor and [`crate::broadcast`].
pub(crate) fn ensure_started(trap: &Arc<dyn Trap>) {
    DAEMON.call_once(|| {
        if let Err(err) = start(trap.clone()) {
            trap.trap(&err);
        }
    });
}

/// Whether the signal handler registration has run.
pub fn signal_daemon_started() -> bool {
    DAEMON.is_completed()
}

#[cfg(unix)]
fn start(trap: Arc<dyn Trap>) -> Result<(), crate::Error> {
    use std::thread;

    use signal_hook::iterator::Signals;

    use crate::Error;
    use crate::rotate::task::catch_panic;

    let mut signals = Signals::new([ROTATION_SIGNAL]).map_err(|err| {
        Error::new("failed to register rotation signal handler")
            .with_context("signal", "SIGHUP")
            .with_source(err)
    })?;

    thread::Builder::new()
        .name("logforth-rotate-signal".to_string())
        .spawn(move || {
            let broadcast = RotationBroadcast::global();
            let result = catch_panic("signal", || {
                for _ in signals.forever() {
                    broadcast.broadcast();
                }
            });
            if let Err(err) = result {
                trap.trap(&err);
            }
        })
        .map_err(|err| Error::new("failed to spawn rotation signal handler").with_source(err))?;

    Ok(())
}

#[cfg(not(unix))]
fn start(_: Arc<dyn Trap>) -> Result<(), crate::Error> {
    Ok(())
}
