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

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::select;
use crossbeam_channel::tick;

use crate::rotate::trigger::RotationTrigger;

/// How often the log file is checked for existence by default.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Requests a rotation whenever the log file has disappeared from the filesystem.
///
/// This catches external tools removing or renaming the active file, which would otherwise leave
/// the logger writing to an unlinked inode.
#[derive(Debug)]
pub(crate) struct FileMonitor {
    path: PathBuf,
    interval: Duration,
    trigger: Arc<RotationTrigger>,
}

impl FileMonitor {
    pub(crate) fn new(path: PathBuf, interval: Duration, trigger: Arc<RotationTrigger>) -> Self {
        Self {
            path,
            interval,
            trigger,
        }
    }

    /// Runs until `shutdown` is disconnected.
    pub(crate) fn run(self, shutdown: Receiver<()>) {
        let ticker = tick(self.interval);
        loop {
            select! {
                recv(shutdown) -> _ => break,
                recv(ticker) -> _ => self.check(),
            }
        }
    }

    fn check(&self) {
        // any outcome other than "not found" waits for the next tick
        if let Err(err) = fs::metadata(&self.path) {
            if err.kind() == io::ErrorKind::NotFound {
                self.trigger.request();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::thread;
    use std::time::Instant;

    use crossbeam_channel::bounded;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_check_only_triggers_on_missing_file() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        File::create(&path).unwrap();

        let trigger = Arc::new(RotationTrigger::new());
        let monitor = FileMonitor::new(path.clone(), DEFAULT_CHECK_INTERVAL, trigger.clone());

        monitor.check();
        assert!(!trigger.is_pending());

        fs::remove_file(&path).unwrap();
        monitor.check();
        assert!(trigger.is_pending());
    }

    #[test]
    fn test_removal_is_noticed_within_two_intervals() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        File::create(&path).unwrap();

        let interval = Duration::from_millis(100);
        let trigger = Arc::new(RotationTrigger::new());
        let monitor = FileMonitor::new(path.clone(), interval, trigger.clone());

        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let handle = thread::spawn(move || monitor.run(shutdown_rx));

        // let a few ticks pass over the existing file
        thread::sleep(interval * 3);
        assert!(!trigger.is_pending());

        let removed = Instant::now();
        fs::remove_file(&path).unwrap();
        assert!(trigger.wait());
        let elapsed = removed.elapsed();
        assert!(elapsed < interval * 2, "noticed after {elapsed:?}");

        drop(shutdown_tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let trigger = Arc::new(RotationTrigger::new());
        let monitor = FileMonitor::new(
            temp_dir.path().join("missing.log"),
            Duration::from_millis(5),
            trigger.clone(),
        );

        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let handle = thread::spawn(move || monitor.run(shutdown_rx));

        assert!(trigger.wait());
        drop(shutdown_tx);
        handle.join().unwrap();
    }
}
