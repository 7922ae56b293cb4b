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

#![allow(dead_code)]

use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use logforth_rotate::Error;
use logforth_rotate::Rotate;
use logforth_rotate::Trap;

/// A rotator keeping records in memory and counting rotations.
#[derive(Debug, Clone, Default)]
pub struct StubRotator {
    pub rotations: Arc<AtomicUsize>,
    pub written: Arc<Mutex<Vec<u8>>>,
    /// Held by a test to block rotations in progress.
    pub gate: Arc<Mutex<()>>,
    pub fail: bool,
}

impl StubRotator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn rotations(&self) -> usize {
        self.rotations.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> String {
        String::from_utf8(self.written.lock().unwrap().clone()).unwrap()
    }
}

impl Write for StubRotator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Rotate for StubRotator {
    fn rotate(&mut self) -> io::Result<()> {
        let _gate = self.gate.lock().unwrap();
        self.rotations.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(io::Error::other("disk on fire"))
        } else {
            Ok(())
        }
    }
}

/// A trap collecting errors for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectTrap(pub Arc<Mutex<Vec<String>>>);

impl CollectTrap {
    pub fn errors(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Trap for CollectTrap {
    fn trap(&self, err: &Error) {
        self.0.lock().unwrap().push(err.to_string());
    }
}

/// Polls `cond` until it holds, failing the test after five seconds.
pub fn wait_until(what: &str, cond: impl FnMut() -> bool) {
    wait_within(what, Duration::from_secs(5), cond);
}

/// Polls `cond` until it holds, failing the test once `timeout` has passed.
pub fn wait_within(what: &str, timeout: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}
