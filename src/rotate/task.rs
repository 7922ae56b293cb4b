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

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;

use crate::Error;
use crate::Trap;
use crate::rotate::RotationBroadcast;
use crate::rotate::trigger::RotationTrigger;

/// The liveness of a background rotation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    /// The task name, e.g. `watcher`, `monitor` or `rotator`.
    pub name: &'static str,
    /// Whether the task is still running. A task stops only on logger teardown or after a panic.
    pub running: bool,
}

#[derive(Debug)]
struct Task {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// The background tasks owned by one logger, cancelled together on drop.
#[derive(Debug)]
pub(crate) struct Tasks {
    tasks: Vec<Task>,
    cancelled: Arc<AtomicBool>,
    shutdown_tx: Option<Sender<()>>,
    shutdown_rx: Receiver<()>,
    broadcast: Arc<RotationBroadcast>,
    trigger: Arc<RotationTrigger>,
    trap: Arc<dyn Trap>,
}

impl Tasks {
    pub(crate) fn new(
        broadcast: Arc<RotationBroadcast>,
        trigger: Arc<RotationTrigger>,
        trap: Arc<dyn Trap>,
    ) -> Self {
        // never sent on, only disconnected
        let (shutdown_tx, shutdown_rx) = bounded(0);
        Self {
            tasks: vec![],
            cancelled: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Some(shutdown_tx),
            shutdown_rx,
            broadcast,
            trigger,
            trap,
        }
    }

    /// A flag set once the tasks are cancelled.
    pub(crate) fn cancelled(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// A channel disconnected once the tasks are cancelled.
    pub(crate) fn shutdown(&self) -> Receiver<()> {
        self.shutdown_rx.clone()
    }

    /// Spawns a named task. A panic ends the task and is reported on the trap.
    pub(crate) fn spawn<F>(&mut self, name: &'static str, f: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let trap = self.trap.clone();
        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name(format!("logforth-rotate-{name}"))
                .spawn(move || {
                    let result = catch_panic(name, f);
                    running.store(false, Ordering::Release);
                    if let Err(err) = result {
                        trap.trap(&err);
                    }
                })
                .map_err(|err| {
                    Error::new("failed to spawn rotation task")
                        .with_context("task", name)
                        .with_source(err)
                })?
        };

        self.tasks.push(Task {
            name,
            running,
            handle: Some(handle),
        });
        Ok(())
    }

    pub(crate) fn status(&self) -> Vec<TaskStatus> {
        self.tasks
            .iter()
            .map(|task| TaskStatus {
                name: task.name,
                running: task.running.load(Ordering::Acquire),
            })
            .collect()
    }

    /// Stops every task and waits for them to exit.
    pub(crate) fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        self.shutdown_tx.take();
        self.trigger.close();
        self.broadcast.interrupt();

        for task in &mut self.tasks {
            if let Some(handle) = task.handle.take() {
                // panics were caught and trapped inside the task
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs `f` to completion, turning a panic into an error naming the task.
pub(crate) fn catch_panic(name: &'static str, f: impl FnOnce()) -> Result<(), Error> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        Error::new("rotation task exited permanently after a panic")
            .with_context("task", name)
            .with_context("panic", panic_message(payload.as_ref()))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct CollectTrap(Arc<Mutex<Vec<String>>>);

    impl Trap for CollectTrap {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    #[test]
    fn test_catch_panic() {
        assert!(catch_panic("calm", || {}).is_ok());

        let err = catch_panic("boom", || panic!("kaboom {}", 42)).unwrap_err();
        assert_eq!(err.context("task"), Some("boom"));
        assert_eq!(err.context("panic"), Some("kaboom 42"));
    }

    #[test]
    fn test_panic_is_trapped_and_observable() {
        let errors = Arc::new(Mutex::new(vec![]));
        let trap: Arc<dyn Trap> = Arc::new(CollectTrap(errors.clone()));
        let mut tasks = Tasks::new(
            Arc::new(RotationBroadcast::new()),
            Arc::new(RotationTrigger::new()),
            trap,
        );

        tasks.spawn("boom", || panic!("kaboom")).unwrap();
        let shutdown = tasks.shutdown();
        tasks
            .spawn("idle", move || {
                let _ = shutdown.recv();
            })
            .unwrap();

        while tasks.status()[0].running {
            thread::yield_now();
        }
        assert_eq!(
            tasks.status(),
            vec![
                TaskStatus {
                    name: "boom",
                    running: false
                },
                TaskStatus {
                    name: "idle",
                    running: true
                },
            ]
        );

        tasks.cancel();
        assert!(tasks.status().iter().all(|s| !s.running));

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("task: boom"));
        assert!(errors[0].contains("panic: kaboom"));
    }
}
