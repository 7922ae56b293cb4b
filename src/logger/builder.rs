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
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde::Deserializer;

use crate::Error;
use crate::LogConfig;
use crate::Logger;
use crate::Rotate;
use crate::Trap;
use crate::append::RotatingFile;
use crate::layout::ConsoleLayout;
use crate::layout::Layout;
use crate::record::Field;
use crate::rotate::DEFAULT_CHECK_INTERVAL;
use crate::rotate::RotationBroadcast;
use crate::rotate::SharedRotator;
use crate::rotate::consumer::RotationConsumer;
use crate::rotate::monitor::FileMonitor;
use crate::rotate::signal;
use crate::rotate::task::Tasks;
use crate::rotate::trigger::RotationTrigger;
use crate::rotate::watcher::RotationWatcher;
use crate::trap;
use crate::trap::DefaultTrap;

const MEGABYTE: u64 = 1024 * 1024;
const DAY: u64 = 24 * 60 * 60;

/// Creates a logger from `config`, exiting the process if the configuration is invalid.
///
/// This is a shorthand for `LoggerBuilder::new(config).build()`.
pub fn new_logger(config: LogConfig) -> Logger {
    LoggerBuilder::new(config).build()
}

/// Decodes a [`LogConfig`] and creates a logger from it.
///
/// # Errors
///
/// Return the deserializer's error if the configuration cannot be decoded, in which case no
/// logger is constructed. An invalid decoded configuration exits the process like
/// [`new_logger`].
///
/// # Examples
///
/// ```no_run
/// let yaml = "logfile: /var/log/app/error.log\nlevel: warn\n";
/// let logger = logforth_rotate::decode_logger(serde_yaml::Deserializer::from_str(yaml)).unwrap();
/// ```
pub fn decode_logger<'de, D>(deserializer: D) -> Result<Logger, D::Error>
where
    D: Deserializer<'de>,
{
    let config = LogConfig::deserialize(deserializer)?;
    Ok(new_logger(config))
}

/// A builder for configuring a [`Logger`] and its rotation tasks.
///
/// By default, the logger writes to a [`RotatingFile`] configured from the [`LogConfig`], and
/// rotates it when the process receives `SIGHUP`, when [`broadcast`](crate::broadcast) is
/// called, or when the file disappears from disk.
///
/// # Examples
///
/// ```no_run
/// use logforth_rotate::LogConfig;
/// use logforth_rotate::LoggerBuilder;
///
/// let config = LogConfig {
///     logfile: "/var/log/app/error.log".to_string(),
///     level: "debug".to_string(),
///     ..Default::default()
/// };
///
/// let logger = LoggerBuilder::new(config)
///     .name("app")
///     .field("pid", std::process::id())
///     .try_build()
///     .unwrap();
/// logger.debug(format_args!("ready"));
/// ```
#[must_use = "call `build` or `try_build` to construct the logger"]
#[derive(Debug)]
pub struct LoggerBuilder {
    config: LogConfig,
    rotator: Option<Box<dyn Rotate>>,
    broadcast: Option<Arc<RotationBroadcast>>,
    check_interval: Duration,
    monitor_file: Option<bool>,
    trap: Arc<dyn Trap>,
    layout: Option<Box<dyn Layout>>,
    name: Option<String>,
    fields: Vec<Field>,
    caller: Option<bool>,
}

impl LoggerBuilder {
    /// Create a new [`LoggerBuilder`] from a configuration.
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            rotator: None,
            broadcast: None,
            check_interval: DEFAULT_CHECK_INTERVAL,
            monitor_file: None,
            trap: Arc::new(DefaultTrap::default()),
            layout: None,
            name: None,
            fields: vec![],
            caller: None,
        }
    }

    /// Write to `rotator` instead of a [`RotatingFile`] built from the configuration.
    ///
    /// The configured log file is still validated, but is no longer watched for removal unless
    /// [`LoggerBuilder::monitor_file`] asks for it.
    pub fn rotator(mut self, rotator: impl Rotate) -> Self {
        self.rotator = Some(Box::new(rotator));
        self
    }

    /// Listen to `broadcast` instead of the process-wide one.
    ///
    /// The `SIGHUP` handler is only installed for loggers on the process-wide broadcast.
    pub fn broadcast(mut self, broadcast: Arc<RotationBroadcast>) -> Self {
        self.broadcast = Some(broadcast);
        self
    }

    /// Set the interval of checking whether the log file still exists.
    ///
    /// Default to [`DEFAULT_CHECK_INTERVAL`].
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Set whether a missing log file triggers a rotation.
    ///
    /// Default to `true` for a [`RotatingFile`] built from the configuration, and to `false` when
    /// a rotator is set with [`LoggerBuilder::rotator`], since it may write elsewhere.
    pub fn monitor_file(mut self, monitor: bool) -> Self {
        self.monitor_file = Some(monitor);
        self
    }

    /// Set the trap receiving errors of writes and background rotation.
    ///
    /// Default to [`DefaultTrap`].
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Arc::from(trap.into());
        self
    }

    /// Format records with `layout` instead of a [`ConsoleLayout`] built from the encoder
    /// configuration.
    pub fn layout(mut self, layout: impl Into<Box<dyn Layout>>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    /// Set the logger name written with every record.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a field written with every record.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }

    /// Add a duration field written with every record, rendered by the duration encoder.
    pub fn duration_field(mut self, key: impl Into<String>, value: Duration) -> Self {
        self.fields.push(Field::duration(key, value));
        self
    }

    /// Set whether records carry the source location of the logging call.
    ///
    /// Default to the `trace` flag of the configuration.
    pub fn caller(mut self, caller: bool) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Build the [`Logger`], exiting the process with status 1 if the configuration is invalid.
    ///
    /// See [`LoggerBuilder::try_build`] for the errors.
    pub fn build(self) -> Logger {
        match self.try_build() {
            Ok(logger) => logger,
            Err(err) => trap::fatal(&err),
        }
    }

    /// Build the [`Logger`] and start its rotation tasks.
    ///
    /// # Errors
    ///
    /// Return an error if:
    ///
    /// * the log file path cannot be made absolute, or names a directory;
    /// * the log file cannot be inspected for a reason other than not existing;
    /// * the parent directories of the log file cannot be created;
    /// * the level is not one of `debug`, `info`, `warn`, `error`, `panic` or `fatal`;
    /// * the log file cannot be opened, or a background task cannot be spawned.
    ///
    /// Tasks already started are stopped before the error is returned.
    pub fn try_build(self) -> Result<Logger, Error> {
        let LoggerBuilder {
            config,
            rotator,
            broadcast,
            check_interval,
            monitor_file,
            trap,
            layout,
            name,
            fields,
            caller,
        } = self;

        let broadcast = match broadcast {
            Some(broadcast) => broadcast,
            None => {
                signal::ensure_started(&trap);
                RotationBroadcast::global()
            }
        };

        let trigger = Arc::new(RotationTrigger::new());
        // dropping tasks on an early return stops everything spawned so far
        let mut tasks = Tasks::new(broadcast.clone(), trigger.clone(), trap.clone());

        let watcher = RotationWatcher::new(broadcast, trigger.clone());
        let cancelled = tasks.cancelled();
        tasks.spawn("watcher", move || watcher.run(&cancelled))?;

        let path = prepare_log_path(Path::new(config.logfile()))?;
        let level = config.level()?;

        if monitor_file.unwrap_or(rotator.is_none()) {
            let monitor = FileMonitor::new(path.clone(), check_interval, trigger.clone());
            let shutdown = tasks.shutdown();
            tasks.spawn("monitor", move || monitor.run(shutdown))?;
        }

        let rotator = match rotator {
            Some(rotator) => rotator,
            None => Box::new(
                RotatingFile::builder(&path)
                    .max_file_size(config.max_size().saturating_mul(MEGABYTE))
                    .max_backups(config.max_backups())
                    .max_age(Duration::from_secs(config.max_age().saturating_mul(DAY)))
                    .compress(config.compress())
                    .shared_trap(trap.clone())
                    .build()?,
            ),
        };
        let rotator: SharedRotator = Arc::new(Mutex::new(rotator));

        let consumer = RotationConsumer::new(trigger.clone(), rotator.clone(), trap.clone());
        tasks.spawn("rotator", move || consumer.run())?;

        let layout = layout.unwrap_or_else(|| Box::new(ConsoleLayout::new(config.encoder())));
        let caller = caller.unwrap_or(config.trace());

        log::debug!(
            "rotating logger started: path={}, level={level}",
            path.display()
        );

        Ok(Logger::new(
            name, fields, level, caller, layout, rotator, trigger, trap, tasks,
        ))
    }
}

/// Resolves the log file path, creating its missing parent directories.
fn prepare_log_path(logfile: &Path) -> Result<PathBuf, Error> {
    let path = std::path::absolute(logfile).map_err(|err| {
        Error::new("failed to resolve log file path")
            .with_context("path", logfile.display())
            .with_source(err)
    })?;

    match fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Err(Error::new("log file path is a directory")
            .with_context("path", path.display())),
        Ok(_) => Ok(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|err| {
                    Error::new("failed to create log directory")
                        .with_context("dir", dir.display())
                        .with_source(err)
                })?;
            }
            Ok(path)
        }
        Err(err) => Err(Error::new("failed to stat log file")
            .with_context("path", path.display())
            .with_source(err)),
    }
}
