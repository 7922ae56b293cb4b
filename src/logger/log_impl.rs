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

use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::process;
use std::sync::Arc;

use crate::Error;
use crate::Layout;
use crate::Level;
use crate::Trap;
use crate::record::Field;
use crate::record::Record;
use crate::rotate::SharedRotator;
use crate::rotate::TaskStatus;
use crate::rotate::lock_rotator;
use crate::rotate::task::Tasks;
use crate::rotate::trigger::RotationTrigger;

/// A leveled logger writing formatted records to a rotating file.
///
/// Created by [`LoggerBuilder`](crate::LoggerBuilder), [`new_logger`](crate::new_logger) or
/// [`decode_logger`](crate::decode_logger). Dropping the logger stops its background rotation
/// tasks and flushes the file.
///
/// # Examples
///
/// ```no_run
/// use logforth_rotate::LogConfig;
///
/// let logger = logforth_rotate::new_logger(LogConfig::default());
/// logger.info(format_args!("listening on {}", 8080));
/// logger.warnln(format_args!("disk almost full"));
/// ```
#[derive(Debug)]
pub struct Logger {
    name: Option<String>,
    fields: Vec<Field>,
    level: Level,
    caller: bool,
    layout: Box<dyn Layout>,
    rotator: SharedRotator,
    trigger: Arc<RotationTrigger>,
    trap: Arc<dyn Trap>,
    tasks: Tasks,
}

macro_rules! leveled {
    ($(#[$doc:meta])* $name:ident, $ln:ident, $level:expr) => {
        $(#[$doc])*
        #[track_caller]
        pub fn $name(&self, args: fmt::Arguments) {
            self.log($level, args);
        }

        /// Like the variant without the `ln` suffix, with a line break appended to the message.
        #[track_caller]
        pub fn $ln(&self, args: fmt::Arguments) {
            self.log($level, format_args!("{args}\n"));
        }
    };
}

impl Logger {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: Option<String>,
        fields: Vec<Field>,
        level: Level,
        caller: bool,
        layout: Box<dyn Layout>,
        rotator: SharedRotator,
        trigger: Arc<RotationTrigger>,
        trap: Arc<dyn Trap>,
        tasks: Tasks,
    ) -> Self {
        Self {
            name,
            fields,
            level,
            caller,
            layout,
            rotator,
            trigger,
            trap,
            tasks,
        }
    }

    /// The minimum level of records written by this logger.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Whether records at `level` are written.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Writes a record at `level`.
    ///
    /// Unlike [`Logger::panic`] and [`Logger::fatal`], this never panics or exits regardless of
    /// the level.
    #[track_caller]
    pub fn log(&self, level: Level, args: fmt::Arguments) {
        if !self.enabled(level) {
            return;
        }

        let caller = Location::caller();
        self.emit(level, args, Some((caller.file(), caller.line())), &[]);
    }

    leveled!(
        /// Writes a debug record. There is no level below debug, so this is an alias of
        /// [`Logger::debug`].
        trace,
        traceln,
        Level::Debug
    );
    leveled!(
        /// Writes a debug record.
        debug,
        debugln,
        Level::Debug
    );
    leveled!(
        /// Writes an info record.
        info,
        infoln,
        Level::Info
    );
    leveled!(
        /// Writes a warn record.
        warn,
        warnln,
        Level::Warn
    );
    leveled!(
        /// Writes an error record.
        error,
        errorln,
        Level::Error
    );

    /// Writes a panic record, then panics with the message.
    #[track_caller]
    pub fn panic(&self, args: fmt::Arguments) -> ! {
        self.log(Level::Panic, args);
        panic!("{args}");
    }

    /// Like [`Logger::panic`], with a line break appended to the message.
    #[track_caller]
    pub fn panicln(&self, args: fmt::Arguments) -> ! {
        self.panic(format_args!("{args}\n"))
    }

    /// Writes a fatal record, flushes the file, then exits the process with status 1.
    #[track_caller]
    pub fn fatal(&self, args: fmt::Arguments) -> ! {
        self.log(Level::Fatal, args);
        self.flush();
        process::exit(1);
    }

    /// Like [`Logger::fatal`], with a line break appended to the message.
    #[track_caller]
    pub fn fatalln(&self, args: fmt::Arguments) -> ! {
        self.fatal(format_args!("{args}\n"))
    }

    /// Flushes the underlying file. Errors are reported on the trap.
    pub fn flush(&self) {
        if let Err(err) = lock_rotator(&self.rotator).flush() {
            let err = Error::new("failed to flush log file").with_source(err);
            self.trap.trap(&err);
        }
    }

    /// Requests a rotation of this logger's file, leaving other loggers alone.
    ///
    /// Returns `false` if a rotation is already pending, in which case both requests are served
    /// by the same rotation.
    pub fn rotate_now(&self) -> bool {
        self.trigger.request()
    }

    /// The liveness of the background rotation tasks of this logger.
    ///
    /// A task only stops running after a panic, which is also reported on the trap.
    pub fn tasks(&self) -> Vec<TaskStatus> {
        self.tasks.status()
    }

    /// Formats and writes a record that already passed the level check.
    pub(crate) fn emit(
        &self,
        level: Level,
        args: fmt::Arguments,
        caller: Option<(&str, u32)>,
        extra: &[Field],
    ) {
        let merged;
        let fields = if extra.is_empty() {
            self.fields.as_slice()
        } else {
            merged = self.fields.iter().chain(extra).cloned().collect::<Vec<_>>();
            merged.as_slice()
        };

        let mut record = Record::new(level, args)
            .with_name(self.name.as_deref())
            .with_fields(fields);
        if self.caller {
            if let Some((file, line)) = caller {
                record = record.with_location(file, line);
            }
        }

        let result = self.layout.format(&record).and_then(|bytes| {
            lock_rotator(&self.rotator)
                .write_all(&bytes)
                .map_err(Error::from_io_error)
        });
        if let Err(err) = result {
            let err = Error::new("failed to write log record")
                .with_context("level", level)
                .with_source(err);
            self.trap.trap(&err);
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.tasks.cancel();
        self.flush();
    }
}
