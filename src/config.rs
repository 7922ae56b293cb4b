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

//! Logger configuration.
//!
//! [`LogConfig`] is usually decoded from a configuration file:
//!
//! ```yaml
//! logfile: /var/log/app/error.log
//! max_size: 100
//! max_backups: 7
//! max_age: 30
//! compress: true
//! level: warn
//! trace: true
//! encoder:
//!   timeEncoder: rfc3339
//!   levelEncoder: lowercase
//! ```
//!
//! Every field is optional. A zero value falls back to its default when read through the getters,
//! so `LogConfig::default()` is a valid configuration.

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Level;

/// The log file used when none is configured.
pub const DEFAULT_LOGFILE: &str = "logs/error.log";

/// Configuration of a rotating logger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Path of the active log file.
    pub logfile: String,
    /// Maximum size in megabytes of the log file before it gets rotated.
    pub max_size: u64,
    /// Maximum number of rotated files to retain.
    pub max_backups: usize,
    /// Maximum number of days to retain rotated files.
    pub max_age: u64,
    /// Whether rotated files are compressed with gzip.
    pub compress: bool,
    /// Minimum level name, see [`Level::resolve`].
    pub level: String,
    /// Whether the caller location is recorded.
    pub trace: bool,
    /// Number of caller frames to skip. Caller locations come from `#[track_caller]`, which already
    /// points past the logger, so this is accepted but has no effect.
    pub trace_skip: usize,
    /// Overrides of the output encoding.
    pub encoder: Option<EncoderConfig>,
}

impl LogConfig {
    /// The log file path, `logs/error.log` if unset.
    pub fn logfile(&self) -> &str {
        if self.logfile.is_empty() {
            DEFAULT_LOGFILE
        } else {
            &self.logfile
        }
    }

    /// Maximum size in megabytes; zero lets the rotator pick its default.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Maximum number of backups; zero retains all of them.
    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Maximum age in days; zero disables age based removal.
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn trace(&self) -> bool {
        self.trace
    }

    pub fn trace_skip(&self) -> usize {
        self.trace_skip
    }

    /// The minimum level, [`Level::Info`] if unset.
    ///
    /// # Errors
    ///
    /// Return an error if the configured name is not a known level.
    pub fn level(&self) -> Result<Level, Error> {
        Level::resolve(&self.level)
    }

    /// The encoder configuration with every unset field defaulted.
    pub fn encoder(&self) -> EncoderConfig {
        match &self.encoder {
            None => EncoderConfig::production(),
            Some(enc) => enc.clone().with_defaults(),
        }
    }
}

/// How the level of a record is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelEncoder {
    /// `INFO`
    Capital,
    /// `INFO`, colored by level.
    CapitalColor,
    /// `info`
    Lowercase,
    /// `info`, colored by level.
    #[serde(alias = "color")]
    LowercaseColor,
}

/// How the time of a record is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeEncoder {
    /// `2024-08-11T22:44:57.172+0800`
    #[serde(alias = "ISO8601")]
    Iso8601,
    /// `2024-08-11T22:44:57+08:00`
    #[serde(alias = "RFC3339")]
    Rfc3339,
    /// `2024-08-11T22:44:57.172105000+08:00`
    #[serde(alias = "rfc3339nano", alias = "RFC3339Nano")]
    Rfc3339Nano,
    /// Floating point seconds since the Unix epoch.
    Epoch,
    /// Floating point milliseconds since the Unix epoch.
    Millis,
    /// Integer nanoseconds since the Unix epoch.
    Nanos,
}

/// How duration fields are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DurationEncoder {
    /// Floating point seconds.
    Seconds,
    /// Floating point milliseconds.
    #[serde(alias = "ms")]
    Millis,
    /// Integer nanoseconds.
    Nanos,
    /// Human readable, e.g. `1.5s`.
    String,
}

/// How the caller location is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallerEncoder {
    /// `src/file.rs:42`, the last two path components only.
    Short,
    /// The full path as recorded by the compiler.
    Full,
}

/// Overrides of the output encoding.
///
/// A `None` field means "use the default". Keys set to an empty string omit that element from
/// the output.
///
/// Field names are camelCase (`timeKey`, `levelEncoder`, ...) as in zap's encoder configuration;
/// the snake_case spellings are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncoderConfig {
    #[serde(alias = "time_key")]
    pub time_key: Option<String>,
    #[serde(alias = "level_key")]
    pub level_key: Option<String>,
    #[serde(alias = "name_key")]
    pub name_key: Option<String>,
    #[serde(alias = "caller_key")]
    pub caller_key: Option<String>,
    #[serde(alias = "message_key")]
    pub message_key: Option<String>,
    /// Key of stack traces. Records never carry one, so this only round-trips the setting.
    #[serde(alias = "stacktrace_key")]
    pub stacktrace_key: Option<String>,
    #[serde(alias = "line_ending")]
    pub line_ending: Option<String>,
    #[serde(alias = "level_encoder")]
    pub level_encoder: Option<LevelEncoder>,
    #[serde(alias = "time_encoder")]
    pub time_encoder: Option<TimeEncoder>,
    #[serde(alias = "duration_encoder")]
    pub duration_encoder: Option<DurationEncoder>,
    #[serde(alias = "caller_encoder")]
    pub caller_encoder: Option<CallerEncoder>,
}

impl EncoderConfig {
    /// The default encoding: ISO8601 time, capital level, short caller and `\n` line ending.
    pub fn production() -> Self {
        EncoderConfig::default().with_defaults()
    }

    /// Fill every unset field with its default.
    pub fn with_defaults(self) -> Self {
        fn key(k: Option<String>, default: &str) -> Option<String> {
            Some(k.unwrap_or_else(|| default.to_string()))
        }

        let line_ending = match self.line_ending {
            Some(ending) if !ending.is_empty() => ending,
            _ => "\n".to_string(),
        };

        EncoderConfig {
            time_key: key(self.time_key, "ts"),
            level_key: key(self.level_key, "level"),
            name_key: key(self.name_key, "logger"),
            caller_key: key(self.caller_key, "caller"),
            message_key: key(self.message_key, "msg"),
            stacktrace_key: key(self.stacktrace_key, "stacktrace"),
            line_ending: Some(line_ending),
            level_encoder: Some(self.level_encoder.unwrap_or(LevelEncoder::Capital)),
            time_encoder: Some(self.time_encoder.unwrap_or(TimeEncoder::Iso8601)),
            duration_encoder: Some(self.duration_encoder.unwrap_or(DurationEncoder::Seconds)),
            caller_encoder: Some(self.caller_encoder.unwrap_or(CallerEncoder::Short)),
        }
    }
}
