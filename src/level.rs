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
use std::str::FromStr;

use crate::Error;

/// The severity of a log record.
///
/// Levels are ordered from the most verbose to the most severe, so `Level::Warn > Level::Info`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    /// Designates lower priority information. Trace records are logged at this level too.
    Debug,
    /// Designates useful information.
    #[default]
    Info,
    /// Designates hazardous situations.
    Warn,
    /// Designates very serious errors.
    Error,
    /// Designates errors after which the logger panics.
    Panic,
    /// Designates errors after which the process exits.
    Fatal,
}

impl Level {
    /// Return the upper-case name of the `Level`.
    ///
    /// This returns the same string as the `fmt::Display` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    /// Return the lower-case name of the `Level`.
    pub fn as_lowercase_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
        }
    }

    /// Resolve a configured level name.
    ///
    /// Names are matched case-insensitively. An empty name resolves to [`Level::Info`].
    ///
    /// # Errors
    ///
    /// Return an error if the name is not one of `debug`, `info`, `warn`, `error`, `panic` or
    /// `fatal`.
    ///
    /// # Examples
    ///
    /// ```
    /// use logforth_rotate::Level;
    ///
    /// assert_eq!(Level::resolve("WARN").unwrap(), Level::Warn);
    /// assert_eq!(Level::resolve("").unwrap(), Level::Info);
    /// assert!(Level::resolve("verbose").is_err());
    /// ```
    pub fn resolve(name: &str) -> Result<Level, Error> {
        if name.is_empty() {
            return Ok(Level::Info);
        }
        name.parse()
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Level, Self::Err> {
        for level in [
            Level::Debug,
            Level::Info,
            Level::Warn,
            Level::Error,
            Level::Panic,
            Level::Fatal,
        ] {
            if s.eq_ignore_ascii_case(level.as_str()) {
                return Ok(level);
            }
        }

        Err(Error::new(format!("invalid log level({s})")))
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Level::Error,
            log::Level::Warn => Level::Warn,
            log::Level::Info => Level::Info,
            log::Level::Debug | log::Level::Trace => Level::Debug,
        }
    }
}
