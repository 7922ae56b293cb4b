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
use std::io;

/// The error struct of logforth-rotate.
///
/// Every failure the logger runs into, either while being built or in its background rotation
/// tasks, is expressed as an `Error` carrying a message, optional key-value context and the
/// underlying sources.
pub struct Error {
    message: String,
    sources: Vec<anyhow::Error>,
    context: Vec<(&'static str, String)>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;

        if let Some(((key, value), rest)) = self.context.split_first() {
            write!(f, ", context: {{ {key}: {value}")?;
            for (key, value) in rest {
                write!(f, ", {key}: {value}")?;
            }
            f.write_str(" }")?;
        }

        if let Some((first, rest)) = self.sources.split_first() {
            write!(f, ", sources: [{first}")?;
            for source in rest {
                write!(f, ", {source}")?;
            }
            f.write_str("]")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f
                .debug_struct("Error")
                .field("message", &self.message)
                .field("context", &self.context)
                .field("sources", &self.sources)
                .finish();
        }

        // one line per context entry and per source chain
        f.write_str(&self.message)?;
        for (key, value) in &self.context {
            write!(f, "\n    {key}: {value}")?;
        }
        for source in &self.sources {
            write!(f, "\n    caused by: {source:#}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.sources.first().map(|v| v.as_ref())
    }
}

impl Error {
    /// Create a new Error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sources: vec![],
            context: vec![],
        }
    }

    /// Add one more context in error.
    pub fn with_context(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context.push((key, value.to_string()));
        self
    }

    /// Add one more source in error.
    pub fn with_source(mut self, src: impl Into<anyhow::Error>) -> Self {
        self.sources.push(src.into());
        self
    }

    /// The error message, without context and sources.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Return the value of the first context entry under `key`.
    pub fn context(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Return an iterator over all sources of this error.
    pub fn sources(&self) -> impl ExactSizeIterator<Item = &(dyn std::error::Error + 'static)> {
        self.sources.iter().map(|v| v.as_ref())
    }

    /// Default constructor for [`Error`] from [`io::Error`].
    pub fn from_io_error(err: io::Error) -> Error {
        Error::new("failed to perform io").with_source(err)
    }

    /// Default constructor for [`Error`] from [`fmt::Error`].
    pub fn from_fmt_error(err: fmt::Error) -> Error {
        Error::new("failed to perform format").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_lists_context_and_sources() {
        let err = Error::new("failed to open log file")
            .with_context("path", "/var/log/app.log")
            .with_context("mode", "append")
            .with_source(io::Error::new(io::ErrorKind::NotFound, "gone"));

        assert_eq!(
            format!("{err:?}"),
            "failed to open log file\n    path: /var/log/app.log\n    mode: append\n    caused by: gone"
        );
    }

    #[test]
    fn test_display_with_context_and_sources() {
        let err = Error::new("failed to rotate log file")
            .with_context("path", "/var/log/app.log")
            .with_source(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));

        assert_eq!(
            err.to_string(),
            "failed to rotate log file, context: { path: /var/log/app.log }, sources: [denied]"
        );
        assert_eq!(err.context("path"), Some("/var/log/app.log"));
        assert_eq!(err.context("level"), None);
        assert_eq!(err.sources().len(), 1);
    }
}
