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

//! Log record and structured fields.

use std::fmt;
use std::time::Duration;

use jiff::Timestamp;

use crate::Level;

/// A log record passed to a [`Layout`](crate::Layout).
#[derive(Clone, Debug)]
pub struct Record<'a> {
    // the observed time
    now: Timestamp,

    // the metadata
    level: Level,
    name: Option<&'a str>,
    file: Option<&'a str>,
    line: Option<u32>,

    // the payload
    payload: fmt::Arguments<'a>,

    // structural logging
    fields: &'a [Field],
}

impl<'a> Record<'a> {
    /// Create a record observed now.
    pub fn new(level: Level, payload: fmt::Arguments<'a>) -> Self {
        Self {
            now: Timestamp::now(),
            level,
            name: None,
            file: None,
            line: None,
            payload,
            fields: &[],
        }
    }

    /// Set the observed time.
    pub fn with_time(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    /// Set the name of the logger emitting the record.
    pub fn with_name(mut self, name: Option<&'a str>) -> Self {
        self.name = name;
        self
    }

    /// Set the caller location.
    pub fn with_location(mut self, file: &'a str, line: u32) -> Self {
        self.file = Some(file);
        self.line = Some(line);
        self
    }

    /// Set the structured fields.
    pub fn with_fields(mut self, fields: &'a [Field]) -> Self {
        self.fields = fields;
        self
    }

    /// The observed time.
    pub fn time(&self) -> Timestamp {
        self.now
    }

    /// The severity of the message.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The name of the logger, if any.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// The source file containing the message, if caller capture is enabled.
    pub fn file(&self) -> Option<&'a str> {
        self.file
    }

    /// The line containing the message.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The message body.
    pub fn payload(&self) -> fmt::Arguments<'a> {
        self.payload
    }

    /// The structured fields attached to the record.
    pub fn fields(&self) -> &'a [Field] {
        self.fields
    }
}

/// A structured key-value pair attached to every record of a logger.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    key: String,
    value: FieldValue,
}

/// The value of a [`Field`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// Any JSON value.
    Json(serde_json::Value),
    /// A duration, rendered by the configured duration encoder.
    Duration(Duration),
}

impl Field {
    /// Create a field holding a JSON value.
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Json(value.into()),
        }
    }

    /// Create a field holding a duration.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Duration(value),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}
