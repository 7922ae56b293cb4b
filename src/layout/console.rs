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

use std::fmt::Write;
use std::time::Duration;

#[cfg(feature = "colored")]
use colored::Color;
#[cfg(feature = "colored")]
use colored::ColoredString;
#[cfg(feature = "colored")]
use colored::Colorize;
use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::Error;
use crate::Level;
use crate::config::CallerEncoder;
use crate::config::DurationEncoder;
use crate::config::EncoderConfig;
use crate::config::LevelEncoder;
use crate::config::TimeEncoder;
use crate::layout::Layout;
use crate::record::FieldValue;
use crate::record::Record;

/// A layout that formats log records as tab separated console lines.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172+0800	ERROR	api	src/handler.rs:51	Hello error!	{"request":42}
/// 2024-08-11T22:44:57.172+0800	WARN	api	src/handler.rs:52	Hello warn!	{"request":42}
/// ```
///
/// The logger name, the caller and the trailing fields object are only present when the record
/// carries them. An element whose key is configured as an empty string is omitted.
///
/// You can customize the timezone of the timestamp by setting a [`TimeZone`]. Otherwise, the
/// system timezone is used.
#[derive(Debug, Clone)]
pub struct ConsoleLayout {
    time: Option<TimeEncoder>,
    level: Option<LevelEncoder>,
    name: bool,
    caller: Option<CallerEncoder>,
    message: bool,
    duration: DurationEncoder,
    line_ending: String,
    tz: Option<TimeZone>,
    #[cfg(feature = "colored")]
    colors: LevelColor,
}

impl Default for ConsoleLayout {
    fn default() -> Self {
        Self::new(EncoderConfig::production())
    }
}

/// Customize the color of each log level.
#[cfg(feature = "colored")]
#[derive(Debug, Clone)]
pub struct LevelColor {
    pub debug: Color,
    pub info: Color,
    pub warn: Color,
    pub error: Color,
    pub panic: Color,
    pub fatal: Color,
}

#[cfg(feature = "colored")]
impl Default for LevelColor {
    fn default() -> Self {
        Self {
            debug: Color::Magenta,
            info: Color::Blue,
            warn: Color::Yellow,
            error: Color::Red,
            panic: Color::Red,
            fatal: Color::Red,
        }
    }
}

impl ConsoleLayout {
    /// Creates a layout from an encoder configuration. Unset fields are defaulted.
    pub fn new(config: EncoderConfig) -> Self {
        let config = config.with_defaults();
        let enabled = |key: &Option<String>| key.as_deref().is_some_and(|k| !k.is_empty());

        Self {
            time: config.time_encoder.filter(|_| enabled(&config.time_key)),
            level: config.level_encoder.filter(|_| enabled(&config.level_key)),
            name: enabled(&config.name_key),
            caller: config.caller_encoder.filter(|_| enabled(&config.caller_key)),
            message: enabled(&config.message_key),
            duration: config.duration_encoder.unwrap_or(DurationEncoder::Seconds),
            line_ending: config.line_ending.unwrap_or_else(|| "\n".to_string()),
            tz: None,
            #[cfg(feature = "colored")]
            colors: LevelColor::default(),
        }
    }

    /// Sets the timezone of rendered timestamps.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    /// Sets the colors used by the colored level encoders.
    #[cfg(feature = "colored")]
    pub fn colors(mut self, colors: LevelColor) -> Self {
        self.colors = colors;
        self
    }

    fn format_time(&self, encoder: TimeEncoder, ts: Timestamp) -> String {
        let zoned = || {
            let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
            ts.to_zoned(tz)
        };

        match encoder {
            TimeEncoder::Iso8601 => zoned().strftime("%Y-%m-%dT%H:%M:%S.%3f%z").to_string(),
            TimeEncoder::Rfc3339 => zoned().strftime("%Y-%m-%dT%H:%M:%S%:z").to_string(),
            TimeEncoder::Rfc3339Nano => zoned().strftime("%Y-%m-%dT%H:%M:%S.%9f%:z").to_string(),
            TimeEncoder::Epoch => (ts.as_nanosecond() as f64 / 1e9).to_string(),
            TimeEncoder::Millis => (ts.as_nanosecond() as f64 / 1e6).to_string(),
            TimeEncoder::Nanos => ts.as_nanosecond().to_string(),
        }
    }

    fn format_level(&self, encoder: LevelEncoder, level: Level) -> String {
        match encoder {
            LevelEncoder::Capital => level.as_str().to_string(),
            LevelEncoder::Lowercase => level.as_lowercase_str().to_string(),
            LevelEncoder::CapitalColor => self.colorize(level, level.as_str()),
            LevelEncoder::LowercaseColor => self.colorize(level, level.as_lowercase_str()),
        }
    }

    #[cfg(feature = "colored")]
    fn colorize(&self, level: Level, text: &str) -> String {
        let color = match level {
            Level::Debug => self.colors.debug,
            Level::Info => self.colors.info,
            Level::Warn => self.colors.warn,
            Level::Error => self.colors.error,
            Level::Panic => self.colors.panic,
            Level::Fatal => self.colors.fatal,
        };
        ColoredString::from(text).color(color).to_string()
    }

    #[cfg(not(feature = "colored"))]
    fn colorize(&self, _: Level, text: &str) -> String {
        text.to_string()
    }

    fn format_duration(&self, d: Duration) -> serde_json::Value {
        match self.duration {
            DurationEncoder::Seconds => d.as_secs_f64().into(),
            DurationEncoder::Millis => (d.as_secs_f64() * 1e3).into(),
            DurationEncoder::Nanos => u64::try_from(d.as_nanos()).unwrap_or(u64::MAX).into(),
            DurationEncoder::String => format!("{d:?}").into(),
        }
    }
}

// keep the last directory and the file name, e.g. `src/handler.rs`
fn trim_caller_path(file: &str) -> &str {
    let mut seps = file.rmatch_indices(['/', '\\']);
    match (seps.next(), seps.next()) {
        (Some(_), Some((pos, _))) => &file[pos + 1..],
        _ => file,
    }
}

impl Layout for ConsoleLayout {
    fn format(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut elements: Vec<String> = Vec::with_capacity(6);

        if let Some(encoder) = self.time {
            elements.push(self.format_time(encoder, record.time()));
        }
        if let Some(encoder) = self.level {
            elements.push(self.format_level(encoder, record.level()));
        }
        if let Some(name) = record.name().filter(|_| self.name) {
            elements.push(name.to_string());
        }
        if let (Some(encoder), Some(file)) = (self.caller, record.file()) {
            let file = match encoder {
                CallerEncoder::Short => trim_caller_path(file),
                CallerEncoder::Full => file,
            };
            let line = record.line().unwrap_or_default();
            elements.push(format!("{file}:{line}"));
        }
        if self.message {
            elements.push(record.payload().to_string());
        }

        let fields = record.fields();
        if !fields.is_empty() {
            let mut text = String::from("{");
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    text.push(',');
                }
                let value = match field.value() {
                    FieldValue::Json(value) => value.clone(),
                    FieldValue::Duration(d) => self.format_duration(*d),
                };
                let key = serde_json::to_string(field.key())
                    .map_err(|err| Error::new("failed to encode field key").with_source(err))?;
                let value = serde_json::to_string(&value)
                    .map_err(|err| Error::new("failed to encode field value").with_source(err))?;
                write!(&mut text, "{key}:{value}").map_err(Error::from_fmt_error)?;
            }
            text.push('}');
            elements.push(text);
        }

        let mut text = elements.join("\t");
        text.push_str(&self.line_ending);
        Ok(text.into_bytes())
    }
}
