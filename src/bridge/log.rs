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

use crate::Level;
use crate::Logger;
use crate::record::Field;

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Logger::enabled(self, Level::from(metadata.level()))
    }

    fn log(&self, record: &log::Record) {
        let level = Level::from(record.level());
        if !Logger::enabled(self, level) {
            return;
        }

        struct FieldVisitor<'a> {
            fields: &'a mut Vec<Field>,
        }

        impl<'kvs> log::kv::VisitSource<'kvs> for FieldVisitor<'_> {
            fn visit_pair(
                &mut self,
                key: log::kv::Key<'kvs>,
                value: log::kv::Value<'kvs>,
            ) -> Result<(), log::kv::Error> {
                self.fields.push(to_field(key.as_str(), &value));
                Ok(())
            }
        }

        let mut fields = vec![];
        let mut visitor = FieldVisitor {
            fields: &mut fields,
        };
        // the visitor never fails
        let _ = record.key_values().visit(&mut visitor);

        let caller = record.file().zip(record.line());
        self.emit(level, *record.args(), caller, &fields);
    }

    fn flush(&self) {
        Logger::flush(self);
    }
}

fn to_field(key: &str, value: &log::kv::Value) -> Field {
    if let Some(v) = value.to_bool() {
        Field::new(key, v)
    } else if let Some(v) = value.to_i64() {
        Field::new(key, v)
    } else if let Some(v) = value.to_u64() {
        Field::new(key, v)
    } else if let Some(v) = value.to_f64() {
        Field::new(key, v)
    } else if let Some(v) = value.to_borrowed_str() {
        Field::new(key, v)
    } else {
        Field::new(key, value.to_string())
    }
}

impl Logger {
    /// Set up this logger as the `log` crate global logger.
    ///
    /// Records of the `log` crate at `Trace` are written at [`Level::Debug`]. Key-values are
    /// written as fields after the static fields of the logger.
    ///
    /// # Errors
    ///
    /// Return an error if the log crate global logger has already been set.
    pub fn apply(self) -> Result<(), log::SetLoggerError> {
        let max_level = match self.level() {
            Level::Debug => log::LevelFilter::Trace,
            Level::Info => log::LevelFilter::Info,
            Level::Warn => log::LevelFilter::Warn,
            _ => log::LevelFilter::Error,
        };
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    #[test]
    fn test_kv_to_field() {
        let cases = [
            (log::kv::Value::from(true), serde_json::json!(true)),
            (log::kv::Value::from(-7i64), serde_json::json!(-7)),
            (log::kv::Value::from(u64::MAX), serde_json::json!(u64::MAX)),
            (log::kv::Value::from(1.5f64), serde_json::json!(1.5)),
            (log::kv::Value::from("sda"), serde_json::json!("sda")),
        ];

        for (value, expected) in cases {
            let field = to_field("k", &value);
            assert_eq!(field.key(), "k");
            match field.value() {
                FieldValue::Json(actual) => assert_eq!(actual, &expected),
                other => panic!("unexpected field value: {other:?}"),
            }
        }
    }
}
