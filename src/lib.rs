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

//! A structured file logger that rotates its file when told to, or when the file goes away.
//!
//! # Overview
//!
//! Every [`Logger`] writes to a rotating file and starts three background tasks that decide when
//! to rotate it:
//!
//! * on `SIGHUP` or a call to [`broadcast`], every logger of the process rotates;
//! * when the log file is removed or moved away, e.g. by `logrotate`, the logger owning it
//!   notices within [`rotate::DEFAULT_CHECK_INTERVAL`] and reopens it;
//! * the default [`RotatingFile`] also rotates once the file reaches its maximum size.
//!
//! Writes never wait for these tasks, and failures in them are reported on a [`Trap`] instead of
//! crashing the process.
//!
//! # Examples
//!
//! ```no_run
//! use logforth_rotate::LogConfig;
//!
//! let config = LogConfig {
//!     logfile: "/var/log/app/error.log".to_string(),
//!     max_size: 64,
//!     max_backups: 7,
//!     compress: true,
//!     ..Default::default()
//! };
//!
//! let logger = logforth_rotate::new_logger(config);
//! logger.info(format_args!("Hello info!"));
//!
//! // rotate the files of all loggers in this process
//! logforth_rotate::broadcast();
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod append;
pub mod config;
pub mod layout;
pub mod record;
pub mod rotate;
pub mod trap;

pub use append::RotatingFile;
pub use config::EncoderConfig;
pub use config::LogConfig;
pub use layout::Layout;
pub use rotate::Rotate;
pub use rotate::RotationBroadcast;
pub use trap::DefaultTrap;
pub use trap::Trap;

mod bridge;
mod error;
mod level;
mod logger;

pub use error::Error;
pub use level::Level;
pub use logger::*;

/// Rotate the files of every logger listening to the process-wide [`RotationBroadcast`].
///
/// Loggers not waiting at this moment, e.g. one still being built, miss the broadcast.
pub fn broadcast() {
    RotationBroadcast::global().broadcast();
}
