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
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;
use flate2::Compression;
use flate2::write::GzEncoder;
use jiff::SignedDuration;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::Error;
use crate::Trap;
use crate::append::clock::Clock;
use crate::rotate::Rotate;
use crate::rotate::task::catch_panic;
use crate::trap::DefaultTrap;

/// The size at which files are rotated if no maximum is configured: 100 megabytes.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S.%3f";
const BACKUP_TIME_PARSE_FORMAT: &str = "%Y-%m-%dT%H-%M-%S.%f";
const COMPRESS_SUFFIX: &str = ".gz";

/// A file writer rotating on demand and whenever the file would exceed its maximum size.
///
/// On rotation the current file is renamed to `<stem>-<UTC timestamp><.ext>` next to it, e.g.
/// `error-2024-08-10T17-12-52.123.log`, and a fresh file is opened at the configured path. Rotated
/// files are pruned by count and age, and optionally gzipped, by a background thread so that
/// writes are not held up.
///
/// # Examples
///
/// ```no_run
/// use std::io::Write;
///
/// use logforth_rotate::Rotate;
/// use logforth_rotate::append::RotatingFile;
///
/// let mut file = RotatingFile::builder("logs/app.log")
///     .max_file_size(10 * 1024 * 1024)
///     .max_backups(5)
///     .compress(true)
///     .build()
///     .unwrap();
///
/// file.write_all(b"hello\n").unwrap();
/// file.rotate().unwrap();
/// ```
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
    max_size: u64,
    clock: Clock,
    mill: Option<Sender<()>>,
    miller: Option<JoinHandle<()>>,
}

impl RotatingFile {
    /// Creates a new [`RotatingFileBuilder`] writing to `path`.
    #[must_use]
    pub fn builder(path: impl Into<PathBuf>) -> RotatingFileBuilder {
        RotatingFileBuilder::new(path)
    }

    /// The path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to the active file, including what it held when opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn request_mill(&self) {
        if let Some(mill) = &self.mill {
            // a full slot means a pass is already queued; it reads the clock when it starts and
            // sees this file too
            let _ = mill.try_send(());
        }
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {len} exceeds maximum file size {}",
                    self.max_size
                ),
            ));
        }

        if self.size + len > self.max_size {
            self.rotate()?;
        }

        self.file
            .write(buf)
            .inspect(|&n| self.size += n as u64)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Rotate for RotatingFile {
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let now = self.clock.now();
        match fs::rename(&self.path, backup_path(&self.path, now)) {
            Ok(()) => {}
            // removed or moved away by someone else, just start over
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }

        self.file = open_log_file(&self.path)?;
        self.size = 0;
        self.request_mill();
        Ok(())
    }
}

impl Drop for RotatingFile {
    fn drop(&mut self) {
        let _ = self.file.flush();
        self.mill.take();
        if let Some(miller) = self.miller.take() {
            let _ = miller.join();
        }
    }
}

/// A builder for configuring [`RotatingFile`].
#[derive(Debug)]
pub struct RotatingFileBuilder {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    max_age: Option<Duration>,
    compress: bool,
    trap: Arc<dyn Trap>,
    clock: Clock,
}

impl RotatingFileBuilder {
    /// Creates a new [`RotatingFileBuilder`] writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: DEFAULT_MAX_FILE_SIZE,
            max_backups: 0,
            max_age: None,
            compress: false,
            trap: Arc::new(DefaultTrap::default()),
            clock: Clock::default(),
        }
    }

    /// Sets the maximum size of the file in bytes. Zero restores [`DEFAULT_MAX_FILE_SIZE`].
    #[must_use]
    pub fn max_file_size(mut self, n: u64) -> Self {
        self.max_size = if n == 0 { DEFAULT_MAX_FILE_SIZE } else { n };
        self
    }

    /// Sets the maximum number of rotated files to keep. Zero keeps all of them.
    #[must_use]
    pub fn max_backups(mut self, n: usize) -> Self {
        self.max_backups = n;
        self
    }

    /// Sets the maximum age of rotated files. Zero keeps them regardless of age.
    #[must_use]
    pub fn max_age(mut self, age: Duration) -> Self {
        self.max_age = (!age.is_zero()).then_some(age);
        self
    }

    /// Sets whether rotated files are gzipped.
    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Sets the trap receiving errors of the background cleanup of rotated files.
    ///
    /// Default to [`DefaultTrap`].
    #[must_use]
    pub fn trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = Arc::from(trap.into());
        self
    }

    pub(crate) fn shared_trap(mut self, trap: Arc<dyn Trap>) -> Self {
        self.trap = trap;
        self
    }

    #[cfg(test)]
    fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the [`RotatingFile`], creating missing parent directories and appending to an
    /// existing file.
    ///
    /// # Errors
    ///
    /// Return an error if the directory cannot be created or the file cannot be opened.
    pub fn build(self) -> Result<RotatingFile, Error> {
        let RotatingFileBuilder {
            path,
            max_size,
            max_backups,
            max_age,
            compress,
            trap,
            clock,
        } = self;

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|err| {
                Error::new("failed to create log directory")
                    .with_context("dir", dir.display())
                    .with_source(err)
            })?;
        }

        let file = open_log_file(&path).map_err(|err| {
            Error::new("failed to open log file")
                .with_context("path", path.display())
                .with_source(err)
        })?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        let (mill, miller) = if max_backups > 0 || max_age.is_some() || compress {
            let (sender, receiver) = bounded(1);
            let miller = Miller {
                path: path.clone(),
                max_backups,
                max_age,
                compress,
                trap,
                clock: clock.clone(),
            };
            let handle = miller.make_thread(receiver)?;
            (Some(sender), Some(handle))
        } else {
            (None, None)
        };

        Ok(RotatingFile {
            path,
            file,
            size,
            max_size,
            clock,
            mill,
            miller,
        })
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().append(true).create(true).open(path)
}

fn split_file_name(path: &Path) -> (String, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

fn backup_path(path: &Path, now: Timestamp) -> PathBuf {
    let (stem, ext) = split_file_name(path);
    let time = now.strftime(BACKUP_TIME_FORMAT);
    path.with_file_name(format!("{stem}-{time}{ext}"))
}

#[derive(Debug)]
struct Backup {
    path: PathBuf,
    time: Timestamp,
    compressed: bool,
}

/// Removes and compresses rotated files off the write path.
#[derive(Debug)]
struct Miller {
    path: PathBuf,
    max_backups: usize,
    max_age: Option<Duration>,
    compress: bool,
    trap: Arc<dyn Trap>,
    clock: Clock,
}

impl Miller {
    fn make_thread(self, receiver: Receiver<()>) -> Result<JoinHandle<()>, Error> {
        thread::Builder::new()
            .name("logforth-rotate-mill".to_string())
            .spawn(move || {
                let result = catch_panic("mill", || {
                    while receiver.recv().is_ok() {
                        if let Err(err) = self.mill(self.clock.now()) {
                            self.trap.trap(&err);
                        }
                    }
                });
                if let Err(err) = result {
                    self.trap.trap(&err);
                }
            })
            .map_err(|err| Error::new("failed to spawn log cleanup thread").with_source(err))
    }

    fn backups(&self) -> Result<Vec<Backup>, Error> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let read_dir = fs::read_dir(dir).map_err(|err| {
            Error::new("failed to read log dir")
                .with_context("dir", dir.display())
                .with_source(err)
        })?;

        let (stem, ext) = split_file_name(&self.path);
        let prefix = format!("{stem}-");
        let compressed_ext = format!("{ext}{COMPRESS_SUFFIX}");

        let backups = read_dir
            .filter_map(|entry| {
                let entry = entry.ok()?;
                // only ever delete files we could have created
                if !entry.file_type().ok()?.is_file() {
                    return None;
                }

                let filename = entry.file_name();
                let filename = filename.to_str()?;
                let rest = filename.strip_prefix(&prefix)?;
                let (time, compressed) = match rest.strip_suffix(&compressed_ext) {
                    Some(time) => (time, true),
                    None => (rest.strip_suffix(&ext)?, false),
                };

                let time = DateTime::strptime(BACKUP_TIME_PARSE_FORMAT, time)
                    .ok()?
                    .to_zoned(TimeZone::UTC)
                    .ok()?
                    .timestamp();
                Some(Backup {
                    path: entry.path(),
                    time,
                    compressed,
                })
            })
            .collect();
        Ok(backups)
    }

    fn mill(&self, now: Timestamp) -> Result<(), Error> {
        let mut backups = self.backups()?;
        // newest first
        backups.sort_by(|a, b| b.time.cmp(&a.time));

        let mut remove = vec![];
        if self.max_backups > 0 && backups.len() > self.max_backups {
            remove = backups.split_off(self.max_backups);
        }
        if let Some(max_age) = self.max_age {
            let max_age = SignedDuration::try_from(max_age).unwrap_or(SignedDuration::MAX);
            let cutoff = now.checked_sub(max_age).unwrap_or(Timestamp::MIN);
            let (keep, expired): (Vec<_>, Vec<_>) =
                backups.into_iter().partition(|b| b.time >= cutoff);
            backups = keep;
            remove.extend(expired);
        }

        let mut errors = vec![];
        for backup in &remove {
            if let Err(err) = fs::remove_file(&backup.path) {
                errors.push(
                    Error::new("failed to remove old log file")
                        .with_context("path", backup.path.display())
                        .with_source(err),
                );
            }
        }

        if self.compress {
            for backup in backups.iter().filter(|b| !b.compressed) {
                if let Err(err) = compress_file(&backup.path) {
                    errors.push(
                        Error::new("failed to compress log file")
                            .with_context("path", backup.path.display())
                            .with_source(err),
                    );
                }
            }
        }

        // report all but the last, which is returned
        let last = errors.pop();
        for err in &errors {
            self.trap.trap(err);
        }
        match last {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn compress_file(path: &Path) -> io::Result<()> {
    let mut target = path.as_os_str().to_owned();
    target.push(COMPRESS_SUFFIX);
    let target = PathBuf::from(target);

    let result = (|| {
        let mut reader = BufReader::new(File::open(path)?);
        let writer = BufWriter::new(File::create(&target)?);
        let mut encoder = GzEncoder::new(writer, Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()
    })();

    match result {
        Ok(()) => fs::remove_file(path),
        Err(err) => {
            let _ = fs::remove_file(&target);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::str::FromStr;
    use std::sync::Mutex;

    use flate2::read::GzDecoder;
    use rand::Rng;
    use rand::distr::Alphanumeric;
    use tempfile::TempDir;

    use super::*;

    fn start_time() -> Timestamp {
        Timestamp::from_str("2024-08-10T00:00:00Z").unwrap()
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    fn generate_random_string(len: usize) -> String {
        let mut rng = rand::rng();
        std::iter::repeat(())
            .map(|()| rng.sample(Alphanumeric))
            .map(char::from)
            .take(len)
            .collect()
    }

    #[test]
    fn test_backup_path() {
        let now = Timestamp::from_str("2024-08-10T17:12:52.123456Z").unwrap();
        assert_eq!(
            backup_path(Path::new("/var/log/error.log"), now),
            PathBuf::from("/var/log/error-2024-08-10T17-12-52.123.log")
        );
        assert_eq!(
            backup_path(Path::new("logs/app"), now),
            PathBuf::from("logs/app-2024-08-10T17-12-52.123")
        );
    }

    #[test]
    fn test_open_existing_file_appends() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        fs::write(&path, "hello\n").unwrap();

        let mut writer = RotatingFile::builder(&path).build().unwrap();
        assert_eq!(writer.size(), 6);
        writer.write_all(b"world\n").unwrap();
        drop(writer);

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\nworld\n");
    }

    #[test]
    fn test_creates_missing_directories() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("a").join("b").join("app.log");

        let writer = RotatingFile::builder(&path).build().unwrap();
        assert!(path.is_file());
        assert_eq!(writer.path(), path);
    }

    #[test]
    fn test_rolling_via_file_size() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        let clock = Clock::manual(start_time());

        let mut writer = RotatingFile::builder(&path)
            .max_file_size(100)
            .max_backups(2)
            .clock(clock.clone())
            .build()
            .unwrap();

        // two chunks fit in a file, the third one rotates
        for _ in 0..10 {
            let chunk = generate_random_string(40);
            assert_eq!(writer.write(chunk.as_bytes()).unwrap(), 40);
            assert!(writer.size() <= 100);
            clock.advance(SignedDuration::from_secs(1));
        }
        drop(writer);

        let names = file_names(temp_dir.path());
        assert_eq!(names.len(), 3, "{names:?}");
        assert!(names.contains(&"app.log".to_string()));
        assert_eq!(fs::metadata(&path).unwrap().len(), 80);
    }

    #[test]
    fn test_write_larger_than_max_size_fails() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let mut writer = RotatingFile::builder(temp_dir.path().join("app.log"))
            .max_file_size(10)
            .build()
            .unwrap();

        let err = writer.write(b"this is way too long").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn test_rotate_after_external_removal() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        let mut writer = RotatingFile::builder(&path).build().unwrap();

        writer.write_all(b"before\n").unwrap();
        fs::remove_file(&path).unwrap();

        writer.rotate().unwrap();
        writer.write_all(b"after\n").unwrap();
        drop(writer);

        assert_eq!(file_names(temp_dir.path()), vec!["app.log".to_string()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "after\n");
    }

    #[test]
    fn test_rotate_keeps_content_in_backup() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        let mut writer = RotatingFile::builder(&path)
            .clock(Clock::manual(start_time()))
            .build()
            .unwrap();

        writer.write_all(b"first\n").unwrap();
        writer.rotate().unwrap();
        writer.write_all(b"second\n").unwrap();
        assert_eq!(writer.size(), 7);
        drop(writer);

        let backup = temp_dir.path().join("app-2024-08-10T00-00-00.000.log");
        assert_eq!(fs::read_to_string(backup).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    }

    #[test]
    fn test_compress_backups() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        let clock = Clock::manual(start_time());
        let mut writer = RotatingFile::builder(&path)
            .compress(true)
            .clock(clock.clone())
            .build()
            .unwrap();

        writer.write_all(b"compress me\n").unwrap();
        writer.rotate().unwrap();
        drop(writer);

        let backup = temp_dir.path().join("app-2024-08-10T00-00-00.000.log.gz");
        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app-2024-08-10T00-00-00.000.log.gz".to_string(),
                "app.log".to_string()
            ]
        );

        let mut text = String::new();
        GzDecoder::new(File::open(backup).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, "compress me\n");
    }

    #[test]
    fn test_expire_backups_by_age() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        let clock = Clock::manual(start_time());
        let mut writer = RotatingFile::builder(&path)
            .max_age(Duration::from_secs(2 * 24 * 60 * 60))
            .clock(clock.clone())
            .build()
            .unwrap();

        writer.write_all(b"old\n").unwrap();
        writer.rotate().unwrap();
        clock.advance(SignedDuration::from_hours(72));
        writer.write_all(b"new\n").unwrap();
        writer.rotate().unwrap();
        drop(writer);

        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app-2024-08-13T00-00-00.000.log".to_string(),
                "app.log".to_string()
            ]
        );
    }

    #[test]
    fn test_queued_cleanup_uses_current_time() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let old = temp_dir.path().join("app-2024-08-10T00-00-00.000.log");
        let new = temp_dir.path().join("app-2024-08-13T00-00-00.000.log");
        fs::write(&old, "old\n").unwrap();
        fs::write(&new, "new\n").unwrap();

        let clock = Clock::manual(start_time());
        let miller = Miller {
            path: temp_dir.path().join("app.log"),
            max_backups: 0,
            max_age: Some(Duration::from_secs(2 * 24 * 60 * 60)),
            compress: false,
            trap: Arc::new(DefaultTrap::default()),
            clock: clock.clone(),
        };

        // a request queued before the clock moves, and a later one coalesced into it
        let (sender, receiver) = bounded(1);
        sender.try_send(()).unwrap();
        clock.advance(SignedDuration::from_hours(72));
        assert!(sender.try_send(()).is_err());

        let handle = miller.make_thread(receiver).unwrap();
        drop(sender);
        handle.join().unwrap();

        assert!(!old.exists());
        assert!(new.exists());
    }

    #[test]
    fn test_cleanup_panic_is_trapped() {
        #[derive(Debug, Default)]
        struct ExplodingTrap(Arc<Mutex<Vec<String>>>);

        impl Trap for ExplodingTrap {
            fn trap(&self, err: &Error) {
                let mut errors = self.0.lock().unwrap();
                errors.push(err.message().to_string());
                if errors.len() == 1 {
                    drop(errors);
                    panic!("trap exploded");
                }
            }
        }

        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let errors = Arc::new(Mutex::new(vec![]));
        let miller = Miller {
            path: temp_dir.path().join("missing").join("app.log"),
            max_backups: 1,
            max_age: None,
            compress: false,
            trap: Arc::new(ExplodingTrap(errors.clone())),
            clock: Clock::default(),
        };

        let (sender, receiver) = bounded(1);
        let handle = miller.make_thread(receiver).unwrap();
        sender.send(()).unwrap();
        drop(sender);
        handle.join().unwrap();

        assert_eq!(
            *errors.lock().unwrap(),
            vec![
                "failed to read log dir".to_string(),
                "rotation task exited permanently after a panic".to_string(),
            ]
        );
    }

    #[test]
    fn test_unrelated_files_are_left_alone() {
        let temp_dir = TempDir::new().expect("failed to create a temporary directory");
        let path = temp_dir.path().join("app.log");
        fs::write(temp_dir.path().join("app-notes.log"), "keep").unwrap();
        fs::write(temp_dir.path().join("other-2024-08-01T00-00-00.000.log"), "keep").unwrap();

        let clock = Clock::manual(start_time());
        let mut writer = RotatingFile::builder(&path)
            .max_backups(1)
            .clock(clock.clone())
            .build()
            .unwrap();
        for _ in 0..3 {
            writer.write_all(b"line\n").unwrap();
            writer.rotate().unwrap();
            clock.advance(SignedDuration::from_secs(1));
        }
        drop(writer);

        assert_eq!(
            file_names(temp_dir.path()),
            vec![
                "app-2024-08-10T00-00-02.000.log".to_string(),
                "app-notes.log".to_string(),
                "app.log".to_string(),
                "other-2024-08-01T00-00-00.000.log".to_string(),
            ]
        );
    }
}
