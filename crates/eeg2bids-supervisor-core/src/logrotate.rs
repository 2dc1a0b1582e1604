use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Timestamp format embedded in archived log names: ISO-8601-derived with
/// `:` replaced and the sub-second part dropped.
const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H_%M_%S";

/// Rename the current log file to `<name>-<timestamp><ext>` in the same
/// directory. A rename failure is logged as a warning and swallowed;
/// rotation must never interrupt ongoing logging.
pub fn archive_log(file: &Path) {
    let date = Utc::now().format(ARCHIVE_TIMESTAMP_FORMAT);

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let archived = file.with_file_name(format!("{stem}-{date}{ext}"));

    if let Err(e) = std::fs::rename(file, &archived) {
        warn!(file = %file.display(), error = %e, "Could not rotate log");
    }
}

/// Append-only log file that archives itself once a size threshold is
/// crossed.
pub struct RotatingLog {
    path: PathBuf,
    max_len: u64,
    file: File,
}

impl RotatingLog {
    pub fn open(path: impl Into<PathBuf>, max_len: u64) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, max_len, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, rotating first if the file has grown past the
    /// threshold. Write failures are logged and swallowed so a full disk or
    /// locked file never takes down the host process.
    pub fn append(&mut self, line: &str) {
        if let Ok(meta) = self.file.metadata() {
            if meta.len() >= self.max_len {
                self.rotate();
            }
        }

        if let Err(e) = writeln!(self.file, "{line}") {
            warn!(file = %self.path.display(), error = %e, "Could not append to log");
        }
    }

    fn rotate(&mut self) {
        archive_log(&self.path);
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => self.file = file,
            Err(e) => {
                warn!(file = %self.path.display(), error = %e, "Could not reopen log after rotation");
            }
        }
    }
}

/// Shared, clonable line sink for one supervised service.
///
/// Each line is emitted through tracing and, when a log directory is
/// configured, appended to a rotated per-service log file.
#[derive(Clone)]
pub struct ServiceLog {
    name: &'static str,
    file: Option<Arc<Mutex<RotatingLog>>>,
}

impl ServiceLog {
    /// Open a file-backed service log named `<name>.log` under `dir`
    pub fn open(name: &'static str, dir: &Path, max_len: u64) -> std::io::Result<Self> {
        let log = RotatingLog::open(dir.join(format!("{name}.log")), max_len)?;
        Ok(Self {
            name,
            file: Some(Arc::new(Mutex::new(log))),
        })
    }

    /// A service log that only emits through tracing
    pub fn tracing_only(name: &'static str) -> Self {
        Self { name, file: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn info(&self, line: &str) {
        tracing::info!(service = self.name, "{line}");
        self.append("INFO", line);
    }

    pub fn error(&self, line: &str) {
        tracing::error!(service = self.name, "{line}");
        self.append("ERROR", line);
    }

    fn append(&self, level: &str, line: &str) {
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            file.append(&format!("{level} {line}"));
        }
    }
}
