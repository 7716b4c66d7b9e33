//! JSONL audit trail for transfer decisions, one file per UTC day.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, ErrorKind, Write},
    path::PathBuf,
    sync::Mutex,
};

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::{AuditEntry, AuditLogger};
use crate::{AppError, Result};

/// The day file currently open for appending.
struct DayFile {
    date: NaiveDate,
    writer: BufWriter<File>,
}

/// Appends transfer audit entries to `<log_dir>/transfer-audit-YYYY-MM-DD.jsonl`.
///
/// Each entry goes to the file of the day its own timestamp falls on, so an
/// entry recorded just before midnight is never filed under the next day.
/// Every line is flushed before `log_entry` returns.
pub struct JsonlAuditWriter {
    log_dir: PathBuf,
    current: Mutex<Option<DayFile>>,
}

impl JsonlAuditWriter {
    /// Construct a writer that stores logs in `log_dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the directory cannot be created.
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&log_dir).map_err(|e| {
            AppError::Io(format!(
                "failed to create audit log directory {}: {e}",
                log_dir.display()
            ))
        })?;
        Ok(Self {
            log_dir,
            current: Mutex::new(None),
        })
    }

    /// Path of the audit file for `date`.
    #[must_use]
    pub fn file_for_date(&self, date: NaiveDate) -> PathBuf {
        self.log_dir.join(format!("transfer-audit-{date}.jsonl"))
    }

    /// Entries recorded for `transfer_id` on `date`, in write order.
    ///
    /// A day with no audit file yields an empty trail.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read or a line is not
    /// a valid audit entry.
    pub fn trail_for_transfer(
        &self,
        transfer_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<AuditEntry>> {
        let path = self.file_for_date(date);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Io(format!(
                    "failed to open audit log {}: {e}",
                    path.display()
                )))
            }
        };

        let mut trail = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                AppError::Io(format!("failed to read audit log {}: {e}", path.display()))
            })?;
            let entry: AuditEntry = serde_json::from_str(&line).map_err(|e| {
                AppError::Io(format!(
                    "malformed audit entry at {}:{}: {e}",
                    path.display(),
                    index + 1
                ))
            })?;
            if entry.transfer_id.as_deref() == Some(transfer_id) {
                trail.push(entry);
            }
        }
        Ok(trail)
    }

    fn open_day(&self, date: NaiveDate) -> Result<DayFile> {
        let path = self.file_for_date(date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::Io(format!("failed to open audit log {}: {e}", path.display())))?;
        debug!(path = %path.display(), "audit log opened");
        Ok(DayFile {
            date,
            writer: BufWriter::new(file),
        })
    }
}

impl AuditLogger for JsonlAuditWriter {
    fn log_entry(&self, entry: AuditEntry) -> Result<()> {
        let date = entry.timestamp.date_naive();
        let line = serde_json::to_string(&entry)
            .map_err(|e| AppError::Io(format!("failed to serialize audit entry: {e}")))?;

        let mut current = self
            .current
            .lock()
            .map_err(|_| AppError::Io("audit writer mutex poisoned".into()))?;

        let day = match current.take() {
            Some(day) if day.date == date => day,
            _ => self.open_day(date)?,
        };
        let day = current.insert(day);

        if let Err(e) = writeln!(day.writer, "{line}").and_then(|()| day.writer.flush()) {
            warn!(
                transfer_id = entry.transfer_id.as_deref().unwrap_or("-"),
                event_type = ?entry.event_type,
                "failed to write audit entry: {e}"
            );
            return Err(AppError::Io(format!("audit write failed: {e}")));
        }

        Ok(())
    }
}
