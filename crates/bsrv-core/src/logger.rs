//! C6 — append-only structured event stream with size-based rotation and
//! an in-memory per-session stats map kept current by event emission.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bsrv_protocol::ErrorCode;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEventType {
    SessionStart,
    SessionEnd,
    CommandReceived,
    CommandExecuted,
    CommandFailed,
    Navigation,
    Interaction,
    Extraction,
    WaitCondition,
    Error,
    SecurityViolation,
    RateLimitExceeded,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: f64,
    pub event_type: LogEventType,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

impl LogEvent {
    pub fn new(
        timestamp: f64,
        event_type: LogEventType,
        session_id: impl Into<String>,
        message: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            timestamp,
            event_type,
            session_id: session_id.into(),
            command_id: None,
            client_addr: None,
            message: message.into(),
            data: None,
            execution_time_ms: None,
            success,
            error_code: None,
        }
    }

    pub fn with_command_id(mut self, id: impl Into<String>) -> Self {
        self.command_id = Some(id.into());
        self
    }

    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_execution_time_ms(mut self, ms: u64) -> Self {
        self.execution_time_ms = Some(ms);
        self
    }

    pub fn with_error_code(mut self, code: ErrorCode) -> Self {
        self.error_code = Some(code);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SessionStats {
    pub start_time: f64,
    pub client_addr: Option<String>,
    pub command_count: u64,
    pub last_activity: f64,
}

struct RotatingWriter {
    path: PathBuf,
    file: File,
    max_bytes: u64,
    backup_count: u32,
    current_bytes: u64,
}

impl RotatingWriter {
    fn open(path: PathBuf, max_bytes: u64, backup_count: u32) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let current_bytes = file.metadata()?.len();
        Ok(Self { path, file, max_bytes, backup_count, current_bytes })
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        if self.current_bytes + line.len() as u64 + 1 > self.max_bytes && self.current_bytes > 0 {
            self.rotate()?;
        }
        writeln!(self.file, "{line}")?;
        self.current_bytes += line.len() as u64 + 1;
        Ok(())
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        for i in (1..self.backup_count).rev() {
            let src = backup_path(&self.path, i);
            let dst = backup_path(&self.path, i + 1);
            if src.exists() {
                let _ = std::fs::rename(&src, &dst);
            }
        }
        if self.backup_count > 0 {
            let _ = std::fs::rename(&self.path, backup_path(&self.path, 1));
        }
        self.file = OpenOptions::new().create(true).write(true).truncate(true).open(&self.path)?;
        self.current_bytes = 0;
        Ok(())
    }
}

fn backup_path(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

pub struct SessionLogger {
    writer: Mutex<RotatingWriter>,
    active_sessions: Mutex<HashMap<String, SessionStats>>,
}

impl SessionLogger {
    pub fn open(path: impl AsRef<Path>, max_bytes: u64, backup_count: u32) -> std::io::Result<Self> {
        let writer = RotatingWriter::open(path.as_ref().to_path_buf(), max_bytes, backup_count)?;
        Ok(Self { writer: Mutex::new(writer), active_sessions: Mutex::new(HashMap::new()) })
    }

    /// Appends one JSON line and updates the in-memory stats map. Never
    /// on the hot path for driver calls — logging failures are reported
    /// via `tracing` but never propagated to the caller.
    pub fn log_event(&self, event: LogEvent) {
        self.update_stats(&event);

        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize session log event");
                return;
            }
        };
        if let Err(err) = self.writer.lock().unwrap().write_line(&line) {
            tracing::error!(error = %err, "failed to write session log event");
        }
    }

    fn update_stats(&self, event: &LogEvent) {
        let mut sessions = self.active_sessions.lock().unwrap();
        match event.event_type {
            LogEventType::SessionStart => {
                sessions.insert(
                    event.session_id.clone(),
                    SessionStats {
                        start_time: event.timestamp,
                        client_addr: event.client_addr.clone(),
                        command_count: 0,
                        last_activity: event.timestamp,
                    },
                );
            }
            LogEventType::SessionEnd => {
                sessions.remove(&event.session_id);
            }
            _ => {
                if let Some(stats) = sessions.get_mut(&event.session_id) {
                    stats.last_activity = event.timestamp;
                    if matches!(event.event_type, LogEventType::CommandReceived) {
                        stats.command_count += 1;
                    }
                }
            }
        }
    }

    pub fn session_stats(&self, session_id: &str) -> Option<SessionStats> {
        self.active_sessions.lock().unwrap().get(session_id).cloned()
    }

    pub fn all_session_stats(&self) -> HashMap<String, SessionStats> {
        self.active_sessions.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_logger(max_bytes: u64, backup_count: u32) -> (tempfile::TempDir, SessionLogger) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.log");
        let logger = SessionLogger::open(&path, max_bytes, backup_count).unwrap();
        (dir, logger)
    }

    #[test]
    fn session_start_then_end_updates_map() {
        let (_dir, logger) = tmp_logger(1_000_000, 3);
        logger.log_event(LogEvent::new(1.0, LogEventType::SessionStart, "s1", "start", true));
        assert!(logger.session_stats("s1").is_some());
        logger.log_event(LogEvent::new(2.0, LogEventType::SessionEnd, "s1", "end", true));
        assert!(logger.session_stats("s1").is_none());
    }

    #[test]
    fn command_received_increments_count() {
        let (_dir, logger) = tmp_logger(1_000_000, 3);
        logger.log_event(LogEvent::new(1.0, LogEventType::SessionStart, "s1", "start", true));
        logger.log_event(LogEvent::new(2.0, LogEventType::CommandReceived, "s1", "cmd", true));
        logger.log_event(LogEvent::new(3.0, LogEventType::CommandReceived, "s1", "cmd", true));
        assert_eq!(logger.session_stats("s1").unwrap().command_count, 2);
    }

    #[test]
    fn events_for_unknown_session_do_not_panic() {
        let (_dir, logger) = tmp_logger(1_000_000, 3);
        logger.log_event(LogEvent::new(1.0, LogEventType::CommandExecuted, "ghost", "x", true));
        assert!(logger.session_stats("ghost").is_none());
    }

    #[test]
    fn rotation_creates_backup_file() {
        let (dir, logger) = tmp_logger(64, 2);
        for i in 0..20 {
            logger.log_event(LogEvent::new(
                i as f64,
                LogEventType::CommandReceived,
                "s1",
                "a reasonably long log message to force rotation",
                true,
            ));
        }
        assert!(dir.path().join("sessions.log.1").exists());
    }

    #[test]
    fn writes_valid_json_lines() {
        let (dir, logger) = tmp_logger(1_000_000, 3);
        logger.log_event(
            LogEvent::new(1.0, LogEventType::CommandFailed, "s1", "failed", false)
                .with_error_code(ErrorCode::Timeout)
                .with_command_id("cmd-1"),
        );
        let contents = std::fs::read_to_string(dir.path().join("sessions.log")).unwrap();
        let parsed: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["error_code"], "TIMEOUT");
        assert_eq!(parsed["command_id"], "cmd-1");
    }
}
