//! The two process log streams.

use std::path::Path;

use crate::config::LogRotationConfig;
use crate::observability::logging::{ConsoleSink, LeveledLogger, LogError};
use crate::observability::rotating::RotatingFileWriter;

/// File name of the system event stream inside the log directory.
pub const SYS_LOG_NAME: &str = "sys.log";
/// File name of the SQL statement stream inside the log directory.
pub const SQL_LOG_NAME: &str = "sql.log";

/// Owns the "system" and "sql" loggers and is shared by `Arc` with
/// everything that logs.
#[derive(Debug)]
pub struct LoggerRegistry {
    system: LeveledLogger,
    sql: LeveledLogger,
}

impl LoggerRegistry {
    pub fn new(system: LeveledLogger, sql: LeveledLogger) -> Self {
        Self { system, sql }
    }

    /// Open both streams as rotating files under `log_dir`.
    pub fn open(log_dir: &Path, rotation: &LogRotationConfig) -> Result<Self, LogError> {
        let sys_path = log_dir.join(SYS_LOG_NAME);
        let system = RotatingFileWriter::open(&sys_path, rotation.max_size_bytes, rotation.max_backups)?;
        println!("sys log file path: {}", sys_path.display());

        let sql_path = log_dir.join(SQL_LOG_NAME);
        let sql = RotatingFileWriter::open(&sql_path, rotation.max_size_bytes, rotation.max_backups)?;
        println!("sql log file path: {}", sql_path.display());

        Ok(Self::new(
            LeveledLogger::new("system", Box::new(system)),
            LeveledLogger::new("sql", Box::new(sql)),
        ))
    }

    /// Both streams on standard output.
    pub fn console() -> Self {
        Self::new(
            LeveledLogger::new("system", Box::new(ConsoleSink::new())),
            LeveledLogger::new("sql", Box::new(ConsoleSink::new())),
        )
    }

    pub fn system(&self) -> &LeveledLogger {
        &self.system
    }

    pub fn sql(&self) -> &LeveledLogger {
        &self.sql
    }

    /// Close the system stream, then the sql stream.
    ///
    /// Both are closed even if the first fails; the first error is returned.
    pub fn close(&self) -> Result<(), LogError> {
        let system = self.system.close();
        let sql = self.sql.close();
        system.and(sql)
    }
}
