use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
    TaskNotFound,
    ValidationError,
    MalformedStore,
    StoreReadFailed,
    StoreWriteFailed,
    ConfigError,
    IoError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::MalformedStore => "MALFORMED_STORE",
            Self::StoreReadFailed => "STORE_READ_FAILED",
            Self::StoreWriteFailed => "STORE_WRITE_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct TaskboardError {
    pub code: ErrorCode,
    pub message: String,
}

impl TaskboardError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_initialized(path: &std::path::Path) -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            format!(
                "No task store at {}. Run `taskboard init` first.",
                path.display()
            ),
        )
    }

    pub fn task_not_found(id: &str) -> Self {
        Self::new(ErrorCode::TaskNotFound, format!("Task not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn malformed_store(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::MalformedStore,
            format!("Task store {} is malformed: {detail}", path.display()),
        )
    }

    pub fn store_read(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::StoreReadFailed,
            format!("Failed to read task store {}: {detail}", path.display()),
        )
    }

    pub fn store_write(path: &std::path::Path, detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::StoreWriteFailed,
            format!("Failed to write task store {}: {detail}", path.display()),
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IoError, message)
    }
}

impl From<std::io::Error> for TaskboardError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}
