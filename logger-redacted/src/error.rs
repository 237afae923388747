use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },
}

pub type LoggerResult<T> = Result<T, LoggerError>;
