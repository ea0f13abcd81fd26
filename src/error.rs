//! Error types for archiving, submission and report handling.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotarizeError>;

#[derive(Debug, Error)]
pub enum NotarizeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("Failed to zip application, exited with code: {}\n\n{output}", display_code(.code))]
    ArchiveFailed { code: Option<i32>, output: String },

    #[error("Unexpected tool output: {0}")]
    UnexpectedOutput(String),

    #[error(
        "Notarization {uuid} finished with status '{status}': {}{}",
        .message.as_deref().unwrap_or("no status message"),
        log_suffix(.log_file_url)
    )]
    NotarizationRejected {
        uuid: String,
        status: String,
        message: Option<String>,
        log_file_url: Option<String>,
    },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

// A child killed by a signal has no exit code.
fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn log_suffix(url: &Option<String>) -> String {
    url.as_deref()
        .map(|url| format!("\n\nLog: {url}"))
        .unwrap_or_default()
}
