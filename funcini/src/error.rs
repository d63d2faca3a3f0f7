//! error types for exporting and reading function definitions
use std::path::PathBuf;
use thiserror::Error;

/// the program model could not produce its functions, or one of the per
/// function accessors failed. carries the host's message unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HostModelError {
    pub message: String,
}

impl HostModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for HostModelError {
    fn from(err: anyhow::Error) -> Self {
        // keep the whole context chain, not only the outermost message
        Self::new(format!("{:#}", err))
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("program model error: {0}")]
    HostModel(#[from] HostModelError),
}

#[derive(Error, Debug)]
pub enum IniError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid parameter ordinal in key `{key}`")]
    InvalidOrdinal { line: usize, key: String },
}
