use std::path::PathBuf;

use anyhow::anyhow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No such file or directory: {0}")]
    NotFound(PathBuf),

    /// Malformed JSON or an unparseable timestamp.
    #[error("Parse error in {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn parse(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Parse {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn timestamp(value: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: "timestamp".to_string(),
            source: anyhow!("unparseable timestamp: {}", value),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
