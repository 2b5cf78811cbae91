use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed mode/target or an unusable source path.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The external tool exited abnormally for one strategy.
    #[error("{tool} failed for {tier}: {detail}")]
    ExternalToolFailure {
        tool: String,
        tier: String,
        detail: String,
    },

    /// The tool reported success but left nothing usable behind.
    #[error("{tier} reported success but produced no readable output: {}", .path.display())]
    NoArtifactProduced { tier: String, path: PathBuf },

    #[error("scratch storage error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A padded artifact no longer parses as a document.
    #[error("artifact failed structural validation: {0}")]
    InvalidArtifact(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded before any candidate was produced")]
    DeadlineExceeded,
}

impl EngineError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        EngineError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Attach a description to a raw `io::Result`, mirroring `anyhow::Context`.
pub trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| EngineError::io(f(), e))
    }
}
