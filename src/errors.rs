use std::path::PathBuf;

use thiserror::Error;

/// The ways in which a pipeline stage can fail. Every stage either completes fully or
/// returns one of these (wrapped in an `anyhow::Error`) to its caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid settings in `{file}`: {reason}")]
    Configuration { file: String, reason: String },

    #[error("{action} `{}` failed", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "malformed FASTQ record in `{}`:
record {record}
    {reason}",
        path.display()
    )]
    Format {
        path: PathBuf,
        record: usize,
        reason: String,
    },

    #[error("statistics rejected for stage `{stage}`: {reason}")]
    Statistics { stage: String, reason: String },
}

impl PipelineError {
    /// Wraps an I/O error with the action that was being performed and the offending path.
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}
