use std::io;

/// Errors raised while building or delivering an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Nothing usable was supplied.
    #[error("no usable entries: {0}")]
    Validation(String),

    /// A value does not fit the field it has to be encoded in.
    #[error("cannot encode '{name}': {reason}")]
    Format { name: String, reason: String },

    /// The bytes of an entry could not be read.
    #[error("failed to read '{name}': {source}")]
    Io { name: String, source: io::Error },

    #[error("export cancelled")]
    Cancelled,

    /// The sink refused or failed to deliver a buffer.
    #[error("failed to deliver '{filename}': {reason}")]
    Download { filename: String, reason: String },

    /// The compression backend gave up.
    #[error("compression backend failed: {0:#}")]
    Backend(anyhow::Error),

    /// An archive read back from bytes is malformed.
    #[error("invalid archive: {0}")]
    Archive(String),
}

impl ExportError {
    pub fn format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn download(filename: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether an error coming out of a black-box seam carries a cancellation.
    pub fn is_cancellation(err: &anyhow::Error) -> bool {
        err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<ExportError>(),
                Some(ExportError::Cancelled)
            )
        })
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn cancellation_is_found_through_context() {
        let err: anyhow::Result<()> = Err(ExportError::Cancelled).context("building archive");
        assert!(ExportError::is_cancellation(&err.unwrap_err()));
    }

    #[test]
    fn other_errors_are_not_cancellation() {
        let err = anyhow::Error::new(ExportError::Validation("empty".into()));
        assert!(!ExportError::is_cancellation(&err));
        assert!(!ExportError::is_cancellation(&anyhow::anyhow!("boom")));
    }
}
