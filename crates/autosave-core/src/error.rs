use crate::document::DocumentId;
use thiserror::Error;

/// Boxed error returned by a host's persistence primitive.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error types for autosave.
///
/// Dead save targets are not errors: they are reported as
/// [`Diagnostic::StaleTarget`](crate::diagnostics::Diagnostic::StaleTarget)
/// and the operation is skipped.
///
/// # Examples
///
/// ```
/// use autosave_core::error::{AutosaveError, Result};
/// use autosave_core::DocumentId;
///
/// fn save(document: DocumentId, disk_full: bool) -> Result<()> {
///     if disk_full {
///         return Err(AutosaveError::SaveFailed {
///             document,
///             source: Box::new(std::io::Error::new(
///                 std::io::ErrorKind::StorageFull,
///                 "no space left on device",
///             )),
///         });
///     }
///     Ok(())
/// }
///
/// assert!(save(DocumentId::new(1), true).is_err());
/// ```
#[derive(Error, Debug)]
pub enum AutosaveError {
    #[error("failed to save {document}: {source}")]
    SaveFailed {
        document: DocumentId,
        #[source]
        source: BoxError,
    },

    #[error("document {0} is not alive")]
    DocumentNotAlive(DocumentId),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for `Result<T, AutosaveError>`.
pub type Result<T> = std::result::Result<T, AutosaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_failed_display() {
        let error = AutosaveError::SaveFailed {
            document: DocumentId::new(7),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file",
            )),
        };
        assert_eq!(error.to_string(), "failed to save doc#7: read-only file");
    }

    #[test]
    fn test_save_failed_keeps_source() {
        use std::error::Error as _;

        let error = AutosaveError::SaveFailed {
            document: DocumentId::new(1),
            source: Box::new(std::io::Error::other("boom")),
        };
        assert!(error.source().is_some());
    }

    #[test]
    fn test_document_not_alive() {
        let error = AutosaveError::DocumentNotAlive(DocumentId::new(3));
        assert_eq!(error.to_string(), "document doc#3 is not alive");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: AutosaveError = json_err.into();
        assert!(error.to_string().starts_with("JSON error"));
    }
}
