use std::path::PathBuf;

use crate::geometry::BoundsError;
use crate::transplant::TransplantState;

/// Error type for region transplant operations.
///
/// Every variant is terminal for the invocation that produced it. Nothing is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum TransplantError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),
    #[error("Region out of bounds: {0}")]
    OutOfBounds(#[from] BoundsError),
    #[error("Cannot resolve world size for {}: {reason}", .path.display())]
    SizeUnresolved { path: PathBuf, reason: String },
    #[error("Cannot load patch overlay {}: {reason}", .path.display())]
    OverlayLoad { path: PathBuf, reason: String },
    #[error("Failed to read {}: {source}", .path.display())]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cancelled during {0}")]
    Cancelled(TransplantState),
}

pub type Result<T> = std::result::Result<T, TransplantError>;

impl TransplantError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransplantError::StorageRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TransplantError::StorageWrite {
            path: path.into(),
            source,
        }
    }
}
