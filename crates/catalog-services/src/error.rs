//! Errors of the video write path

use catalog_core::models::Video;
use catalog_core::{AppError, ErrorMetadata, LogLevel};
use catalog_storage::StorageError;
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;
use validator::ValidationErrors;

/// Step a video write is in.
///
/// `Validating` through `Committing` belong to the relational transaction and
/// abort as a unit. `FileCommitting` runs after the commit and can only be
/// compensated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    Validating,
    Persisting,
    RelationSyncing,
    Committing,
    FileCommitting,
    Done,
}

impl Display for WritePhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            WritePhase::Validating => "validating",
            WritePhase::Persisting => "persisting",
            WritePhase::RelationSyncing => "relation_syncing",
            WritePhase::Committing => "committing",
            WritePhase::FileCommitting => "file_committing",
            WritePhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Field rules, tag existence or coverage failed. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The video does not exist or is soft-deleted. Nothing was written.
    #[error("Video not found: {0}")]
    NotFound(Uuid),

    /// The relational phase failed and was rolled back.
    #[error("Transaction failed while {phase}: {source}")]
    Transaction {
        phase: WritePhase,
        #[source]
        source: AppError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The row was committed but its new files could not be stored. The
    /// files of this call were removed again; the row is not rolled back.
    #[error("Video {} was saved but its files could not be stored: {source}", video.id)]
    PartialWrite {
        video: Box<Video>,
        #[source]
        source: StorageError,
    },
}

impl WriteError {
    pub fn transaction(phase: WritePhase, source: AppError) -> Self {
        WriteError::Transaction { phase, source }
    }

    /// Phase the write failed in, when it got past validation.
    pub fn phase(&self) -> Option<WritePhase> {
        match self {
            WriteError::Transaction { phase, .. } => Some(*phase),
            WriteError::PartialWrite { .. } => Some(WritePhase::FileCommitting),
            WriteError::Validation(_) | WriteError::NotFound(_) | WriteError::Storage(_) => None,
        }
    }

    /// Committed video carried by a partial write.
    pub fn committed_video(&self) -> Option<&Video> {
        match self {
            WriteError::PartialWrite { video, .. } => Some(video.as_ref()),
            _ => None,
        }
    }
}

impl ErrorMetadata for WriteError {
    fn http_status_code(&self) -> u16 {
        match self {
            WriteError::Validation(_) => 422,
            WriteError::NotFound(_) => 404,
            WriteError::Transaction { source, .. } => source.http_status_code(),
            WriteError::Storage(_) | WriteError::PartialWrite { .. } => 500,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            WriteError::Validation(_) => "VALIDATION_FAILED",
            WriteError::NotFound(_) => "NOT_FOUND",
            WriteError::Transaction { source, .. } => source.error_code(),
            WriteError::Storage(_) => "STORAGE_ERROR",
            WriteError::PartialWrite { .. } => "PARTIAL_WRITE",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            WriteError::Validation(_) | WriteError::NotFound(_) => false,
            WriteError::Transaction { source, .. } => source.is_recoverable(),
            // The file upload alone can be retried against the committed row.
            WriteError::Storage(_) | WriteError::PartialWrite { .. } => true,
        }
    }

    fn client_message(&self) -> String {
        match self {
            WriteError::Validation(errors) => format!("Validation failed: {}", errors),
            WriteError::NotFound(id) => format!("Video {} not found", id),
            WriteError::Transaction { source, .. } => source.client_message(),
            WriteError::Storage(_) => "Failed to access file storage".to_string(),
            WriteError::PartialWrite { video, .. } => format!(
                "Video {} was saved but its files could not be stored; upload them again",
                video.id
            ),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            WriteError::Validation(_) | WriteError::NotFound(_) => LogLevel::Debug,
            WriteError::Transaction { source, .. } => source.log_level(),
            WriteError::Storage(_) | WriteError::PartialWrite { .. } => LogLevel::Error,
        }
    }
}
