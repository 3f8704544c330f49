//! Collaborator-facing error taxonomy for store operations.

use crate::db::DbError;
use crate::model::{EntityRef, ValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Store file cannot be opened, read or migrated. Fatal at startup.
    Unavailable(DbError),
    /// Commit could not be durably written; pending edits are kept.
    SaveFailed(String),
    /// Entity is absent from the calling context's view.
    NotFound(EntityRef),
    /// A field failed validation at commit time; pending edits are kept.
    ValidationFailed(ValidationError),
    /// Reading committed state failed.
    Query(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "store unavailable: {err}"),
            Self::SaveFailed(reason) => write!(f, "save failed: {reason}"),
            Self::NotFound(entity) => write!(f, "entity not found: {entity}"),
            Self::ValidationFailed(err) => {
                write!(f, "validation failed on `{}`: {err}", err.field())
            }
            Self::Query(err) => write!(f, "query failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) => Some(err),
            Self::ValidationFailed(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::SaveFailed(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Query(value)
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::ValidationFailed(value)
    }
}
