use thiserror::Error;

use crate::model::{ReservationId, TableId};

/// Coarse grouping callers branch on (and the HTTP layer maps to a status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation_error",
            ErrorKind::Internal => "server_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("table {0} does not exist")]
    TableNotFound(TableId),

    #[error("reservation {0} does not exist")]
    ReservationNotFound(ReservationId),

    #[error("table {table_id} already booked for requested interval (reservation {conflicting})")]
    Overlap {
        table_id: TableId,
        conflicting: ReservationId,
    },

    #[error("table {table_id} has {count} active reservations")]
    TableHasReservations { table_id: TableId, count: usize },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("WAL error: {0}")]
    WalError(String),

    #[error("store task failed: {0}")]
    TaskFailed(String),
}

impl EngineError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::TableNotFound(_) | EngineError::ReservationNotFound(_) => {
                ErrorKind::NotFound
            }
            EngineError::Overlap { .. } | EngineError::TableHasReservations { .. } => {
                ErrorKind::Conflict
            }
            EngineError::Validation { .. } => ErrorKind::Validation,
            EngineError::WalError(_) | EngineError::TaskFailed(_) => ErrorKind::Internal,
        }
    }

    /// Names the rule that rejected the operation.
    pub fn reason(&self) -> &'static str {
        match self {
            EngineError::TableNotFound(_) => "table_not_found",
            EngineError::ReservationNotFound(_) => "reservation_not_found",
            EngineError::Overlap { .. } => "reservation_overlap",
            EngineError::TableHasReservations { .. } => "table_has_reservations",
            EngineError::Validation { .. } => "invalid_attribute",
            EngineError::WalError(_) => "storage_failure",
            EngineError::TaskFailed(_) => "task_failure",
        }
    }
}
