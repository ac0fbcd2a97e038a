//! Conversions from external infrastructure errors into domain errors.

use caseledger_common::storage::StorageError;
use caseledger_domain::CaseLedgerError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CaseLedgerError);

impl From<InfraError> for CaseLedgerError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CaseLedgerError> for InfraError {
    fn from(value: CaseLedgerError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoCaseLedgerError {
    fn into_caseledger(self) -> CaseLedgerError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CaseLedgerError */
/* -------------------------------------------------------------------------- */

impl IntoCaseLedgerError for SqlError {
    fn into_caseledger(self) -> CaseLedgerError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        CaseLedgerError::StoreFailure("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        CaseLedgerError::StoreFailure("database is locked".into())
                    }
                    // SQLITE_CONSTRAINT_UNIQUE / SQLITE_CONSTRAINT_PRIMARYKEY
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        CaseLedgerError::Conflict(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        CaseLedgerError::StoreFailure("foreign key constraint violation".into())
                    }
                    _ => CaseLedgerError::StoreFailure(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                CaseLedgerError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                CaseLedgerError::StoreFailure(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CaseLedgerError::StoreFailure(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => CaseLedgerError::StoreFailure(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            RE::InvalidQuery => CaseLedgerError::StoreFailure("invalid SQL query".into()),
            other => CaseLedgerError::StoreFailure(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_caseledger())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → CaseLedgerError */
/* -------------------------------------------------------------------------- */

impl IntoCaseLedgerError for StorageError {
    fn into_caseledger(self) -> CaseLedgerError {
        match self {
            StorageError::Rusqlite(err) => err.into_caseledger(),
            StorageError::Timeout(secs) => CaseLedgerError::StoreFailure(format!(
                "timed out after {secs}s waiting for a database connection"
            )),
            other => CaseLedgerError::StoreFailure(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_caseledger())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → CaseLedgerError */
/* -------------------------------------------------------------------------- */

impl IntoCaseLedgerError for serde_json::Error {
    fn into_caseledger(self) -> CaseLedgerError {
        CaseLedgerError::StoreFailure(format!("stored JSON is unreadable: {self}"))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_caseledger())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
