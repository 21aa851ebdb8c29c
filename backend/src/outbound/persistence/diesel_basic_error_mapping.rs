//! Shared Diesel error mapping for repositories with connection/query errors.
//!
//! Every port error generated by `define_port_error!` in this crate carries a
//! `Connection` and a `Query` variant. [`basic_error_mappers!`] emits the two
//! `map_pool_error`/`map_diesel_error` functions a repository module needs.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map common Diesel error variants into query/connection constructors.
///
/// Database errors are logged at `debug` with their kind and server message;
/// callers only see a generic description.
pub fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            query("unique constraint violated")
        }
        DieselError::DatabaseError(_, _) => query("database error"),
        _ => query("database error"),
    }
}

/// Whether `error` is a unique constraint violation.
pub fn is_unique_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Whether `error` is a foreign key violation.
pub fn is_foreign_key_violation(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

/// Whether `error` reports a missing column, as raised by older schemas.
pub fn is_undefined_column(error: &DieselError) -> bool {
    match error {
        DieselError::DatabaseError(_, info) => {
            let message = info.message().to_ascii_lowercase();
            message.contains("column") && message.contains("does not exist")
        }
        _ => false,
    }
}

/// Emit `map_pool_error` and `map_diesel_error` for a port error type.
macro_rules! basic_error_mappers {
    ($error:ty) => {
        /// Map pool errors to domain repository errors.
        fn map_pool_error(error: $crate::outbound::persistence::PoolError) -> $error {
            $crate::outbound::persistence::diesel_basic_error_mapping::map_basic_pool_error(
                error,
                |message| <$error>::connection(message),
            )
        }

        /// Map Diesel errors to domain repository errors.
        fn map_diesel_error(error: diesel::result::Error) -> $error {
            $crate::outbound::persistence::diesel_basic_error_mapping::map_basic_diesel_error(
                error,
                <$error>::query,
                <$error>::connection,
            )
        }
    };
}

pub(crate) use basic_error_mappers;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ProductRepositoryError;
    use rstest::rstest;

    basic_error_mappers!(ProductRepositoryError);

    #[rstest]
    fn pool_errors_become_connection_errors() {
        let mapped = map_pool_error(PoolError::checkout("refused"));
        assert_eq!(mapped, ProductRepositoryError::connection("refused"));
    }

    #[rstest]
    #[case(DieselError::NotFound, "record not found")]
    #[case(DieselError::RollbackTransaction, "database error")]
    fn diesel_errors_become_query_errors(#[case] error: DieselError, #[case] message: &str) {
        assert_eq!(map_diesel_error(error), ProductRepositoryError::query(message));
    }

    #[rstest]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&DieselError::NotFound));
        assert!(!is_foreign_key_violation(&DieselError::NotFound));
        assert!(!is_undefined_column(&DieselError::NotFound));
    }
}
