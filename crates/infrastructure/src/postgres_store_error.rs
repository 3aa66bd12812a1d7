use maintly_core::{AppError, StoreKind};

const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Maps a driver error to the store error taxonomy.
pub(crate) fn map_store_error(store: StoreKind, context: &str, error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                return AppError::InvalidPermission(format!(
                    "{context}: referenced permission is not in the catalog"
                ));
            }
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
                return AppError::ConcurrentModification(format!(
                    "{context}: conflicting concurrent write, retry with a fresh read"
                ));
            }
            _ => {}
        }
    }

    AppError::store_unavailable(store, format!("{context}: {error}"))
}
