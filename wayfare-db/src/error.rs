use wayfare_core::{CoreError, ErrorCode};

/// Extension trait for converting `sqlx::Error` into [`CoreError`].
///
/// Due to Rust's orphan rules, `From<sqlx::Error> for CoreError` can't live
/// in `wayfare-core` (which doesn't depend on `sqlx`). Use
/// `.into_core_error()` or the `?` operator after an explicit `.map_err`.
pub trait SqlxErrorExt {
    fn into_core_error(self) -> CoreError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_core_error(self) -> CoreError {
        match &self {
            sqlx::Error::RowNotFound => CoreError::new(ErrorCode::NotFound, "row not found"),
            _ => CoreError::new(ErrorCode::Internal, self.to_string()),
        }
    }
}

/// Convenience alias for database operations returning `CoreError`.
pub type DbResult<T> = Result<T, CoreError>;
