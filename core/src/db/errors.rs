use anyhow::Error as AnyError;
use sqlx::{Error as SqlxError, error::DatabaseError};
use std::error::Error as StdError;

const SQLITE_UNIQUE_VIOLATION: &str = "2067";
const SQLITE_PRIMARY_KEY_VIOLATION: &str = "1555";

/// Returns `true` if any error in the chain is a SQLite uniqueness violation.
pub fn is_unique_violation(err: &AnyError) -> bool {
    err.chain().any(is_unique_violation_cause)
}

fn is_unique_violation_cause(cause: &(dyn StdError + 'static)) -> bool {
    if let Some(sqlx_error) = cause.downcast_ref::<SqlxError>() {
        if matches_sqlx_unique(sqlx_error) {
            return true;
        }
    }

    cause
        .to_string()
        .to_ascii_lowercase()
        .contains("unique constraint failed")
}

fn matches_sqlx_unique(err: &SqlxError) -> bool {
    match err {
        SqlxError::Database(db_err) => {
            database_code_is_unique(db_err.as_ref())
                || db_err
                    .message()
                    .to_ascii_lowercase()
                    .contains("unique constraint")
        }
        _ => false,
    }
}

fn database_code_is_unique(err: &(dyn DatabaseError + 'static)) -> bool {
    err.code().is_some_and(|code| {
        matches!(
            code.as_ref(),
            SQLITE_UNIQUE_VIOLATION | SQLITE_PRIMARY_KEY_VIOLATION
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_database;

    #[test]
    fn unrelated_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&anyhow::anyhow!("connection reset")));
    }

    #[tokio::test]
    async fn detects_duplicate_email_insert() {
        let (_temp_dir, database) = setup_database().await;
        let insert = "INSERT INTO users (id, email, first_name, last_name, created_at) VALUES (?, 'dup@example.com', 'A', 'B', 0)";

        sqlx::query(insert)
            .bind("one")
            .execute(database.pool())
            .await
            .unwrap();
        let err = sqlx::query(insert)
            .bind("two")
            .execute(database.pool())
            .await
            .unwrap_err();

        assert!(is_unique_violation(&anyhow::Error::from(err).context("insert user")));
    }
}
