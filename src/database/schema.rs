use sea_orm::{ConnectionTrait, DbErr, Statement};

use super::DB;

/// Initial schema, embedded so the admin binary works from any directory.
pub const INIT_SQL: &str = include_str!("../../migrations/001_init.sql");

/// Splits a script on `;`, dropping empty fragments.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Runs every statement of `sql`; objects that already exist are skipped.
/// Returns how many statements were executed successfully.
pub async fn apply(db: &DB, sql: &str) -> Result<usize, DbErr> {
    let mut applied = 0;
    for statement in split_statements(sql) {
        match db
            .execute(Statement::from_string(
                db.get_database_backend(),
                statement.to_string(),
            ))
            .await
        {
            Ok(_) => applied += 1,
            Err(e) if e.to_string().contains("already exists") => {
                log::info!(
                    "Skipping existing object: {}",
                    statement.split_whitespace().take(6).collect::<Vec<_>>().join(" ")
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(applied)
}
