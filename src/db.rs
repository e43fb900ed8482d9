use sea_orm::{Database, DatabaseConnection, DbErr};
use std::{env, fs, path::PathBuf};
use tracing::info;

/// SQLite file under the user's data directory, created on demand.
fn default_database_url() -> Result<String, DbErr> {
    let home = env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    let dir = home.join(".nexus");
    fs::create_dir_all(&dir).map_err(|err| {
        DbErr::Custom(format!(
            "failed to create data directory {}: {err}",
            dir.display()
        ))
    })?;
    Ok(format!("sqlite://{}?mode=rwc", dir.join("nexus.db").display()))
}

pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let url = match env::var("DATABASE_URL") {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default_database_url()?,
    };
    info!(url = %url, "connecting to database");
    Database::connect(url).await
}
