pub mod leaderboard;
pub mod migrate;
pub mod server;

use anyhow::{Context, Result};
use sqlx::{postgres::Postgres, Pool};
use std::env;
use url::Url;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connects to the database named by `DATABASE_URL`.
pub async fn connect() -> Result<Pool<Postgres>> {
    let database_url: String = env::var("DATABASE_URL").with_context(|| {
        let message = "DATABASE_URL must be configured.";
        tracing::error!(message);
        message
    })?;
    let max_connections: u32 = match env::var("DATABASE_MAX_CONNECTIONS") {
        Ok(value) => value.parse().with_context(|| {
            let message = format!("DATABASE_MAX_CONNECTIONS must be a number, got `{}`", value);
            tracing::error!(message);
            message
        })?,
        Err(_) => DEFAULT_MAX_CONNECTIONS,
    };

    tracing::info!(
        "Connect to database {} with at most {} connections",
        redact(&database_url),
        max_connections
    );
    let pool: Pool<Postgres> = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .with_context(|| {
            let message = "Failed to create database connection pool.";
            tracing::error!(message);
            message
        })?;

    Ok(pool)
}

fn redact(database_url: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() {
                url.set_password(Some("****")).ok();
            }
            url.to_string()
        }
        Err(_) => String::from("<unparsable url>"),
    }
}
