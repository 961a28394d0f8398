use crate::cmd::connect;
use anyhow::{Context, Result};
use clap::Args;
use studyhub_libs::migration::MIGRATOR;

#[derive(Debug, Args)]
pub struct MigrateArgs {}

pub async fn run(_args: MigrateArgs) -> Result<()> {
    let pool = connect().await?;

    MIGRATOR.run(&pool).await.with_context(|| {
        let message = "Failed to run database migrations.";
        tracing::error!(message);
        message
    })?;
    tracing::info!("Database migrations successfully applied.");

    pool.close().await;
    Ok(())
}
