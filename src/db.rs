use std::{path::{Path, PathBuf}, sync::Arc};

use anyhow::{Context, Result};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use tokio::fs;

use crate::{
    config::{AppConfig, StoreBackend},
    remote::{MemoryStore, PgStore, RemoteStore},
};

/// Opens the store selected by `STORE_BACKEND`, migrating PostgreSQL first.
pub async fn connect_store(config: &AppConfig) -> Result<Arc<dyn RemoteStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            let store = PgStore::connect(url).await?;
            run_migrations(store.orm(), Path::new("migrations")).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Minimal migration runner that executes SQL files in `dir` in filename order.
pub async fn run_migrations(conn: &DatabaseConnection, dir: &Path) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("reading {}", dir.display()))?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();

    let backend = conn.get_database_backend();
    for file in files {
        let sql = fs::read_to_string(&file).await?;
        // One command per prepared statement in Postgres.
        for stmt in sql.split(';') {
            let stmt = stmt.trim();
            if stmt.is_empty() {
                continue;
            }
            conn.execute(Statement::from_string(backend, format!("{stmt};")))
                .await
                .with_context(|| format!("applying {}", file.display()))?;
        }
        tracing::info!(file = %file.display(), "migration applied");
    }

    Ok(())
}
