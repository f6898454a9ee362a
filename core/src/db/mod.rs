use std::{fs, fs::File, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};

use self::{
    sqlite::{
        connection as sqlite_connection, notification_center::SqliteNotificationCenter,
        user_repo::SqliteUserRepository, workspace_repo::SqliteWorkspaceRepository,
    },
    user_repo::UserRepositoryRef,
    workspace_repo::WorkspaceRepositoryRef,
};
use crate::{
    config::{self, AppConfig},
    notification::NotificationCenterRef,
};

pub mod errors;
pub mod sqlite;
pub mod user_repo;
pub mod workspace_repo;

#[derive(Clone)]
pub struct RepositoryRegistry {
    workspace_repo: WorkspaceRepositoryRef,
    user_repo: UserRepositoryRef,
    notification_center: NotificationCenterRef,
}

impl RepositoryRegistry {
    pub fn new(
        workspace_repo: WorkspaceRepositoryRef,
        user_repo: UserRepositoryRef,
        notification_center: NotificationCenterRef,
    ) -> Self {
        Self {
            workspace_repo,
            user_repo,
            notification_center,
        }
    }

    pub fn workspace_repo(&self) -> WorkspaceRepositoryRef {
        self.workspace_repo.clone()
    }

    pub fn user_repo(&self) -> UserRepositoryRef {
        self.user_repo.clone()
    }

    pub fn notification_center(&self) -> NotificationCenterRef {
        self.notification_center.clone()
    }
}

#[derive(Clone)]
pub struct Database {
    pool: sqlite_connection::SqlitePool,
    path: PathBuf,
    repositories: Arc<RepositoryRegistry>,
}

impl Database {
    const SQLITE_FILE_NAME: &'static str = "crewspace.db";

    /// Open (creating if needed) the SQLite database and apply migrations.
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let (data_dir, db_file) = Self::resolve_database_paths(&config.database_path)?;
        fs::create_dir_all(&data_dir).with_context(|| {
            format!(
                "failed to create database directory: {}",
                data_dir.display()
            )
        })?;

        if !db_file.exists() {
            File::create(&db_file).with_context(|| {
                format!("failed to create database file: {}", db_file.display())
            })?;
        }

        let pool =
            sqlite_connection::create_pool(&db_file, config.database_max_connections).await?;
        sqlite_connection::run_migrations(&pool).await?;

        let workspace_repo =
            Arc::new(SqliteWorkspaceRepository::new(pool.clone())) as WorkspaceRepositoryRef;
        let user_repo = Arc::new(SqliteUserRepository::new(pool.clone())) as UserRepositoryRef;
        let notification_center =
            Arc::new(SqliteNotificationCenter::new(pool.clone())) as NotificationCenterRef;
        let repositories = Arc::new(RepositoryRegistry::new(
            workspace_repo,
            user_repo,
            notification_center,
        ));

        Ok(Self {
            pool,
            path: db_file,
            repositories,
        })
    }

    pub fn pool(&self) -> &sqlite_connection::SqlitePool {
        &self.pool
    }

    pub fn database_path(&self) -> &PathBuf {
        &self.path
    }

    pub fn repositories(&self) -> Arc<RepositoryRegistry> {
        self.repositories.clone()
    }

    fn resolve_database_paths(path: &str) -> Result<(PathBuf, PathBuf)> {
        if config::database_path_is_file(path) {
            let db_file = Self::resolve_db_path(path)?;
            let dir = if let Some(parent) = db_file.parent() {
                parent.to_path_buf()
            } else {
                std::env::current_dir().context("failed to obtain current directory")?
            };
            Ok((dir, db_file))
        } else {
            let data_dir = Self::resolve_db_path(path)?;
            Ok((data_dir.clone(), data_dir.join(Self::SQLITE_FILE_NAME)))
        }
    }

    fn resolve_db_path(path: &str) -> Result<PathBuf> {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            Ok(path)
        } else {
            let cwd = std::env::current_dir().context("failed to obtain current directory")?;
            Ok(cwd.join(path))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(path: String) -> AppConfig {
        AppConfig {
            database_path: path,
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn connect_creates_file_inside_directory_path() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested");

        let database = Database::connect(&config_for(data_dir.display().to_string()))
            .await
            .unwrap();

        assert_eq!(database.database_path(), &data_dir.join("crewspace.db"));
        assert!(data_dir.join("crewspace.db").exists());
    }

    #[tokio::test]
    async fn connect_is_repeatable_on_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("custom.sqlite");
        let config = config_for(file.display().to_string());

        Database::connect(&config).await.unwrap();
        let reopened = Database::connect(&config).await.unwrap();

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'workspaces', 'workspace_members', 'notifications')",
        )
        .fetch_one(reopened.pool())
        .await
        .unwrap();
        assert_eq!(tables, 4);
    }
}
