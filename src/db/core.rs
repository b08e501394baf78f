use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, instrument};

use crate::TARGET_DB;

/// Record store for rosters, clusters, clustering jobs and customized questions
#[derive(Clone, Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Get access to the database pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

impl Database {
    /// Opens (creating if needed) the SQLite database at `database_path` and applies the schema
    #[instrument(target = "db_query", level = "info")]
    pub async fn new(database_path: &str) -> Result<Self, sqlx::Error> {
        info!(target: TARGET_DB, "Creating database pool for: {}", database_path);

        let connect_options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", database_path))?
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        info!(target: TARGET_DB, "Database pool created");

        let db = Database { pool };
        db.initialize_schema().await?;

        Ok(db)
    }

    /// Row counts per table, joined with `:` in schema order
    pub async fn collect_stats(&self) -> Result<String, sqlx::Error> {
        let queries = [
            "SELECT COUNT(*) FROM students;",
            "SELECT COUNT(*) FROM student_clusters;",
            "SELECT COUNT(*) FROM cluster_members;",
            "SELECT COUNT(*) FROM clustering_jobs;",
            "SELECT COUNT(*) FROM customized_questions;",
        ];

        let mut results = vec![];
        for query in queries {
            let count: i64 = sqlx::query_scalar(query).fetch_one(&self.pool).await?;
            results.push(count);
        }

        Ok(results
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(":"))
    }
}

#[cfg(test)]
impl Database {
    /// Fresh database in a temporary directory that lives as long as the returned guard
    pub(crate) async fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cohort-test.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }
}
