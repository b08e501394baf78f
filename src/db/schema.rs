use tracing::info;

use super::core::Database;
use crate::TARGET_DB;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                teacher_id TEXT NOT NULL,
                student_id TEXT NOT NULL,
                major TEXT NOT NULL,
                academic_level TEXT NOT NULL,
                gpa REAL,
                career_interests TEXT NOT NULL, -- JSON array
                updated_at TEXT NOT NULL,
                UNIQUE(teacher_id, student_id)
            );
            CREATE INDEX IF NOT EXISTS idx_students_teacher_id ON students (teacher_id);

            CREATE TABLE IF NOT EXISTS student_clusters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                teacher_id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                characteristics TEXT NOT NULL, -- JSON ClusterCharacteristics
                criteria TEXT NOT NULL, -- JSON ClusterCriteria
                student_count INTEGER NOT NULL,
                approved BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_student_clusters_teacher_id ON student_clusters (teacher_id);

            CREATE TABLE IF NOT EXISTS cluster_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cluster_id INTEGER NOT NULL,
                teacher_id TEXT NOT NULL,
                student_id TEXT NOT NULL,
                FOREIGN KEY (cluster_id) REFERENCES student_clusters (id) ON DELETE CASCADE,
                UNIQUE(teacher_id, student_id)
            );
            CREATE INDEX IF NOT EXISTS idx_cluster_members_cluster_id ON cluster_members (cluster_id);

            CREATE TABLE IF NOT EXISTS clustering_jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL UNIQUE,
                teacher_id TEXT NOT NULL,
                strategy TEXT NOT NULL,
                options TEXT NOT NULL, -- JSON ClusteringOptions
                total_clusters INTEGER NOT NULL,
                total_students INTEGER NOT NULL,
                average_cluster_size REAL NOT NULL,
                ungrouped_students INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_clustering_jobs_teacher_id ON clustering_jobs (teacher_id, created_at);

            CREATE TABLE IF NOT EXISTS customized_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cluster_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                customized_text TEXT NOT NULL,
                context TEXT NOT NULL,
                tokens_used INTEGER NOT NULL,
                cost REAL NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (cluster_id) REFERENCES student_clusters (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_customized_questions_cluster_id ON customized_questions (cluster_id);
            "#,
        )
        .execute(&mut *conn)
        .await?;

        info!(target: TARGET_DB, "Database schema initialized");
        Ok(())
    }
}
