use serde::{Deserialize, Serialize};
use tracing::debug;

use super::core::Database;
use crate::clustering::{ClusteringOptions, ClusteringSummary};
use crate::db::Row;
use crate::TARGET_DB;

/// Record of one clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringJob {
    pub run_id: String,
    pub teacher_id: String,
    pub options: ClusteringOptions,
    pub summary: ClusteringSummary,
    pub created_at: String,
}

impl Database {
    pub async fn log_clustering_job(&self, job: &ClusteringJob) -> Result<i64, sqlx::Error> {
        let options =
            serde_json::to_string(&job.options).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let id = sqlx::query(
            r#"
            INSERT INTO clustering_jobs
            (run_id, teacher_id, strategy, options, total_clusters, total_students,
             average_cluster_size, ungrouped_students, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.run_id)
        .bind(&job.teacher_id)
        .bind(job.options.strategy.as_str())
        .bind(&options)
        .bind(job.summary.total_clusters as i64)
        .bind(job.summary.total_students as i64)
        .bind(job.summary.average_cluster_size)
        .bind(job.summary.ungrouped_students as i64)
        .bind(&job.created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        debug!(target: TARGET_DB, "Logged clustering job {} for teacher {}", job.run_id, job.teacher_id);
        Ok(id)
    }

    /// Most recent clustering jobs for a teacher, newest first
    pub async fn recent_jobs(
        &self,
        teacher_id: &str,
        limit: i64,
    ) -> Result<Vec<ClusteringJob>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT run_id, teacher_id, options, total_clusters, total_students,
                   average_cluster_size, ungrouped_students, created_at
            FROM clustering_jobs
            WHERE teacher_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(teacher_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            let options: String = row.get("options");
            let options: ClusteringOptions =
                serde_json::from_str(&options).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "options".to_string(),
                    source: Box::new(e),
                })?;

            jobs.push(ClusteringJob {
                run_id: row.get("run_id"),
                teacher_id: row.get("teacher_id"),
                options,
                summary: ClusteringSummary {
                    total_clusters: row.get::<i64, _>("total_clusters") as usize,
                    total_students: row.get::<i64, _>("total_students") as usize,
                    average_cluster_size: row.get("average_cluster_size"),
                    ungrouped_students: row.get::<i64, _>("ungrouped_students") as usize,
                },
                created_at: row.get("created_at"),
            });
        }

        Ok(jobs)
    }
}
