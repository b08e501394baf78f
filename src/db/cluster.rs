use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::core::Database;
use crate::clustering::{Cluster, ClusterCharacteristics, ClusterCriteria, ClusteringResult};
use crate::db::Row;
use crate::TARGET_DB;

/// A persisted cluster row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCluster {
    pub id: i64,
    pub teacher_id: String,
    pub name: String,
    pub description: String,
    pub characteristics: ClusterCharacteristics,
    pub criteria: ClusterCriteria,
    pub student_count: i64,
    pub approved: bool,
    pub created_at: String,
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

fn decode_json<T: for<'de> Deserialize<'de>>(column: &str, raw: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn stored_cluster_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredCluster, sqlx::Error> {
    let characteristics: String = row.get("characteristics");
    let criteria: String = row.get("criteria");

    Ok(StoredCluster {
        id: row.get("id"),
        teacher_id: row.get("teacher_id"),
        name: row.get("name"),
        description: row.get("description"),
        characteristics: decode_json("characteristics", &characteristics)?,
        criteria: decode_json("criteria", &criteria)?,
        student_count: row.get("student_count"),
        approved: row.get("approved"),
        created_at: row.get("created_at"),
    })
}

impl Database {
    /// Replaces a teacher's clusters with the result of a new run.
    ///
    /// Runs in one transaction: the teacher's previous clusters and memberships are
    /// deleted, then every new cluster and one membership row per assigned student are
    /// inserted. Returns the new cluster ids in result order.
    pub async fn replace_clusters(
        &self,
        teacher_id: &str,
        result: &ClusteringResult,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut transaction = self.pool().begin().await?;

        sqlx::query("DELETE FROM cluster_members WHERE teacher_id = ?")
            .bind(teacher_id)
            .execute(&mut *transaction)
            .await?;
        let removed = sqlx::query("DELETE FROM student_clusters WHERE teacher_id = ?")
            .bind(teacher_id)
            .execute(&mut *transaction)
            .await?
            .rows_affected();

        let mut cluster_ids = Vec::with_capacity(result.clusters.len());

        for cluster in &result.clusters {
            let cluster_id = insert_cluster(&mut transaction, teacher_id, cluster, &now).await?;

            for student_id in &cluster.student_ids {
                sqlx::query(
                    r#"
                    INSERT INTO cluster_members (cluster_id, teacher_id, student_id)
                    VALUES (?, ?, ?)
                    "#,
                )
                .bind(cluster_id)
                .bind(teacher_id)
                .bind(student_id)
                .execute(&mut *transaction)
                .await?;
            }

            cluster_ids.push(cluster_id);
        }

        transaction.commit().await?;

        info!(
            target: TARGET_DB,
            "Replaced {} clusters for teacher {} with {} new clusters",
            removed,
            teacher_id,
            cluster_ids.len()
        );

        Ok(cluster_ids)
    }

    /// All clusters stored for a teacher, in insertion order
    pub async fn clusters_for_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<StoredCluster>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, teacher_id, name, description, characteristics, criteria,
                   student_count, approved, created_at
            FROM student_clusters
            WHERE teacher_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(stored_cluster_from_row).collect()
    }

    /// Approved clusters for a teacher, the ones questions are customized for
    pub async fn approved_clusters_for_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<StoredCluster>, sqlx::Error> {
        Ok(self
            .clusters_for_teacher(teacher_id)
            .await?
            .into_iter()
            .filter(|c| c.approved)
            .collect())
    }

    pub async fn cluster_by_id(&self, cluster_id: i64) -> Result<Option<StoredCluster>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, teacher_id, name, description, characteristics, criteria,
                   student_count, approved, created_at
            FROM student_clusters
            WHERE id = ?
            "#,
        )
        .bind(cluster_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(stored_cluster_from_row).transpose()
    }

    /// Member student ids of a cluster, in assignment order
    pub async fn cluster_student_ids(&self, cluster_id: i64) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT student_id FROM cluster_members WHERE cluster_id = ? ORDER BY id ASC",
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await
    }

    /// Marks a cluster approved (or not). Returns false when the cluster does not exist.
    pub async fn set_cluster_approved(
        &self,
        cluster_id: i64,
        approved: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE student_clusters SET approved = ? WHERE id = ?")
            .bind(approved)
            .bind(cluster_id)
            .execute(self.pool())
            .await?;

        debug!(target: TARGET_DB, "Set cluster {} approved={}", cluster_id, approved);
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_cluster(
    transaction: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    teacher_id: &str,
    cluster: &Cluster,
    now: &str,
) -> Result<i64, sqlx::Error> {
    let characteristics = encode_json(&cluster.characteristics)?;
    let criteria = encode_json(&cluster.criteria)?;

    let cluster_id = sqlx::query(
        r#"
        INSERT INTO student_clusters
        (teacher_id, name, description, characteristics, criteria, student_count, approved, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(teacher_id)
    .bind(&cluster.name)
    .bind(&cluster.description)
    .bind(&characteristics)
    .bind(&criteria)
    .bind(cluster.size() as i64)
    .bind(now)
    .execute(&mut **transaction)
    .await?
    .last_insert_rowid();

    Ok(cluster_id)
}
