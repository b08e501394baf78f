use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::core::Database;
use crate::customization::CustomizationOutcome;
use crate::db::Row;
use crate::TARGET_DB;

/// A customized question stored against a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizedQuestion {
    pub id: i64,
    pub cluster_id: i64,
    pub question: String,
    pub customized_text: String,
    pub context: String,
    pub tokens_used: u32,
    pub cost: f64,
    pub created_at: String,
}

impl Database {
    /// Stores a successful customization. Failed outcomes are not persisted.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` for the new row, `Ok(None)` when the outcome was a failure.
    pub async fn save_customized_question(
        &self,
        cluster_id: i64,
        question: &str,
        outcome: &CustomizationOutcome,
    ) -> Result<Option<i64>, sqlx::Error> {
        if !outcome.success {
            return Ok(None);
        }

        let id = sqlx::query(
            r#"
            INSERT INTO customized_questions
            (cluster_id, question, customized_text, context, tokens_used, cost, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(cluster_id)
        .bind(question)
        .bind(&outcome.customized_text)
        .bind(&outcome.context)
        .bind(outcome.tokens_used as i64)
        .bind(outcome.cost)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        debug!(target: TARGET_DB, "Saved customized question {} for cluster {}", id, cluster_id);
        Ok(Some(id))
    }

    pub async fn customized_questions_for_cluster(
        &self,
        cluster_id: i64,
    ) -> Result<Vec<CustomizedQuestion>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, cluster_id, question, customized_text, context, tokens_used, cost, created_at
            FROM customized_questions
            WHERE cluster_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| CustomizedQuestion {
                id: row.get("id"),
                cluster_id: row.get("cluster_id"),
                question: row.get("question"),
                customized_text: row.get("customized_text"),
                context: row.get("context"),
                tokens_used: row.get::<i64, _>("tokens_used") as u32,
                cost: row.get("cost"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
