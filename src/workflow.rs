//! Caller-side orchestration: regenerate a teacher's clusters and customize a question
//! for every approved cluster.

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clustering::{ungrouped_advisory, ClusteringEngine, ClusteringOptions, ClusteringResult};
use crate::customization::{ClusterProfile, CustomizationOptions, CustomizationOutcome, QuestionCustomizer};
use crate::db::{ClusteringJob, Database};
use crate::TARGET_CLUSTERING;

/// What a regeneration run produced and stored
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationReport {
    pub run_id: String,
    pub cluster_ids: Vec<i64>,
    pub result: ClusteringResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

/// Customization result for one approved cluster
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCustomization {
    pub cluster_id: i64,
    pub cluster_name: String,
    pub outcome: CustomizationOutcome,
    pub question_id: Option<i64>,
}

/// Regenerates a teacher's clusters with the built-in strategies.
///
/// See [`regenerate_clusters_with`].
pub async fn regenerate_clusters(
    db: &Database,
    teacher_id: &str,
    options: &ClusteringOptions,
) -> Result<RegenerationReport> {
    regenerate_clusters_with(db, &ClusteringEngine::new(), teacher_id, options).await
}

/// Loads the teacher's roster, clusters it, replaces the stored clusters and logs the run.
///
/// # Arguments
///
/// * `db` - Record store holding the roster.
/// * `engine` - Engine to run, possibly carrying a custom strategy.
/// * `teacher_id` - Whose roster and clusters to use.
/// * `options` - Strategy and size bounds for this run.
///
/// # Returns
///
/// The report, with an advisory message when some students could not be grouped.
pub async fn regenerate_clusters_with(
    db: &Database,
    engine: &ClusteringEngine,
    teacher_id: &str,
    options: &ClusteringOptions,
) -> Result<RegenerationReport> {
    let students = db.students_for_teacher(teacher_id).await?;
    info!(
        target: TARGET_CLUSTERING,
        "Regenerating clusters for teacher {} from {} students using {}",
        teacher_id,
        students.len(),
        options.strategy
    );

    let result = engine.cluster(&students, options);
    let cluster_ids = db.replace_clusters(teacher_id, &result).await?;

    let job = ClusteringJob {
        run_id: Uuid::new_v4().to_string(),
        teacher_id: teacher_id.to_string(),
        options: options.clone(),
        summary: result.summary.clone(),
        created_at: Utc::now().to_rfc3339(),
    };
    db.log_clustering_job(&job).await?;

    let advisory = ungrouped_advisory(&result.summary);
    if let Some(message) = &advisory {
        info!(target: TARGET_CLUSTERING, "Teacher {}: {}", teacher_id, message);
    }

    Ok(RegenerationReport {
        run_id: job.run_id,
        cluster_ids,
        result,
        advisory,
    })
}

/// Customizes `question` for each of the teacher's approved clusters concurrently.
///
/// Successful outcomes are stored. A failure for one cluster is reported in its entry and
/// does not stop the others.
pub async fn customize_for_approved_clusters(
    db: &Database,
    customizer: &dyn QuestionCustomizer,
    teacher_id: &str,
    question: &str,
    options: &CustomizationOptions,
) -> Result<Vec<ClusterCustomization>> {
    let clusters = db.approved_clusters_for_teacher(teacher_id).await?;
    if clusters.is_empty() {
        warn!(target: TARGET_CLUSTERING, "Teacher {} has no approved clusters", teacher_id);
        return Ok(Vec::new());
    }

    let tasks = clusters.iter().map(|cluster| async move {
        let profile = ClusterProfile::from(cluster);
        let outcome = customizer.customize(question, &profile, options).await;

        let question_id = match db.save_customized_question(cluster.id, question, &outcome).await {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    target: TARGET_CLUSTERING,
                    "Failed to store customized question for cluster {}: {}", cluster.id, e
                );
                None
            }
        };

        ClusterCustomization {
            cluster_id: cluster.id,
            cluster_name: cluster.name.clone(),
            outcome,
            question_id,
        }
    });

    let results = join_all(tasks).await;

    let succeeded = results.iter().filter(|r| r.outcome.success).count();
    info!(
        target: TARGET_CLUSTERING,
        "Customized question for {}/{} approved clusters of teacher {}",
        succeeded,
        results.len(),
        teacher_id
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::{AcademicLevel, ClusteringStrategy, Student};
    use async_trait::async_trait;

    struct EchoCustomizer;

    #[async_trait]
    impl QuestionCustomizer for EchoCustomizer {
        async fn customize(
            &self,
            question: &str,
            profile: &ClusterProfile,
            _options: &CustomizationOptions,
        ) -> CustomizationOutcome {
            if profile.major == "Art" {
                return CustomizationOutcome::failure("model unavailable");
            }
            CustomizationOutcome {
                customized_text: format!("{} ({})", question, profile.major),
                context: String::new(),
                tokens_used: 100,
                cost: 0.01,
                success: true,
                error: None,
            }
        }
    }

    async fn seeded() -> (tempfile::TempDir, Database) {
        let (dir, db) = Database::open_temp().await;
        let mut students: Vec<Student> = (0..6)
            .map(|i| {
                Student::new(&format!("cs{}", i), "Computer Science", AcademicLevel::Junior)
                    .with_gpa(3.2)
            })
            .collect();
        students.extend(
            (0..3).map(|i| Student::new(&format!("art{}", i), "Art", AcademicLevel::Senior)),
        );
        students.push(Student::new("lone", "Physics", AcademicLevel::Freshman));
        db.upsert_students("t1", &students).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_regenerate_persists_and_logs() {
        let (_dir, db) = seeded().await;
        let options = ClusteringOptions {
            gpa_weight: Some(0.7),
            ..ClusteringOptions::new(ClusteringStrategy::MajorLevel, 3, 10)
        };

        let report = regenerate_clusters(&db, "t1", &options).await.unwrap();
        assert_eq!(report.cluster_ids.len(), 2);
        assert_eq!(report.result.summary.ungrouped_students, 1);
        assert_eq!(report.advisory.as_deref(), Some("1 student could not be grouped"));

        let stored = db.clusters_for_teacher("t1").await.unwrap();
        assert_eq!(stored.len(), 2);

        let jobs = db.recent_jobs("t1", 5).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].run_id, report.run_id);
        assert_eq!(jobs[0].summary, report.result.summary);
        assert_eq!(jobs[0].options, options);
        assert_eq!(jobs[0].options.gpa_weight, Some(0.7));
    }

    #[tokio::test]
    async fn test_customize_reports_each_cluster() {
        let (_dir, db) = seeded().await;
        let options = ClusteringOptions::new(ClusteringStrategy::MajorLevel, 3, 10);
        let report = regenerate_clusters(&db, "t1", &options).await.unwrap();

        // Nothing approved yet
        let none = customize_for_approved_clusters(
            &db,
            &EchoCustomizer,
            "t1",
            "Explain recursion.",
            &CustomizationOptions::default(),
        )
        .await
        .unwrap();
        assert!(none.is_empty());

        for id in &report.cluster_ids {
            db.set_cluster_approved(*id, true).await.unwrap();
        }

        let results = customize_for_approved_clusters(
            &db,
            &EchoCustomizer,
            "t1",
            "Explain recursion.",
            &CustomizationOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 2);

        let cs = &results[0];
        assert!(cs.outcome.success);
        assert!(cs.question_id.is_some());
        assert_eq!(cs.outcome.customized_text, "Explain recursion. (Computer Science)");

        let art = &results[1];
        assert!(!art.outcome.success);
        assert!(art.question_id.is_none());

        assert_eq!(
            db.customized_questions_for_cluster(cs.cluster_id).await.unwrap().len(),
            1
        );
        assert!(db
            .customized_questions_for_cluster(art.cluster_id)
            .await
            .unwrap()
            .is_empty());
    }
}
