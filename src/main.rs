use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use cohort::clustering::{cluster, Student};
use cohort::customization::{CustomizationOptions, LlmCustomizer};
use cohort::db::Database;
use cohort::environment::Settings;
use cohort::logging::configure_logging;
use cohort::workflow::{customize_for_approved_clusters, regenerate_clusters};
use prettytable::{Cell, Row as PrettyRow, Table};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[clap(name = "cohort", about = "Group a teacher's students into clusters and tailor questions to them")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import (or update) a roster from a JSON array of students
    Import {
        #[clap(short, long)]
        teacher: String,

        /// Path to the roster JSON file
        #[clap(required = true)]
        roster: PathBuf,

        /// Drop the existing roster before importing
        #[clap(long)]
        replace: bool,
    },

    /// Regenerate clusters for a teacher
    Cluster {
        #[clap(short, long)]
        teacher: String,

        /// major_level, gpa_interests or custom (defaults to CLUSTER_STRATEGY)
        #[clap(short, long)]
        strategy: Option<String>,

        /// Maximum cluster size
        #[clap(long)]
        max: Option<usize>,

        /// Minimum cluster size
        #[clap(long)]
        min: Option<usize>,

        /// Recorded with the run; no strategy weights by it yet
        #[clap(long)]
        gpa_weight: Option<f64>,

        /// Recorded with the run; no strategy weights by it yet
        #[clap(long)]
        interest_weight: Option<f64>,

        /// Show the result without storing it
        #[clap(long)]
        dry_run: bool,

        /// Print the result as JSON
        #[clap(long)]
        json: bool,
    },

    /// List stored clusters for a teacher
    List {
        #[clap(short, long)]
        teacher: String,
    },

    /// Show the students assigned to a cluster
    Members {
        #[clap(required = true)]
        cluster_id: i64,
    },

    /// Approve a cluster for question customization
    Approve {
        #[clap(required = true)]
        cluster_id: i64,

        /// Withdraw a previous approval
        #[clap(long)]
        revoke: bool,
    },

    /// Show recent clustering runs for a teacher
    Jobs {
        #[clap(short, long)]
        teacher: String,

        #[clap(short, long, default_value = "10")]
        limit: i64,
    },

    /// Customize a question for every approved cluster of a teacher
    Customize {
        #[clap(short, long)]
        teacher: String,

        #[clap(required = true)]
        question: String,

        /// Allow the model to adjust difficulty
        #[clap(long)]
        adjust_difficulty: bool,
    },

    /// Show row counts (students:clusters:members:jobs:questions)
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = Settings::from_env();
    configure_logging(&settings.log_dir);

    let db = Database::new(&settings.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", settings.database_path))?;

    match args.command {
        Commands::Import {
            teacher,
            roster,
            replace,
        } => import_roster(&db, &teacher, &roster, replace).await?,
        Commands::Cluster {
            teacher,
            strategy,
            max,
            min,
            gpa_weight,
            interest_weight,
            dry_run,
            json,
        } => {
            let mut options = settings.clustering_options(strategy.as_deref())?;
            if gpa_weight.is_some() {
                options.gpa_weight = gpa_weight;
            }
            if interest_weight.is_some() {
                options.interest_weight = interest_weight;
            }
            if let Some(max) = max {
                options.max_cluster_size = max;
            }
            if let Some(min) = min {
                options.min_cluster_size = min;
            }
            if options.min_cluster_size > options.max_cluster_size {
                return Err(anyhow!(
                    "--min ({}) must not exceed --max ({})",
                    options.min_cluster_size,
                    options.max_cluster_size
                ));
            }

            if dry_run {
                let students = db.students_for_teacher(&teacher).await?;
                let result = cluster(&students, &options);
                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    print_result_table(&result.clusters);
                    print_summary(&result.summary);
                }
            } else {
                let report = regenerate_clusters(&db, &teacher, &options).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    println!("Run {}", report.run_id);
                    print_result_table(&report.result.clusters);
                    print_summary(&report.result.summary);
                    if let Some(advisory) = report.advisory {
                        println!("⚠️  {}", advisory);
                    }
                }
            }
        }
        Commands::List { teacher } => list_clusters(&db, &teacher).await?,
        Commands::Members { cluster_id } => show_members(&db, cluster_id).await?,
        Commands::Approve { cluster_id, revoke } => {
            if db.set_cluster_approved(cluster_id, !revoke).await? {
                println!(
                    "✅ Cluster {} {}",
                    cluster_id,
                    if revoke { "unapproved" } else { "approved" }
                );
            } else {
                println!("❌ Cluster {} not found", cluster_id);
            }
        }
        Commands::Jobs { teacher, limit } => list_jobs(&db, &teacher, limit).await?,
        Commands::Stats => println!("{}", db.collect_stats().await?),
        Commands::Customize {
            teacher,
            question,
            adjust_difficulty,
        } => {
            let customizer = LlmCustomizer::new(
                settings.build_llm_client()?,
                &settings.llm_model,
                settings.cost_per_1k_tokens,
            );
            let options = CustomizationOptions {
                temperature: settings.llm_temperature,
                preserve_difficulty: !adjust_difficulty,
                ..Default::default()
            };

            let results =
                customize_for_approved_clusters(&db, &customizer, &teacher, &question, &options)
                    .await?;
            if results.is_empty() {
                println!("No approved clusters for teacher {}", teacher);
            }

            let mut total_cost = 0.0;
            for result in results {
                total_cost += result.outcome.cost;
                if result.outcome.success {
                    println!("\n✅ {} (cluster {})", result.cluster_name, result.cluster_id);
                    println!("{}", result.outcome.customized_text);
                    if !result.outcome.context.is_empty() {
                        println!("Context: {}", result.outcome.context);
                    }
                } else {
                    println!(
                        "\n❌ {} (cluster {}): {}",
                        result.cluster_name,
                        result.cluster_id,
                        result.outcome.error.unwrap_or_default()
                    );
                }
            }
            println!("\nEstimated cost: ${:.4}", total_cost);
        }
    }

    Ok(())
}

async fn import_roster(db: &Database, teacher_id: &str, path: &Path, replace: bool) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster {}", path.display()))?;
    let students: Vec<Student> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid roster JSON in {}", path.display()))?;

    let count = if replace {
        let (removed, stored) = db.replace_students(teacher_id, &students).await?;
        println!("Removed {} existing students", removed);
        stored
    } else {
        db.upsert_students(teacher_id, &students).await?
    };
    println!("Imported {} students for teacher {}", count, teacher_id);
    Ok(())
}

fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn print_result_table(clusters: &[cohort::clustering::Cluster]) {
    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("Name"),
        Cell::new("Students"),
        Cell::new("Avg GPA"),
        Cell::new("Learning Style"),
        Cell::new("Common Interests"),
    ]));

    for cluster in clusters {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&cluster.name),
            Cell::new(&cluster.size().to_string()),
            Cell::new(&format!("{:.2}", cluster.characteristics.average_gpa)),
            Cell::new(&cluster.characteristics.learning_style.to_string()),
            Cell::new(&cluster.characteristics.common_interests.join(", ")),
        ]));
    }

    table.printstd();
}

fn print_summary(summary: &cohort::clustering::ClusteringSummary) {
    println!(
        "{} clusters, {} students, average size {:.1}, {} ungrouped",
        summary.total_clusters,
        summary.total_students,
        summary.average_cluster_size,
        summary.ungrouped_students
    );
}

async fn list_clusters(db: &Database, teacher_id: &str) -> Result<()> {
    let clusters = db.clusters_for_teacher(teacher_id).await?;

    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Students"),
        Cell::new("Avg GPA"),
        Cell::new("Approved"),
        Cell::new("Created"),
    ]));

    for cluster in clusters {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&cluster.id.to_string()),
            Cell::new(&cluster.name),
            Cell::new(&cluster.student_count.to_string()),
            Cell::new(&format!("{:.2}", cluster.characteristics.average_gpa)),
            Cell::new(if cluster.approved { "yes" } else { "no" }),
            Cell::new(&format_timestamp(&cluster.created_at)),
        ]));
    }

    table.printstd();
    Ok(())
}

async fn show_members(db: &Database, cluster_id: i64) -> Result<()> {
    let Some(cluster) = db.cluster_by_id(cluster_id).await? else {
        println!("❌ Cluster {} not found", cluster_id);
        return Ok(());
    };

    println!("{} ({} students)", cluster.name, cluster.student_count);
    println!("{}", cluster.description);
    println!(
        "Learning style: {}, common interests: {}",
        cluster.characteristics.learning_style,
        cluster.characteristics.common_interests.join(", ")
    );
    for student_id in db.cluster_student_ids(cluster_id).await? {
        println!("  - {}", student_id);
    }
    Ok(())
}

async fn list_jobs(db: &Database, teacher_id: &str, limit: i64) -> Result<()> {
    let jobs = db.recent_jobs(teacher_id, limit).await?;

    let mut table = Table::new();
    table.add_row(PrettyRow::new(vec![
        Cell::new("Run"),
        Cell::new("When"),
        Cell::new("Strategy"),
        Cell::new("Clusters"),
        Cell::new("Students"),
        Cell::new("Ungrouped"),
    ]));

    for job in jobs {
        table.add_row(PrettyRow::new(vec![
            Cell::new(&job.run_id),
            Cell::new(&format_timestamp(&job.created_at)),
            Cell::new(job.options.strategy.as_str()),
            Cell::new(&job.summary.total_clusters.to_string()),
            Cell::new(&job.summary.total_students.to_string()),
            Cell::new(&job.summary.ungrouped_students.to_string()),
        ]));
    }

    table.printstd();
    Ok(())
}
