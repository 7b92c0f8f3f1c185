use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod aggregate;
mod config;
mod db;
mod error;
mod export;
mod filter;
mod models;
mod report;
mod seed;
mod store;

use config::{Config, LogFormat};
use error::InsightsError;
use filter::{ActivityFilter, FilterParams, Viewer};
use models::{
    ActivityRecord, ClassBreakdown, DailyActivity, Teacher, TeacherDetail, TeacherSummary,
};
use store::{MemoryStore, RecordStore};

#[derive(Parser)]
#[command(name = "teacher-activity-insights")]
#[command(about = "Lesson plan, quiz and question paper insights for school admins", long_about = None)]
struct Cli {
    /// Use the built-in demo dataset instead of Postgres
    #[arg(long, global = true)]
    demo: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Run as this teacher; results are limited to their own activity
    #[arg(long, global = true)]
    as_teacher: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Grade from 1 to 12, or "all"
    #[arg(long)]
    grade: Option<String>,
    /// Subject name, or "all"
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    teacher_id: Option<String>,
    /// Only include activity from the last N days
    #[arg(long)]
    since_days: Option<i64>,
    /// End of the --since-days window (defaults to now, UTC)
    #[arg(long, value_parser = models::parse_timestamp, requires = "since_days")]
    as_of: Option<NaiveDateTime>,
}

impl FilterArgs {
    fn resolve(self, viewer: &Viewer) -> Result<ActivityFilter, InsightsError> {
        let params = FilterParams {
            grade: self.grade,
            subject: self.subject,
            teacher_id: self.teacher_id,
            since_days: self.since_days,
            as_of: self.as_of,
        };
        Ok(params.validate(Utc::now().naive_utc())?.scoped_to(viewer))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the demo dataset into Postgres
    Seed,
    /// Import activities from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Per-teacher activity summaries
    Teachers {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// One teacher's summary, classes, daily activity and activity log
    Teacher {
        id: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Activity counts per class
    Classes {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Activity counts per day
    Daily {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Totals and rankings across all teachers
    Insights {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Most recent activities
    Activities {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Export activities as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Write the CSV to stdout instead of a file
        #[arg(long)]
        stdout: bool,
    },
    /// Generate a markdown report (markdown only; --json is rejected)
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "teacher_activity_insights=info".into());

    // stdout carries CSV and JSON output, so logs go to stderr.
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let viewer = match cli.as_teacher {
        Some(id) => Viewer::Teacher(id),
        None => Viewer::Admin,
    };

    if cli.demo {
        if matches!(
            cli.command,
            Commands::InitDb | Commands::Seed | Commands::Import { .. }
        ) {
            anyhow::bail!("init-db, seed and import need Postgres; drop --demo");
        }
        tracing::info!("using built-in demo dataset");
        let store = MemoryStore::demo()?;
        return run(&store, &viewer, cli.command, cli.json).await;
    }

    let database_url = config.require_database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = db::PgStore::new(pool);

    match cli.command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(store.pool()).await?;
            println!("Seed data inserted ({inserted} new activities).");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(store.pool(), &csv).await?;
            println!("Inserted {inserted} activities from {}.", csv.display());
        }
        command => run(&store, &viewer, command, cli.json).await?,
    }

    Ok(())
}

/// Fetches a fresh snapshot and drops replayed facts.
async fn snapshot<S: RecordStore>(
    store: &S,
    filter: &ActivityFilter,
) -> anyhow::Result<Vec<ActivityRecord>> {
    let fetched = store.query(filter).await?;
    let records = aggregate::dedup(&fetched);
    tracing::debug!(
        fetched = fetched.len(),
        unique = records.len(),
        filter = %filter.describe(),
        "loaded activity snapshot"
    );
    Ok(records)
}

/// Resolves the filter's teacher, so an unknown id fails instead of reading as zero activity.
async fn known_teacher<S: RecordStore>(
    store: &S,
    filter: &ActivityFilter,
) -> anyhow::Result<Option<Teacher>> {
    let Some(id) = filter.teacher_id.as_deref() else {
        return Ok(None);
    };
    let teacher = store
        .find_teacher(id)
        .await?
        .ok_or_else(|| InsightsError::TeacherNotFound(id.to_string()))?;
    Ok(Some(teacher))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_summary(summary: &TeacherSummary) {
    let grades: Vec<String> = summary.grades.iter().map(|g| g.to_string()).collect();
    println!(
        "- {} ({}) {} activities: {} lessons, {} quizzes, {} assessments; classes {}; subjects {}",
        summary.teacher_name,
        summary.teacher_id,
        summary.total_activities,
        summary.counts.lessons,
        summary.counts.quizzes,
        summary.counts.assessments,
        if grades.is_empty() { "-".to_string() } else { grades.join(", ") },
        if summary.subjects.is_empty() { "-".to_string() } else { summary.subjects.join(", ") },
    );
}

fn print_class(class: &ClassBreakdown) {
    println!(
        "- {}: {} lessons, {} quizzes, {} assessments ({} total)",
        class.class_name,
        class.counts.lessons,
        class.counts.quizzes,
        class.counts.assessments,
        class.total
    );
}

fn print_day(day: &DailyActivity) {
    println!(
        "- {}: {} lessons, {} quizzes, {} assessments",
        day.date, day.counts.lessons, day.counts.quizzes, day.counts.assessments
    );
}

fn print_activity(record: &ActivityRecord) {
    println!(
        "- {} {} | {} | {} | {}",
        record.created_at_display(),
        record.teacher_name,
        record.grade.class_name(),
        record.subject,
        record.activity_type
    );
}

async fn run<S: RecordStore>(
    store: &S,
    viewer: &Viewer,
    command: Commands,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        Commands::InitDb | Commands::Seed | Commands::Import { .. } => {
            anyhow::bail!("this command needs a Postgres connection");
        }
        Commands::Teachers { filters } => {
            let filter = filters.resolve(viewer)?;
            known_teacher(store, &filter).await?;
            let records = snapshot(store, &filter).await?;
            let summaries = aggregate::teacher_summaries(&records);

            if json {
                return print_json(&summaries);
            }
            if summaries.is_empty() {
                println!("No activity found for {}.", filter.describe());
                return Ok(());
            }
            println!("Teachers ({}):", filter.describe());
            for summary in summaries.iter() {
                print_summary(summary);
            }
        }
        Commands::Teacher { id, filters } => {
            if let Viewer::Teacher(own) = viewer {
                if own != &id {
                    anyhow::bail!("teacher {own} cannot view activity for {id}");
                }
            }
            let teacher = store
                .find_teacher(&id)
                .await?
                .ok_or_else(|| InsightsError::TeacherNotFound(id.clone()))?;
            let filter = filters.resolve(viewer)?.for_teacher(id.clone());
            let records = snapshot(store, &filter).await?;

            let detail = TeacherDetail {
                teacher: aggregate::teacher_by_id(&records, &id)
                    .unwrap_or_else(|| TeacherSummary::empty(&teacher)),
                class_breakdown: aggregate::class_breakdown(&records, Some(id.as_str())),
                daily_activity: aggregate::daily_activity(&records, Some(id.as_str())),
                activities: aggregate::activities_for_teacher(&records, &id),
            };

            if json {
                return print_json(&detail);
            }
            print_summary(&detail.teacher);
            println!();
            println!("Classes:");
            detail.class_breakdown.iter().for_each(print_class);
            println!();
            println!("Daily activity:");
            detail.daily_activity.iter().for_each(print_day);
            println!();
            println!("Activity log:");
            for record in detail.activities.iter() {
                print_activity(record);
            }
        }
        Commands::Classes { filters } => {
            let filter = filters.resolve(viewer)?;
            known_teacher(store, &filter).await?;
            let records = snapshot(store, &filter).await?;
            let classes = aggregate::class_breakdown(&records, filter.teacher_id.as_deref());

            if json {
                return print_json(&classes);
            }
            if classes.is_empty() {
                println!("No activity found for {}.", filter.describe());
            }
            classes.iter().for_each(print_class);
        }
        Commands::Daily { filters } => {
            let filter = filters.resolve(viewer)?;
            known_teacher(store, &filter).await?;
            let records = snapshot(store, &filter).await?;
            let days = aggregate::daily_activity(&records, filter.teacher_id.as_deref());

            if json {
                return print_json(&days);
            }
            if days.is_empty() {
                println!("No activity found for {}.", filter.describe());
            }
            days.iter().for_each(print_day);
        }
        Commands::Insights { filters } => {
            let filter = filters.resolve(viewer)?;
            known_teacher(store, &filter).await?;
            let records = snapshot(store, &filter).await?;
            let insights = aggregate::global_insights(&records);

            if json {
                return print_json(&insights);
            }
            println!("Insights for {}:", filter.describe());
            println!(
                "- {} active teachers, {} lessons, {} quizzes, {} assessments ({}% lessons)",
                insights.active_teachers,
                insights.total_lessons,
                insights.total_quizzes,
                insights.total_assessments,
                insights.lesson_share_percent
            );
            for line in report::pulse_lines(&insights) {
                println!("- {line}");
            }
        }
        Commands::Activities { filters, limit } => {
            let filter = filters.resolve(viewer)?;
            known_teacher(store, &filter).await?;
            let records = snapshot(store, &filter).await?;
            let recent = aggregate::recent_activities(&records, limit);

            if json {
                return print_json(&recent);
            }
            if recent.is_empty() {
                println!("No activity found for {}.", filter.describe());
            }
            for record in recent.iter() {
                print_activity(record);
            }
        }
        Commands::Export {
            filters,
            out_dir,
            stdout,
        } => {
            let filter = filters.resolve(viewer)?;
            let teacher_name = known_teacher(store, &filter).await?.map(|t| t.name);
            let records = aggregate::newest_first(&snapshot(store, &filter).await?);
            let csv = export::to_csv(&records)?;

            if stdout {
                print!("{csv}");
                return Ok(());
            }
            let path = out_dir.join(export::export_filename(teacher_name.as_deref()));
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(rows = records.len(), path = %path.display(), "exported activities");
            println!("Exported {} activities to {}.", records.len(), path.display());
        }
        Commands::Report { filters, out } => {
            if json {
                anyhow::bail!("report writes markdown; --json is not supported");
            }
            let filter = filters.resolve(viewer)?;
            known_teacher(store, &filter).await?;
            let records = snapshot(store, &filter).await?;
            let report = report::build_report(&filter, &records);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_filters_and_globals() {
        let cli = Cli::try_parse_from([
            "teacher-activity-insights",
            "--demo",
            "teachers",
            "--grade",
            "8",
            "--since-days",
            "7",
            "--as-of",
            "2026-02-18 12:00:00",
        ])
        .expect("valid arguments");
        assert!(cli.demo);
        let Commands::Teachers { filters } = cli.command else {
            panic!("expected teachers command");
        };
        let filter = filters.resolve(&Viewer::Admin).expect("valid filter");
        assert_eq!(filter.grade.map(|g| g.value()), Some(8));
        assert_eq!(filter.window.map(|w| w.days), Some(7));
    }

    #[test]
    fn invalid_grade_fails_before_querying() {
        let filters = FilterArgs {
            grade: Some("eighth".to_string()),
            ..FilterArgs::default()
        };
        assert!(matches!(
            filters.resolve(&Viewer::Admin),
            Err(InsightsError::InvalidGrade(_))
        ));
    }

    #[tokio::test]
    async fn unknown_teacher_is_not_found() {
        let store = MemoryStore::demo().expect("demo store");
        let result = run(
            &store,
            &Viewer::Admin,
            Commands::Teacher {
                id: "T404".to_string(),
                filters: FilterArgs::default(),
            },
            true,
        )
        .await;
        let err = result.expect_err("unknown teacher");
        assert!(matches!(
            err.downcast_ref::<InsightsError>(),
            Some(InsightsError::TeacherNotFound(id)) if id == "T404"
        ));
    }

    fn assert_not_found(result: anyhow::Result<()>, expected: &str) {
        let err = result.expect_err("unknown teacher");
        assert!(matches!(
            err.downcast_ref::<InsightsError>(),
            Some(InsightsError::TeacherNotFound(id)) if id == expected
        ));
    }

    fn for_teacher(id: &str) -> FilterArgs {
        FilterArgs {
            teacher_id: Some(id.to_string()),
            ..FilterArgs::default()
        }
    }

    #[tokio::test]
    async fn unknown_teacher_filter_is_not_found_for_listings() {
        let store = MemoryStore::demo().expect("demo store");

        let activities = Commands::Activities {
            filters: for_teacher("T404"),
            limit: 20,
        };
        assert_not_found(run(&store, &Viewer::Admin, activities, true).await, "T404");

        let classes = Commands::Classes {
            filters: for_teacher("T404"),
        };
        assert_not_found(run(&store, &Viewer::Admin, classes, true).await, "T404");

        let daily = Commands::Daily {
            filters: FilterArgs::default(),
        };
        let viewer = Viewer::Teacher("T404".to_string());
        assert_not_found(run(&store, &viewer, daily, true).await, "T404");
    }

    #[tokio::test]
    async fn known_teacher_with_no_matches_is_not_an_error() {
        let store = MemoryStore::demo().expect("demo store");
        let filters = FilterArgs {
            grade: Some("12".to_string()),
            ..for_teacher("T001")
        };
        let result = run(&store, &Viewer::Admin, Commands::Classes { filters }, true).await;
        assert!(result.is_ok());
    }

    #[test]
    fn as_of_requires_since_days() {
        let result = Cli::try_parse_from([
            "teacher-activity-insights",
            "teachers",
            "--as-of",
            "2026-02-18 12:00:00",
        ]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn report_rejects_json_output() {
        let store = MemoryStore::demo().expect("demo store");
        let out = std::env::temp_dir().join("teacher-activity-insights-json-report.md");
        let result = run(
            &store,
            &Viewer::Admin,
            Commands::Report {
                filters: FilterArgs::default(),
                out: out.clone(),
            },
            true,
        )
        .await;
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn teacher_viewer_cannot_open_other_teachers() {
        let store = MemoryStore::demo().expect("demo store");
        let result = run(
            &store,
            &Viewer::Teacher("T001".to_string()),
            Commands::Teacher {
                id: "T002".to_string(),
                filters: FilterArgs::default(),
            },
            true,
        )
        .await;
        assert!(result.is_err());
    }
}
