use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use evaluation_analytics::config::AnalyticsConfig;
use evaluation_analytics::grades::{aggregate, GradeFilter};
use evaluation_analytics::models::QuestionCategory;
use evaluation_analytics::sheet::{self, EvaluationContext};
use evaluation_analytics::{report, QuestionBank, ThematicClusterer};

#[derive(Parser)]
#[command(name = "evaluation-analytics")]
#[command(about = "Grade distributions and course/guest evaluation themes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    Course,
    Guest,
}

impl From<Category> for QuestionCategory {
    fn from(value: Category) -> Self {
        match value {
            Category::Course => QuestionCategory::Course,
            Category::Guest => QuestionCategory::Guest,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a grade distribution report from a grade CSV
    Grades {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long, default_value = "grade_report.md")]
        out: PathBuf,
        /// Also write raw_grades.csv and grade_metrics.csv here
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Print the report as JSON instead of writing markdown
        #[arg(long)]
        json: bool,
    },
    /// Summarize an evaluation export: Likert averages and response themes
    Evaluation {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, value_enum)]
        category: Category,
        #[arg(long)]
        course: String,
        #[arg(long)]
        semester: String,
        #[arg(long)]
        year: String,
        #[arg(long)]
        guest: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        keywords: Option<usize>,
        #[arg(long, default_value = "evaluation_report.md")]
        out: PathBuf,
        /// Also write evaluation_report.csv here
        #[arg(long)]
        export_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Group free-text responses, one per line, into themes
    Themes {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        keywords: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Grades {
            csv,
            student,
            course,
            year,
            out,
            export_dir,
            json,
        } => {
            let records = sheet::read_grades_file(&csv)?;
            let filter = GradeFilter {
                student_id: student,
                course_id: course,
                academic_year_id: year,
            };
            let selected = filter.apply(&records);
            info!(
                imported = records.len(),
                selected = selected.len(),
                "selected grade rows"
            );
            let grade_report = aggregate(&selected);

            if let Some(dir) = export_dir {
                ensure_dir(&dir)?;
                sheet::export_table(
                    &dir.join("raw_grades.csv"),
                    &report::raw_grades_table(&grade_report),
                )?;
                sheet::export_table(
                    &dir.join("grade_metrics.csv"),
                    &report::grade_metrics_table(&grade_report),
                )?;
                println!("Grade tables written to {}.", dir.display());
            }

            if json {
                print_json(&grade_report)?;
            } else {
                let scope = describe_grade_scope(&filter);
                let markdown = report::render_grade_report(&grade_report, scope.as_deref(), today);
                std::fs::write(&out, markdown)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Evaluation {
            csv,
            category,
            course,
            semester,
            year,
            guest,
            config,
            threshold,
            keywords,
            out,
            export_dir,
            json,
        } => {
            let config = load_config(config.as_deref(), threshold, keywords)?;
            let context = EvaluationContext {
                category: category.into(),
                course_id: course,
                semester_id: semester,
                academic_year_id: year,
                guest_id: guest,
            };
            let mut bank = QuestionBank::new();
            let instances =
                sheet::read_evaluations_file(&csv, &config.schema, &context, &mut bank)?;
            let evaluation =
                report::assemble_evaluation(&bank, &instances, context.category, &config)?;

            if let Some(dir) = export_dir {
                ensure_dir(&dir)?;
                sheet::export_table(
                    &dir.join("evaluation_report.csv"),
                    &report::evaluation_table(&evaluation, config.likert_precision),
                )?;
                println!("Evaluation table written to {}.", dir.display());
            }

            if json {
                print_json(&evaluation)?;
            } else {
                let scope = match &context.guest_id {
                    Some(guest) => format!(
                        "guest {} in {} ({}, {})",
                        guest, context.course_id, context.semester_id, context.academic_year_id
                    ),
                    None => format!(
                        "{} ({}, {})",
                        context.course_id, context.semester_id, context.academic_year_id
                    ),
                };
                let markdown =
                    report::render_evaluation_report(&evaluation, &scope, today, &config);
                std::fs::write(&out, markdown)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Themes {
            input,
            config,
            threshold,
            keywords,
            json,
        } => {
            let config = load_config(config.as_deref(), threshold, keywords)?;
            let raw = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let responses: Vec<&str> = raw.lines().collect();
            let outcome = ThematicClusterer::new(config.cluster)?.cluster(&responses);

            if json {
                print_json(&outcome.clusters)?;
            } else if outcome.clusters.is_empty() {
                println!("No themes found in {} responses.", responses.len());
            } else {
                println!(
                    "{} themes across {} responses ({} without content):",
                    outcome.clusters.len(),
                    responses.len(),
                    outcome.no_content
                );
                for cluster in &outcome.clusters {
                    println!("- {} [{}]", cluster.summary, cluster.keywords.join(", "));
                }
            }
        }
    }

    Ok(())
}

fn load_config(
    path: Option<&Path>,
    threshold: Option<f64>,
    keywords: Option<usize>,
) -> anyhow::Result<AnalyticsConfig> {
    let config = match path {
        Some(path) => AnalyticsConfig::load(path)?,
        None => AnalyticsConfig::default(),
    };
    Ok(config.with_overrides(threshold, keywords)?)
}

fn describe_grade_scope(filter: &GradeFilter) -> Option<String> {
    let parts: Vec<String> = [
        ("student", &filter.student_id),
        ("course", &filter.course_id),
        ("academic year", &filter.academic_year_id),
    ]
    .into_iter()
    .filter_map(|(label, value)| match value.as_deref() {
        None | Some("*") | Some("") => None,
        Some(value) => Some(format!("{label} {value}")),
    })
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
