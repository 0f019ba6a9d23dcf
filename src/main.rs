use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod db;
mod error;
mod growth;
mod models;
mod report;
mod streak;

use models::{CourseProgress, GrowthSnapshot, StudentRecord};

#[derive(Parser)]
#[command(name = "student-growth-tracker")]
#[command(about = "Learning growth index and streak tracker for students", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import assignment records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the Overall Growth Index for a student
    Score {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown growth report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "growth-report.md")]
        out: PathBuf,
    },
    /// Mark a lesson as complete
    CompleteLesson {
        #[arg(long)]
        email: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        lesson: String,
    },
    /// Mark every lesson of a course as complete
    CompleteCourse {
        #[arg(long)]
        email: String,
        #[arg(long)]
        course: String,
    },
    /// Submit quiz answers, in question order
    SubmitQuiz {
        #[arg(long)]
        email: String,
        #[arg(long)]
        quiz: String,
        #[arg(long, value_delimiter = ',')]
        answers: Vec<String>,
    },
    /// Submit an assignment
    SubmitAssignment {
        #[arg(long)]
        email: String,
        #[arg(long)]
        assignment: String,
    },
    /// Record instructor marks for an assignment
    GradeAssignment {
        #[arg(long)]
        email: String,
        #[arg(long)]
        assignment: String,
        #[arg(long)]
        marks: i32,
        #[arg(long)]
        feedback: Option<String>,
    },
    /// Record a login as a qualifying activity
    RecordLogin {
        #[arg(long)]
        email: String,
    },
}

async fn load_snapshot(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<(StudentRecord, GrowthSnapshot, Vec<CourseProgress>)> {
    let student = db::fetch_student(pool, email).await?;
    let quizzes = db::fetch_quiz_results(pool, student.id).await?;
    let assignments = db::fetch_assignments(pool, student.id).await?;
    let courses = db::fetch_course_progress(pool, student.id).await?;
    let modules = db::fetch_module_tallies(pool, student.id).await?;

    let snapshot = growth::compute_growth(
        &quizzes,
        &assignments,
        &courses,
        &modules,
        student.learning_streak,
    );
    Ok((student, snapshot, courses))
}

/// Best-effort streak bump after a qualifying activity. A failure here is
/// reported but never fails the primary action; a lost conditional update
/// means another activity already counted today. Returns the streak to show.
async fn bump_streak(pool: &PgPool, student: &StudentRecord) -> i32 {
    let now = Utc::now();
    let state = student.activity();
    let Some(updated) = streak::apply_activity_streak(&state, now) else {
        return state.learning_streak;
    };

    match db::persist_streak(pool, student.id, state.last_active_date, updated).await {
        Ok(true) => updated.learning_streak,
        Ok(false) => state.learning_streak,
        Err(err) => {
            eprintln!("warning: streak update failed: {err}");
            state.learning_streak
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} assignments from {}.", csv.display());
        }
        Commands::Score { email, json } => {
            let (student, snapshot, _) = load_snapshot(&pool, &email).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                let metrics = &snapshot.metrics;
                println!(
                    "{} <{}>: OGI {} ({})",
                    student.full_name, student.email, snapshot.ogi, snapshot.classification
                );
                println!("- quiz average: {} (weight 40%)", metrics.quiz_avg);
                println!(
                    "- assignment average: {} (weight 30%)",
                    metrics.assignment_avg
                );
                println!(
                    "- course completion: {} (weight 20%)",
                    metrics.completion_rate
                );
                println!("- consistency: {} (weight 10%)", metrics.consistency);
                println!(
                    "- quizzes {}/{}, assignments {}/{} ({} on time), streak {} days",
                    metrics.completed_quizzes,
                    metrics.total_quizzes,
                    metrics.submitted_assignments,
                    metrics.total_assignments,
                    metrics.on_time_submissions,
                    metrics.learning_streak
                );
            }
        }
        Commands::Report { email, out } => {
            let (student, snapshot, courses) = load_snapshot(&pool, &email).await?;
            let report = report::build_report(&student, &snapshot, &courses);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::CompleteLesson {
            email,
            course,
            lesson,
        } => {
            let student = db::fetch_student(&pool, &email).await?;
            let completion = db::complete_lesson(&pool, student.id, &course, &lesson).await?;

            if completion.newly_completed {
                let streak = bump_streak(&pool, &student).await;
                println!(
                    "Lesson '{lesson}' completed. {} now at {}% ({} of {} lessons), streak {streak} days.",
                    completion.course.title,
                    completion.course.progress_percentage,
                    completion.course.lessons_completed,
                    completion.course.total_lessons
                );
            } else {
                println!("Lesson '{lesson}' was already completed.");
            }
        }
        Commands::CompleteCourse { email, course } => {
            let student = db::fetch_student(&pool, &email).await?;
            let progress = db::complete_course(&pool, student.id, &course).await?;
            println!(
                "{} marked complete ({} lessons).",
                progress.title, progress.total_lessons
            );
        }
        Commands::SubmitQuiz {
            email,
            quiz,
            answers,
        } => {
            let student = db::fetch_student(&pool, &email).await?;
            let result = db::submit_quiz(&pool, student.id, &quiz, &answers).await?;
            let streak = bump_streak(&pool, &student).await;
            println!(
                "Quiz '{}' scored {}% ({} of {} correct), streak {streak} days.",
                result.title,
                result.score_percentage.unwrap_or(0),
                result.correct_answers,
                result.total_questions
            );
        }
        Commands::SubmitAssignment { email, assignment } => {
            let student = db::fetch_student(&pool, &email).await?;
            let record = db::submit_assignment(&pool, student.id, &assignment, Utc::now()).await?;
            let streak = bump_streak(&pool, &student).await;
            println!(
                "Assignment '{}' submitted ({}), streak {streak} days.",
                record.title,
                record.status.as_str()
            );
        }
        Commands::GradeAssignment {
            email,
            assignment,
            marks,
            feedback,
        } => {
            let student = db::fetch_student(&pool, &email).await?;
            let record =
                db::grade_assignment(&pool, student.id, &assignment, marks, feedback.as_deref())
                    .await?;
            println!(
                "Assignment '{}' evaluated with {} marks.",
                record.title,
                record.marks.unwrap_or(0)
            );
        }
        Commands::RecordLogin { email } => {
            let student = db::fetch_student(&pool, &email).await?;
            let streak = bump_streak(&pool, &student).await;
            println!("Login recorded for {}, streak {streak} days.", student.email);
        }
    }

    Ok(())
}
