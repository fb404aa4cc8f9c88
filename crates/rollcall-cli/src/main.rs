use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use rollcall_core::{
    build_gallery, dispatch_absence_notices, run_recognition, FirstBelowTolerance, SessionRecord,
};
use rollcall_store::Store;
use rollcall_vision::VisionClient;

mod commands;
mod config;
mod mail;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition classroom attendance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a student with a reference photo
    Enroll {
        /// Roll number (must be unused)
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Path to the reference photo
        #[arg(long)]
        photo: String,
    },
    /// List enrolled students
    Roster,
    /// Start a fresh attendance session for a course
    Start {
        course: String,
        /// Session date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the camera loop and mark recognized students present
    Recognize {
        course: String,
        #[arg(long)]
        date: Option<String>,
        /// Embedding distance tolerance; lower is stricter
        #[arg(long)]
        tolerance: Option<f32>,
    },
    /// Show the attendance table
    Show {
        course: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Manually set one student's status
    Mark {
        course: String,
        id: String,
        /// Mark absent instead of present
        #[arg(long)]
        absent: bool,
        #[arg(long)]
        date: Option<String>,
    },
    /// Apply the pending dispute queue to a session
    Review {
        course: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Finalize a session; no further changes are possible
    Post {
        course: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Email every absentee a notice with the dispute link
    Notify {
        course: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Inspect or clear the dispute queue
    Disputes {
        #[command(subcommand)]
        action: DisputeAction,
    },
}

#[derive(Subcommand)]
enum DisputeAction {
    List,
    Clear,
}

fn resolve_date(arg: Option<String>) -> Result<NaiveDate> {
    match arg {
        Some(s) => s
            .parse::<NaiveDate>()
            .with_context(|| format!("bad date {s:?}; expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn print_table(session: &SessionRecord) {
    println!(
        "Attendance for {} on {} [{}]",
        session.course,
        session.date,
        session.state.as_str()
    );
    println!("{:>4}  {:<24} {:<12} {}", "S.No", "Name", "Roll No", "Status");
    for entry in &session.entries {
        println!(
            "{:>4}  {:<24} {:<12} {}",
            entry.seq,
            entry.name,
            entry.person_id,
            entry.status.as_str()
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data dir {}", parent.display()))?;
    }
    let mut store = Store::open(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    match cli.command {
        Commands::Enroll { id, name, email, photo } => {
            let person = commands::enroll(&store, &id, &name, &email, &photo)?;
            println!("Enrolled {} ({})", person.name, person.id);
        }
        Commands::Roster => {
            let roster = store.roster()?;
            if roster.is_empty() {
                println!("No students enrolled");
            }
            for person in roster {
                println!("{:<12} {:<24} {}", person.id, person.name, person.email);
            }
        }
        Commands::Start { course, date } => {
            let date = resolve_date(date)?;
            let session = commands::start(&mut store, &course, date)?;
            println!(
                "Session started for {course} on {date}: {} students, all Absent",
                session.entries.len()
            );
        }
        Commands::Recognize { course, date, tolerance } => {
            let date = resolve_date(date)?;
            let tolerance = tolerance.unwrap_or(config.tolerance);
            let mut session = store.load_session(&course, date)?;
            let roster = store.roster()?;

            let stop = Arc::new(AtomicBool::new(false));
            {
                let stop = stop.clone();
                tokio::spawn(async move {
                    let _ = tokio::signal::ctrl_c().await;
                    eprintln!("stopping after the current frame...");
                    stop.store(true, Ordering::Relaxed);
                });
            }

            println!("Recognizing for {course} on {date}; press Ctrl-C to stop");
            let socket = config.vision_socket.clone();
            let (mut session, summary) = tokio::task::spawn_blocking(move || -> Result<_> {
                let mut client = VisionClient::connect(&socket)?;
                let gallery = build_gallery(&roster, &mut client)?;
                let summary = run_recognition(
                    &mut session,
                    &mut client,
                    &gallery,
                    &FirstBelowTolerance,
                    tolerance,
                    &stop,
                )?;
                Ok((session, summary))
            })
            .await??;

            store.save_session(&mut session)?;
            println!(
                "Done: {} frames, {} marked present, {} unknown sightings",
                summary.frames, summary.marked, summary.unknown_sightings
            );
            print_table(&session);
        }
        Commands::Show { course, date } => {
            let session = store.load_session(&course, resolve_date(date)?)?;
            print_table(&session);
        }
        Commands::Mark { course, id, absent, date } => {
            let date = resolve_date(date)?;
            let session = commands::mark(&mut store, &course, date, &id, !absent)?;
            println!(
                "{id} is now {}",
                session.entry(&id).map(|e| e.status.as_str()).unwrap_or("?")
            );
        }
        Commands::Review { course, date } => {
            let outcome = commands::review(&mut store, &course, resolve_date(date)?)?;
            if outcome.applied.is_empty() && outcome.unmatched.is_empty() {
                println!("No pending disputes");
            } else {
                for id in &outcome.applied {
                    println!("Marked present after dispute: {id}");
                }
                for id in &outcome.unmatched {
                    println!("No entry in this session (dropped): {id}");
                }
            }
        }
        Commands::Post { course, date } => {
            let date = resolve_date(date)?;
            commands::post(&mut store, &course, date)?;
            println!("Attendance for {course} on {date} is posted and locked");
        }
        Commands::Notify { course, date } => {
            let session = store.load_session(&course, resolve_date(date)?)?;
            let roster = store.roster()?;
            let mut mailer = mail::SmtpMailer::from_config(&config.smtp)?;
            let report =
                dispatch_absence_notices(&session, &roster, &mut mailer, &config.dispute_link);
            println!(
                "Notices: {} sent, {} failed, {} skipped",
                report.sent, report.failed, report.skipped
            );
        }
        Commands::Disputes { action } => match action {
            DisputeAction::List => {
                let disputes = store.disputes()?;
                if disputes.is_empty() {
                    println!("No pending disputes");
                }
                for d in disputes {
                    println!("{:<12} {:<12} {:<12} raised {}", d.person_id, d.course, d.date, d.raised_at);
                }
            }
            DisputeAction::Clear => {
                let cleared = store.clear_disputes()?;
                println!("Cleared {cleared} pending disputes");
            }
        },
    }

    Ok(())
}
