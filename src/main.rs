mod api;
mod app;
mod cli;
mod config;
mod context;
mod error;
mod git;
mod observers;
mod proctor;
mod state_machine;
mod store;
mod submission;
mod timer;
mod ui;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tokio::runtime::Handle;
use tracing::Level;

use app::{App, WatchExit};
use cli::{Cli, Command};
use config::ExamConfig;
use error::SubmitMode;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli.command).await {
        ui::warn(&format!("{err:#}"));
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    let config = ExamConfig::load()?;
    let mut app = App::new(config, Handle::current())?;

    match command {
        Command::Login { token } => {
            let drives = app.login(&token).await?;
            ui::print_drives(&drives);
        }
        Command::Logout => app.logout()?,
        Command::Drives => ui::print_drives(&app.drives().await?),
        Command::Exams { drive } => ui::print_exams(&app.exams(&drive).await?),
        Command::Start {
            drive,
            exam,
            duration_minutes,
            template,
        } => {
            let workspace = app
                .start_exam(&drive, &exam, duration_minutes, template.as_deref())
                .await?;
            println!("  Workspace: {}", workspace.display());
            println!("  Run `exam-proctor watch` to keep proctoring and submit on time.");
        }
        Command::Status => {
            let report = app.status()?;
            ui::print_status(report.state, report.exam_id.as_deref(), report.remaining);
        }
        Command::Submit => {
            let outcome = app.submit(SubmitMode::Manual).await?;
            ui::print_outcome(&outcome, SubmitMode::Manual);
        }
        Command::Watch => {
            let stdin = BufReader::new(tokio::io::stdin());
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            match app.watch(stdin, shutdown).await? {
                WatchExit::Submitted { mode, outcome } => ui::print_outcome(&outcome, mode),
                WatchExit::Interrupted => {
                    println!("  Exam still in progress. Run `exam-proctor watch` again to resume.");
                }
            }
        }
    }

    Ok(())
}
