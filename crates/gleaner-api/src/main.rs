//! Gleaner CLI entry point.
//!
//! Binary name: `glean`
//!
//! Parses CLI arguments, initializes tracing, the database and config, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands, LessonsCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = gleaner_observe::tracing_setup::init_tracing(cli.log_directive(), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let outcome = run(cli).await;
    gleaner_observe::tracing_setup::shutdown_tracing();
    outcome
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // These commands need neither the database nor config.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "glean", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Check { file } => {
            return cli::check::check(file.as_deref(), cli.json).await;
        }
        _ => {}
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Evaluate { file } => {
            cli::evaluate::evaluate(&state, file.as_deref(), cli.json).await?;
        }

        Commands::Lessons { action } => match action {
            LessonsCommand::List { room, limit } => {
                cli::lessons::list_lessons(&state, room, limit, cli.json).await?;
            }
            LessonsCommand::Delete { id, force } => {
                cli::lessons::delete_lesson(&state, id, force, cli.json).await?;
            }
            LessonsCommand::Forget { room, force } => {
                cli::lessons::forget(&state, room, force, cli.json).await?;
            }
        },

        Commands::Check { .. } | Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
