// src/cli.rs
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::analysis::RunOutcome;
use crate::dashboard::Dashboard;
use crate::router::{Route, RouteDecision};
use crate::session::{SessionState, SignUpOutcome};
use crate::types::JobMode;
use crate::view::RenderedResults;

#[derive(Parser)]
#[command(name = "spectral")]
#[command(about = "Screen uploaded résumés against a job description")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config.yaml (defaults to ./config.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in with e-mail and password
    Login {
        email: String,
        #[arg(long, env = "SPECTRAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Signup {
        email: String,
        #[arg(long, env = "SPECTRAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show who is signed in
    Status,
    /// Show what a route renders for the current session
    Open {
        #[arg(default_value = "/")]
        route: String,
    },
    /// Upload a PDF résumé
    Upload { file: PathBuf },
    /// Register a job and rank uploaded résumés against it
    #[command(group(ArgGroup::new("criteria").required(true).args(["description", "keywords"])))]
    Analyze {
        #[arg(long)]
        description: Option<String>,
        /// Repeat for several keywords
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[arg(long, default_value = "0")]
        min_experience: String,
    },
    /// Rank résumés against a job registered earlier
    Match { job_id: String },
}

pub async fn handle_command(command: Command, dashboard: &mut Dashboard) -> Result<()> {
    let state = dashboard.mount().await;
    info!(authenticated = state.is_authenticated(), "Session resolved");

    // Ctrl-C aborts the in-flight request; the command then reports `Cancelled`.
    let canceller = dashboard.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight request");
            canceller.cancel();
        }
    });

    let outcome = run_command(command, dashboard).await;
    interrupt.abort();
    outcome
}

async fn run_command(command: Command, dashboard: &mut Dashboard) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let session = dashboard
                .session()
                .sign_in(&email, &password)
                .await
                .context("Sign-in failed")?;
            println!(
                "✅ Signed in as {}",
                session.email.as_deref().unwrap_or(&email)
            );
        }

        Command::Signup { email, password } => {
            match dashboard
                .session()
                .sign_up(&email, &password)
                .await
                .context("Sign-up failed")?
            {
                SignUpOutcome::SignedIn(_) => println!("✅ Account created, signed in as {}", email),
                SignUpOutcome::ConfirmationRequired => {
                    println!("📧 Check your e-mail to confirm {}, then log in", email)
                }
            }
        }

        Command::Logout => {
            if let Err(e) = dashboard.session().sign_out().await {
                warn!("Remote sign-out failed: {}", e);
            }
            println!("Signed out");
        }

        Command::Status => match dashboard.session().state() {
            SessionState::Authenticated(session) => {
                println!(
                    "Signed in as {}",
                    session.email.as_deref().unwrap_or("unknown user")
                );
                if let Some(expires_at) = session.expires_at {
                    println!("Session expires {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
                }
            }
            _ => println!("Not signed in"),
        },

        Command::Open { route } => match dashboard.navigate(&route) {
            RouteDecision::Render(Route::Login) => println!("Login: spectral login <email> --password <password>"),
            RouteDecision::Render(Route::Dashboard) => print_results(&dashboard.render()),
            RouteDecision::Redirect(to) => println!("→ {}", to.path()),
            RouteDecision::Placeholder => println!("Loading..."),
            RouteDecision::NotFound(path) => anyhow::bail!("No such page: {}", path),
        },

        Command::Upload { file } => {
            dashboard
                .select_resume(&file)
                .await
                .with_context(|| format!("Cannot upload {}", file.display()))?;
            dashboard
                .upload_resume()
                .await
                .with_context(|| format!("Upload of {} failed", file.display()))?;
            println!("✅ Uploaded {}", file.display());
        }

        Command::Analyze {
            description,
            keywords,
            min_experience,
        } => {
            let composer = dashboard.composer_mut();
            match description {
                Some(description) => {
                    composer.set_mode(JobMode::Description);
                    composer.set_description(&description)?;
                }
                None => {
                    composer.set_mode(JobMode::Keywords);
                    for keyword in &keywords {
                        composer.add_keyword(keyword)?;
                    }
                }
            }
            composer.set_min_experience(&min_experience);

            let (job_id, outcome) = dashboard.submit_job().await.context("Analysis failed")?;
            println!("Job {}", job_id);
            print_outcome(outcome, dashboard);
        }

        Command::Match { job_id } => {
            let outcome = dashboard
                .rerun(&job_id)
                .await
                .with_context(|| format!("Analysis of {} failed", job_id))?;
            print_outcome(outcome, dashboard);
        }
    }

    Ok(())
}

fn print_outcome(outcome: RunOutcome, dashboard: &Dashboard) {
    if let RunOutcome::Superseded { run_id } = outcome {
        warn!(run_id, "Run superseded before it finished");
    }
    print_results(&dashboard.render());
}

fn print_results(rendered: &RenderedResults) {
    print!("{}", rendered.to_text());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_collects_repeated_keywords() {
        let cli = Cli::try_parse_from([
            "spectral",
            "analyze",
            "--keyword",
            "React",
            "--keyword",
            "SQL",
            "--min-experience",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::Analyze {
                description,
                keywords,
                min_experience,
            } => {
                assert!(description.is_none());
                assert_eq!(keywords, vec!["React", "SQL"]);
                assert_eq!(min_experience, "3");
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_analyze_needs_criteria() {
        assert!(Cli::try_parse_from(["spectral", "analyze"]).is_err());
    }

    #[test]
    fn test_open_defaults_to_dashboard() {
        let cli = Cli::try_parse_from(["spectral", "--config", "c.yaml", "open"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Command::Open { route } if route == "/"));
    }
}
