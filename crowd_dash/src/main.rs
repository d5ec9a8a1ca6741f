mod account;
mod analyze;
mod render;
mod tui;

use std::path::PathBuf;

use analytics_client::media::parse_frame_size;
use analytics_client::{ClientConfig, SessionStore};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use zone_common::geometry::Size;

const DEFAULT_LOG_FILTER: &str = "warn,crowd_dash=info,analytics_client=info";

#[derive(Debug, Parser)]
#[command(version, about = "Zone editor and statistics client for a crowd analytics backend")]
pub struct Args {
    /// Config file to use instead of ./crowd_dash.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Delete the logged-in account.
    DeleteAccount {
        /// Skip the confirmation prompt.
        #[arg(long, action, default_value = "false")]
        yes: bool,
    },
    /// Request a reset code by email, verify it and set a new password.
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Upload an image or video with a saved zone layout and print the statistics.
    Analyze {
        /// Image (.jpg/.png/...) or video (.mp4/.mkv/...) to analyze.
        input: PathBuf,
        /// Zone layout file; defaults to the configured zones file.
        #[arg(long)]
        zones: Option<PathBuf>,
        /// Where to write the annotated media returned by the server.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Native frame size (e.g. 1920x1080) when it cannot be probed.
        #[arg(long, value_parser = frame_size)]
        frame_size: Option<Size>,
    },
    /// Paint a zone layout over an image.
    RenderZones {
        input: PathBuf,
        #[arg(long)]
        zones: Option<PathBuf>,
        #[arg(long, short)]
        output: PathBuf,
        /// TrueType/OpenType font used for zone labels; labels are skipped without one.
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Interactive dashboard: draw zones with the mouse and run analyses.
    Dashboard {
        /// Media to load on start.
        input: Option<PathBuf>,
        #[arg(long, value_parser = frame_size)]
        frame_size: Option<Size>,
    },
}

fn frame_size(s: &str) -> Result<Size, String> {
    parse_frame_size(s).ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))
}

fn init_logging(interactive: bool) {
    if interactive {
        // Keep log lines off the alternate screen.
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new("off"))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::sink))
            .init();
        return;
    }
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(matches!(args.command, Command::Dashboard { .. }));

    let config = ClientConfig::load(args.config.as_deref())?;
    tracing::debug!("{config:?}");
    let sessions = SessionStore::new(&config.session_file);

    let runtime = tokio::runtime::Runtime::new()?;

    match args.command {
        Command::Login { email, password } => {
            runtime.block_on(account::login(&config, &sessions, &email, &password))?
        }
        Command::Logout => account::logout(&sessions)?,
        Command::DeleteAccount { yes } => {
            runtime.block_on(account::delete_account(&config, &sessions, yes))?
        }
        Command::ForgotPassword { email } => {
            runtime.block_on(account::forgot_password(&config, &email))?
        }
        Command::Analyze {
            input,
            zones,
            output,
            frame_size,
        } => {
            let zones = zones.unwrap_or_else(|| config.zones_file.clone());
            runtime.block_on(analyze::analyze(
                &config,
                &input,
                &zones,
                output.as_deref(),
                frame_size,
            ))?
        }
        Command::RenderZones {
            input,
            zones,
            output,
            font,
        } => {
            let zones = zones.unwrap_or_else(|| config.zones_file.clone());
            render::render_zones(&input, &zones, &output, font.as_deref())?
        }
        Command::Dashboard { input, frame_size } => {
            let Some(session) = sessions.load() else {
                anyhow::bail!("Not logged in. Run `crowd_dash login` first.");
            };
            tui::run_dashboard(
                config,
                session,
                sessions,
                input.as_deref(),
                frame_size,
                runtime.handle().clone(),
            )?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_args() {
        let args = Args::parse_from([
            "crowd_dash",
            "--config",
            "dash.toml",
            "analyze",
            "hall.mp4",
            "--frame-size",
            "1280x720",
            "-o",
            "out.mp4",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("dash.toml")));
        match args.command {
            Command::Analyze {
                input,
                frame_size,
                output,
                zones,
            } => {
                assert_eq!(input, PathBuf::from("hall.mp4"));
                assert_eq!(frame_size, Some(Size::new(1280, 720)));
                assert_eq!(output, Some(PathBuf::from("out.mp4")));
                assert_eq!(zones, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_frame_size_rejected() {
        let parsed = Args::try_parse_from(["crowd_dash", "dashboard", "--frame-size", "big"]);
        assert!(parsed.is_err());
    }
}
