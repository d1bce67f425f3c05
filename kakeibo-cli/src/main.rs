use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod auth;
mod commands;
mod config;
mod services;
mod state;

use services::Services;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("KAKEIBO_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "kakeibo", version = VERSION, about = "Household budget summaries from MoneyForward exports")]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a MoneyForward CSV, fill blank categories and store the summary
    Analyze {
        /// Path to the exported CSV
        #[arg(long)]
        csv: PathBuf,

        /// User id the summary belongs to
        #[arg(long)]
        user: String,

        /// Run every stage but keep the artifact in memory
        #[arg(long)]
        dry_run: bool,

        /// Skip the model; blank categories stay unclassified
        #[arg(long)]
        no_llm: bool,
    },

    /// Generate a planner comment for the user's latest summary
    Advise {
        #[arg(long)]
        user: String,

        /// Also push the comment to the user
        #[arg(long)]
        notify: bool,
    },

    /// Render and store a text report for the user's latest summary
    Report {
        #[arg(long)]
        user: String,

        /// Also write the report to this file
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        notify: bool,
    },

    /// Handle one inbound chat message
    Message {
        #[arg(long)]
        user: String,

        #[arg(long)]
        text: String,
    },

    /// Manage ~/.kakeibo/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store API keys in ~/.kakeibo/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    OpenaiPasteApiKey,
    AnthropicPasteApiKey,
    LinePasteChannelToken,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = match cli.command {
        Command::Config { command } => {
            match command {
                ConfigCommand::Init => config::init_config()?,
                ConfigCommand::Show => {
                    let cfg = config::load_config()?;
                    println!("# {}", config::config_path()?.display());
                    print!("{}", toml::to_string_pretty(&cfg)?);
                }
            }
            return Ok(());
        }
        Command::Auth { command } => {
            match command {
                AuthCommand::OpenaiPasteApiKey => auth::openai_paste_api_key()?,
                AuthCommand::AnthropicPasteApiKey => auth::anthropic_paste_api_key()?,
                AuthCommand::LinePasteChannelToken => auth::line_paste_channel_token()?,
            }
            return Ok(());
        }
        other => other,
    };

    let svc = Services::load(config::load_config()?, auth::load_auth()?)?;
    match command {
        Command::Analyze {
            csv,
            user,
            dry_run,
            no_llm,
        } => commands::analyze(&svc, &csv, &user, dry_run, no_llm).await?,
        Command::Advise { user, notify } => commands::advise(&svc, &user, notify).await?,
        Command::Report { user, out, notify } => commands::report(&svc, &user, out, notify).await?,
        Command::Message { user, text } => commands::message(&svc, &user, &text).await?,
        Command::Config { .. } | Command::Auth { .. } => {}
    }

    Ok(())
}
