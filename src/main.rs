use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fundex::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Find funds by code, name or pinyin initials
    Search {
        /// At least two characters of a code, name or pinyin abbreviation
        keyword: String,
        /// Maximum number of results
        #[arg(short, long, allow_negative_numbers = true)]
        limit: Option<i64>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single fund by its six digit code
    Info {
        code: String,
        /// Print the fund as JSON
        #[arg(long)]
        json: bool,
    },
}

impl From<Commands> for fundex::AppCommand {
    fn from(cmd: Commands) -> fundex::AppCommand {
        match cmd {
            Commands::Search {
                keyword,
                limit,
                json,
            } => fundex::AppCommand::Search {
                keyword,
                limit,
                json,
            },
            Commands::Info { code, json } => fundex::AppCommand::Info { code, json },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fundex::cli::setup::setup(),
        Some(cmd) => fundex::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        let message = format!("{e:#}");
        tracing::error!(error = %message, "Application failed");
    }
    result
}
