use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use transhub::telemetry::init_tracing;
use transhub::Config;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "transhub")]
#[command(about = "TransHub CLI - template mapping tools")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.transhub/config.toml)
    #[arg(short, long, global = true, env = "TRANSHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding config.toml and stored templates
    #[arg(long, global = true, env = "TRANSHUB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List reference tables and their columns
    Catalog,

    /// Parse a PDF or spreadsheet and show what the editor would see
    Inspect {
        /// Document to inspect
        file: PathBuf,

        /// Sheet to open (first sheet by default)
        #[arg(short, long)]
        sheet: Option<String>,
    },

    /// Manage stored templates
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateAction {
    /// List stored templates
    List,

    /// Show a template's fields and bindings
    Show {
        /// Template id
        id: String,
    },

    /// Write a template record as JSON
    Export {
        /// Template id
        id: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Store a template record from JSON
    Import {
        /// Record file
        file: PathBuf,

        /// Source document to store alongside the template
        #[arg(short, long)]
        asset: Option<PathBuf>,
    },

    /// Delete a template and its stored document
    Delete {
        /// Template id
        id: String,

        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    match (&cli.config, &cli.data_dir) {
        (Some(path), data_dir) => {
            let mut config = Config::load_file(path)?;
            if let Some(dir) = data_dir {
                config.storage.data_dir = transhub::config::expand_tilde(dir)?;
            }
            Ok(config)
        }
        (None, Some(dir)) => Config::load_from(&transhub::config::expand_tilde(dir)?),
        (None, None) => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging)?;

    tracing::debug!(data_dir = ?config.storage.data_dir, "Loaded configuration");

    match cli.command {
        Commands::Catalog => commands::run_catalog(&config)?,
        Commands::Inspect { file, sheet } => commands::run_inspect(&file, sheet).await?,
        Commands::Templates { action } => match action {
            TemplateAction::List => commands::templates::list(&config).await?,
            TemplateAction::Show { id } => commands::templates::show(&config, &id).await?,
            TemplateAction::Export { id, output } => {
                commands::templates::export(&config, &id, output.as_deref()).await?
            }
            TemplateAction::Import { file, asset } => {
                commands::templates::import(&config, &file, asset.as_deref()).await?
            }
            TemplateAction::Delete { id, yes } => {
                commands::templates::delete(&config, &id, yes).await?
            }
        },
    }

    Ok(())
}
