use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use manualrag_config::{FileConfigProvider, DEFAULT_CONFIG_FILE};
use manualrag_retrieval::DEFAULT_TOP_K;
use manualrag_vector_store::DEFAULT_DATA_DIR;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "manualrag")]
#[command(about = "Answer questions from technical manuals", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (credential, system context, manuals)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory holding index generations
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EmbedMode {
    Openai,
    Stub,
}

impl EmbedMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Stub => "stub",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from the manuals folder
    Index(IndexArgs),

    /// Ask a question about the indexed manuals
    Ask(AskArgs),

    /// Inspect or edit the configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show the current index generation
    Status(StatusArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Folder with the manuals (top level only)
    #[arg(long, default_value = "manuals")]
    manuals: PathBuf,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct AskArgs {
    /// The question
    question: String,

    /// Number of fragments to retrieve
    #[arg(short = 'k', long = "top-k", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Print the grounding prompt instead of calling the generation service
    #[arg(long)]
    prompt_only: bool,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration (credential redacted)
    Show {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Update configuration fields
    Set(ConfigSetArgs),
}

#[derive(Args)]
struct ConfigSetArgs {
    /// Embedding and generation service credential
    #[arg(long)]
    credential: Option<String>,

    /// System context placed at the top of every prompt
    #[arg(long, conflicts_with = "context_file")]
    context: Option<String>,

    /// Read the system context from a file
    #[arg(long)]
    context_file: Option<PathBuf>,
}

#[derive(Args)]
struct StatusArgs {
    /// Output JSON
    #[arg(long)]
    json: bool,
}

/// Shared handles for a single invocation.
pub(crate) struct AppContext {
    pub config: Arc<FileConfigProvider>,
    pub data_dir: PathBuf,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    if let Some(mode) = cli.embed_mode {
        env::set_var("MANUALRAG_EMBEDDING_MODE", mode.as_str());
    }

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Index(args) => args.json,
        Commands::Ask(args) => args.json,
        Commands::Config(ConfigCommand::Show { json }) => *json,
        Commands::Status(args) => args.json,
        Commands::Config(ConfigCommand::Set(_)) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if !cli.verbose {
        builder.filter_module("reqwest", log::LevelFilter::Warn);
        builder.filter_module("hyper_util", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let ctx = AppContext {
        config: Arc::new(FileConfigProvider::new(&cli.config)),
        data_dir: cli.data_dir,
    };

    match cli.command {
        Commands::Index(args) => commands::run_index(&ctx, &args.manuals, args.json).await?,
        Commands::Ask(args) => {
            commands::run_ask(&ctx, &args.question, args.top_k, args.prompt_only, args.json)
                .await?;
        }
        Commands::Config(ConfigCommand::Show { json }) => {
            commands::run_config_show(&ctx, json).await?;
        }
        Commands::Config(ConfigCommand::Set(args)) => {
            commands::run_config_set(&ctx, args.credential, args.context, args.context_file)
                .await?;
        }
        Commands::Status(args) => commands::run_status(&ctx, args.json).await?,
    }

    Ok(())
}
