use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "questline")]
#[command(about = "Questline - tokens, levels, streaks, quests and achievements")]
#[command(version)]
struct Cli {
    /// Path to the database (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Path to the config file (defaults to ~/.questline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default ~/.questline/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Daily check-in for a user
    CheckIn { user: String },

    /// Emit an activity event for a user
    Activity {
        user: String,
        /// Action type, e.g. item_listed, post_created
        action: String,
        #[arg(long, default_value_t = 1)]
        value: u32,
        /// Category the action happened in (e.g. electronics)
        #[arg(long)]
        category: Option<String>,
    },

    /// List a user's quests
    Quests {
        user: String,
        #[arg(long, value_enum, default_value_t = cli::quests::QuestList::Active)]
        view: cli::quests::QuestList,
    },

    /// Start a quest
    Start { user: String, quest_id: String },

    /// Claim a completed quest's reward
    Claim { user: String, quest_id: String },

    /// Show a user's achievements
    Achievements {
        user: String,
        /// Show summary statistics instead of the list
        #[arg(long)]
        stats: bool,
    },

    /// Show a user's level, XP, balance and streaks
    Stats { user: String },

    /// Run the maintenance sweep (expire, decay, generate, assign)
    Maintain {
        /// Keep running on an interval until Ctrl-C
        #[arg(long)]
        watch: bool,
        /// Seconds between sweeps (defaults to the config value)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Administrative ledger operations
    Admin {
        #[command(subcommand)]
        command: cli::admin::AdminCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Init { force } = cli.command {
        return cli::init::init_command(cli.config.as_deref(), force);
    }

    let engine = cli::open_engine(cli.config.as_deref(), cli.db)?;

    match cli.command {
        // Handled before the engine is opened
        Commands::Init { .. } => {}
        Commands::CheckIn { user } => cli::activity::check_in_command(&engine, &user)?,
        Commands::Activity {
            user,
            action,
            value,
            category,
        } => cli::activity::activity_command(&engine, &user, &action, value, category)?,
        Commands::Quests { user, view } => cli::quests::list_command(&engine, &user, view)?,
        Commands::Start { user, quest_id } => cli::quests::start_command(&engine, &user, &quest_id)?,
        Commands::Claim { user, quest_id } => cli::quests::claim_command(&engine, &user, &quest_id)?,
        Commands::Achievements { user, stats } => {
            cli::profile::achievements_command(&engine, &user, stats)?
        }
        Commands::Stats { user } => cli::profile::stats_command(&engine, &user)?,
        Commands::Maintain {
            watch,
            interval_secs,
        } => cli::maintain::maintain_command(engine, watch, interval_secs).await?,
        Commands::Admin { command } => cli::admin::admin_command(&engine, command)?,
    }

    Ok(())
}
