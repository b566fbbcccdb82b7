use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, session, watchlist};
use watchlist_models::{SortOrder, WatchlistStatus};

mod commands;
mod context;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "watchlist")]
#[command(about = "Team4s watchlist - track anime with or without an account")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the watchlist status of an anime
    Status {
        anime_id: i64,
    },
    /// Add an anime or change its status
    #[command(long_about = "Add an anime to the watchlist or change its status. Valid statuses: watching, done, break, planned, dropped. Stored on this device until you log in, in your account afterwards.")]
    Set {
        anime_id: i64,
        status: WatchlistStatus,
    },
    /// Remove an anime from the watchlist
    Remove {
        anime_id: i64,
    },
    /// List the watchlist with per-status counts
    List {
        /// Only show entries with this status
        #[arg(long)]
        status: Option<WatchlistStatus>,

        /// Sort order: added, updated or title
        #[arg(long, default_value = "added")]
        sort: SortOrder,
    },
    /// Show the status of several anime at once
    Check {
        #[arg(required = true, num_args = 1..)]
        anime_ids: Vec<i64>,
    },
    /// Store an access token and merge this device's watchlist into the account
    #[command(long_about = "Store the access token for your account. Entries saved on this device while logged out are uploaded once; newer edits on either side win.")]
    Login {
        /// Access token (if not provided, will prompt)
        #[arg(long)]
        token: Option<String>,

        /// Refresh token to store alongside the access token
        #[arg(long)]
        refresh_token: Option<String>,
    },
    /// Forget the stored tokens
    Logout,
    /// Retry merging this device's watchlist into the account
    Sync,
    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Clear local data
    #[command(long_about = "Clear the watchlist stored on this device (--local), stored credentials (--credentials), or both (--all).")]
    Clear {
        /// Clear everything
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,

        /// Clear the watchlist stored on this device
        #[arg(long, action = ArgAction::SetTrue)]
        local: bool,

        /// Clear stored credentials
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,

        /// Don't ask for confirmation
        #[arg(long, short = 'y', action = ArgAction::SetTrue)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let output = output::Output::new(cli.output, cli.quiet);
    let ctx = context::AppContext::load()?;

    logging::init_logging(cli.verbose, cli.quiet, &ctx.config.logging)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    match cli.command {
        Commands::Status { anime_id } => watchlist::run_status(&ctx, anime_id, &output).await,
        Commands::Set { anime_id, status } => watchlist::run_set(&ctx, anime_id, status, &output).await,
        Commands::Remove { anime_id } => watchlist::run_remove(&ctx, anime_id, &output).await,
        Commands::List { status, sort } => watchlist::run_list(&ctx, status, sort, &output).await,
        Commands::Check { anime_ids } => watchlist::run_check(&ctx, &anime_ids, &output).await,
        Commands::Login { token, refresh_token } => session::run_login(&ctx, token, refresh_token, &output).await,
        Commands::Logout => session::run_logout(&ctx, &output).await,
        Commands::Sync => session::run_sync(&ctx, &output).await,
        Commands::Config { cmd } => config::run_config(&ctx, cmd, &output),
        Commands::Clear { all, local, credentials, yes } => clear::run_clear(&ctx, all, local, credentials, yes, &output),
    }
}
