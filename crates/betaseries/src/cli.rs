//! Clap derive structures for the `betaseries` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// betaseries -- track TV shows and movies from the command line
#[derive(Debug, Parser)]
#[command(
    name = "betaseries",
    version,
    about = "Track TV shows and movies on BetaSeries from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "BETASERIES_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "BETASERIES_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Client key (overrides profile)
    #[arg(long, env = "BETASERIES_CLIENT_KEY", global = true, hide_env = true)]
    pub client_key: Option<String>,

    /// Member token (overrides profile and keyring)
    #[arg(long, env = "BETASERIES_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "json", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "BETASERIES_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show details of a TV show
    Show {
        id: u64,
        /// Skip the cache
        #[arg(long)]
        force: bool,
    },

    /// Change a show's state in your account
    ShowAction { action: ShowAction, id: u64 },

    /// Episodes of a show for one season
    Episodes { show_id: u64, season: u32 },

    /// Shows or movies similar to a title
    Similars { kind: TitleKind, id: u64 },

    /// Show details of a movie
    Movie {
        id: u64,
        #[arg(long)]
        force: bool,
    },

    /// Add a movie to your account
    MovieAdd {
        id: u64,
        #[arg(long, default_value = "to-see")]
        state: MovieStateArg,
    },

    /// Remove a movie from your account
    MovieRemove { id: u64 },

    /// Show details of an episode
    Episode {
        id: u64,
        #[arg(long)]
        force: bool,
    },

    /// Mark an episode as watched
    Watch {
        id: u64,
        /// Do not mark the earlier episodes as watched too
        #[arg(long)]
        no_bulk: bool,
    },

    /// Unmark a watched episode
    Unwatch { id: u64 },

    /// Show a member's profile
    Member { id: u64 },

    /// Check whether the stored token is still accepted
    Session,

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShowAction {
    Add,
    Remove,
    Archive,
    Unarchive,
    Favorite,
    Unfavorite,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TitleKind {
    Show,
    Movie,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MovieStateArg {
    ToSee,
    Seen,
    WontSee,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the active configuration (secrets redacted)
    Show,
    /// Prompt for a member token and store it in the system keyring
    SetToken,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: clap_complete::Shell,
}
