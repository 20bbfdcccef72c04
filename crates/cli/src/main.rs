// Bestie CLI - sponsorship funding, check-in streaks, hosted store access

mod collection;
mod exit_codes;
mod funding;
mod store;
mod streak;

use std::path::PathBuf;
use std::process::ExitCode;

use bestie_funding::FundingError;
use bestie_store_client::StoreError;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exit_codes::{
    store_exit_code, EXIT_IO, EXIT_PARSE, EXIT_STORE_UPSTREAM, EXIT_SUCCESS, EXIT_USAGE,
};

/// Log filter variable (`BESTIE_LOG=debug`, `BESTIE_LOG=bestie_funding=trace`).
const LOG_ENV: &str = "BESTIE_LOG";

#[derive(Parser)]
#[command(name = "bestie")]
#[command(about = "Sponsorship funding reconciliation and community store tools")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (overridden by BESTIE_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate funding per beneficiary from exported sponsorship rows
    #[command(after_help = "\
Examples:
  bestie funding sponsorships.json
  bestie funding sponsorships.json --content content.json --admin --json
  bestie funding sponsorships.json --now 2026-10-18T12:00:00Z")]
    Funding {
        /// JSON array of sponsorship rows
        sponsorships: PathBuf,

        /// JSON object with `sponsor_besties` and `featured_besties` arrays
        #[arg(long)]
        content: Option<PathBuf>,

        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Include test-mode totals
        #[arg(long)]
        admin: bool,

        /// Emit JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Sponsorships a viewer owns or has been shared, with live funding
    Visible {
        /// Viewer account id (defaults to the logged-in user)
        #[arg(long)]
        viewer: Option<String>,

        /// Viewer email, for guest-checkout sponsorships
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Check-in streak and milestones from exported check-in rows
    Streak {
        /// JSON array of check-in rows (`checked_in_at` or `created_at`)
        check_ins: PathBuf,

        /// IANA zone for day boundaries (defaults to settings)
        #[arg(long)]
        zone: Option<String>,

        /// Community date to evaluate at (YYYY-MM-DD); defaults to today
        #[arg(long)]
        today: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Sticker collection progress from exported catalog and holdings rows
    #[command(after_help = "\
Examples:
  bestie collection stickers.json user_stickers.json
  bestie collection stickers.json user_stickers.json --preview st_owl --reveal st_sun --json")]
    Collection {
        /// JSON array of `stickers` rows
        stickers: PathBuf,

        /// JSON array of `user_stickers` rows for one member
        owned: PathBuf,

        /// Preferred sticker for the collection card
        #[arg(long)]
        preview: Option<String>,

        /// Classify a revealed sticker as new or duplicate
        #[arg(long)]
        reveal: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Call a remote procedure and print its JSON result
    Invoke {
        /// Function name (e.g. open-sticker-pack)
        function: String,

        /// JSON request body
        #[arg(long, default_value = "{}")]
        body: String,
    },

    /// Save store credentials
    Login {
        /// Store base URL (defaults to `store.url` in settings)
        #[arg(long)]
        url: Option<String>,

        /// Public project key
        #[arg(long, env = "BESTIE_API_KEY")]
        api_key: String,

        /// Session token for a user account
        #[arg(long, env = "BESTIE_TOKEN")]
        token: Option<String>,

        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Delete saved store credentials
    Logout,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Funding { sponsorships, content, now, admin, json } => {
            funding::cmd_funding(sponsorships, content, now, admin, json)
        }
        Commands::Visible { viewer, email, json } => store::cmd_visible(viewer, email, json),
        Commands::Streak { check_ins, zone, today, json } => {
            streak::cmd_streak(check_ins, zone, today, json)
        }
        Commands::Collection { stickers, owned, preview, reveal, json } => {
            collection::cmd_collection(stickers, owned, preview, reveal, json)
        }
        Commands::Invoke { function, body } => store::cmd_invoke(function, body),
        Commands::Login { url, api_key, token, user_id, email } => {
            store::cmd_login(url, api_key, token, user_id, email)
        }
        Commands::Logout => store::cmd_logout(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Install the stderr subscriber. `log` records from the library crates are
/// bridged into it. Stdout stays reserved for command output.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Create error from a store error with the proper exit code.
    pub fn store(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::NotAuthenticated => Some("run `bestie login` first".to_string()),
            StoreError::Unauthorized(_) => {
                Some("the saved token may have expired; run `bestie login` again".to_string())
            }
            _ => None,
        };
        Self { code: store_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn funding(err: FundingError) -> Self {
        let code = match &err {
            FundingError::Parse(_) | FundingError::Decode { .. } => EXIT_PARSE,
            FundingError::Config(_) => EXIT_USAGE,
            FundingError::Source(_) => EXIT_STORE_UPSTREAM,
        };
        Self { code, message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Read a whole input file, mapping failures to the I/O exit code.
pub fn read_input(path: &std::path::Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError { code: exit_codes::EXIT_ERROR, message: e.to_string(), hint: None })?;
    println!("{}", json);
    Ok(())
}
