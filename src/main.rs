//! fedilist binary entry point

use clap::{Parser, Subcommand};
use fedilist::service::{DirectoryOrder, DirectoryParams, Outcome};
use fedilist::{ClientState, config};
use futures::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fedilist", version, about = "Browse paginated collections of a Mastodon/Pleroma instance")]
struct Cli {
    /// Explicit configuration file (defaults to config/default.toml + config/local.toml)
    #[arg(long, env = "FEDILIST_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Print dispatched store events
    #[arg(long)]
    watch: bool,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Favourited statuses (own, or another account's on Pleroma)
    Favourites {
        /// Account whose favourites to list
        #[arg(long)]
        account: Option<String>,
        /// Pages to load
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Profile directory
    Directory {
        #[arg(long)]
        order: Option<DirectoryOrder>,
        /// Only local accounts
        #[arg(long)]
        local: bool,
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Mark accounts as suggested (admin); accounts must be loaded first via the directory
    Suggest { account_ids: Vec<String> },
    /// Remove accounts from suggestions (admin)
    Unsuggest { account_ids: Vec<String> },
}

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize metrics and ClientState
/// 4. Run the requested command
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = match &cli.config {
        Some(path) => config::ClientConfig::load_from(path)?,
        None => config::ClientConfig::load()?,
    };

    // 2. Initialize tracing/logging
    let default_filter = format!("fedilist={}", config.logging.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }

    // 3. Initialize metrics
    fedilist::metrics::init_metrics();

    tracing::info!(
        instance = %config.instance.base_url,
        "Configuration loaded"
    );

    // 4. Initialize client state
    let state = ClientState::new(config)?;

    if cli.watch {
        spawn_event_printer(&state);
    }

    // 5. Run command
    match cli.command {
        Command::Favourites { account, pages } => {
            let favourites = state.favourites();
            let key = match &account {
                Some(id) => favourites.account_collection(id).key,
                None => favourites.collection().key,
            };

            for page in 0..pages.max(1) {
                let outcome = match (&account, page) {
                    (Some(id), 0) => favourites.fetch_account_favourited_statuses(id).await,
                    (Some(id), _) => favourites.expand_account_favourited_statuses(id).await,
                    (None, 0) => favourites.fetch_favourited_statuses().await,
                    (None, _) => favourites.expand_favourited_statuses().await,
                };
                if !continue_paging(&outcome) {
                    break;
                }
            }

            for status in state.store.cursor_statuses(&key).await {
                let author = state
                    .store
                    .account(&status.account_id)
                    .await
                    .map(|account| account.acct)
                    .unwrap_or_default();
                println!("{}\t@{}\t{}", status.id, author, first_line(&status.search_index));
            }
        }
        Command::Directory {
            order,
            local,
            pages,
        } => {
            let directory = state.directory();
            let params = DirectoryParams { order, local };

            for page in 0..pages.max(1) {
                let outcome = if page == 0 {
                    directory.fetch_directory(&params).await
                } else {
                    directory.expand_directory().await
                };
                if !continue_paging(&outcome) {
                    break;
                }
            }

            let key = directory.collection().key;
            for account in state.store.cursor_accounts(&key).await {
                let following = state
                    .store
                    .relationship(&account.id)
                    .await
                    .map(|relationship| relationship.following)
                    .unwrap_or(false);
                println!(
                    "{}\t@{}\t{}\t{}",
                    account.id,
                    account.acct,
                    account.display_name,
                    if following { "following" } else { "" }
                );
            }
        }
        Command::Suggest { account_ids } => {
            state.suggestions().suggest(&account_ids).await?;
        }
        Command::Unsuggest { account_ids } => {
            state.suggestions().unsuggest(&account_ids).await?;
        }
    }

    if cli.metrics {
        print!("{}", fedilist::metrics::render()?);
    }

    Ok(())
}

/// Whether another page should be requested after this outcome
fn continue_paging(outcome: &Outcome) -> bool {
    match outcome {
        Outcome::Loaded { has_more, .. } => *has_more,
        Outcome::Skipped(reason) => {
            tracing::info!(reason = reason.as_str(), "Nothing to load");
            false
        }
        Outcome::Failed(error) => {
            tracing::error!(%error, "Page load failed");
            false
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

/// Spawn background task printing store events
fn spawn_event_printer(state: &ClientState) {
    let mut events = state.store.events().boxed();

    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            eprintln!("[event] {}", event.action_type());
        }
    });

    tracing::debug!("Event printer spawned");
}
