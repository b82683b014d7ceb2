mod cache;
mod geo;
mod suggest;

use clap::{Parser, Subcommand, ValueEnum};
use menuscan_core::PermissionState;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "menuscan")]
#[command(about = "Location-aware restaurant suggestions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Suggest restaurants around a coordinate
    Suggest {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        /// Ignore cached suggestions and query the backend
        #[arg(long)]
        refresh: bool,
        /// Only suggest this cuisine (e.g., thai)
        #[arg(long)]
        cuisine: Option<String>,
        /// Dietary protocol to count safe items for; repeatable
        #[arg(long = "protocol")]
        protocols: Vec<String>,
        /// Location permission to simulate
        #[arg(long, value_enum, default_value_t = PermissionArg::Granted)]
        permission: PermissionArg,
    },
    /// Search restaurants by name
    Search {
        query: String,
        /// Optional location hint (city, address)
        #[arg(long)]
        location: Option<String>,
    },
    /// Inspect or clear the suggestion cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Debug, Subcommand)]
enum CacheCommands {
    /// Print the cached entry and its age
    Show,
    /// Delete the cached entry
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PermissionArg {
    Granted,
    Denied,
    Restricted,
    NotDetermined,
}

impl From<PermissionArg> for PermissionState {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Granted => PermissionState::Granted,
            PermissionArg::Denied => PermissionState::Denied,
            PermissionArg::Restricted => PermissionState::Restricted,
            PermissionArg::NotDetermined => PermissionState::NotDetermined,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = menuscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, api = %config.api_base_url, "configuration loaded");

    match cli.command {
        Commands::Suggest {
            lat,
            lng,
            refresh,
            cuisine,
            protocols,
            permission,
        } => {
            let args = suggest::SuggestArgs {
                lat,
                lng,
                refresh,
                cuisine,
                protocols,
                permission: permission.into(),
            };
            suggest::run_suggest(&config, args).await?;
        }
        Commands::Search { query, location } => {
            suggest::run_search(&config, &query, location.as_deref()).await?;
        }
        Commands::Cache { command } => match command {
            CacheCommands::Show => cache::run_cache_show(&config),
            CacheCommands::Clear => cache::run_cache_clear(&config),
        },
    }

    Ok(())
}
