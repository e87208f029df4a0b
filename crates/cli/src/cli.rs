use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rutas", about = "Offline-first transit route estimator", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "RUTAS_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the asset manifest into a new cache generation
    Install,

    /// Make the current generation the only one
    Activate,

    /// Show stored cache generations
    Status,

    /// Request a path through the cache controller
    Fetch {
        /// Path relative to the site origin, e.g. data/rutas.json
        path: String,
    },

    /// List known neighborhoods
    Neighborhoods,

    /// Show active service alerts
    Alerts,

    /// Find routes between two neighborhoods, fastest first
    Search { origin: String, destination: String },

    /// Manage saved routes
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Switch between Spanish and English
    Lang,

    /// Switch between light and dark theme
    Theme,

    /// Toggle data-saving mode
    LowData,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum FavoritesAction {
    /// List saved routes
    List,
    /// Save a route by its id
    Add { route_id: String },
    /// Remove a saved route
    Remove { id: String },
}
