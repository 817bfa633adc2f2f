use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::config::ConfigLoader;

pub mod commands;

use self::commands::{LinkArgs, OpenArgs, RemoteArgs, SearchArgs, TimerArgs};

#[derive(Parser, Debug)]
#[command(
    name = "cooktui",
    version,
    about = "Terminal companion for the cookbook kiosk"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over COOKTUI_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the server base URL (takes precedence over COOKTUI_SERVER)
    #[arg(long)]
    pub server: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Search recipes and print the matches
    Search(SearchArgs),
    /// Open a recipe page on the kiosk
    Open(OpenArgs),
    /// Open an external link in the kiosk browser
    Link(LinkArgs),
    /// Queue a kitchen timer on the server
    Timer(TimerArgs),
    /// Drive the kiosk browser (paging, scrolling, zoom)
    Remote(RemoteArgs),
    /// Pull the latest recipes from git and restart the server
    Pull,
    /// Regenerate the rendered recipe pages
    Generate,
    /// Remove the generated recipe pages
    Reset,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("COOKTUI_CONFIG", path);
    }
    if let Some(server) = &cli.server {
        env::set_var("COOKTUI_SERVER", server);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;

    let config = Arc::new(config);
    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let mut app = App::new(config.clone())?;
            commands::run_tui(&mut app)
        }
        Commands::Search(args) => commands::search_recipes(config, args),
        Commands::Open(args) => commands::open_recipe(config, args),
        Commands::Link(args) => commands::open_link(config, args),
        Commands::Timer(args) => commands::queue_timer(config, args),
        Commands::Remote(args) => commands::remote_control(config, args),
        Commands::Pull => commands::maintenance(config, "/git_pull", "git pull"),
        Commands::Generate => commands::maintenance(config, "/make_recipes", "page generation"),
        Commands::Reset => commands::maintenance(config, "/reset", "page cleanup"),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
