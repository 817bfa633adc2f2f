use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};

use crate::app::App;
use crate::client::{FetchOutcome, RemoteAction, ServerClient};
use crate::config::AppConfig;
use crate::listing::{self, RecipeEntry};

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search terms, matched against recipe names and tags
    #[arg()]
    pub query: Vec<String>,
    /// Filter by a single tag instead of (or in addition to) terms
    #[arg(long)]
    pub tag: Option<String>,
    /// Limit the number of results printed
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct OpenArgs {
    /// Recipe slug or listing number (e.g. "apple_pie" or "3")
    pub recipe: String,
}

#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// URL for the kiosk browser to open
    pub url: String,
}

#[derive(Args, Debug, Clone)]
pub struct TimerArgs {
    /// Timer length in minutes (fractions allowed, e.g. 2.5)
    pub minutes: f64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RemoteActionArg {
    PageUp,
    PageDown,
    ScrollUp,
    ScrollDown,
    ZoomIn,
    ZoomOut,
}

impl From<RemoteActionArg> for RemoteAction {
    fn from(arg: RemoteActionArg) -> Self {
        match arg {
            RemoteActionArg::PageUp => RemoteAction::PageUp,
            RemoteActionArg::PageDown => RemoteAction::PageDown,
            RemoteActionArg::ScrollUp => RemoteAction::ScrollUp,
            RemoteActionArg::ScrollDown => RemoteAction::ScrollDown,
            RemoteActionArg::ZoomIn => RemoteAction::ZoomIn,
            RemoteActionArg::ZoomOut => RemoteAction::ZoomOut,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    #[arg(value_enum)]
    pub action: RemoteActionArg,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

fn client_for(config: &AppConfig) -> Result<ServerClient> {
    ServerClient::new(&config.server.base_url, config.server.timeout())
        .context("building server client")
}

pub fn search_recipes(config: Arc<AppConfig>, args: SearchArgs) -> Result<()> {
    let query = args.query.join(" ");
    let trimmed = query.trim();
    if trimmed.is_empty() && args.tag.is_none() {
        bail!("provide search terms or --tag");
    }

    let client = client_for(&config)?;
    let fragment = client
        .find(trimmed, args.tag.as_deref())
        .context("querying the search endpoint")?;
    let entries = listing::parse_results_fragment(&fragment);
    print!("{}", format_entries(&entries, args.limit));
    Ok(())
}

pub fn open_recipe(config: Arc<AppConfig>, args: OpenArgs) -> Result<()> {
    let recipe = args.recipe.trim().trim_start_matches('/');
    if recipe.is_empty() {
        bail!("recipe cannot be empty");
    }
    let client = client_for(&config)?;
    let path = format!("/recipes/{recipe}");
    report_outcome(
        client.open_page(&path).context("opening recipe page")?,
        &format!("Opened {path} on the kiosk"),
    )
}

pub fn open_link(config: Arc<AppConfig>, args: LinkArgs) -> Result<()> {
    let url = args.url.trim();
    if url.is_empty() {
        bail!("URL cannot be empty");
    }
    let client = client_for(&config)?;
    report_outcome(
        client.open_link(url).context("opening link")?,
        "Opened link in the kiosk browser",
    )
}

pub fn queue_timer(config: Arc<AppConfig>, args: TimerArgs) -> Result<()> {
    if !args.minutes.is_finite() || args.minutes <= 0.0 {
        bail!("timer length must be a positive number of minutes");
    }
    let client = client_for(&config)?;
    client
        .queue_timer(args.minutes)
        .context("queueing timer command")?;
    let unit = if (args.minutes - 1.0).abs() < f64::EPSILON {
        "minute"
    } else {
        "minutes"
    };
    println!("Queued a {} {unit} kitchen timer", args.minutes);
    Ok(())
}

pub fn remote_control(config: Arc<AppConfig>, args: RemoteArgs) -> Result<()> {
    let action = RemoteAction::from(args.action);
    let client = client_for(&config)?;
    report_outcome(
        client.remote(action).context("sending remote action")?,
        &format!("Sent {} to the kiosk", action.path().trim_start_matches('/')),
    )
}

pub fn maintenance(config: Arc<AppConfig>, path: &str, label: &str) -> Result<()> {
    let client = client_for(&config)?;
    report_outcome(
        client
            .open_page(path)
            .with_context(|| format!("requesting {label}"))?,
        &format!("Requested {label}; the kiosk page reloads itself"),
    )
}

fn report_outcome(outcome: FetchOutcome, success: &str) -> Result<()> {
    match outcome {
        FetchOutcome::Opened => {
            println!("{success}");
            Ok(())
        }
        FetchOutcome::Rejected(message) => bail!("server rejected the request: {message}"),
        FetchOutcome::Ignored(status) => {
            println!("Server returned HTTP {status}; nothing happened");
            Ok(())
        }
    }
}

fn format_entries(entries: &[RecipeEntry], limit: usize) -> String {
    if entries.is_empty() {
        return "No matching recipes.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries.iter().take(limit) {
        let _ = writeln!(&mut out, "{}", entry.name);
        let _ = writeln!(&mut out, "    {}", entry.href);
    }
    if entries.len() > limit {
        let hidden = entries.len() - limit;
        let _ = writeln!(
            &mut out,
            "… and {hidden} more (raise --limit to see {})",
            if hidden == 1 { "it" } else { "them" }
        );
    }
    out
}
