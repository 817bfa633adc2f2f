use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::client::{ClientError, FetchOutcome, ServerClient};
use crate::listing::{self, RecipeEntry};

/// Work the UI hands to the request worker. One blocking HTTP call
/// services each message, in order, so the server never sees more than
/// one interactive request in flight.
#[derive(Debug, Clone)]
pub enum ServerRequest {
    /// Fetch the home page to seed the listing and the tag strip.
    LoadHome,
    /// Search the recipe index; `seq` lets the UI drop stale replies.
    Search {
        query: String,
        tag: Option<String>,
        seq: u64,
    },
    /// Open a recipe page on the kiosk.
    OpenRecipe { path: String },
    /// Open an external link in the kiosk browser.
    OpenLink { url: String },
    /// Fire-and-forget maintenance GET; the response is discarded.
    Trigger { path: String },
}

/// Replies flowing back to the UI thread. The command poller shares this
/// channel, so a server-pushed timer arrives the same way.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    HomeLoaded {
        recipes: Vec<RecipeEntry>,
        tags: Vec<String>,
    },
    HomeFailed {
        error: String,
    },
    SearchLoaded {
        entries: Vec<RecipeEntry>,
        seq: u64,
    },
    SearchFailed {
        error: String,
        seq: u64,
    },
    PageOpened,
    PageRejected {
        message: String,
    },
    PageIgnored {
        status: u16,
    },
    TimerStarted {
        seconds: u64,
    },
}

pub struct WorkerHandle {
    requests: Option<Sender<ServerRequest>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn send(&self, request: ServerRequest) {
        let Some(requests) = &self.requests else {
            return;
        };
        if requests.send(request).is_err() {
            tracing::error!("request worker is gone; dropping request");
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Disconnecting the channel is the stop signal.
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn spawn(client: ServerClient, events: Sender<ServerEvent>) -> Result<WorkerHandle> {
    let (requests_tx, requests_rx) = unbounded::<ServerRequest>();
    let thread = thread::Builder::new()
        .name("cooktui-requests".into())
        .spawn(move || run(client, requests_rx, events))
        .context("spawning request worker thread")?;
    Ok(WorkerHandle {
        requests: Some(requests_tx),
        thread: Some(thread),
    })
}

fn run(client: ServerClient, requests: Receiver<ServerRequest>, events: Sender<ServerEvent>) {
    for request in requests.iter() {
        let Some(event) = service(&client, request) else {
            continue;
        };
        if events.send(event).is_err() {
            break;
        }
    }
}

fn service(client: &ServerClient, request: ServerRequest) -> Option<ServerEvent> {
    match request {
        ServerRequest::LoadHome => match client.fetch_home() {
            Ok(html) => {
                let page = listing::parse_home_page(&html);
                Some(ServerEvent::HomeLoaded {
                    recipes: page.recipes,
                    tags: page.tags,
                })
            }
            Err(err) => Some(ServerEvent::HomeFailed {
                error: err.to_string(),
            }),
        },
        ServerRequest::Search { query, tag, seq } => {
            match client.find(&query, tag.as_deref()) {
                Ok(fragment) => Some(ServerEvent::SearchLoaded {
                    entries: listing::parse_results_fragment(&fragment),
                    seq,
                }),
                Err(err) => Some(ServerEvent::SearchFailed {
                    error: err.to_string(),
                    seq,
                }),
            }
        }
        ServerRequest::OpenRecipe { path } => outcome_event(client.open_page(&path)),
        ServerRequest::OpenLink { url } => outcome_event(client.open_link(&url)),
        ServerRequest::Trigger { path } => {
            if let Err(err) = client.trigger(&path) {
                tracing::debug!(%err, path, "fire-and-forget request failed");
            }
            None
        }
    }
}

fn outcome_event(result: Result<FetchOutcome, ClientError>) -> Option<ServerEvent> {
    match result {
        Ok(FetchOutcome::Opened) => Some(ServerEvent::PageOpened),
        Ok(FetchOutcome::Rejected(message)) => Some(ServerEvent::PageRejected { message }),
        Ok(FetchOutcome::Ignored(status)) => Some(ServerEvent::PageIgnored { status }),
        Err(err) => {
            // The page never surfaced transport failures for these either.
            tracing::error!(%err, "page request failed");
            None
        }
    }
}
