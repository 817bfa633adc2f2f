use std::time::Instant;

use crate::client::worker::{ServerRequest, WorkerHandle};

use super::state::AppState;

/// Thin seam between UI intent and the request worker. The dispatch
/// rules that couple search and tag state (reset the chips before a
/// free-text search, clear the input before a tag filter) live here so
/// the key handlers stay declarative.
pub struct RequestDispatcher<'a> {
    worker: &'a WorkerHandle,
}

impl<'a> RequestDispatcher<'a> {
    pub fn new(worker: &'a WorkerHandle) -> Self {
        Self { worker }
    }

    /// Free-text search. Any active tag filter is dropped first, then the
    /// current input is posted as the search form.
    pub fn search(&self, state: &mut AppState) {
        state.tags.clear_selection();
        let seq = state.next_search_seq();
        self.worker.send(ServerRequest::Search {
            query: state.search.query.clone(),
            tag: None,
            seq,
        });
    }

    /// Tag filter. The free-text input is cleared and the (now empty)
    /// form is posted with the tag as a query parameter.
    pub fn filter(&self, state: &mut AppState, tag: String) {
        state.search.clear();
        let seq = state.next_search_seq();
        self.worker.send(ServerRequest::Search {
            query: String::new(),
            tag: Some(tag),
            seq,
        });
    }

    pub fn open_recipe(&self, state: &mut AppState, path: String) {
        state.show_alert("Opening recipe page");
        self.worker.send(ServerRequest::OpenRecipe { path });
    }

    pub fn open_link(&self, url: String) {
        self.worker.send(ServerRequest::OpenLink { url });
    }

    /// Kick a maintenance endpoint and start the reload grace period; the
    /// response to the trigger itself is ignored.
    pub fn reload(&self, state: &mut AppState, path: String, delay_secs: u64, now: Instant) {
        self.worker.send(ServerRequest::Trigger { path });
        state.begin_reload(delay_secs, now);
    }

    pub fn load_home(&self) {
        self.worker.send(ServerRequest::LoadHome);
    }
}
