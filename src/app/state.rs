use std::time::Instant;

use time::OffsetDateTime;
use unicode_segmentation::UnicodeSegmentation;

use crate::client::worker::ServerEvent;
use crate::listing::RecipeEntry;
use crate::timers::{Countdown, ReloadCountdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Search,
    Tags,
    Results,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Search => FocusPane::Tags,
            FocusPane::Tags => FocusPane::Results,
            FocusPane::Results => FocusPane::Search,
        }
    }
}

impl Default for FocusPane {
    fn default() -> Self {
        FocusPane::Search
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
}

impl SearchState {
    pub fn push_char(&mut self, ch: char) {
        self.query.push(ch);
    }

    pub fn pop_char(&mut self) -> bool {
        if self.query.is_empty() {
            return false;
        }
        let boundary = prev_grapheme_boundary(&self.query, self.query.len());
        self.query.truncate(boundary);
        true
    }

    pub fn clear(&mut self) -> bool {
        if self.query.is_empty() {
            return false;
        }
        self.query.clear();
        true
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}

/// Single-select tag row. At most one tag is ever selected; the
/// invariant lives in the type instead of a class-toggling convention.
#[derive(Debug, Clone, Default)]
pub struct TagStrip {
    names: Vec<String>,
    pub cursor: usize,
    selected: Option<usize>,
}

/// What a toggle did: picked a new filter tag, or cleared the current
/// one (toggling the selected tag off falls back to unfiltered search).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagToggle {
    Selected(String),
    Cleared,
}

impl TagStrip {
    pub fn set_names(&mut self, names: Vec<String>) {
        self.names = names;
        self.cursor = 0;
        self.selected = None;
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.names.get(index))
            .map(String::as_str)
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected == Some(index)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.names.is_empty() {
            return;
        }
        let len = self.names.len() as isize;
        let mut next = self.cursor as isize + delta;
        if next < 0 {
            next = 0;
        } else if next >= len {
            next = len - 1;
        }
        self.cursor = next as usize;
    }

    /// Toggle the tag under the cursor. Selecting displaces whichever tag
    /// held the selection before, so two tags can never be active at once.
    pub fn toggle_at_cursor(&mut self) -> Option<TagToggle> {
        let index = self.cursor;
        let name = self.names.get(index)?.clone();
        if self.selected == Some(index) {
            self.selected = None;
            Some(TagToggle::Cleared)
        } else {
            self.selected = Some(index);
            Some(TagToggle::Selected(name))
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertOverlay {
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct LinkPrompt {
    pub url: String,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    Alert(AlertOverlay),
    LinkPrompt(LinkPrompt),
}

#[derive(Debug, Default)]
pub struct AppState {
    pub focus: FocusPane,
    pub search: SearchState,
    pub tags: TagStrip,
    pub recipes: Vec<RecipeEntry>,
    pub selected: usize,
    pub overlay: Option<OverlayState>,
    pub kitchen_timer: Option<Countdown>,
    pub reload: Option<ReloadCountdown>,
    pub status_message: Option<String>,
    pub last_loaded: Option<OffsetDateTime>,
    latest_search: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn selected_recipe(&self) -> Option<&RecipeEntry> {
        self.recipes.get(self.selected)
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.recipes.is_empty() {
            return;
        }
        let len = self.recipes.len() as isize;
        let mut next = self.selected as isize + delta;
        if next < 0 {
            next = 0;
        } else if next >= len {
            next = len - 1;
        }
        self.selected = next as usize;
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    // --- alert overlay -------------------------------------------------

    /// Show the alert with `message`. A message already on screen is
    /// overwritten in place; there is no queue.
    pub fn show_alert<S: Into<String>>(&mut self, message: S) {
        self.overlay = Some(OverlayState::Alert(AlertOverlay {
            message: message.into(),
        }));
    }

    /// Rewrite the visible alert text, or show the alert if it was
    /// dismissed in the meantime.
    pub fn set_alert_message<S: Into<String>>(&mut self, message: S) {
        match &mut self.overlay {
            Some(OverlayState::Alert(alert)) => alert.message = message.into(),
            _ => self.show_alert(message),
        }
    }

    pub fn hide_alert(&mut self) {
        if matches!(self.overlay, Some(OverlayState::Alert(_))) {
            self.overlay = None;
        }
    }

    pub fn alert(&self) -> Option<&AlertOverlay> {
        match &self.overlay {
            Some(OverlayState::Alert(alert)) => Some(alert),
            _ => None,
        }
    }

    // --- link prompt ---------------------------------------------------

    pub fn open_link_prompt(&mut self) {
        self.overlay = Some(OverlayState::LinkPrompt(LinkPrompt::default()));
    }

    pub fn link_prompt(&self) -> Option<&LinkPrompt> {
        match &self.overlay {
            Some(OverlayState::LinkPrompt(prompt)) => Some(prompt),
            _ => None,
        }
    }

    pub fn link_prompt_mut(&mut self) -> Option<&mut LinkPrompt> {
        match &mut self.overlay {
            Some(OverlayState::LinkPrompt(prompt)) => Some(prompt),
            _ => None,
        }
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    // --- timers --------------------------------------------------------

    /// Start (or restart) the kitchen countdown. Replacing the option is
    /// the whole cancellation story: the previous countdown can never
    /// tick again.
    pub fn start_kitchen_timer(&mut self, seconds: u64, now: Instant) {
        self.kitchen_timer = Some(Countdown::start(seconds, now));
    }

    pub fn tick_kitchen_timer(&mut self, now: Instant) {
        if let Some(timer) = self.kitchen_timer {
            if timer.is_finished(now) {
                self.kitchen_timer = None;
            }
        }
    }

    pub fn begin_reload(&mut self, delay_secs: u64, now: Instant) {
        let countdown = ReloadCountdown::new(delay_secs, now);
        self.show_alert(countdown.message(now));
        self.reload = Some(countdown);
    }

    /// Advance the reload countdown; returns true exactly once, when the
    /// listing refresh is due.
    pub fn tick_reload(&mut self, now: Instant) -> bool {
        let Some(countdown) = self.reload else {
            return false;
        };
        if countdown.is_due(now) {
            self.reload = None;
            self.hide_alert();
            return true;
        }
        self.set_alert_message(countdown.message(now));
        false
    }

    // --- server events -------------------------------------------------

    /// Hand out the sequence number for a freshly dispatched search;
    /// replies carrying an older number are dropped on arrival.
    pub fn next_search_seq(&mut self) -> u64 {
        self.latest_search += 1;
        self.latest_search
    }

    pub fn apply_server_event(&mut self, event: ServerEvent, now: Instant) {
        match event {
            ServerEvent::HomeLoaded { recipes, tags } => {
                self.recipes = recipes;
                self.tags.set_names(tags);
                self.selected = 0;
                self.normalize_selection();
                self.last_loaded = Some(OffsetDateTime::now_utc());
                self.status_message = None;
            }
            ServerEvent::HomeFailed { error } => {
                self.status_message = Some(format!("Could not load recipes: {error}"));
            }
            ServerEvent::SearchLoaded { entries, seq } => {
                if seq != self.latest_search {
                    tracing::debug!(seq, "dropping superseded search response");
                    return;
                }
                self.recipes = entries;
                self.selected = 0;
                self.normalize_selection();
                self.last_loaded = Some(OffsetDateTime::now_utc());
            }
            ServerEvent::SearchFailed { error, seq } => {
                // The page only ever logged these; keep that contract.
                tracing::error!(%error, seq, "search request failed");
            }
            ServerEvent::PageOpened => self.hide_alert(),
            ServerEvent::PageRejected { message } => self.show_alert(message),
            ServerEvent::PageIgnored { status } => {
                // Deliberately no user feedback for anything but 400.
                tracing::debug!(status, "unhandled page fetch status");
            }
            ServerEvent::TimerStarted { seconds } => self.start_kitchen_timer(seconds, now),
        }
    }

    fn normalize_selection(&mut self) {
        if self.recipes.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.recipes.len() {
            self.selected = self.recipes.len() - 1;
        }
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor == 0 {
        return 0;
    }
    let mut last = 0;
    for (idx, _) in text[..cursor].grapheme_indices(true) {
        last = idx;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;

    fn strip_with(names: &[&str]) -> TagStrip {
        let mut strip = TagStrip::default();
        strip.set_names(names.iter().map(|s| s.to_string()).collect());
        strip
    }

    fn entry(name: &str) -> RecipeEntry {
        RecipeEntry {
            name: name.to_string(),
            href: format!("/recipes/{}", name.to_lowercase()),
        }
    }

    #[test]
    fn at_most_one_tag_is_selected_across_any_toggle_sequence() {
        let mut strip = strip_with(&["Dinner", "Dessert", "Soup"]);

        strip.cursor = 0;
        assert_matches!(
            strip.toggle_at_cursor(),
            Some(TagToggle::Selected(tag)) if tag == "Dinner"
        );
        strip.cursor = 2;
        assert_matches!(
            strip.toggle_at_cursor(),
            Some(TagToggle::Selected(tag)) if tag == "Soup"
        );

        // Selecting "Soup" displaced "Dinner".
        assert_eq!(strip.selected_name(), Some("Soup"));
        let selected = (0..3).filter(|&i| strip.is_selected(i)).count();
        assert_eq!(selected, 1);
    }

    #[test]
    fn toggling_the_selected_tag_clears_the_filter() {
        let mut strip = strip_with(&["Dinner", "Dessert"]);
        strip.cursor = 1;
        strip.toggle_at_cursor();
        assert_eq!(strip.selected_name(), Some("Dessert"));

        assert_eq!(strip.toggle_at_cursor(), Some(TagToggle::Cleared));
        assert_eq!(strip.selected_name(), None);
    }

    #[test]
    fn tag_cursor_clamps_to_the_strip() {
        let mut strip = strip_with(&["A", "B"]);
        strip.move_cursor(-5);
        assert_eq!(strip.cursor, 0);
        strip.move_cursor(10);
        assert_eq!(strip.cursor, 1);
    }

    #[test]
    fn alert_messages_overwrite_in_place() {
        let mut state = AppState::new();
        state.show_alert("Opening recipe page");
        state.show_alert("Invalid or unsafe URL");

        assert_eq!(state.alert().map(|a| a.message.as_str()), Some("Invalid or unsafe URL"));
        state.hide_alert();
        assert!(state.alert().is_none());
    }

    #[test]
    fn hiding_the_alert_leaves_other_overlays_alone() {
        let mut state = AppState::new();
        state.open_link_prompt();
        state.hide_alert();
        assert!(state.link_prompt().is_some());
    }

    #[test]
    fn stale_search_responses_are_dropped() {
        let now = Instant::now();
        let mut state = AppState::new();
        let first = state.next_search_seq();
        let second = state.next_search_seq();

        state.apply_server_event(
            ServerEvent::SearchLoaded {
                entries: vec![entry("Latest")],
                seq: second,
            },
            now,
        );
        state.apply_server_event(
            ServerEvent::SearchLoaded {
                entries: vec![entry("Stale")],
                seq: first,
            },
            now,
        );

        assert_eq!(state.recipes.len(), 1);
        assert_eq!(state.recipes[0].name, "Latest");
    }

    #[test]
    fn starting_a_second_timer_supersedes_the_first() {
        let now = Instant::now();
        let mut state = AppState::new();
        state.start_kitchen_timer(600, now);
        state.start_kitchen_timer(125, now);

        let timer = state.kitchen_timer.expect("one active countdown");
        assert_eq!(timer.display(now), "2:05");

        // The first timer's schedule is gone with it: ticking past the
        // replacement's end clears the countdown entirely.
        state.tick_kitchen_timer(now + Duration::from_secs(125));
        assert!(state.kitchen_timer.is_none());
    }

    #[test]
    fn reload_updates_the_alert_then_fires_once() {
        let now = Instant::now();
        let mut state = AppState::new();
        state.begin_reload(5, now);
        assert_eq!(
            state.alert().map(|a| a.message.as_str()),
            Some("Page reloading in 5 seconds")
        );

        assert!(!state.tick_reload(now + Duration::from_secs(3)));
        assert_eq!(
            state.alert().map(|a| a.message.as_str()),
            Some("Page reloading in 2 seconds")
        );

        assert!(state.tick_reload(now + Duration::from_secs(5)));
        assert!(state.alert().is_none());
        // Consumed: later ticks are inert.
        assert!(!state.tick_reload(now + Duration::from_secs(6)));
    }

    #[test]
    fn home_load_resets_listing_tags_and_selection() {
        let now = Instant::now();
        let mut state = AppState::new();
        state.selected = 7;
        state.apply_server_event(
            ServerEvent::HomeLoaded {
                recipes: vec![entry("Apple Pie"), entry("Beef Stew")],
                tags: vec!["Dinner".into()],
            },
            now,
        );

        assert_eq!(state.len(), 2);
        assert_eq!(state.selected, 0);
        assert_eq!(state.tags.names(), ["Dinner".to_string()]);
        assert!(state.last_loaded.is_some());
    }

    #[test]
    fn search_input_pops_whole_graphemes() {
        let mut search = SearchState::default();
        for ch in "crème".chars() {
            search.push_char(ch);
        }
        assert!(search.pop_char());
        assert_eq!(search.query, "crèm");
    }
}
