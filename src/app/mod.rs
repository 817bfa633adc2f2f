use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::client::poller::{self, PollerHandle};
use crate::client::worker::{self, ServerEvent, WorkerHandle};
use crate::client::ServerClient;
use crate::config::AppConfig;
use crate::timers::SearchDebounce;
use crate::ui;

mod actions;
pub mod state;

use actions::RequestDispatcher;
pub use state::{AppState, FocusPane, OverlayState, TagToggle};

const GIT_PULL_PATH: &str = "/git_pull";
const MAKE_RECIPES_PATH: &str = "/make_recipes";

enum Action {
    Quit,
    FocusSearch,
    FocusNext,
    SelectNext,
    SelectPrevious,
    TagLeft,
    TagRight,
    ToggleTag,
    OpenSelected,
    OpenLinkPrompt,
    Refresh,
    SyncFromGit,
    RegeneratePages,
}

pub struct App {
    config: Arc<AppConfig>,
    state: AppState,
    list_state: ListState,
    debounce: SearchDebounce,
    worker: WorkerHandle,
    events: Receiver<ServerEvent>,
    poller: Option<PollerHandle>,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>) -> Result<Self> {
        let client = ServerClient::new(&config.server.base_url, config.server.timeout())
            .context("building server client")?;

        let (events_tx, events_rx) = unbounded();
        let worker =
            worker::spawn(client.clone(), events_tx.clone()).context("starting request worker")?;
        let poller = if config.commands.enabled {
            Some(
                poller::spawn(client, config.commands.poll_interval(), events_tx)
                    .context("starting command poller")?,
            )
        } else {
            None
        };

        let debounce = SearchDebounce::new(config.search.debounce_duration());
        let app = Self {
            config,
            state: AppState::new(),
            list_state: ListState::default(),
            debounce,
            worker,
            events: events_rx,
            poller,
            should_quit: false,
            tick_rate: Duration::from_millis(200),
        };
        // Seed the listing and the tag strip from the home page.
        RequestDispatcher::new(&app.worker).load_home();
        Ok(app)
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        if let Some(poller) = self.poller.as_mut() {
            poller.stop();
        }
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            terminal
                .draw(|frame| {
                    if !self.state.is_empty() {
                        self.list_state.select(Some(self.state.selected));
                    } else {
                        self.list_state.select(None);
                    }
                    ui::draw_app(frame, &self.state, &mut self.list_state, Instant::now());
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Resize(_, _) => {
                        // no-op: the next draw adapts to the new size
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        let now = Instant::now();

        if self.debounce.poll(now) {
            RequestDispatcher::new(&self.worker).search(&mut self.state);
        }

        while let Ok(event) = self.events.try_recv() {
            self.state.apply_server_event(event, now);
        }

        if self.state.tick_reload(now) {
            // The refresh the page reload stood for: drop all filters and
            // re-fetch the listing wholesale.
            self.state.search.clear();
            RequestDispatcher::new(&self.worker).load_home();
        }

        self.state.tick_kitchen_timer(now);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.focus == FocusPane::Search {
            self.handle_search_key(key);
            return;
        }

        let action = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('/') => Some(Action::FocusSearch),
            KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::Char('h') | KeyCode::Left => Some(Action::TagLeft),
            KeyCode::Char('l') | KeyCode::Right => Some(Action::TagRight),
            KeyCode::Char(' ') if self.state.focus == FocusPane::Tags => Some(Action::ToggleTag),
            KeyCode::Enter => match self.state.focus {
                FocusPane::Tags => Some(Action::ToggleTag),
                FocusPane::Results => Some(Action::OpenSelected),
                FocusPane::Search => None,
            },
            KeyCode::Char('o') => Some(Action::OpenLinkPrompt),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('g') => Some(Action::SyncFromGit),
            KeyCode::Char('m') => Some(Action::RegeneratePages),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        let now = Instant::now();
        match action {
            Action::Quit => self.should_quit = true,
            Action::FocusSearch => self.state.focus = FocusPane::Search,
            Action::FocusNext => self.state.focus = self.state.focus.next(),
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::TagLeft => self.state.tags.move_cursor(-1),
            Action::TagRight => self.state.tags.move_cursor(1),
            Action::ToggleTag => self.handle_toggle_tag(),
            Action::OpenSelected => self.handle_open_selected(),
            Action::OpenLinkPrompt => {
                self.state.open_link_prompt();
                self.state
                    .set_status_message(Some("Open link: type a URL • Enter open • Esc cancel"));
            }
            Action::Refresh => {
                RequestDispatcher::new(&self.worker).load_home();
            }
            Action::SyncFromGit => {
                RequestDispatcher::new(&self.worker).reload(
                    &mut self.state,
                    GIT_PULL_PATH.to_string(),
                    self.config.reload.delay_secs,
                    now,
                );
            }
            Action::RegeneratePages => {
                RequestDispatcher::new(&self.worker).reload(
                    &mut self.state,
                    MAKE_RECIPES_PATH.to_string(),
                    self.config.reload.delay_secs,
                    now,
                );
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        let now = Instant::now();
        match key.code {
            KeyCode::Tab => self.state.focus = self.state.focus.next(),
            KeyCode::Enter => {
                // Explicit submit bypasses the quiet-period wait.
                self.debounce.cancel();
                RequestDispatcher::new(&self.worker).search(&mut self.state);
            }
            KeyCode::Backspace => {
                if self.state.search.pop_char() {
                    self.debounce.note_input(now);
                }
            }
            KeyCode::Esc => {
                if self.state.search.clear() {
                    self.debounce.note_input(now);
                }
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.state.search.push_char(ch);
                self.debounce.note_input(now);
            }
            _ => {}
        }
    }

    fn handle_toggle_tag(&mut self) {
        let Some(toggle) = self.state.tags.toggle_at_cursor() else {
            return;
        };
        // A toggle always outruns any half-typed search.
        self.debounce.cancel();
        let dispatcher = RequestDispatcher::new(&self.worker);
        match toggle {
            TagToggle::Selected(tag) => dispatcher.filter(&mut self.state, tag),
            TagToggle::Cleared => dispatcher.search(&mut self.state),
        }
    }

    fn handle_open_selected(&mut self) {
        let Some(path) = self.state.selected_recipe().map(|r| r.href.clone()) else {
            self.state.set_status_message(Some("No recipe selected"));
            return;
        };
        RequestDispatcher::new(&self.worker).open_recipe(&mut self.state, path);
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match self.state.overlay() {
            Some(OverlayState::Alert(_)) => {
                // Dismissing the alert never cancels a pending reload; the
                // refresh still fires on schedule.
                if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                    self.state.hide_alert();
                }
                true
            }
            Some(OverlayState::LinkPrompt(_)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Canceled"));
                    }
                    KeyCode::Enter => self.submit_link(),
                    KeyCode::Backspace => {
                        if let Some(prompt) = self.state.link_prompt_mut() {
                            prompt.url.pop();
                        }
                    }
                    KeyCode::Char(ch)
                        if !key.modifiers.intersects(
                            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                        ) =>
                    {
                        if let Some(prompt) = self.state.link_prompt_mut() {
                            if prompt.url.len() < 512 {
                                prompt.url.push(ch);
                            }
                        }
                    }
                    _ => {}
                }
                true
            }
            None => false,
        }
    }

    fn submit_link(&mut self) {
        let Some(url) = self
            .state
            .link_prompt()
            .map(|prompt| prompt.url.trim().to_string())
        else {
            return;
        };
        if url.is_empty() {
            self.state.set_status_message(Some("URL cannot be empty"));
            return;
        }
        RequestDispatcher::new(&self.worker).open_link(url);
        self.state.close_overlay();
        self.state.set_status_message(Some("Opening link"));
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
