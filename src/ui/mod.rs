use std::time::Instant;

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::macros::format_description;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, FocusPane, OverlayState};
use crate::highlight::build_query_regex;

pub fn draw_app(frame: &mut Frame, state: &AppState, list_state: &mut ListState, now: Instant) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    draw_search_bar(frame, state, vertical[0]);
    draw_tag_strip(frame, state, vertical[1]);
    draw_results(frame, state, list_state, vertical[2]);
    draw_status(frame, state, now, vertical[3]);

    render_overlays(frame, state, now);
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn draw_search_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let focused = matches!(state.focus, FocusPane::Search);
    let input = Paragraph::new(state.search.query.as_str()).block(
        Block::default()
            .title("Search")
            .borders(Borders::ALL)
            .border_style(focus_style(focused)),
    );
    frame.render_widget(input, area);

    if focused && state.overlay().is_none() {
        let cursor_x = area.x + 1 + state.search.query.width() as u16;
        frame.set_cursor(cursor_x.min(area.right().saturating_sub(2)), area.y + 1);
    }
}

fn draw_tag_strip(frame: &mut Frame, state: &AppState, area: Rect) {
    let focused = matches!(state.focus, FocusPane::Tags);
    let mut spans = Vec::new();
    if state.tags.is_empty() {
        spans.push(Span::styled(
            "(no tags)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    for (index, name) in state.tags.names().iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" "));
        }
        let mut style = if state.tags.is_selected(index) {
            // The "filtering on this tag" look, standing in for the
            // page's is-info chip color.
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green)
        };
        if focused && index == state.tags.cursor {
            style = style.add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        }
        spans.push(Span::styled(format!(" {name} "), style));
    }

    let strip = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title("Tags")
            .borders(Borders::ALL)
            .border_style(focus_style(focused)),
    );
    frame.render_widget(strip, area);
}

fn draw_results(frame: &mut Frame, state: &AppState, list_state: &mut ListState, area: Rect) {
    let focused = matches!(state.focus, FocusPane::Results);
    let highlight_regex = build_query_regex(&state.search.query);
    let highlight_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut items = Vec::with_capacity(state.recipes.len());
    for recipe in &state.recipes {
        let name_line = Line::from(highlight_line(
            &recipe.name,
            highlight_regex.as_ref(),
            highlight_style,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        let href_line = Line::from(Span::styled(
            recipe.href.clone(),
            Style::default().fg(Color::Gray),
        ));
        items.push(ListItem::new(vec![name_line, href_line]));
    }
    if items.is_empty() {
        items.push(ListItem::new("No recipes to show."));
    }

    let list = List::new(items)
        .block(
            Block::default()
                .title("Recipes")
                .borders(Borders::ALL)
                .border_style(focus_style(focused)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_status(frame: &mut Frame, state: &AppState, now: Instant, area: Rect) {
    let total = state.len();
    let position = if state.is_empty() {
        "0/0".to_string()
    } else {
        format!("{}/{}", state.selected + 1, total)
    };
    let focus = match state.focus {
        FocusPane::Search => "Search",
        FocusPane::Tags => "Tags",
        FocusPane::Results => "Recipes",
    };

    let mut spans = vec![
        Span::raw(format!("Recipes: {total} ")),
        Span::raw(" | Selected: "),
        Span::styled(position, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" | Focus: "),
        Span::styled(focus, Style::default().add_modifier(Modifier::BOLD)),
    ];

    if let Some(tag) = state.tags.selected_name() {
        spans.push(Span::raw(" | Filter: "));
        spans.push(Span::styled(
            format!("#{tag}"),
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(loaded) = state.last_loaded {
        let format = format_description!("[hour]:[minute]:[second]");
        if let Ok(stamp) = loaded.format(&format) {
            spans.push(Span::raw(" | Loaded "));
            spans.push(Span::styled(stamp, Style::default().fg(Color::Gray)));
        }
    }

    if let Some(timer) = state.kitchen_timer {
        spans.push(Span::raw(" | Timer: "));
        spans.push(Span::styled(
            timer.display(now),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let mut lines = vec![Line::from(spans)];
    if let Some(message) = &state.status_message {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Tab focus • / search • Space tag • Enter open • o link • r refresh • g sync • m rebuild • q quit",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let status = Paragraph::new(Text::from(lines)).style(Style::default().fg(Color::Gray));
    frame.render_widget(status, area);
}

fn render_overlays(frame: &mut Frame, state: &AppState, now: Instant) {
    if let Some(timer) = state.kitchen_timer {
        let area = centered_rect(36, 5, frame.size());
        frame.render_widget(Clear, area);
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title("Kitchen timer")
                    .borders(Borders::ALL),
            )
            .gauge_style(
                Style::default()
                    .fg(Color::Magenta)
                    .bg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .ratio((timer.progress_percent(now) / 100.0).clamp(0.0, 1.0))
            .label(timer.display(now));
        frame.render_widget(gauge, area);
    }

    match state.overlay() {
        Some(OverlayState::Alert(alert)) => {
            let width = (alert.message.width() as u16 + 6).clamp(24, 60);
            let area = centered_rect(width, 5, frame.size());
            frame.render_widget(Clear, area);
            let body = Paragraph::new(Text::from(vec![
                Line::from(alert.message.clone()),
                Line::from(Span::styled(
                    "Esc to dismiss",
                    Style::default().fg(Color::DarkGray),
                )),
            ]))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Alert")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            );
            frame.render_widget(body, area);
        }
        Some(OverlayState::LinkPrompt(prompt)) => {
            let area = centered_rect(50, 3, frame.size());
            frame.render_widget(Clear, area);
            let body = Paragraph::new(prompt.url.as_str()).block(
                Block::default()
                    .title("Open link")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            );
            frame.render_widget(body, area);
            let cursor_x = area.x + 1 + prompt.url.width() as u16;
            frame.set_cursor(cursor_x.min(area.right().saturating_sub(2)), area.y + 1);
        }
        None => {}
    }
}

fn highlight_line<'a>(
    text: &'a str,
    regex: Option<&Regex>,
    highlight: Style,
    base: Style,
) -> Vec<Span<'a>> {
    let Some(regex) = regex else {
        return vec![Span::styled(text, base)];
    };
    let mut spans = Vec::new();
    let mut cursor = 0;
    for found in regex.find_iter(text) {
        if found.start() > cursor {
            spans.push(Span::styled(&text[cursor..found.start()], base));
        }
        spans.push(Span::styled(&text[found.start()..found.end()], highlight));
        cursor = found.end();
    }
    if cursor < text.len() {
        spans.push(Span::styled(&text[cursor..], base));
    }
    if spans.is_empty() {
        spans.push(Span::styled(text, base));
    }
    spans
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
