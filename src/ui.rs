use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Screen};
use crate::clock::Clock;
use crate::history::Metric;
use crate::session::{SessionResult, SlotStatus};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const RECENT_SESSIONS: usize = 10;

impl<C: Clock> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Typing => render_typing(self, area, buf),
            Screen::Results => render_results(self, area, buf),
            Screen::History => render_history(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn render_typing<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let engine = &app.engine;
    let green_bold_style = bold().fg(Color::Green);
    let red_bold_style = bold().fg(Color::Red);
    let underlined_dim_bold_style = dim_bold().add_modifier(Modifier::UNDERLINED);

    let prompt = engine.text();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_occupied_lines = if prompt.width() <= max_chars_per_line as usize {
        1
    } else {
        ((prompt.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
    };
    let padding = area.height.saturating_sub(prompt_occupied_lines + 2) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(2),
            Constraint::Length(prompt_occupied_lines),
            Constraint::Length(padding),
        ])
        .split(area);

    let cursor = engine.current_index();
    let spans = engine
        .slots()
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let style = if idx == cursor {
                underlined_dim_bold_style
            } else {
                match slot.status {
                    SlotStatus::Correct => green_bold_style,
                    SlotStatus::Incorrect => red_bold_style,
                    SlotStatus::Untested => dim_bold(),
                }
            };
            let symbol = match (slot.status, slot.expected) {
                // a missed space would be invisible
                (SlotStatus::Incorrect, ' ') => "·".to_owned(),
                (_, c) => c.to_string(),
            };
            Span::styled(symbol, style)
        })
        .collect::<Vec<Span>>();

    let widget = Paragraph::new(Line::from(spans))
        .alignment(if prompt_occupied_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: true });
    widget.render(chunks[2], buf);

    let timer = Paragraph::new(Span::styled(
        format!("{:.1}s", engine.elapsed().as_secs_f64()),
        dim_bold(),
    ))
    .alignment(Alignment::Center);
    timer.render(chunks[1], buf);

    if let Some(notice) = &app.notice {
        notice_line(notice).render(chunks[3], buf);
    }
}

fn notice_line(notice: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(notice, Style::default().fg(Color::Yellow)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
}

pub fn format_result(result: &SessionResult) -> String {
    format!(
        "{:.2} wpm   {:.2} cpm   {:.2}% acc   {}/{} correct",
        result.wpm, result.cpm, result.accuracy_percent, result.correct_count, result.total_count
    )
}

fn render_results<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // title
            Constraint::Length(1), // stats
            Constraint::Length(1), // timing
            Constraint::Length(2), // notice
            Constraint::Min(1),    // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        "Test Complete!",
        bold().fg(Color::Magenta),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    if let Some(result) = &app.last_result {
        Paragraph::new(Span::styled(format_result(result), bold()))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        let saved = app
            .last_record
            .map(|r| format!("   session #{}", r.id))
            .unwrap_or_default();
        Paragraph::new(Span::styled(
            format!(
                "{:.1}s   finished {}{}",
                result.elapsed_minutes * 60.0,
                result.completed_at.format("%H:%M:%S"),
                saved
            ),
            italic(),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
    }

    if let Some(notice) = &app.notice {
        notice_line(notice).render(chunks[3], buf);
    }

    Paragraph::new(Span::styled(
        "(enter/n)ew / (r)etry / (h)istory / (esc)ape",
        italic(),
    ))
    .render(chunks[5], buf);
}

fn render_history<C: Clock>(app: &App<C>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(3), // averages
            Constraint::Min(0),    // recent sessions
            Constraint::Length(1), // legend
        ])
        .split(area);

    let summary = app.history.aggregate();
    let averages = format!(
        "Average WPM: {:.1}   Average CPM: {:.1}   Average Accuracy: {:.1}%",
        summary.avg_wpm, summary.avg_cpm, summary.avg_accuracy
    );
    Paragraph::new(averages)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("History ({} sessions)", app.history.len())),
        )
        .style(bold().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    if app.history.is_empty() {
        Paragraph::new("No sessions yet.\nComplete a typing test to start your history!")
            .block(Block::default().borders(Borders::ALL).title("No Data"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    } else {
        let header = Row::new(
            std::iter::once(Cell::from("#"))
                .chain(Metric::ALL.iter().map(|m| Cell::from(m.to_string())))
                .collect::<Vec<_>>(),
        )
        .style(bold().fg(Color::Yellow));

        let rows = app
            .history
            .recent(RECENT_SESSIONS)
            .into_iter()
            .map(|record| {
                Row::new(
                    std::iter::once(Cell::from(record.id.to_string()))
                        .chain(
                            Metric::ALL
                                .iter()
                                .map(|m| Cell::from(m.of(&record.metrics).to_string())),
                        )
                        .collect::<Vec<_>>(),
                )
            })
            .collect::<Vec<_>>();

        Table::new(
            rows,
            [
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Recent sessions"),
        )
        .render(chunks[1], buf);
    }

    Paragraph::new(Span::styled(
        "(tab/b)ack / (enter/n)ew / (esc)ape",
        italic(),
    ))
    .render(chunks[2], buf);
}
