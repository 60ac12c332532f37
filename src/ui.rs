use crate::app::{App, InputMode, SwipeDirection};
use crate::board::Source;
use crate::store::TaskRepository;
use crate::task::Filter;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs},
    Frame, Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};

const IDLE_POLL: Duration = Duration::from_millis(250);
const SWIPE_POLL: Duration = Duration::from_millis(50);

pub fn run_app<B: Backend, R: TaskRepository>(
    terminal: &mut Terminal<B>,
    app: &mut App<R>,
) -> io::Result<()> {
    while !app.should_quit {
        terminal.draw(|f| draw(f, app))?;

        let timeout = if app.swipe_active() { SWIPE_POLL } else { IDLE_POLL };
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }
        app.tick(Instant::now());
    }
    Ok(())
}

pub fn draw<R: TaskRepository>(f: &mut Frame, app: &mut App<R>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(f.area());

    draw_filters(f, app, chunks[0]);
    draw_tasks(f, app, chunks[1]);
    draw_input(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);
}

fn draw_filters<R: TaskRepository>(f: &mut Frame, app: &App<R>, area: Rect) {
    let counts = app.board.counts();
    let titles: Vec<Line> = Filter::ALL
        .iter()
        .map(|filter| Line::from(format!("{} ({})", filter.label(), counts.get(*filter))))
        .collect();
    let tabs = Tabs::new(titles)
        .block(Block::default().title("Tasks").borders(Borders::ALL))
        .select(app.filter.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );
    f.render_widget(tabs, area);
}

fn draw_tasks<R: TaskRepository>(f: &mut Frame, app: &mut App<R>, area: Rect) {
    let items: Vec<ListItem> = app
        .visible()
        .iter()
        .map(|t| {
            let (mark, text_style) = if t.done {
                (
                    "[x] ",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ("[ ] ", Style::default().fg(Color::White))
            };
            let mut spans = Vec::with_capacity(4);
            if app.swipe_of(t.id) == Some(SwipeDirection::Right) {
                spans.push(Span::styled("  » ", Style::default().fg(Color::Green)));
            }
            spans.push(Span::raw(mark));
            spans.push(Span::styled(t.text.clone(), text_style));
            if app.swipe_of(t.id) == Some(SwipeDirection::Left) {
                spans.push(Span::styled(" « ", Style::default().fg(Color::Yellow)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let title = match app.board.source() {
        Source::Store => app.filter.label().to_string(),
        Source::LocalFallback => format!("{} (local)", app.filter.label()),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if app.mode == InputMode::Normal {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        });

    if items.is_empty() {
        let hint = Paragraph::new("Nothing here yet. Press 'a' to add a task.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(hint, area);
    } else {
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
        f.render_stateful_widget(list, area, &mut app.list_state);
    }
}

fn draw_input<R: TaskRepository>(f: &mut Frame, app: &App<R>, area: Rect) {
    let editing = app.mode == InputMode::Editing;
    let input = Paragraph::new(app.input.as_str()).block(
        Block::default()
            .title(if editing { "New task (Enter to add, Esc to cancel)" } else { "New task (a)" })
            .borders(Borders::ALL)
            .border_style(if editing {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            }),
    );
    f.render_widget(input, area);

    if editing {
        f.set_cursor_position(input_cursor(area, &app.input));
    }
}

/// Cursor just past the typed text, kept inside the box borders.
fn input_cursor(area: Rect, input: &str) -> Position {
    let width = u16::try_from(input.chars().count()).unwrap_or(u16::MAX);
    let x = area
        .x
        .saturating_add(1)
        .saturating_add(width)
        .min(area.right().saturating_sub(2));
    Position::new(x, area.y.saturating_add(1))
}

fn draw_footer<R: TaskRepository>(f: &mut Frame, app: &App<R>, area: Rect) {
    let diag = &app.diagnostics;
    let mut lines = vec![Line::from(vec![
        Span::raw(format!(
            "SQLite {} · schema {}",
            diag.engine_version, diag.schema_version
        )),
        Span::styled(
            "  ·  space toggle  ←/→ swipe  tab filter  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ])];
    if let Some(err) = app.board.last_error() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    f.render_widget(Paragraph::new(lines), area);
}
