use crate::app::App;
use crate::model::{self, FilterMode, Task};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(mut app: App) -> Result<()> {
    let mut terminal = setup_terminal()?;
    app.start_load();
    let result = event_loop(&mut app, &mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

/// Shown instead of the task view when no user id is configured.
pub fn run_warning() -> Result<()> {
    let mut terminal = setup_terminal()?;
    let result = warning_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

fn event_loop(app: &mut App, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| draw(f, app))?;
        if event::poll(poll_timeout(app, Instant::now()))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn warning_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    loop {
        terminal.draw(draw_warning)?;
        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Wake up no later than the next banner deadline so it clears on time.
fn poll_timeout(app: &App, now: Instant) -> Duration {
    app.notifier()
        .next_deadline()
        .map(|d| d.saturating_duration_since(now).min(POLL_INTERVAL))
        .unwrap_or(POLL_INTERVAL)
}

pub fn draw(f: &mut ratatui::Frame<'_>, app: &App) {
    let footer_height = if app.footer_visible() { 2 } else { 0 };
    let banner_height = if app.error_message().is_some() { 3 } else { 0 };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(3),
            Constraint::Length(footer_height),
            Constraint::Length(banner_height),
            Constraint::Length(2),
        ])
        .split(f.size());

    draw_header(f, app, layout[0]);
    draw_list(f, app, layout[1]);
    if app.footer_visible() {
        draw_footer(f, app.tasks(), app.filter(), layout[2]);
    }
    if let Some(message) = app.error_message() {
        draw_banner(f, message, layout[3]);
    }
    draw_help(f, app, layout[4]);
}

fn draw_header(f: &mut ratatui::Frame<'_>, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3)])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        "todos",
        Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(title, rows[0]);

    // The input is placeholder chrome; nothing is wired to it.
    let input = Line::from(vec![
        toggle_all_span(app.all_completed()),
        Span::raw(" "),
        Span::styled(
            "What needs to be done?",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ),
    ]);
    let paragraph = Paragraph::new(input).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, rows[1]);
}

fn toggle_all_span(active: bool) -> Span<'static> {
    let style = if active {
        Style::default()
            .fg(Color::LightGreen)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled("❯", style)
}

fn draw_list(f: &mut ratatui::Frame<'_>, app: &App, area: Rect) {
    let width = area.width.saturating_sub(8) as usize;
    let items = app
        .filtered_tasks()
        .into_iter()
        .map(|task| task_item(task, width))
        .collect::<Vec<_>>();
    let title = format!("{} ({})", app.filter().label(), items.len());
    let block = Block::default()
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if items.is_empty() {
        let text = if app.is_loading() {
            "Loading..."
        } else {
            "Nothing to show"
        };
        let empty = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }
    f.render_widget(List::new(items).block(block), area);
}

fn task_item(task: &Task, width: usize) -> ListItem<'static> {
    let title = truncate_text(&task.title, width);
    let line = if task.completed {
        Line::from(vec![
            Span::styled("[x] ", Style::default().fg(Color::LightGreen)),
            Span::styled(
                title,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT),
            ),
        ])
    } else {
        Line::from(vec![
            Span::styled("[ ] ", Style::default().fg(Color::Gray)),
            Span::styled(title, Style::default().fg(Color::White)),
        ])
    };
    ListItem::new(line)
}

fn draw_footer(f: &mut ratatui::Frame<'_>, tasks: &[Task], filter: FilterMode, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let summary = Paragraph::new(footer_summary(tasks))
        .style(Style::default().fg(Color::Gray))
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(summary, cols[0]);

    let selected = FilterMode::MODES
        .iter()
        .position(|m| *m == filter)
        .unwrap_or(0);
    let tabs = Tabs::new(FilterMode::MODES.iter().map(|m| m.label()).collect::<Vec<_>>())
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider("|")
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(tabs, cols[1]);
}

fn footer_summary(tasks: &[Task]) -> String {
    let total = tasks.len();
    let left = model::active_count(tasks);
    format!(
        "{} {} · {} {} left",
        total,
        if total == 1 { "task" } else { "tasks" },
        left,
        if left == 1 { "item" } else { "items" }
    )
}

fn draw_banner(f: &mut ratatui::Frame<'_>, message: &str, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", message),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("  (x to dismiss)", Style::default().fg(Color::Gray)),
    ]);
    let banner = Paragraph::new(line)
        .style(Style::default().bg(Color::Rgb(120, 24, 32)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed)),
        );
    f.render_widget(Clear, area);
    f.render_widget(banner, area);
}

fn draw_help(f: &mut ratatui::Frame<'_>, app: &App, area: Rect) {
    let mut status = app.status().to_string();
    if let Some(at) = app.loaded_at() {
        status.push_str(&format!("  •  loaded {}", at.format("%H:%M:%S")));
    }
    let help = Line::from(vec![
        Span::styled("1/2/3", Style::default().fg(Color::LightCyan)),
        Span::raw(" filter  "),
        Span::styled("Tab/←→", Style::default().fg(Color::LightCyan)),
        Span::raw(" cycle  "),
        Span::styled("r", Style::default().fg(Color::LightGreen)),
        Span::raw(" reload  "),
        Span::styled("x", Style::default().fg(Color::LightYellow)),
        Span::raw(" dismiss  "),
        Span::styled("q", Style::default().fg(Color::LightRed)),
        Span::raw(" quit"),
    ]);
    let lines = vec![
        help,
        Line::from(Span::styled(status, Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

pub fn draw_warning(f: &mut ratatui::Frame<'_>) {
    let area = centered_rect(60, 40, f.size());
    let text = vec![
        Line::from(Span::styled(
            "No user id configured",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        Line::raw("Set `user_id` in config.yml or pass --user-id <N>, then restart."),
        Line::raw(""),
        Line::from(Span::styled(
            "q to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let warning = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::LightRed))
                .title("todos"),
        );
    f.render_widget(Clear, area);
    f.render_widget(warning, area);
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::settle;
    use crate::model::{task, UserId};
    use crate::notifier::AUTO_CLEAR_DELAY;
    use crate::source::stub::StubSource;
    use ratatui::backend::TestBackend;

    fn render(app: &App) -> String {
        render_with(|f| draw(f, app))
    }

    fn render_with<F: FnOnce(&mut ratatui::Frame<'_>)>(paint: F) -> String {
        let backend = TestBackend::new(90, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(paint).unwrap();
        let buf = terminal.backend().buffer();
        let area = buf.area;
        let mut lines = Vec::new();
        for y in area.y..area.y + area.height {
            let mut line = String::new();
            for x in area.x..area.x + area.width {
                line.push_str(buf.get(x, y).symbol());
            }
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }

    fn loaded_app(tasks: Vec<Task>) -> App {
        let mut app = App::new(StubSource::ok(tasks), UserId::new(1).unwrap());
        app.start_load();
        settle(&mut app);
        app
    }

    #[test]
    fn active_filter_renders_only_open_tasks() {
        let mut app = loaded_app(vec![task(1, "A", false), task(2, "B", true)]);
        app.set_filter(FilterMode::Active);
        let screen = render(&app);

        assert!(screen.contains("[ ] A"), "{screen}");
        assert!(!screen.contains("[x] B"), "{screen}");
        assert!(screen.contains("2 tasks · 1 item left"), "{screen}");
        assert!(screen.contains("Active (1)"), "{screen}");
        assert!(!app.all_completed());
        assert!(!screen.contains("Unable to load todos"));
    }

    #[test]
    fn empty_store_hides_footer() {
        let app = loaded_app(vec![]);
        let screen = render(&app);
        assert!(!screen.contains("left"), "{screen}");
        assert!(screen.contains("Nothing to show"), "{screen}");
        assert!(app.all_completed());
    }

    #[test]
    fn failed_load_shows_banner_until_expiry() {
        let mut app = App::new(StubSource::failing(), UserId::new(1).unwrap());
        app.start_load();
        let t = settle(&mut app);

        let screen = render(&app);
        assert!(screen.contains("Unable to load todos"), "{screen}");
        assert!(!screen.contains("left"));

        app.tick(t + AUTO_CLEAR_DELAY);
        let screen = render(&app);
        assert!(!screen.contains("Unable to load todos"), "{screen}");
    }

    #[test]
    fn toggle_all_highlights_only_when_everything_done() {
        assert_eq!(toggle_all_span(true).style.fg, Some(Color::LightGreen));
        assert_eq!(toggle_all_span(false).style.fg, Some(Color::DarkGray));
    }

    #[test]
    fn warning_view_explains_missing_user() {
        let screen = render_with(draw_warning);
        assert!(screen.contains("No user id configured"), "{screen}");
    }

    #[test]
    fn poll_timeout_is_bounded_by_banner_deadline() {
        let mut app = App::new(StubSource::failing(), UserId::new(1).unwrap());
        assert_eq!(poll_timeout(&app, Instant::now()), POLL_INTERVAL);
        app.start_load();
        let t = settle(&mut app);
        let near = t + AUTO_CLEAR_DELAY - Duration::from_millis(50);
        assert_eq!(poll_timeout(&app, near), Duration::from_millis(50));
    }

    #[test]
    fn truncates_long_titles() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a very long title", 10), "a very ...");
        assert_eq!(truncate_text("abc", 0), "");
    }

    #[test]
    fn summary_pluralizes() {
        assert_eq!(footer_summary(&[task(1, "A", false)]), "1 task · 1 item left");
        assert_eq!(
            footer_summary(&[task(1, "A", true), task(2, "B", true)]),
            "2 tasks · 0 items left"
        );
    }
}
