use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, Focus, GridCell, InputField, InputMode};
use crate::days::day_header;
use crate::models::Priority;
use crate::timefmt::{format_12h, format_hhmm};

/// Maps a stored color tag to a terminal color.
pub fn tag_color(tag: &str) -> Color {
    match tag.to_lowercase().as_str() {
        "red" => Color::Red,
        "yellow" | "orange" => Color::Yellow,
        "green" => Color::Green,
        "blue" => Color::Blue,
        "purple" | "magenta" => Color::Magenta,
        "cyan" | "teal" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        _ => Color::White,
    }
}

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Panes
            Constraint::Length(3)  // Help / flash
        ].as_ref())
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(chunks[0]);

    render_inbox(f, app, panes[0]);
    render_grid(f, app, panes[1]);

    let (help_text, help_style) = match (&app.flash, app.input_mode) {
        (Some(flash), _) => (flash.message.clone(), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        (None, InputMode::Normal) => {
            let text = match app.focus {
                Focus::Inbox => "q: Quit | Tab: Grid | a: Add | Enter: Place at cursor | e: Title | i: Details | g: Category | p: Priority | d: Del | f: Filter",
                Focus::Grid => "q: Quit | Tab: Inbox | m: Move | Enter: Drop | +/-: Resize | r: Retract | e: Title | p: Priority | d: Del | [ ]: Window | w: Span | t: Today",
            };
            (text.to_string(), Style::default().fg(Color::Gray))
        }
        (None, InputMode::Editing) => ("Enter: Save | Esc: Cancel".to_string(), Style::default().fg(Color::Gray)),
        (None, InputMode::Adding) => ("Enter: Next Step | Esc: Cancel".to_string(), Style::default().fg(Color::Gray)),
    };

    let help = Paragraph::new(help_text)
        .style(help_style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[1]);

    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Adding => match app.add_state.step {
                0 => "Add Task: Enter Title",
                1 => "Add Task: Enter Details (Optional)",
                2 => "Add Task: Enter Priority (low/medium/high/none)",
                _ => "Add Task: Enter Category (Optional)",
            },
            InputMode::Editing => match app.input_field {
                InputField::Title => "Edit Title",
                InputField::Details => "Edit Details",
                InputField::Category => "Edit Category (empty clears)",
                InputField::None => "Edit",
            },
            InputMode::Normal => "",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);
    }
}

fn render_inbox(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .inbox
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.id.short().to_string()),
                Cell::from(t.title.clone()),
                Cell::from(t.category.clone().unwrap_or_default()),
            ])
            .style(Style::default().fg(tag_color(&t.color)))
        })
        .collect();

    let widths = [Constraint::Length(8), Constraint::Min(10), Constraint::Length(8)];

    let title = match &app.category_filter {
        Some(cat) => format!("Inbox [{}]", cat),
        None => "Inbox".to_string(),
    };
    let border = if app.focus == Focus::Inbox { Color::Cyan } else { Color::DarkGray };

    let table = Table::new(rows, widths)
        .header(Row::new(vec!["ID", "Title", "Cat"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(border)))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.inbox_state);
}

fn render_grid(f: &mut Frame, app: &App, area: Rect) {
    let settings = *app.calendar.scheduler().settings();
    let days = app.window.days();
    let columns: Vec<Vec<GridCell>> = days.iter().map(|d| app.day_column(d)).collect();
    let held = app.holding.as_ref();
    let shown: Vec<Vec<_>> = days.iter().map(|d| app.filtered_ids(d)).collect();

    let mut rows = Vec::new();
    for (r, hour) in (settings.first_hour..=settings.last_hour).enumerate() {
        let mut cells = vec![Cell::from(format_12h(f64::from(hour))).style(Style::default().fg(Color::DarkGray))];

        for (c, day) in days.iter().enumerate() {
            let (text, mut style) = match &columns[c][r] {
                GridCell::Free => (String::new(), Style::default()),
                GridCell::Starts { entry, more } => {
                    let mut text = if entry.start_hour == f64::from(hour) {
                        entry.title.clone()
                    } else {
                        format!("{} {}", format_hhmm(entry.start_hour), entry.title)
                    };
                    if *more > 0 {
                        text.push_str(&format!(" +{}", more));
                    }
                    let mut style = Style::default().fg(tag_color(&entry.color));
                    if entry.priority == Priority::High {
                        style = style.add_modifier(Modifier::BOLD);
                    }
                    if !shown[c].contains(&entry.task_id) {
                        style = Style::default().fg(Color::DarkGray);
                    }
                    if held == Some(&entry.task_id) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    (text, style)
                }
                GridCell::Continues(entry) => {
                    let mut style = if shown[c].contains(&entry.task_id) {
                        Style::default().fg(tag_color(&entry.color))
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    if held == Some(&entry.task_id) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    ("┆".to_string(), style)
                }
            };

            let flashed = app
                .flash
                .as_ref()
                .and_then(|fl| fl.cell.as_ref())
                .is_some_and(|(d, h)| d == day && h.floor() as u32 == hour);
            if flashed {
                style = style.bg(Color::Red).fg(Color::White);
            } else if app.focus == Focus::Grid && c == app.cursor_day && hour == app.cursor_hour {
                style = style.bg(Color::DarkGray);
            }
            cells.push(Cell::from(text).style(style));
        }
        rows.push(Row::new(cells));
    }

    let mut widths = vec![Constraint::Length(9)];
    widths.extend(days.iter().map(|_| Constraint::Fill(1)));

    let mut header = vec![Cell::from("")];
    header.extend(days.iter().map(|d| Cell::from(day_header(d))));

    let title = match &app.category_filter {
        Some(cat) => format!("Timetable [{}]", cat),
        None => "Timetable".to_string(),
    };
    let border = if app.focus == Focus::Grid { Color::Cyan } else { Color::DarkGray };
    let table = Table::new(rows, widths)
        .header(Row::new(header)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .bottom_margin(1))
        .block(Block::default().borders(Borders::ALL).title(title).border_style(Style::default().fg(border)));

    f.render_widget(table, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ].as_ref())
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ].as_ref())
        .split(popup_layout[1])[1]
}
