pub mod app;
pub mod ui;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};

use crate::calendar::Calendar;
use crate::days::DayWindow;
use app::{App, Focus, InputField, InputMode};
use ui::ui;

/// Redraw interval while idle, so flash messages expire on their own.
const TICK: Duration = Duration::from_millis(250);

pub fn run_tui(calendar: Calendar, window: DayWindow) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(calendar, window);
    info!(tasks = app.calendar.scheduler().len(), "tui started");

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = %err, "tui exited with error");
    }
    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let step = app.calendar.scheduler().settings().granularity;

        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Tab => app.toggle_focus(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Left | KeyCode::Char('h') => app.left(),
                KeyCode::Right | KeyCode::Char('l') => app.right(),
                KeyCode::Char('[') => app.previous_window(),
                KeyCode::Char(']') => app.next_window(),
                KeyCode::Char('w') => app.cycle_span(),
                KeyCode::Char('t') => app.go_today(),
                KeyCode::Char('f') => app.cycle_category(),
                KeyCode::Enter => app.place_at_cursor(),
                KeyCode::Char('m') if app.focus == Focus::Grid => app.toggle_hold(),
                KeyCode::Char('+') | KeyCode::Char('=') if app.focus == Focus::Grid => app.resize_under_cursor(step),
                KeyCode::Char('-') if app.focus == Focus::Grid => app.resize_under_cursor(-step),
                KeyCode::Char('r') | KeyCode::Backspace if app.focus == Focus::Grid => app.retract_under_cursor(),
                KeyCode::Char('d') | KeyCode::Delete => app.delete_focused(),
                KeyCode::Char('p') => app.cycle_priority(),
                KeyCode::Char('a') => app.start_add(),
                KeyCode::Char('e') => app.start_edit(InputField::Title),
                KeyCode::Char('i') => app.start_edit(InputField::Details),
                KeyCode::Char('g') => app.start_edit(InputField::Category),
                KeyCode::Esc => app.holding = None,
                _ => {}
            },
            InputMode::Editing | InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
