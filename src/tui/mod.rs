pub mod app;
pub mod theme;
pub mod views;

use crate::config::app_config::Config;
use crate::filesystem::clipboard::{copy_with_ttl, ttl_seconds, SystemClipboardEngine};
use crate::shelf::handlers::Shelf;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::block_in_place;

use self::app::{App, Mode, View};
use self::views::confirm::render_confirm;
use self::views::details::render_details;
use self::views::list::render_list;

pub async fn launch(config: &Config, shelf: &Shelf<'_>) -> Result<()> {
    let mut state = shelf.load().await?;
    state.set_sort(config.default_sort);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let ttl_secs = ttl_seconds(config, None);
    let mut app = App::new(state, config.mask);
    let res = event_loop(&mut terminal, &mut app, ttl_secs);

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    terminal.show_cursor()?;

    res
}

fn event_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    ttl_secs: u64,
) -> Result<()> {
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(200);

    loop {
        terminal.draw(|f| match app.view {
            View::List => render_list(f, app),
            View::Details => render_details(f, app),
            View::ConfirmDelete => render_confirm(f, app),
        })?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press && !handle_key(app, k.code, ttl_secs) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }
    }
}

/// Returns false when the UI should exit.
pub fn handle_key(app: &mut App, code: KeyCode, ttl_secs: u64) -> bool {
    match app.view {
        View::List => match app.mode {
            Mode::Normal => match code {
                KeyCode::Char('q') => return false,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.prev(),
                KeyCode::Char('/') => app.enter_search(),
                KeyCode::Char('s') => app.cycle_sort(),
                KeyCode::Char('t') => app.cycle_tag(),
                KeyCode::Char(' ') => app.toggle_current(),
                KeyCode::Char('A') => app.toggle_all_visible(),
                KeyCode::Right | KeyCode::Char('l') => app.enter_details(),
                KeyCode::Char('d') => app.enter_confirm_delete(),
                KeyCode::Enter => copy_current(app, ttl_secs),
                _ => {}
            },
            Mode::Search => match code {
                KeyCode::Esc | KeyCode::Enter => app.exit_search(),
                KeyCode::Backspace => app.pop_filter(),
                KeyCode::Char(c) => app.push_filter(c),
                _ => {}
            },
        },
        View::Details => match code {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
                app.back_to_list()
            }
            KeyCode::Enter => copy_current(app, ttl_secs),
            KeyCode::Char('v') => app.reveal = !app.reveal,
            KeyCode::Char(' ') => app.toggle_current(),
            KeyCode::Char('d') => app.enter_confirm_delete(),
            _ => {}
        },
        View::ConfirmDelete => match code {
            KeyCode::Esc | KeyCode::Char('n') => app.cancel_confirm_delete(),
            KeyCode::Char('y') => {
                // Errors are already surfaced as a toast.
                let _ = block_in_place(|| app.confirm_delete());
            }
            _ => {}
        },
    }
    true
}

fn copy_current(app: &mut App, ttl_secs: u64) {
    let Some((label, value)) = app.copy_target() else {
        return;
    };
    let engine = match SystemClipboardEngine::new() {
        Ok(engine) => Arc::new(engine),
        Err(_) => {
            app.toast("Clipboard unavailable".to_string());
            return;
        }
    };
    match copy_with_ttl(engine, &value, Duration::from_secs(ttl_secs)) {
        Ok(_) => app.toast(format!("{label} copied ({ttl_secs}s)")),
        Err(e) => app.toast(format!("Copy failed: {e}")),
    }
}
