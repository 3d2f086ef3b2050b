use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, time::Duration};
use tracing::info;

use dudrill::{logging, resolve_root, ui, App, Args, ScanOptions, Scanner};

const EVENT_POLL: Duration = Duration::from_millis(50);

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    loop {
        // Progress and completion arrive over channels and are applied here
        app.poll_background();
        if app.should_quit {
            return Ok(());
        }

        terminal.draw(|f| ui::ui(f, app))?;

        if event::poll(EVENT_POLL)?
            && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn setup_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Attempt to restore terminal state
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref())?;

    // An unreadable root is fatal before the terminal is touched
    let root = resolve_root(&args.path)?;
    info!(root = %root.display(), "starting");

    let scanner = Scanner::new(ScanOptions::from(&args));
    let mut app = App::scanning(root, &scanner, args.tick_interval())?;

    // Setup panic hook before entering raw mode
    setup_panic_hook();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    if let Some(err) = app.take_fatal() {
        return Err(err);
    }
    info!("exiting");
    Ok(())
}
