use std::{
    io::{self, Write},
    panic,
    str::FromStr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::Show,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    style::ResetColor,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use tracing::warn;
use tuirealm::{
    PollStrategy,
    terminal::{CrosstermTerminalAdapter, TerminalBridge},
};

use homework_tracker::{
    app::{App, Message, today},
    cli::{self, RootCommand},
    haptics,
    logging::{init_logging, print_log_location},
    realm::{BoardId, apply_message, init_application, should_quit, shutdown},
    settings::Settings,
    store::{Backend, MemoryTaskStore},
    theme::ThemePreset,
};

#[derive(Parser, Debug)]
#[command(
    name = "homework-tracker",
    about = "Terminal homework tracker",
    long_about = "Track homework per student with due-date urgency, synced through a hosted PostgREST store with realtime updates.",
    version = env!("HOMEWORK_TRACKER_BUILD_VERSION"),
    author
)]
struct Cli {
    #[arg(long, value_name = "PRESET")]
    theme: Option<String>,

    /// Use an in-memory store seeded with sample tasks.
    #[arg(long, global = true)]
    demo: bool,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<RootCommand>,
}

enum RunOutcome {
    Continue,
    Exit(i32),
}

static TERMINAL_RESTORED: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> Result<()> {
    let log_handle = match init_logging() {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: failed to initialize logging: {err}");
            None
        }
    };
    let log_path = log_handle.as_ref().map(|handle| handle.path.clone());
    if let Some(path) = log_path.as_ref() {
        install_panic_hook_with_log(path.clone());
    }

    let outcome = run_app().await;
    if let Some(path) = log_path.as_ref()
        && !matches!(outcome, Ok(RunOutcome::Exit(_)))
    {
        print_log_location(path);
    }

    match outcome {
        Ok(RunOutcome::Continue) => Ok(()),
        Ok(RunOutcome::Exit(code)) => {
            drop(log_handle);
            std::process::exit(code);
        }
        Err(err) => Err(err),
    }
}

async fn run_app() -> Result<RunOutcome> {
    let cli = Cli::parse();

    let mut settings = Settings::load();
    if let Some(theme) = cli.theme.as_deref() {
        match ThemePreset::from_str(theme) {
            Ok(preset) => settings.theme = preset.as_str().to_string(),
            Err(()) => warn!(theme, "ignoring unknown theme preset"),
        }
    }

    let (backend, notice) = select_backend(&settings, cli.demo);

    if let Some(command) = cli.command {
        let code = cli::run(backend.store, command, today(), cli.json, cli.quiet).await;
        return Ok(RunOutcome::Exit(code));
    }

    let _guard = TerminalGuard;
    let mut terminal = setup_terminal()?;

    let haptics = haptics::for_settings(settings.haptic_feedback);
    let app = App::new(backend, settings, haptics)
        .with_settings_path(Settings::config_path())
        .with_notice(notice);
    let app = Arc::new(Mutex::new(app));
    let mut realm = init_application(Arc::clone(&app))?;

    if let Ok((width, height)) = crossterm::terminal::size() {
        apply_message(&app, Message::Resize(width, height))?;
    }

    let mut redraw = true;
    while !should_quit(&app)? {
        if redraw {
            terminal
                .draw(|frame| realm.view(&BoardId::Board, frame, frame.area()))
                .context("failed to render frame")?;
            redraw = false;
        }

        let messages = realm
            .tick(PollStrategy::Once)
            .context("failed to process tui-realm tick")?;

        if !messages.is_empty() {
            redraw = true;
        }

        for message in messages {
            apply_message(&app, message)?;
        }
    }

    shutdown(&app)?;
    let _ = terminal.disable_raw_mode();
    let _ = terminal.leave_alternate_screen();
    let _ = terminal.clear_screen();
    let _ = restore_terminal();

    Ok(RunOutcome::Continue)
}

/// Demo mode wins; otherwise the configured store, falling back to an
/// offline store that reports why on every call.
fn select_backend(settings: &Settings, demo: bool) -> (Backend, Option<String>) {
    if demo {
        let store = Arc::new(MemoryTaskStore::demo(today()));
        return (
            Backend::memory(store),
            Some("Demo mode: changes live in memory only".to_string()),
        );
    }

    match settings
        .store_config()
        .and_then(|config| Backend::remote(config, settings.realtime))
    {
        Ok(backend) => (backend, None),
        Err(err) => {
            warn!(error = %err, "task store unavailable");
            (
                Backend::unconfigured(err.to_string()),
                Some(format!("Store not configured: {err}")),
            )
        }
    }
}

fn setup_terminal() -> Result<TerminalBridge<CrosstermTerminalAdapter>> {
    TERMINAL_RESTORED.store(false, Ordering::SeqCst);

    let mut terminal =
        TerminalBridge::new_crossterm().context("failed to initialize terminal bridge")?;

    terminal
        .enable_raw_mode()
        .context("failed to enable raw mode")?;
    terminal
        .enter_alternate_screen()
        .context("failed to enter alternate screen")?;
    execute!(io::stdout(), EnableMouseCapture).context("failed to enable mouse capture")?;

    Ok(terminal)
}

fn install_panic_hook_with_log(log_path: std::path::PathBuf) {
    let previous_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        print_log_location(&log_path);
        previous_hook(panic_info);
    }));
}

fn restore_terminal() -> Result<()> {
    if TERMINAL_RESTORED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let _ = disable_raw_mode();

    let mut stdout = io::stdout();
    let _ = execute!(
        stdout,
        LeaveAlternateScreen,
        DisableMouseCapture,
        Show,
        ResetColor
    );
    let _ = stdout.flush();

    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = restore_terminal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_flag_selects_memory_backend() {
        let (backend, notice) = select_backend(&Settings::default(), true);
        assert_eq!(backend.label, "demo");
        assert!(notice.is_some());
    }

    #[test]
    fn missing_config_selects_offline_backend() {
        let settings = Settings {
            supabase_url: None,
            anon_key: None,
            ..Settings::default()
        };
        let (backend, notice) = select_backend(&settings, false);
        assert_eq!(backend.label, "offline");
        assert!(notice.is_some_and(|text| text.starts_with("Store not configured")));
        assert!(backend.feed.is_none());
    }
}
