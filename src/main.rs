//! Reaction Time Tester - terminal reaction time measurement

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{stdout, Stdout},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    time::{Duration, Instant},
};

use reaction_time_tester::{
    config::{config_path, Config, EntryPolicy},
    error::{report_fatal, ErrorReporter},
    input::{
        poller::DevicePoller,
        terminal::{
            translate, InputAvailability, InputWiring, KeyboardSource, MouseSource,
            TerminalAction,
        },
        InputEvent,
    },
    trial_log::{create_log_file, DEBUG_LOG_PREFIX},
    ui::{self, App},
};

#[cfg(target_os = "linux")]
use reaction_time_tester::input::evdev_listener::{evdev_status, EvdevListener};

/// How often the elapsed clock in the status bar is refreshed
const CLOCK_REDRAW: Duration = Duration::from_secs(1);

/// Terminal reaction time tester
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start the first trial immediately instead of waiting for a click
    #[arg(long)]
    auto_start: bool,
}

/// Raw mode, alternate screen and mouse capture, undone on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Terminal reports key release events
    key_releases: bool,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let key_releases = supports_keyboard_enhancement().unwrap_or(false);
        if key_releases {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self {
            terminal,
            key_releases,
        })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        if self.key_releases {
            let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
        }
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        report_fatal(&e);
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => {
            let path = config_path()?;
            Config::load()
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
    };
    if args.auto_start {
        config.trial.entry = EntryPolicy::AutoStart;
    }
    Ok(config)
}

/// Route `log` output into the debug log file. The terminal is owned by the
/// UI, so nothing goes to stderr.
fn init_debug_log(config: &Config, started: &DateTime<Local>) -> Result<PathBuf> {
    let (path, file) = create_log_file(&config.logging.log_dir(), DEBUG_LOG_PREFIX, started)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(path)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let started = Local::now();

    let debug_log = if config.logging.debug_log {
        Some(init_debug_log(&config, &started))
    } else {
        None
    };
    log::info!("configuration: {:?}", config);

    let quit_requested = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&quit_requested);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .context("failed to install signal handler")?;
    }

    let mut guard = TerminalGuard::new()?;
    let mut app = App::new(config.clone());

    match debug_log {
        Some(Ok(path)) => log::info!("debug log: {}", path.display()),
        Some(Err(e)) => app.report(&format!("debug log disabled: {:#}", e)),
        None => {}
    }
    app.open_trial_log();

    let (event_tx, event_rx) = mpsc::channel::<InputEvent>();
    let poller = DevicePoller::try_new();
    if poller.is_none() {
        log::info!("polled input unavailable, using terminal events");
    }

    #[cfg(target_os = "linux")]
    let mut evdev_listener = if config.input.raw_keyboard {
        EvdevListener::try_new(event_tx)
    } else {
        None
    };
    #[cfg(target_os = "linux")]
    let use_evdev = evdev_listener.is_some();
    #[cfg(not(target_os = "linux"))]
    let use_evdev = {
        drop(event_tx);
        false
    };

    let wiring = InputWiring::select(
        &config.input,
        InputAvailability {
            evdev: use_evdev,
            poller: poller.is_some(),
            key_releases: guard.key_releases,
        },
    );
    log::info!("input wiring: {}", wiring.describe());

    if config.input.raw_input_debug {
        #[cfg(target_os = "linux")]
        let devices = match &evdev_listener {
            Some(listener) => {
                for path in listener.device_paths() {
                    log::info!("raw keyboard device: {}", path.display());
                }
                format!("{} keyboard device(s) open", listener.device_count())
            }
            None => evdev_status(),
        };
        #[cfg(not(target_os = "linux"))]
        let devices = "evdev not supported".to_string();
        log::info!("raw input devices: {}", devices);
        app.set_status(format!("Raw input: {} ({})", wiring.describe(), devices));
    }

    app.start()?;

    let tick_rate = config.refresh_interval();
    let mut last_draw: Option<Instant> = None;

    while app.is_running() {
        if quit_requested.load(Ordering::SeqCst) {
            app.quit();
            break;
        }

        #[cfg(target_os = "linux")]
        if let Some(listener) = evdev_listener.as_mut() {
            listener.poll();
        }
        while let Ok(input) = event_rx.try_recv() {
            app.process_input(&input)?;
        }

        // Background samples only release latches; presses need a terminal
        // event behind them
        if let Some(poller) = &poller {
            if wiring.keyboard == KeyboardSource::Polled {
                app.process_input(&poller.keyboard_resync())?;
            }
            if wiring.mouse == MouseSource::Polled {
                app.process_input(&poller.mouse_resync())?;
            }
        }

        app.fire_due_timers()?;

        let clock_stale = last_draw.map_or(true, |t| t.elapsed() >= CLOCK_REDRAW);
        if app.take_redraw() || clock_stale {
            guard.terminal.draw(|frame| ui::draw(frame, &mut app))?;
            last_draw = Some(Instant::now());
        }

        let timeout = app
            .next_deadline()?
            .map_or(tick_rate, |deadline| deadline.min(tick_rate));
        if !event::poll(timeout)? {
            continue;
        }

        let terminal_event = event::read()?;
        for action in translate(&terminal_event, &wiring, app.signal_area()) {
            match action {
                TerminalAction::Input(input) => app.process_input(&input)?,
                TerminalAction::HeldPress(key) => app.process_held_press(key)?,
                TerminalAction::PollKeyboard => {
                    if let Some(poller) = &poller {
                        app.process_input(&poller.keyboard())?;
                    }
                }
                TerminalAction::PollMouse => {
                    if let Some(poller) = &poller {
                        app.process_input(&poller.mouse())?;
                    }
                }
                TerminalAction::Resize => app.invalidate(),
                TerminalAction::Quit => app.quit(),
            }
        }
    }

    drop(guard);

    #[cfg(target_os = "linux")]
    if let Some(listener) = &evdev_listener {
        if listener.malformed_count() > 0 {
            log::warn!(
                "dropped {} malformed raw input reads",
                listener.malformed_count()
            );
        }
    }

    let view = app.view();
    println!("\nReaction Time Tester session complete.");
    println!("Trials completed: {}", view.trial_iteration);
    if let Some(average) = view.average_ms {
        println!(
            "Average of current window ({}/{}): {:.2}ms",
            view.current_attempt, view.averaging_window, average
        );
    }
    println!("Session duration: {}", app.elapsed_formatted());
    if let Some(log) = app.trial_log() {
        println!(
            "Trial log: {} ({} entries)",
            log.path().display(),
            log.entries()
        );
    }

    Ok(())
}
