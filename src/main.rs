use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use console_bridge::app::{Bridge, BridgeHost};
use console_bridge::config::{self, BridgeConfig};
use console_bridge::config_io::{self, DirectoryContext};
use console_bridge::host::{last_line_of, FlushTimer, HistoryMenu, Surface, SurfaceOptions, ViewControl};
use console_bridge::services::{log_dirs, tracing_setup};
use std::cell::Cell;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Run an interactive shell behind a line-oriented console
#[derive(Parser, Debug)]
#[command(name = "console-bridge")]
#[command(about = "Drive a shell through piped I/O with a periodically refreshed transcript", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Shell to run instead of the configured one
    #[arg(long, value_name = "PATH")]
    shell: Option<String>,

    /// Path to log file for diagnostics (default: state dir)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    dump_schema: bool,
}

/// Prints the part of each transcript replacement the terminal has not seen yet
#[derive(Default)]
struct StdoutSurface {
    shown: String,
}

impl Surface for StdoutSurface {
    fn replace_text(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        match text.strip_prefix(self.shown.as_str()) {
            Some(suffix) => {
                out.write_all(suffix.as_bytes()).ok();
            }
            None => {
                writeln!(out).ok();
                out.write_all(text.as_bytes()).ok();
            }
        }
        out.flush().ok();
        self.shown = text.to_string();
    }

    fn go_to_end(&mut self) {
        io::stdout().flush().ok();
    }

    fn last_line(&self) -> Option<String> {
        last_line_of(&self.shown)
    }

    fn apply_options(&mut self, options: &SurfaceOptions) {
        // A plain terminal has neither fonts nor a gutter
        tracing::debug!("Ignoring surface options {:?}", options);
    }
}

struct CloseFlag(Rc<Cell<bool>>);

impl ViewControl for CloseFlag {
    fn close_view(&mut self) {
        self.0.set(true);
    }
}

/// Ticks are driven by the main loop; this only records whether they are wanted
struct LoopTimer {
    period: Rc<Cell<Option<Duration>>>,
}

impl FlushTimer for LoopTimer {
    fn start(&mut self, period: Duration) {
        self.period.set(Some(period));
    }

    fn stop(&mut self) {
        self.period.set(None);
    }
}

struct PrintedMenu;

impl HistoryMenu for PrintedMenu {
    fn show(&mut self, entries: &[String]) {
        let mut err = io::stderr().lock();
        if entries.is_empty() {
            writeln!(err, "(history is empty)").ok();
        }
        for (i, entry) in entries.iter().enumerate() {
            writeln!(err, "{:>3}  {}", i + 1, entry).ok();
        }
    }
}

fn load_config(args: &Args) -> AnyhowResult<BridgeConfig> {
    let dirs = DirectoryContext::from_system().ok();
    let mut config = config_io::load_config(args.config.as_deref(), dirs.as_ref())
        .context("Failed to load configuration")?;
    if let Some(shell) = &args.shell {
        config.shell_path = shell.clone();
    }
    Ok(config)
}

/// Lines starting with `:` control the bridge instead of reaching the shell
fn handle_meta_command(bridge: &mut Bridge, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some(":break") => bridge.break_session(false),
        Some(":restart") => bridge.break_session(true),
        Some(":hide") => bridge.hide(),
        Some(":show") => {
            if !bridge.activate() {
                eprintln!("(busy, try again)");
            }
        }
        Some(":history") => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) => {
                let chosen = bridge.history().display_order().get(n.wrapping_sub(1)).cloned();
                match chosen {
                    Some(command) => bridge.submit(&command),
                    None => eprintln!("(no history entry {n})"),
                }
            }
            None => bridge.show_history(&mut PrintedMenu),
        },
        _ => return false,
    }
    true
}

fn run(config: &BridgeConfig) -> AnyhowResult<()> {
    let close_requested = Rc::new(Cell::new(false));
    let timer_period = Rc::new(Cell::new(None));

    let host = BridgeHost {
        surface: Box::new(StdoutSurface::default()),
        view: Box::new(CloseFlag(close_requested.clone())),
        timer: Box::new(LoopTimer {
            period: timer_period.clone(),
        }),
    };
    let mut bridge = Bridge::new(config, host).context("Invalid configuration")?;

    let (tx, rx) = mpsc::channel::<String>();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("Failed to start stdin reader")?;

    bridge.activate();
    let idle_wait = bridge.tick_period();
    let mut last_tick = Instant::now();

    while !close_requested.get() {
        let wait = timer_period.get().unwrap_or(idle_wait);
        match rx.recv_timeout(wait) {
            Ok(line) => {
                if !handle_meta_command(&mut bridge, &line) {
                    bridge.submit(&line);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Input closed");
                break;
            }
        }

        if let Some(period) = timer_period.get() {
            if last_tick.elapsed() >= period {
                bridge.tick();
                last_tick = Instant::now();
            }
        }
    }

    bridge.shutdown();
    Ok(())
}

fn main() -> AnyhowResult<()> {
    let args = Args::parse();

    if args.dump_schema {
        println!("{}", BridgeConfig::schema_json()?);
        return Ok(());
    }

    let config = load_config(&args)?;

    if args.dump_config {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| config::ConfigError::SerializeError(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    let log_file = args.log_file.clone().unwrap_or_else(log_dirs::main_log_path);
    if !tracing_setup::init_global(&log_file) {
        eprintln!("Warning: logging to {} is unavailable", log_file.display());
    }
    log_dirs::cleanup_stale_logs();

    tracing::info!("Console bridge starting with shell {}", config.shell_path);
    let result = run(&config);
    tracing::info!("Console bridge exiting");
    result
}
