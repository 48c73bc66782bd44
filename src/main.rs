#![forbid(unsafe_code)]

mod config;
mod constants;
mod hover;
mod ipc;
mod pointer;
mod presentation;
mod renderer;
mod signals;
mod types;
mod x11_utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use config::{ConfigStore, ConfigWriter, JsonFileStore, KeyValueStore, MemoryStore};
use constants::{pointer as pointer_consts, server, x11 as x11_consts};
use pointer::PointerSampler;
use renderer::{JsonLinesRenderer, NullRenderer, RendererPort};
use signals::{ControlSignal, PidFile};
use x11_utils::X11PointerSource;

#[derive(Parser, Debug)]
#[command(name = "notch-companion", version, about = "Desktop companion widget control plane")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Key-value state file (defaults to the user config dir)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    /// Options for the implicit `run`
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the widget daemon (default); renderer commands go to stdout
    Run(RunArgs),
    /// Print the stored camera config
    ShowCamera,
    /// Restore the built-in camera config
    ResetCamera,
    /// Toggle whether the avatar looks at the pointer
    SetFollowMouse {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Lock the widget open (god mode) or release it
    Focus {
        #[arg(value_enum)]
        mode: FocusMode,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FocusMode {
    On,
    Off,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Control listener port
    #[arg(long, default_value_t = server::DEFAULT_PORT)]
    port: u16,

    /// Control listener address
    #[arg(long, default_value = server::DEFAULT_BIND)]
    bind: IpAddr,

    /// Title of the widget window (pointer tracking and hover)
    #[arg(long, default_value = x11_consts::DEFAULT_WINDOW_TITLE)]
    window_title: String,

    /// Disable pointer tracking
    #[arg(long)]
    no_pointer: bool,

    /// Disable hover detection
    #[arg(long)]
    no_hover: bool,

    /// Keep the camera config in memory only
    #[arg(long)]
    ephemeral: bool,
}

fn init_tracing() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    // stdout carries renderer commands, logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")
}

fn file_store(state_file: Option<PathBuf>) -> JsonFileStore {
    state_file.map(JsonFileStore::new).unwrap_or_default()
}

fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(cli.run)) {
        Command::Run(args) => run_daemon(args, cli.state_file),
        Command::ShowCamera => {
            let store = ConfigStore::load(Box::new(file_store(cli.state_file)), Arc::new(NullRenderer));
            let json = serde_json::to_string_pretty(&store.config())
                .context("Failed to serialize camera config")?;
            println!("{}", json);
            Ok(())
        }
        Command::ResetCamera => {
            let store = ConfigStore::load(Box::new(file_store(cli.state_file)), Arc::new(NullRenderer));
            store.reset();
            notify_running_daemon(ControlSignal::Reload);
            Ok(())
        }
        Command::SetFollowMouse { enabled } => {
            let store = ConfigStore::load(Box::new(file_store(cli.state_file)), Arc::new(NullRenderer));
            store.set_follow_mouse(enabled);
            notify_running_daemon(ControlSignal::Reload);
            Ok(())
        }
        Command::Focus { mode } => {
            let signal = match mode {
                FocusMode::On => ControlSignal::EnterGodMode,
                FocusMode::Off => ControlSignal::ExitGodMode,
            };
            signals::send_to_daemon(&signals::pid_file_path()?, signal)
        }
    }
}

fn notify_running_daemon(signal: ControlSignal) {
    match signals::pid_file_path() {
        Ok(path) => signals::notify_daemon_if_running(&path, signal),
        Err(e) => warn!(error = ?e, "Cannot locate daemon pid file"),
    }
}

fn run_daemon(args: RunArgs, state_file: Option<PathBuf>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let renderer: Arc<dyn RendererPort> = Arc::new(JsonLinesRenderer::stdout());

    let store: Box<dyn KeyValueStore> = if args.ephemeral {
        info!("Camera config kept in memory only");
        Box::new(MemoryStore::default())
    } else {
        let store = file_store(state_file);
        info!(path = %store.path().display(), "Using state file");
        Box::new(store)
    };
    let config = Arc::new(ConfigStore::load(store, renderer.clone()));
    let (writer, _writer_thread) = ConfigWriter::spawn(config.clone())?;

    let _pid_file = match signals::pid_file_path().and_then(PidFile::create) {
        Ok(pid_file) => {
            info!(path = %pid_file.path().display(), "Wrote pid file");
            Some(pid_file)
        }
        Err(e) => {
            warn!(error = ?e, "Running without pid file, CLI focus requests will not reach this process");
            None
        }
    };

    let title = args.window_title;
    let addr = SocketAddr::new(args.bind, args.port);

    runtime.block_on(async move {
        let (engine, engine_task) = presentation::spawn_engine(renderer.clone(), writer.clone());

        // Renderer may have started before us: send the full current state
        config.publish();
        engine.publish();

        let _listener = ipc::spawn_listener(addr, engine.clone());

        let shutdown_rx = match signals::spawn_signal_listener(engine.clone(), config.clone()) {
            Ok((_thread, rx)) => Some(rx),
            Err(e) => {
                error!(error = ?e, "Signals unavailable, god mode and reload requests disabled");
                None
            }
        };

        let stop_sampler = Arc::new(AtomicBool::new(false));
        let sampler = if args.no_pointer {
            None
        } else {
            match X11PointerSource::connect(&title) {
                Ok(source) => Some(
                    PointerSampler::new(source, renderer.clone(), pointer_consts::SAMPLE_INTERVAL)
                        .spawn(stop_sampler.clone()),
                ),
                Err(e) => {
                    warn!(error = ?e, "Pointer tracking disabled");
                    None
                }
            }
        };

        if !args.no_hover {
            // Blocks on X11 events; detached, exits with the process
            hover::spawn_hover_watcher(title.clone(), engine.clone());
        }

        info!(addr = %addr, window_title = %title, "Companion daemon running");

        tokio::select! {
            _ = signals::shutdown_requested(shutdown_rx) => info!("Shutting down"),
            res = engine_task => {
                if let Err(e) = res {
                    error!(error = ?e, "Presentation engine crashed");
                }
            }
        }

        if let Some(snap) = engine.snapshot().await {
            info!(state = ?snap.state, override_mode = ?snap.override_mode, "Final presentation state");
        }
        engine.shutdown();
        // Let queued follow_mouse saves reach the store before exiting
        if tokio::task::spawn_blocking(move || writer.flush()).await.is_err() {
            warn!("Config writer flush failed");
        }
        stop_sampler.store(true, Ordering::Relaxed);
        if let Some(sampler) = sampler {
            let _ = sampler.join();
        }
    });

    Ok(())
}
