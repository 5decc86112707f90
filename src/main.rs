//! codemsg CLI - listens for verification codes on a push server stream.
//!
//! This is the main binary entry point. See the `codemsg` library for the
//! pipeline itself.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codemsg::channel::{self, ChannelTarget};
use codemsg::config::ConfigOverrides;
use codemsg::constants::{MAIN_LOOP_TICK, SHUTDOWN_GRACE};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag;

use codemsg::{extract, ws, Config, DesktopNotifier, Dispatcher, Session, SessionSummary, SystemClipboard};

/// Flag set by SIGINT / SIGTERM / SIGHUP.
static SHUTDOWN_FLAG: std::sync::LazyLock<Arc<AtomicBool>> =
    std::sync::LazyLock::new(|| Arc::new(AtomicBool::new(false)));

// CLI
#[derive(Parser)]
#[command(name = "codemsg")]
#[command(version)]
#[command(about = "Copy verification codes from a Gotify message stream to the clipboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Server base URL (http://, https://, ws:// or wss://)
    #[arg(long, global = true)]
    server: Option<String>,
    /// Client token
    #[arg(long, global = true)]
    token: Option<String>,
    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,
    /// Path to config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and listen for messages (default)
    Run,
    /// Print the stream URL derived from the server address
    Url,
    /// Print the code extracted from TEXT
    Extract {
        /// Message body to scan
        text: String,
    },
    /// Print the effective configuration (token masked)
    Config,
}

fn load_config(args: &ConnectionArgs) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;
    config.apply_overrides(ConfigOverrides {
        server_url: args.server.clone(),
        token: args.token.clone(),
        insecure: args.insecure,
    });
    Ok(config)
}

/// Run one session until the channel closes or a signal arrives.
fn run(config: Config) -> Result<()> {
    config.validate()?;

    flag::register(SIGINT, Arc::clone(&SHUTDOWN_FLAG))?;
    flag::register(SIGTERM, Arc::clone(&SHUTDOWN_FLAG))?;
    #[cfg(unix)]
    flag::register(signal_hook::consts::signal::SIGHUP, Arc::clone(&SHUTDOWN_FLAG))?;

    let target = ChannelTarget::from_config(&config);
    println!("Connecting to push stream: {}", target.url);
    if !config.verify_tls {
        log::warn!("TLS certificate verification is disabled");
    }

    let (mut close_handle, close_signal) = channel::close_pair();
    let style = config.notification_style();

    let session_thread = std::thread::Builder::new()
        .name("codemsg-session".to_string())
        .spawn(move || -> Result<SessionSummary> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;
            let dispatcher = Dispatcher::new(SystemClipboard::new(), DesktopNotifier, style);
            let session = Session::new(target, dispatcher);
            let summary = rt.block_on(session.run(close_signal))?;
            Ok(summary)
        })
        .context("Failed to spawn session thread")?;

    // The main thread only waits: the session thread does all the work.
    while !SHUTDOWN_FLAG.load(Ordering::Relaxed) && !session_thread.is_finished() {
        std::thread::sleep(MAIN_LOOP_TICK);
    }

    if !session_thread.is_finished() {
        println!("\nInterrupt received, closing connection...");
        close_handle.close();

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        while !session_thread.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        if !session_thread.is_finished() {
            log::warn!("Session did not close within {:?}, exiting anyway", SHUTDOWN_GRACE);
            return Ok(());
        }
    }

    let summary = session_thread
        .join()
        .map_err(|_| anyhow::anyhow!("session thread panicked"))?
        .context("Could not establish the stream connection")?;

    log::info!(
        "Session ended: {} frames received, {} dropped, {} codes copied",
        summary.frames_received,
        summary.frames_dropped,
        summary.codes_copied
    );
    println!("Exited.");
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .format_timestamp_secs()
        .init();

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {:?}", panic_info);
        default_hook(panic_info);
    }));

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(load_config(&cli.connection)?)?,
        Commands::Url => {
            let config = load_config(&cli.connection)?;
            println!("{}", ws::subscription_url(&config.server_url));
        }
        Commands::Extract { text } => {
            println!("{}", extract::extract_code(&text));
        }
        Commands::Config => {
            let config = load_config(&cli.connection)?;
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}
