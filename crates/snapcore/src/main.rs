use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use snapcore_core::session::{collect_core, create_core, SessionConfig, DEFAULT_POLL_INTERVAL};
use snapcore_core::{find_libraries, CoreResult};
use snapcore_utils::{info, init_logging, init_logging_with_level, LogFormat, LogLevel};

/// Take a core dump of a running process without stopping it.
#[derive(Parser, Debug)]
#[command(name = "snapcore")]
#[command(version)]
#[command(about = "Take a core dump of a running process without stopping it", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Dump this process into a new directory under the current one and print the core path
    Create(SessionArgs),
    /// Dump this process, bundle the core with its libraries, print the archive path
    Collect(SessionArgs),
    /// List the libraries loaded into this process
    Libraries,
}

#[derive(Args, Debug)]
struct SessionArgs
{
    /// Milliseconds between polls of the dumping child
    #[arg(long)]
    poll_ms: Option<u64>,
    /// Give up after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl From<SessionArgs> for SessionConfig
{
    fn from(args: SessionArgs) -> Self
    {
        SessionConfig::default()
            .with_poll_interval(args.poll_ms.map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis))
            .with_timeout(args.timeout_secs.map(Duration::from_secs))
    }
}

fn main()
{
    let cli = Cli::parse();

    // Explicit --log-level wins, otherwise RUST_LOG / SNAPCORE_LOG_FORMAT
    let logging = match cli.log_level {
        Some(level) => LogFormat::from_env().and_then(|format| init_logging_with_level(level, format)),
        None => init_logging(),
    };
    if let Err(e) = logging {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run_command(cli.command)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run_command(command: Commands) -> CoreResult<()>
{
    match command {
        Commands::Create(args) => {
            let config = SessionConfig::from(args);
            info!(?config, "Creating core");
            let dump = create_core(&config).await?;
            println!("{}", dump.core_path.display());
            Ok(())
        }
        Commands::Collect(args) => {
            let config = SessionConfig::from(args);
            info!(?config, "Collecting core and libraries");
            let archive = collect_core(&config).await?;
            println!("{}", archive.display());
            Ok(())
        }
        Commands::Libraries => {
            for library in find_libraries() {
                println!("{library}");
            }
            Ok(())
        }
    }
}
