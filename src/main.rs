use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dialwave::api::ApiServerBuilder;
use dialwave::session::{
    ReplayClient, SessionOrchestrator, SessionSnapshot, SessionState, VoiceClient,
};
use dialwave::Config;

/// Dialwave - outbound calls and live voice sessions for a hosted voice agent
#[derive(Parser)]
#[command(name = "dialwave", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Print the dial-able form of a phone number
    Normalize {
        /// Number as typed, e.g. "(985) 307-5465"
        number: String,
        /// Country code for bare ten-digit numbers
        #[arg(long, env = "DIALWAVE_DEFAULT_COUNTRY_CODE", default_value = "1")]
        country_code: String,
    },
    /// Drive a voice session from a JSON-lines event script
    Replay {
        /// Script with one event frame per line
        script: PathBuf,
        /// Assistant to start the session with
        #[arg(long, env = "VAPI_ASSISTANT_ID", default_value = "replay")]
        assistant: String,
        /// Give up if the session has not ended by then (seconds)
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,dialwave=info",
        1 => "info,dialwave=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.port).await.map(|()| ExitCode::SUCCESS),
        Command::Normalize {
            number,
            country_code,
        } => Ok(normalize(&number, &country_code)),
        Command::Replay {
            script,
            assistant,
            timeout,
        } => replay(&script, assistant, Duration::from_secs(timeout)).await,
    }
}

async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(port) = port {
        config.api_server.port = port;
    }

    tracing::info!(
        port = config.api_server.port,
        env = %config.environment,
        "starting dialwave"
    );

    ApiServerBuilder::from_config(&config).build().run().await?;
    Ok(())
}

fn normalize(number: &str, country_code: &str) -> ExitCode {
    match dialwave::normalize(number, country_code) {
        Some(normalized) => {
            println!("{normalized}");
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("not a dial-able number: {number:?}");
            ExitCode::FAILURE
        }
    }
}

async fn replay(script: &Path, assistant: String, timeout: Duration) -> anyhow::Result<ExitCode> {
    let config = Config::from_env();
    let text = tokio::fs::read_to_string(script).await?;
    let client: Arc<dyn VoiceClient> = Arc::new(ReplayClient::from_jsonl(&text)?);

    let handle = SessionOrchestrator::spawn(Ok(client), assistant, &config.session);
    let mut snapshots = handle.subscribe();
    let mut printed = 0;

    handle.start().await?;

    let finished = tokio::time::timeout(timeout, async {
        loop {
            if snapshots.changed().await.is_err() {
                return;
            }
            let snapshot = snapshots.borrow_and_update().clone();
            printed = print_snapshot(&snapshot, printed);
            if snapshot.state == SessionState::Ended {
                return;
            }
        }
    })
    .await
    .is_ok();

    handle.shutdown().await?;

    if finished {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("session did not end within {}s", timeout.as_secs());
        Ok(ExitCode::FAILURE)
    }
}

/// Print the status line and any transcript lines not shown yet
fn print_snapshot(snapshot: &SessionSnapshot, printed: usize) -> usize {
    println!("[{}]", snapshot.label());
    for entry in snapshot.transcript.iter().skip(printed) {
        println!("  {}: {}", entry.role, entry.text);
    }
    if let Some(error) = &snapshot.error {
        println!("  error: {error}");
    }
    snapshot.transcript.len().max(printed)
}
