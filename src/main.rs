use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use voice_memo_recorder::{
    AssetPath, Config, PermissionStatus, RecorderCallbacks, RecorderDelegate, RecorderError,
    RecorderState, RecordingSession, SimulatedBackend, StaticAuthority,
};

#[derive(Debug, Parser)]
#[command(name = "voice-memo-recorder", version, about = "Drive a recording session against the simulated recorder")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voice-memo-recorder")]
    config: String,

    /// Record to this path instead of the temporary directory
    #[arg(long)]
    file: Option<PathBuf>,

    /// File name inside the temporary directory
    #[arg(long, default_value = "memo.m4a")]
    temp_name: String,

    /// Total seconds to keep the session running
    #[arg(long, default_value_t = 5)]
    seconds: u64,

    /// Pause after this many seconds, then continue one second later
    #[arg(long)]
    pause_after: Option<u64>,

    /// Microphone permission reported by the simulated platform
    #[arg(long, value_enum, default_value_t = PermissionArg::Granted)]
    permission: PermissionArg,

    /// Make audio-session activation fail
    #[arg(long)]
    fail_activation: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PermissionArg {
    Granted,
    Denied,
    Undetermined,
}

impl From<PermissionArg> for PermissionStatus {
    fn from(arg: PermissionArg) -> Self {
        match arg {
            PermissionArg::Granted => PermissionStatus::Granted,
            PermissionArg::Denied => PermissionStatus::Denied,
            PermissionArg::Undetermined => PermissionStatus::Undetermined,
        }
    }
}

/// Logs every notification
struct LoggingDelegate;

impl RecorderDelegate for LoggingDelegate {
    fn on_start(&mut self) {
        info!("delegate: recording started");
    }

    fn on_finish(&mut self) {
        info!("delegate: recording finished");
    }

    fn on_state_change(&mut self, state: RecorderState) {
        info!("delegate: state -> {}", state);
    }

    fn on_error(&mut self, error: &RecorderError) {
        error!("delegate: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    let level = if cli.verbose { Level::DEBUG } else { cfg.log_level()? };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Voice memo recorder v{}", env!("CARGO_PKG_VERSION"));

    let backend = SimulatedBackend::new();
    backend.set_fail_activation(cli.fail_activation);

    let authority = Arc::new(
        StaticAuthority::new(cli.permission.into()).answer_after(Duration::from_millis(500)),
    );

    let callbacks = RecorderCallbacks::new()
        .on_time_update(|seconds| println!("⏱  {:.0}s", seconds))
        .on_error(|error| eprintln!("❌ {}", error));

    let session = RecordingSession::new(Box::new(backend), authority, cfg.to_session_config())
        .with_delegate(LoggingDelegate)
        .with_callbacks(callbacks)
        .spawn();

    let destination = match cli.file {
        Some(path) => AssetPath::explicit(path),
        None => AssetPath::temporary(cli.temp_name),
    };

    session.start_with_defaults(destination).await?;
    session.try_start_record().await?;

    match cli.pause_after {
        Some(pause_after) if pause_after < cli.seconds => {
            tokio::time::sleep(Duration::from_secs(pause_after)).await;
            session.pause_or_continue_record().await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
            session.pause_or_continue_record().await?;
            let remaining = (cli.seconds - pause_after).saturating_sub(1);
            tokio::time::sleep(Duration::from_secs(remaining)).await;
        }
        _ => tokio::time::sleep(Duration::from_secs(cli.seconds)).await,
    }

    let before_stop = session.snapshot().await?;
    session.stop_recording().await?;

    println!("{}", serde_json::to_string_pretty(&before_stop)?);

    session.shutdown().await?;

    Ok(())
}
