// # hostsyncd - zone reconciliation daemon
//
// Thin integration layer only: flag parsing, logging setup, wiring, and
// exit codes. All reconciliation logic lives in hostsync-core.
//
// ## Usage
//
// ```bash
// export HOSTSYNC_API_TOKEN=your_token
//
// # One pass
// hostsyncd --mode oneshot -f /etc/hosts --network 10.0.0.0/8 -d example.com
//
// # Daemon: resync every 15 minutes and on changes to /etc/hosts
// hostsyncd --network 10.0.0.0/8 --network 192.168.0.0/16 -d example.com
// ```
//
// ## Configuration
//
// Everything except credentials is a command-line flag. Secrets come from
// the environment only, never from the command line:
//
// - `HOSTSYNC_API_TOKEN`: record store API token (required)
// - `HOSTSYNC_ZONE_ID`: pre-resolved zone ID (optional)
// - `HOSTSYNC_LOG`: log level (trace|debug|info|warn|error, default info;
//   `--debug` overrides to debug)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use ipnet::IpNet;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use hostsync_core::{Mode, RecordStore, SyncConfig, SyncEngine};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (failed cycle in oneshot mode, daemon failure)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Operating mode flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Run forever, re-syncing on a timer and on file changes
    Daemon,
    /// Run one reconciliation pass and exit
    Oneshot,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Daemon => Mode::Daemon,
            ModeArg::Oneshot => Mode::Oneshot,
        }
    }
}

/// Sync a zone's address records with a local hosts file
#[derive(Debug, Parser)]
#[command(name = "hostsyncd", version, about)]
struct Cli {
    /// Operating mode
    #[arg(short, long, value_enum, default_value_t = ModeArg::Daemon)]
    mode: ModeArg,

    /// Input file in /etc/hosts format
    #[arg(short, long = "file", value_name = "HOSTFILE", default_value = "/etc/hosts")]
    file: PathBuf,

    /// Filter by CIDR network (repeatable, at least one required)
    #[arg(long = "network", value_name = "x.x.x.x/len", required = true)]
    networks: Vec<IpNet>,

    /// Domain to update records in
    #[arg(short, long)]
    domain: String,

    /// Seconds between scheduled resyncs
    #[arg(short, long, value_name = "SECS", default_value_t = 900)]
    interval: u64,

    /// TTL to use for created and updated records
    #[arg(long, value_name = "SECS", default_value_t = 3600)]
    ttl: u32,

    /// Don't force the domain to be added to the end of hosts
    #[arg(long)]
    no_qualify_hosts: bool,

    /// Exclude one or more hosts from being synced (repeatable)
    #[arg(long = "exclude-host", value_name = "HOSTNAME")]
    exclude_hosts: Vec<String>,

    /// Don't wait for the record store to finish applying the batch
    #[arg(long)]
    no_wait: bool,

    /// Log intended changes without submitting them
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn into_config(self) -> SyncConfig {
        let mut config = SyncConfig::new(&self.domain)
            .with_hosts_file(self.file)
            .with_networks(self.networks);
        config.mode = self.mode.into();
        config.interval_secs = self.interval;
        config.ttl = self.ttl;
        config.qualify_hosts = !self.no_qualify_hosts;
        config.exclude_hosts = self.exclude_hosts;
        config.wait_for_apply = !self.no_wait;
        config
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let dry_run = cli.dry_run;
    let debug_logging = cli.debug;

    let config = cli.into_config();
    if let Err(e) = config.validate() {
        eprintln!("configuration error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing before anything that logs
    let log_level = if debug_logging {
        Level::DEBUG
    } else {
        match std::env::var("HOSTSYNC_LOG").unwrap_or_default().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    let store = match build_store(dry_run) {
        Ok(store) => store,
        Err(e) => {
            error!("startup error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    info!(
        "starting hostsyncd: domain {}, {} network filter(s), source {}",
        config.domain,
        config.networks.len(),
        config.hosts_file.display()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        if let Err(e) = run(config, store).await {
            error!("{:#}", e);
            SyncExitCode::RuntimeError
        } else {
            SyncExitCode::CleanShutdown
        }
    })
    .into()
}

/// Construct the record store from environment credentials
#[cfg(feature = "cloudflare")]
fn build_store(dry_run: bool) -> Result<Box<dyn RecordStore>> {
    let api_token = std::env::var("HOSTSYNC_API_TOKEN").map_err(|_| {
        anyhow::anyhow!(
            "HOSTSYNC_API_TOKEN is required. Set it via: export HOSTSYNC_API_TOKEN=your_token"
        )
    })?;
    let zone_id = std::env::var("HOSTSYNC_ZONE_ID").ok();

    if dry_run {
        info!("running in DRY-RUN mode, no changes will be submitted");
    }

    let store = hostsync_provider_cloudflare::CloudflareStore::new(api_token, zone_id, dry_run)?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "cloudflare"))]
fn build_store(_dry_run: bool) -> Result<Box<dyn RecordStore>> {
    anyhow::bail!("no record store implementation compiled in")
}

/// Run the engine in the configured mode
async fn run(config: SyncConfig, store: Box<dyn RecordStore>) -> Result<()> {
    let mode = config.mode;
    let (engine, mut events) = SyncEngine::new(store, config)?;

    // Drain engine events for debug visibility
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "engine event");
        }
    });

    match mode {
        Mode::Oneshot => engine.sync_once().await?,
        Mode::Daemon => engine.run().await?,
    }

    Ok(())
}
