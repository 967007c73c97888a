//! arena-oracle command line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arena_oracle::{
    DecryptionService, Fixture, OracleConfig, OracleContext, OraclePoller, SandboxDecryptionService,
    SharedDecryptionService,
};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arena-oracle", version, about = "Tournament computation oracle")]
struct Args {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the polling oracle against a sandbox ledger until Ctrl-C
    Run {
        /// Oracle configuration (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Tournament fixture used to seed the sandbox ledger (JSON)
        #[arg(long)]
        fixture: PathBuf,
    },

    /// Compute results offline from a fixture and print them as JSON
    Replay {
        #[arg(long)]
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Run { config, fixture } => run(config, fixture).await,
        Command::Replay { fixture } => replay(fixture),
    }
}

async fn run(config_path: PathBuf, fixture_path: PathBuf) -> Result<()> {
    let config = OracleConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let fixture = Fixture::from_file(&fixture_path)
        .with_context(|| format!("failed to load fixture from {}", fixture_path.display()))?;
    if fixture.contract_address != config.contract_address {
        warn!(
            fixture = %fixture.contract_address,
            config = %config.contract_address,
            "fixture contract differs from configured contract"
        );
    }

    let identity = config.identity();
    let ledger = fixture
        .seed(identity.address().clone())
        .await
        .context("failed to seed sandbox ledger")?;

    let decryption_ledger = ledger.clone();
    let signer = identity.clone();
    let decryption = SharedDecryptionService::lazy(move || {
        let ledger = decryption_ledger.clone();
        let signer = signer.clone();
        async move {
            let service = SandboxDecryptionService::new(ledger).with_signer(signer);
            Ok(Arc::new(service) as Arc<dyn DecryptionService>)
        }
    });

    let ctx = Arc::new(OracleContext {
        ledger,
        decryption: Arc::new(decryption),
        identity,
        request_timeout: config.request_timeout(),
        authorization_days: config.authorization_duration_days,
    });
    let poller = OraclePoller::new(ctx, config.poll_interval());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    poller.run(cancel).await;
    Ok(())
}

fn replay(fixture_path: PathBuf) -> Result<()> {
    let fixture = Fixture::from_file(&fixture_path)
        .with_context(|| format!("failed to load fixture from {}", fixture_path.display()))?;
    let results = fixture.replay().context("replay failed")?;

    let json = serde_json::to_string_pretty(&results).context("failed to serialize results")?;
    println!("{json}");
    Ok(())
}
