//! damlink sync worker.
//!
//! One binary with subcommands for each cron entry point: apply
//! migrations, run a refresh cycle, drain the work queues, seed a
//! conversion campaign, or run all of it continuously as a daemon.

mod config;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use damlink_core::store::WorkQueue;
use damlink_dam::{DamClient, OAuthConfig, TokenManager};
use damlink_db::stores::{
    PgAssetDataStore, PgQueue, PgRecordStore, PgStateStore, PgTokenStore,
};
use damlink_db::DbPool;
use damlink_sync::{
    ConvertSeeder, ConvertWorker, DrainSummary, QueueRunner, RefreshConfig, RefreshManager,
    RefreshWorker,
};

use crate::config::Config;

const REFRESH_QUEUE: &str = "dam_refresh";
const CONVERT_QUEUE: &str = "dam_convert";

/// Credential namespace the service-account tokens are stored under.
const CREDENTIAL_NAMESPACE: &str = "dam";

#[derive(Parser)]
#[command(name = "damlink", version, about = "DAM asset synchronization worker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations.
    Migrate,
    /// Run one notification-polling cycle, then drain the refresh queue.
    Refresh,
    /// Drain both work queues once.
    Drain,
    /// Sweep the catalog and seed the conversion queue for one
    /// source/destination file-type pair.
    SeedConvert {
        /// Source file type, e.g. `tiff`.
        #[arg(long)]
        from: String,
        /// Destination file type, e.g. `png`.
        #[arg(long)]
        to: String,
        /// Discard any items already in the conversion queue first.
        #[arg(long)]
        clear: bool,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Run refresh and drain continuously until interrupted.
    Run,
}

/// Wired-up collaborators shared by every DAM-facing command.
struct App {
    config: Config,
    dam: Arc<DamClient>,
    state: Arc<PgStateStore>,
    asset_data: Arc<PgAssetDataStore>,
    records: Arc<PgRecordStore>,
    refresh_queue: Arc<PgQueue>,
    convert_queue: Arc<PgQueue>,
}

impl App {
    async fn connect(config: Config, pool: DbPool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building HTTP client")?;

        let token_store = Arc::new(PgTokenStore::new(
            pool.clone(),
            CREDENTIAL_NAMESPACE,
            config.dam_username.clone(),
        ));
        let auth = TokenManager::new(
            http,
            OAuthConfig {
                token_url: config.dam_token_url.clone(),
                client_id: config.dam_client_id.clone(),
                client_secret: config.dam_client_secret.clone(),
            },
            token_store,
        );
        auth.authenticate_password(&config.dam_username, &config.dam_password)
            .await
            .context("authenticating with the DAM")?;

        let dam = Arc::new(DamClient::new(config.dam_base_url.clone(), auth));
        let visibility = Duration::from_secs(config.visibility_timeout_secs);

        Ok(Self {
            dam,
            state: Arc::new(PgStateStore::new(pool.clone())),
            asset_data: Arc::new(PgAssetDataStore::new(pool.clone())),
            records: Arc::new(PgRecordStore::new(pool.clone())),
            refresh_queue: Arc::new(PgQueue::new(pool.clone(), REFRESH_QUEUE, visibility)),
            convert_queue: Arc::new(PgQueue::new(pool, CONVERT_QUEUE, visibility)),
            config,
        })
    }

    fn refresh_manager(&self) -> RefreshManager {
        RefreshManager::new(
            self.dam.clone(),
            self.state.clone(),
            self.records.clone(),
            self.refresh_queue.clone(),
            RefreshConfig {
                request_limit: self.config.refresh_limit,
                read_interval_secs: self.config.refresh_interval_secs,
            },
        )
    }

    async fn drain_refresh(&self) -> anyhow::Result<DrainSummary> {
        let worker = RefreshWorker::new(self.dam.clone(), self.records.clone());
        let runner = QueueRunner::new(self.refresh_queue.clone());
        Ok(runner.drain(&worker, self.config.drain_batch).await?)
    }

    async fn drain_convert(&self) -> anyhow::Result<DrainSummary> {
        let transfer = Arc::new(damlink_dam::HttpTransfer::new(reqwest::Client::new()));
        let worker = ConvertWorker::new(self.dam.clone(), self.asset_data.clone(), transfer);
        let runner = QueueRunner::new(self.convert_queue.clone());
        Ok(runner.drain(&worker, self.config.drain_batch).await?)
    }

    /// One daemon tick: poll notifications, then drain both queues.
    /// Failures are logged, never fatal; the next tick retries.
    async fn cycle(&self) {
        let enqueued = self.refresh_manager().update_queue(&self.config.sync_bundles).await;
        tracing::debug!(enqueued, "Refresh cycle finished");

        match self.drain_refresh().await {
            Ok(summary) => log_summary(REFRESH_QUEUE, &summary),
            Err(err) => tracing::error!(error = %err, "Refresh queue drain failed"),
        }
        match self.drain_convert().await {
            Ok(summary) => log_summary(CONVERT_QUEUE, &summary),
            Err(err) => tracing::error!(error = %err, "Convert queue drain failed"),
        }
    }
}

fn log_summary(queue: &str, summary: &DrainSummary) {
    tracing::info!(
        queue,
        processed = summary.processed,
        requeued = summary.requeued,
        dropped = summary.dropped,
        suspended = summary.suspended.as_deref(),
        "Drain pass finished",
    );
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush().context("flushing stdout")?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// A conversion sweep requires an empty queue so two campaigns never
/// mix; `clear` discards whatever is pending instead of refusing.
async fn prepare_convert_queue(queue: &dyn WorkQueue, clear: bool) -> anyhow::Result<()> {
    let pending = queue.count().await?;
    if pending > 0 {
        if !clear {
            anyhow::bail!(
                "conversion queue has {pending} pending items; pass --clear to discard them"
            );
        }
        queue.clear().await?;
        tracing::info!(pending, "Cleared pending conversion items");
    }
    Ok(())
}

async fn seed_convert(
    app: &App,
    from: &str,
    to: &str,
    clear: bool,
    yes: bool,
) -> anyhow::Result<()> {
    if !yes && !confirm(&format!("Seed a {from} -> {to} conversion sweep?"))? {
        tracing::info!("Seeding aborted");
        return Ok(());
    }

    prepare_convert_queue(app.convert_queue.as_ref(), clear).await?;

    let seeder = ConvertSeeder::new(
        app.dam.clone(),
        app.asset_data.clone(),
        app.convert_queue.clone(),
    );
    let enqueued = seeder.seed(from, to).await?;
    tracing::info!(enqueued, from, to, "Seeding finished");
    Ok(())
}

async fn run_daemon(app: &App) {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs(app.config.poll_interval_secs));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => app.cycle().await,
        }
    }
    tracing::info!("Worker stopped");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "damlink=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = damlink_db::create_pool(&config.database_url)
        .await
        .context("connecting to database")?;

    if let Command::Migrate = cli.command {
        damlink_db::run_migrations(&pool)
            .await
            .context("applying migrations")?;
        tracing::info!("Migrations applied");
        return Ok(());
    }

    let app = App::connect(config, pool).await?;
    match cli.command {
        Command::Migrate => unreachable!(),
        Command::Refresh => {
            let enqueued = app
                .refresh_manager()
                .update_queue(&app.config.sync_bundles)
                .await;
            tracing::info!(enqueued, "Refresh cycle finished");
            log_summary(REFRESH_QUEUE, &app.drain_refresh().await?);
        }
        Command::Drain => {
            log_summary(REFRESH_QUEUE, &app.drain_refresh().await?);
            log_summary(CONVERT_QUEUE, &app.drain_convert().await?);
        }
        Command::SeedConvert {
            from,
            to,
            clear,
            yes,
        } => seed_convert(&app, &from, &to, clear, yes).await?,
        Command::Run => run_daemon(&app).await,
    }

    Ok(())
}
