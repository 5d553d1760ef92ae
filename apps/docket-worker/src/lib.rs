pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docket_service::DocketService;
use docket_storage::{Store, db::Db};

#[derive(Debug, Parser)]
#[command(
	version = docket_cli::VERSION,
	rename_all = "kebab",
	styles = docket_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = docket_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.storage.postgres.fulltext_index).await?;

	let store: Arc<dyn Store> = Arc::new(db);
	let service = Arc::new(DocketService::new(config, store)?);

	tracing::info!(
		spool_enabled = service.spool.is_some(),
		drain_interval_secs = service.cfg.spool.drain_interval_secs,
		compaction_interval_secs = service.cfg.compaction.interval_secs,
		"Worker started."
	);

	worker::run_worker(service, async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for the shutdown signal.");
		}
	})
	.await;

	tracing::info!("Worker stopped.");

	Ok(())
}
