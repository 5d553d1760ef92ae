use std::{future::Future, sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinSet, time::MissedTickBehavior};

use docket_service::DocketService;

/// Runs the spool drainer and, when an interval is configured, the compaction loop until
/// `shutdown` resolves.
///
/// Loops stop between passes; a pass in flight finishes first.
pub async fn run_worker<F>(service: Arc<DocketService>, shutdown: F)
where
	F: Future<Output = ()>,
{
	let (stop_tx, stop_rx) = watch::channel(false);
	let mut loops = JoinSet::new();

	if service.spool.is_some() {
		let every = Duration::from_secs(service.cfg.spool.drain_interval_secs.max(1));

		loops.spawn(drain_loop(service.clone(), every, stop_rx.clone()));
	} else {
		tracing::info!("Spool disabled. Drain loop not started.");
	}

	if service.cfg.compaction.interval_secs > 0 {
		let every = Duration::from_secs(service.cfg.compaction.interval_secs);

		loops.spawn(compact_loop(service.clone(), every, stop_rx.clone()));
	}

	shutdown.await;

	let _ = stop_tx.send(true);

	while let Some(joined) = loops.join_next().await {
		if let Err(err) = joined {
			tracing::error!(error = %err, "Worker loop panicked.");
		}
	}
}

async fn drain_loop(
	service: Arc<DocketService>,
	every: Duration,
	mut stop: watch::Receiver<bool>,
) {
	let mut ticker = tokio::time::interval(every);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = ticker.tick() => {
				if let Err(err) = service.drain().await {
					tracing::error!(error = %err, "Spool drain failed.");
				}
			},
			_ = stop.changed() => break,
		}
	}
}

async fn compact_loop(
	service: Arc<DocketService>,
	every: Duration,
	mut stop: watch::Receiver<bool>,
) {
	let mut ticker = tokio::time::interval(every);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = ticker.tick() => {
				if let Err(err) = service.compact().await {
					tracing::warn!(error = %err, "Chunk compaction failed.");
				}
			},
			_ = stop.changed() => break,
		}
	}
}
