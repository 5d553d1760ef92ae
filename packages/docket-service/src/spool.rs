use std::sync::Arc;

use serde::Serialize;

use docket_storage::{
	Store,
	spool::{self, Decoded, DurableQueue, PendingRecord, SpoolRecord},
};

use crate::{DocketService, Error, Result};

/// Where a protected write ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
	Committed,
	Spooled { record_id: String },
}
impl WriteOutcome {
	pub fn is_spooled(&self) -> bool {
		matches!(self, Self::Spooled { .. })
	}
}

/// Counts from one pass over the pending records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
	pub replayed: usize,
	pub discarded: usize,
	pub failed: usize,
}

impl DocketService {
	/// Durably stages `record` for a later replay.
	pub async fn spool_write(&self, record: &SpoolRecord) -> Result<String> {
		let Some(queue) = self.spool.clone() else {
			return Err(Error::Spool { message: "The spool is disabled.".to_string() });
		};
		let payload = record.encode()?;

		blocking(move || queue.enqueue(&payload)).await
	}

	/// Replays every pending record once. Succeeded, rejected and undecodable records are
	/// removed.
	pub async fn drain(&self) -> Result<DrainReport> {
		let Some(queue) = self.spool.clone() else {
			return Ok(DrainReport::default());
		};

		drain(queue, self.store.as_ref()).await
	}

	/// Writes `record` to primary storage, spooling it when storage is unavailable.
	///
	/// Rejected records are not spooled. If the spool is disabled or its write fails, the original
	/// storage error is returned.
	pub(crate) async fn persist(&self, record: SpoolRecord) -> Result<WriteOutcome> {
		let err = match replay(self.store.as_ref(), &record).await {
			Ok(()) => return Ok(WriteOutcome::Committed),
			Err(err) if is_transient(&err) => err,
			Err(err) => return Err(err.into()),
		};

		if self.spool.is_none() {
			return Err(err.into());
		}

		match self.spool_write(&record).await {
			Ok(record_id) => {
				tracing::warn!(
					error = %err,
					kind = record.kind(),
					record_id = %record_id,
					"Primary write failed. Record spooled for replay."
				);

				Ok(WriteOutcome::Spooled { record_id })
			},
			Err(spool_err) => {
				tracing::error!(
					error = %err,
					spool_error = %spool_err,
					kind = record.kind(),
					"Primary write failed and the record could not be spooled."
				);

				Err(err.into())
			},
		}
	}
}

/// One drain pass of `queue` against `store`.
///
/// Corrupt and unknown-type records, and records the store rejects outright, are acked and
/// counted as discarded. A replay that fails on an outage leaves its record pending for the next
/// pass. Queue I/O runs on the blocking pool.
pub async fn drain(queue: Arc<dyn DurableQueue>, store: &dyn Store) -> Result<DrainReport> {
	let mut report = DrainReport::default();
	let pending = {
		let queue = queue.clone();

		blocking(move || queue.list_pending()).await?
	};

	for pending in pending {
		let record = match spool::decode(&pending.payload) {
			Decoded::Record(record) => record,
			Decoded::UnknownType(kind) => {
				tracing::warn!(
					record_id = %pending.id,
					kind = %kind,
					"Discarding spool record of unknown type."
				);

				ack(&queue, &pending).await?;

				report.discarded += 1;

				continue;
			},
			Decoded::Corrupt(detail) => {
				tracing::warn!(
					record_id = %pending.id,
					error = %detail,
					"Discarding corrupt spool record."
				);

				ack(&queue, &pending).await?;

				report.discarded += 1;

				continue;
			},
		};

		match replay(store, &record).await {
			Ok(()) => {
				ack(&queue, &pending).await?;

				report.replayed += 1;
			},
			Err(err) if !is_transient(&err) => {
				tracing::warn!(
					record_id = %pending.id,
					kind = record.kind(),
					error = %err,
					"Spool record rejected by storage. Discarding it."
				);

				ack(&queue, &pending).await?;

				report.discarded += 1;
			},
			Err(err) => {
				tracing::warn!(
					record_id = %pending.id,
					kind = record.kind(),
					error = %err,
					"Spool replay failed. Record kept for the next pass."
				);

				report.failed += 1;
			},
		}
	}

	if report.replayed > 0 || report.discarded > 0 {
		tracing::info!(
			replayed = report.replayed,
			discarded = report.discarded,
			failed = report.failed,
			"Spool drained."
		);
	}

	Ok(report)
}

async fn replay(store: &dyn Store, record: &SpoolRecord) -> docket_storage::Result<()> {
	match record {
		SpoolRecord::Ingest(payload) => store.upsert_ingest(payload).await,
		SpoolRecord::EvalLog(entry) => store.insert_eval_log(entry).await,
		SpoolRecord::AuditLog(entry) => store.insert_audit(entry).await,
	}
}

async fn ack(queue: &Arc<dyn DurableQueue>, pending: &PendingRecord) -> Result<()> {
	let queue = queue.clone();
	let id = pending.id.clone();

	blocking(move || queue.ack(&id)).await
}

/// Runs a queue call on the blocking pool so fsync and rename stay off the async workers.
async fn blocking<T, F>(call: F) -> Result<T>
where
	F: 'static + Send + FnOnce() -> docket_storage::Result<T>,
	T: 'static + Send,
{
	let result = tokio::task::spawn_blocking(call)
		.await
		.map_err(|err| Error::Spool { message: format!("Spool task failed: {err}.") })?;

	Ok(result?)
}

fn is_transient(err: &docket_storage::Error) -> bool {
	matches!(err, docket_storage::Error::Sqlx(_) | docket_storage::Error::Io(_))
}
