use std::{
	fs, io,
	sync::{Arc, Mutex, mpsc},
	time::Duration,
};

use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use docket_service::{
	DocketService, DrainReport, IngestRequest, Providers, SearchRequest, WriteOutcome,
};
use docket_storage::{
	Store,
	models::{
		AuditLogEntry, ChunkRecord, DocumentRecord, EvalLogEntry, IngestPayload, LatencyBreakdown,
	},
	spool::{DurableQueue, FsQueue, PendingRecord, SpoolRecord},
};

/// Holds each `enqueue` until the test sends a release.
struct GatedQueue {
	inner: FsQueue,
	release: Mutex<mpsc::Receiver<()>>,
}
impl DurableQueue for GatedQueue {
	fn enqueue(&self, payload: &[u8]) -> docket_storage::Result<String> {
		let released = self.release.lock().unwrap().recv_timeout(Duration::from_secs(5));

		if released.is_err() {
			return Err(io::Error::other("Enqueue was never released.").into());
		}

		self.inner.enqueue(payload)
	}

	fn list_pending(&self) -> docket_storage::Result<Vec<PendingRecord>> {
		self.inner.list_pending()
	}

	fn ack(&self, id: &str) -> docket_storage::Result<()> {
		self.inner.ack(id)
	}
}

fn eval(n: u32) -> EvalLogEntry {
	EvalLogEntry {
		eval_id: Uuid::new_v4(),
		tenant_id: Some("acme".to_string()),
		route: "search".to_string(),
		query: format!("query {n}"),
		keyword: Some("notice".to_string()),
		top_k: 5,
		filter_category: None,
		latency_ms: 12,
		step_ms: LatencyBreakdown { embed_ms: 3, search_ms: 6, rerank_ms: 2, assess_ms: 1 },
		evidence_ids: vec![Uuid::new_v4()],
		model: None,
		confidence: 0.25,
		insufficient: true,
		rating: None,
		created_at: OffsetDateTime::UNIX_EPOCH,
	}
}

fn audit(n: u32) -> AuditLogEntry {
	AuditLogEntry {
		audit_id: Uuid::new_v4(),
		tenant_id: Some("acme".to_string()),
		actor: Some(format!("analyst-{n}")),
		route: "search".to_string(),
		query: None,
		evidence_ids: Vec::new(),
		request_id: None,
		created_at: OffsetDateTime::UNIX_EPOCH,
	}
}

fn ingest(n: u32) -> IngestPayload {
	let doc_id = Uuid::new_v4();

	IngestPayload {
		document: DocumentRecord {
			doc_id,
			tenant_id: Some("acme".to_string()),
			title: format!("Contract {n}"),
			meta: json!({ "category": "contracts" }),
		},
		chunks: vec![ChunkRecord {
			chunk_id: Uuid::new_v4(),
			doc_id,
			ord: 0,
			text: format!("Clause {n} survives termination."),
			embedding: vec![0.5, 0.5, 0.5, 0.5],
			tenant_id: Some("acme".to_string()),
		}],
	}
}

fn mixed(n: u32) -> Vec<SpoolRecord> {
	(0..n)
		.map(|i| match i % 3 {
			0 => SpoolRecord::Ingest(ingest(i)),
			1 => SpoolRecord::EvalLog(eval(i)),
			_ => SpoolRecord::AuditLog(audit(i)),
		})
		.collect()
}

#[tokio::test]
async fn draining_replays_every_record_once_with_identical_payloads() {
	let harness = super::harness();
	let records = mixed(9);
	let encoded = records
		.iter()
		.map(|record| record.encode().expect("Failed to encode record."))
		.collect::<Vec<_>>();

	for record in &records {
		harness.service.spool_write(record).await.expect("Spool write failed.");
	}

	let pending = harness.queue.list_pending().expect("Failed to list spool.");

	assert_eq!(pending.iter().map(|p| p.payload.clone()).collect::<Vec<_>>(), encoded);

	let report = harness.service.drain().await.expect("Drain failed.");

	assert_eq!(report, DrainReport { replayed: 9, discarded: 0, failed: 0 });
	assert!(harness.queue.list_pending().expect("Failed to list spool.").is_empty());
	assert_eq!(harness.store.write_calls(), 9);

	let mut replayed = Vec::new();

	replayed.extend(harness.store.ingests().into_iter().map(SpoolRecord::Ingest));
	replayed.extend(harness.store.eval_logs().into_iter().map(SpoolRecord::EvalLog));
	replayed.extend(harness.store.audit_logs().into_iter().map(SpoolRecord::AuditLog));

	let mut replayed_bytes = replayed
		.iter()
		.map(|record| record.encode().expect("Failed to encode record."))
		.collect::<Vec<_>>();
	let mut expected_bytes = encoded.clone();

	replayed_bytes.sort();
	expected_bytes.sort();

	assert_eq!(replayed_bytes, expected_bytes);
	assert_eq!(harness.service.drain().await.expect("Drain failed."), DrainReport::default());
}

#[tokio::test]
async fn corrupt_and_unknown_records_are_discarded() {
	let harness = super::harness();

	harness.queue.enqueue(b"{ truncated").expect("Failed to enqueue.");
	harness.queue.enqueue(br#"{"type":"webhook","payload":{}}"#).expect("Failed to enqueue.");
	harness
		.service
		.spool_write(&SpoolRecord::AuditLog(audit(1)))
		.await
		.expect("Spool write failed.");

	let report = harness.service.drain().await.expect("Drain failed.");

	assert_eq!(report, DrainReport { replayed: 1, discarded: 2, failed: 0 });
	assert!(harness.queue.list_pending().expect("Failed to list spool.").is_empty());
}

#[tokio::test]
async fn failed_replays_stay_pending_until_storage_recovers() {
	let harness = super::harness();

	for record in mixed(3) {
		harness.service.spool_write(&record).await.expect("Spool write failed.");
	}

	harness.store.set_fail_writes(true);

	let report = harness.service.drain().await.expect("Drain failed.");

	assert_eq!(report, DrainReport { replayed: 0, discarded: 0, failed: 3 });
	assert_eq!(harness.queue.list_pending().expect("Failed to list spool.").len(), 3);

	harness.store.set_fail_writes(false);

	let report = harness.service.drain().await.expect("Drain failed.");

	assert_eq!(report.replayed, 3);
	assert!(harness.queue.list_pending().expect("Failed to list spool.").is_empty());
}

#[tokio::test]
async fn writes_during_an_outage_are_spooled_and_replayed() {
	let harness = super::harness();

	harness.store.set_fail_writes(true);

	let response = harness
		.service
		.ingest(IngestRequest {
			doc_id: None,
			title: "Outage contract".to_string(),
			text: "Either party may terminate with thirty days notice.".to_string(),
			meta: json!({ "category": "contracts" }),
			tenant_id: Some("acme".to_string()),
			chunk_size: None,
			chunk_overlap: None,
		})
		.await
		.expect("Ingest should succeed by spooling.");

	assert!(response.spooled);

	let outcome = harness.service.log_eval(eval(1)).await.expect("Eval log should spool.");

	assert!(matches!(outcome, WriteOutcome::Spooled { .. }));

	harness
		.service
		.search(SearchRequest {
			query: "terminate".to_string(),
			keyword: None,
			top_k: Some(3),
			category: None,
			tenant_id: Some("acme".to_string()),
			caller: None,
			request_id: None,
		})
		.await
		.expect("Search should survive a write outage.");

	// Ingest with its audit entry, the eval log, and the search's eval and audit entries.
	assert_eq!(harness.queue.list_pending().expect("Failed to list spool.").len(), 5);
	assert!(harness.store.chunks().is_empty());

	harness.store.set_fail_writes(false);

	let report = harness.service.drain().await.expect("Drain failed.");

	assert_eq!(report.replayed, 5);
	assert_eq!(harness.store.chunks().len(), response.chunk_count);
	assert_eq!(harness.store.eval_logs().len(), 2);
	assert_eq!(harness.store.audit_logs().len(), 2);
}

#[tokio::test]
async fn disabled_spool_surfaces_the_storage_error() {
	let harness = super::harness();
	let spool_dir = tempfile::tempdir().expect("Failed to create dir.");
	let mut cfg = docket_testkit::test_config(spool_dir.path()).expect("Failed to build config.");

	cfg.spool.enabled = false;

	let service = docket_service::DocketService::with_parts(
		cfg,
		harness.store.clone(),
		docket_service::Providers::new(harness.embedding.clone(), harness.rerank.clone()),
		None,
	)
	.expect("Failed to build service.");

	harness.store.set_fail_writes(true);

	let err = service.audit(audit(1)).await.expect_err("Write must fail without a spool.");

	assert!(matches!(err, docket_service::Error::StorageUnavailable { .. }));
	assert!(service.spool_write(&SpoolRecord::AuditLog(audit(2))).await.is_err());
	assert_eq!(service.drain().await.expect("Drain failed."), DrainReport::default());
	assert!(fs::read_dir(spool_dir.path()).expect("Failed to read dir.").next().is_none());
}

#[tokio::test]
async fn records_the_store_rejects_are_discarded_instead_of_retried() {
	let harness = super::harness();
	let payload = ingest(1);
	let doc_id = payload.document.doc_id;

	harness
		.service
		.spool_write(&SpoolRecord::Ingest(payload))
		.await
		.expect("Spool write failed.");
	harness.store.seed_chunk(
		DocumentRecord {
			doc_id,
			tenant_id: Some("globex".to_string()),
			title: "Globex supply agreement".to_string(),
			meta: json!({ "category": "contracts" }),
		},
		ChunkRecord {
			chunk_id: Uuid::new_v4(),
			doc_id,
			ord: 0,
			text: "Globex terms govern.".to_string(),
			embedding: vec![0.1, 0.2, 0.3, 0.4],
			tenant_id: Some("globex".to_string()),
		},
	);

	let report = harness.service.drain().await.expect("Drain failed.");

	assert_eq!(report, DrainReport { replayed: 0, discarded: 1, failed: 0 });
	assert!(harness.queue.list_pending().expect("Failed to list spool.").is_empty());
	assert!(harness.store.ingests().is_empty());
	assert!(
		harness.store.chunks().iter().all(|chunk| chunk.tenant_id.as_deref() == Some("globex"))
	);
	assert_eq!(harness.service.drain().await.expect("Drain failed."), DrainReport::default());
}

#[tokio::test]
async fn spool_writes_leave_the_runtime_thread_free() {
	let harness = super::harness();
	let spool_dir = tempfile::tempdir().expect("Failed to create dir.");
	let cfg = docket_testkit::test_config(spool_dir.path()).expect("Failed to build config.");
	let (release, gate) = mpsc::channel();
	let queue = Arc::new(GatedQueue {
		inner: FsQueue::open(spool_dir.path()).expect("Failed to open spool."),
		release: Mutex::new(gate),
	});
	let service = DocketService::with_parts(
		cfg,
		harness.store.clone() as Arc<dyn Store>,
		Providers::new(harness.embedding.clone(), harness.rerank.clone()),
		Some(queue.clone() as Arc<dyn DurableQueue>),
	)
	.expect("Failed to build service.");

	harness.store.set_fail_writes(true);

	// Single-threaded runtime: the release only runs if the enqueue yields the thread.
	let (outcome, ()) = tokio::join!(service.log_eval(eval(1)), async {
		release.send(()).expect("Failed to release enqueue.");
	});

	assert!(outcome.expect("Eval log should spool.").is_spooled());
	assert_eq!(queue.list_pending().expect("Failed to list spool.").len(), 1);
}
