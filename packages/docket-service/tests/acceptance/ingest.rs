use std::sync::atomic::Ordering;

use serde_json::{Value, json};
use uuid::Uuid;

use docket_service::{Error, IngestRequest, ingest::chunk_id};
use docket_storage::spool::DurableQueue;

use super::StubRerank;

const WORDS: &str = "alpha bravo charlie delta echo foxtrot golf hotel india juliet";

fn request(text: &str) -> IngestRequest {
	IngestRequest {
		doc_id: None,
		title: "Master services agreement".to_string(),
		text: text.to_string(),
		meta: json!({ "category": "contracts" }),
		tenant_id: Some("acme".to_string()),
		chunk_size: Some(4),
		chunk_overlap: Some(1),
	}
}

#[tokio::test]
async fn documents_are_split_into_overlapping_chunks_with_stable_ids() {
	let harness = super::harness();
	let response = harness.service.ingest(request(WORDS)).await.expect("Ingest failed.");

	assert_eq!(response.chunk_count, 3);
	assert!(!response.spooled);

	let mut chunks = harness.store.chunks();

	chunks.sort_by_key(|chunk| chunk.ord);

	let texts = chunks.iter().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>();

	assert_eq!(
		texts,
		vec![
			"alpha bravo charlie delta",
			"delta echo foxtrot golf",
			"golf hotel india juliet"
		]
	);

	for (ord, chunk) in chunks.iter().enumerate() {
		assert_eq!(chunk.chunk_id, chunk_id(response.doc_id, ord));
		assert_eq!(chunk.ord, ord as i32);
		assert_eq!(chunk.tenant_id.as_deref(), Some("acme"));
		assert_eq!(chunk.embedding.len(), 4);
	}

	// One batched embedding call for the whole document.
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ingest_is_recorded_in_the_audit_log() {
	let harness = super::harness();
	let response = harness.service.ingest(request(WORDS)).await.expect("Ingest failed.");
	let audits = harness.store.audit_logs();

	assert_eq!(audits.len(), 1);
	assert_eq!(audits[0].route, "ingest");
	assert_eq!(audits[0].tenant_id.as_deref(), Some("acme"));
	assert_eq!(audits[0].query.as_deref(), Some("Master services agreement"));
	assert!(audits[0].evidence_ids.is_empty());

	let mut req = request(WORDS);

	req.doc_id = Some(response.doc_id);
	req.tenant_id = Some("globex".to_string());

	harness.service.ingest(req).await.expect_err("Tenant change must conflict.");

	assert_eq!(harness.store.audit_logs().len(), 1);
}

#[tokio::test]
async fn reingesting_replaces_the_chunk_set() {
	let harness = super::harness();
	let doc_id = Uuid::new_v4();
	let mut req = request(WORDS);

	req.doc_id = Some(doc_id);

	harness.service.ingest(req.clone()).await.expect("Ingest failed.");

	let first = harness.store.chunks();

	harness.service.ingest(req.clone()).await.expect("Re-ingest failed.");

	assert_eq!(harness.store.chunks(), first);

	req.text = "alpha bravo".to_string();

	let response = harness.service.ingest(req.clone()).await.expect("Re-ingest failed.");
	let chunks = harness.store.chunks();

	assert_eq!(response.doc_id, doc_id);
	assert_eq!(response.chunk_count, 1);
	assert_eq!(chunks.len(), 1);
	assert_eq!(chunks[0].chunk_id, chunk_id(doc_id, 0));
	assert_eq!(chunks[0].text, "alpha bravo");

	req.tenant_id = Some("globex".to_string());

	let err = harness.service.ingest(req).await.expect_err("Tenant change must conflict.");

	assert!(matches!(err, Error::Conflict { .. }));
	assert_eq!(harness.store.chunks()[0].tenant_id.as_deref(), Some("acme"));
}

#[tokio::test]
async fn personal_data_is_redacted_before_storage() {
	let harness = super::harness();
	let mut req = request("Send notices to jane.roe@example.com or call 415-555-2671.");

	req.chunk_size = None;
	req.chunk_overlap = None;

	harness.service.ingest(req).await.expect("Ingest failed.");

	let chunks = harness.store.chunks();

	assert_eq!(chunks.len(), 1);
	assert!(chunks[0].text.contains("[REDACTED_EMAIL]"));
	assert!(chunks[0].text.contains("[REDACTED_PHONE]"));
	assert!(!chunks[0].text.contains("jane.roe"));
}

#[tokio::test]
async fn redaction_can_be_turned_off() {
	let harness =
		super::harness_with(|cfg| cfg.ingest.redact_pii = false, StubRerank::default());

	harness
		.service
		.ingest(request("Send notices to jane.roe@example.com today."))
		.await
		.expect("Ingest failed.");

	assert!(harness.store.chunks()[0].text.contains("jane.roe@example.com"));
}

#[tokio::test]
async fn null_meta_is_stored_as_an_empty_object() {
	let harness = super::harness();
	let mut req = request(WORDS);

	req.meta = Value::Null;

	harness.service.ingest(req).await.expect("Ingest failed.");

	assert_eq!(harness.store.ingests()[0].document.meta, json!({}));
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_work() {
	let harness = super::harness();
	let cases: Vec<fn(&mut IngestRequest)> = vec![
		|req| req.title = "   ".to_string(),
		|req| req.chunk_size = Some(0),
		|req| req.chunk_overlap = Some(4),
		|req| req.meta = json!(["not", "an", "object"]),
		|req| req.text = " \n\t ".to_string(),
	];

	for mutate in cases {
		let mut req = request(WORDS);

		mutate(&mut req);

		let err = harness.service.ingest(req).await.expect_err("Request must be rejected.");

		assert!(matches!(err, Error::InvalidArgument { .. }), "unexpected error: {err}");
	}

	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);
	assert_eq!(harness.store.write_calls(), 0);
	assert!(harness.queue.list_pending().expect("Failed to list spool.").is_empty());
}

#[tokio::test]
async fn required_tenant_is_enforced() {
	let harness =
		super::harness_with(|cfg| cfg.security.require_tenant = true, StubRerank::default());
	let mut req = request(WORDS);

	req.tenant_id = Some("  ".to_string());

	let err = harness.service.ingest(req).await.expect_err("Tenant is required.");

	assert!(matches!(err, Error::InvalidArgument { .. }));
	assert!(harness.store.chunks().is_empty());
}
