use std::sync::atomic::Ordering;

use docket_service::{Error, SearchRequest, SearchResponse};
use docket_testkit::FullTextMode;

use super::{Harness, StubRerank};

const CLAIM: &str = "Liability is capped, except for liability arising from gross negligence.";
const NOTICE: &str = "Notices must be delivered in writing to the registered address.";

fn seeded(harness: &Harness) -> (uuid::Uuid, uuid::Uuid) {
	let claim = super::seed(&harness.store, None, "contracts", CLAIM, [0.0, 1.0, 0.0, 0.0]);
	let notice = super::seed(&harness.store, None, "contracts", NOTICE, [1.0, 0.0, 0.0, 0.0]);

	harness.embedding.fix("liability", [0.9, 0.1, 0.0, 0.0]);

	(claim, notice)
}

async fn search(harness: &Harness, query: &str) -> Result<SearchResponse, Error> {
	harness
		.service
		.search(SearchRequest {
			query: query.to_string(),
			keyword: None,
			top_k: Some(5),
			category: None,
			tenant_id: None,
			caller: None,
			request_id: None,
		})
		.await
}

#[tokio::test]
async fn indexed_keyword_hits_carry_relevance() {
	let harness = super::harness();
	let (claim, notice) = seeded(&harness);
	let response = search(&harness, "liability").await.expect("Search failed.");
	let ids = response.passages.iter().map(|p| p.id).collect::<Vec<_>>();

	// Neutral rerank scores leave passages in distance order.
	assert_eq!(ids, vec![notice, claim]);
	assert_eq!(response.passages[0].relevance, None);
	assert_eq!(response.passages[1].relevance, Some(2.0));
	assert!(response.passages[1].distance.is_some());
}

#[tokio::test]
async fn missing_index_falls_back_to_substring_matching() {
	for mode in [FullTextMode::Unavailable, FullTextMode::Failing] {
		let harness = super::harness();
		let (claim, _) = seeded(&harness);

		harness.store.set_fulltext_mode(mode);

		let response = search(&harness, "liability").await.expect("Search failed.");
		let hit = response
			.passages
			.iter()
			.find(|p| p.id == claim)
			.expect("Substring match must be returned.");

		assert_eq!(hit.relevance, Some(2.0), "mode {mode:?}");
		assert_eq!(response.passages.len(), 2);
	}
}

#[tokio::test]
async fn unreadable_storage_surfaces_as_unavailable() {
	let harness = super::harness();

	seeded(&harness);
	harness.store.set_fail_reads(true);

	let err = search(&harness, "liability").await.expect_err("Both sources failed.");

	assert!(matches!(err, Error::StorageUnavailable { .. }));
	assert!(harness.store.eval_logs().is_empty());
}

#[tokio::test]
async fn failed_embedding_uses_offline_vectors_when_allowed() {
	let harness = super::harness();
	let (claim, _) = seeded(&harness);

	harness.embedding.fail.store(true, Ordering::SeqCst);

	let response = search(&harness, "liability").await.expect("Offline fallback failed.");

	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 1);
	assert!(response.passages.iter().any(|p| p.id == claim));
	assert_eq!(harness.store.eval_logs().len(), 1);
}

#[tokio::test]
async fn failed_embedding_without_fallback_is_a_capability_error() {
	let harness = super::harness_with(
		|cfg| cfg.providers.embedding.offline_fallback = false,
		StubRerank::default(),
	);

	seeded(&harness);
	harness.embedding.fail.store(true, Ordering::SeqCst);

	let err = search(&harness, "liability").await.expect_err("Embedding must fail.");

	assert!(matches!(err, Error::CapabilityUnavailable { .. }));
	assert!(harness.store.eval_logs().is_empty());
}

#[tokio::test]
async fn forced_offline_mode_never_calls_the_provider() {
	let harness =
		super::harness_with(|cfg| cfg.providers.embedding.force_offline = true, StubRerank::default());

	seeded(&harness);

	let response = search(&harness, "liability").await.expect("Search failed.");

	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);
	assert_eq!(response.passages.len(), 2);
}
