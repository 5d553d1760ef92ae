use std::sync::{Arc, atomic::Ordering};

use uuid::Uuid;

use docket_domain::Candidate;
use docket_service::SearchRequest;

use super::StubRerank;

fn candidate(n: u128, text: &str, distance: Option<f32>) -> Candidate {
	Candidate {
		chunk_id: Uuid::from_u128(n),
		doc_id: Uuid::from_u128(100 + n),
		ord: 0,
		text: text.to_string(),
		tenant_id: None,
		distance,
		relevance: None,
		fused_score: 0.0,
		rerank_score: None,
	}
}

fn shuffled() -> Vec<Candidate> {
	vec![
		candidate(1, "indemnity clause", Some(0.40)),
		candidate(2, "liability cap clause", Some(0.10)),
		candidate(3, "keyword only", None),
		candidate(4, "liability survives termination", Some(0.25)),
	]
}

fn ids(candidates: &[Candidate]) -> Vec<u128> {
	candidates.iter().map(|c| c.chunk_id.as_u128()).collect()
}

#[tokio::test]
async fn disabled_rerank_is_idempotent_distance_order() {
	let harness = super::harness();
	let mut once = shuffled();

	harness.service.rerank("liability cap", &mut once).await;

	assert_eq!(ids(&once), vec![2, 4, 1, 3]);
	assert!(once.iter().all(|c| c.rerank_score == Some(0.0)));

	let mut twice = once.clone();

	harness.service.rerank("liability cap", &mut twice).await;

	assert_eq!(twice, once);
	assert_eq!(harness.rerank.loads.load(Ordering::SeqCst), 0);
	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn enabled_rerank_orders_by_score_then_distance() {
	let harness = super::harness_with(super::enable_rerank, StubRerank::default());
	let mut candidates = shuffled();

	harness.service.rerank("liability cap", &mut candidates).await;

	// Scores: 1 -> 0, 2 -> 2, 3 -> 0, 4 -> 1.
	assert_eq!(ids(&candidates), vec![2, 4, 1, 3]);
	assert_eq!(candidates[0].rerank_score, Some(2.0));
	assert_eq!(candidates[1].rerank_score, Some(1.0));

	let mut candidates = shuffled();

	harness.service.rerank("indemnity", &mut candidates).await;

	assert_eq!(ids(&candidates), vec![1, 2, 4, 3]);
}

#[tokio::test]
async fn a_failed_call_degrades_only_that_call() {
	let harness = super::harness_with(super::enable_rerank, StubRerank::default());
	let mut candidates = shuffled();

	harness.rerank.fail_calls.store(true, Ordering::SeqCst);
	harness.service.rerank("indemnity", &mut candidates).await;

	assert_eq!(ids(&candidates), vec![2, 4, 1, 3]);
	assert!(candidates.iter().all(|c| c.rerank_score == Some(0.0)));

	harness.rerank.fail_calls.store(false, Ordering::SeqCst);

	let mut candidates = shuffled();

	harness.service.rerank("indemnity", &mut candidates).await;

	assert_eq!(ids(&candidates)[0], 1);
	assert_eq!(harness.rerank.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn mismatched_score_count_is_a_scoring_failure() {
	let harness = super::harness_with(super::enable_rerank, StubRerank::default());
	let mut candidates = shuffled();

	harness.rerank.truncate_scores.store(true, Ordering::SeqCst);
	harness.service.rerank("indemnity", &mut candidates).await;

	assert_eq!(ids(&candidates), vec![2, 4, 1, 3]);
	assert!(candidates.iter().all(|c| c.rerank_score == Some(0.0)));
}

#[tokio::test]
async fn a_failed_load_is_remembered() {
	let rerank = StubRerank::default();

	rerank.fail_load.store(true, Ordering::SeqCst);

	let harness = super::harness_with(super::enable_rerank, rerank);

	for _ in 0..3 {
		let mut candidates = shuffled();

		harness.service.rerank("indemnity", &mut candidates).await;

		assert_eq!(ids(&candidates), vec![2, 4, 1, 3]);
	}

	assert_eq!(harness.rerank.loads.load(Ordering::SeqCst), 1);
	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_use_loads_the_model_once() {
	let harness = super::harness_with(super::enable_rerank, StubRerank::default());

	super::seed(&harness.store, None, "contracts", "Liability cap clause.", [1.0, 0.0, 0.0, 0.0]);

	let mut tasks = Vec::new();

	for n in 0..16 {
		let service = Arc::clone(&harness.service);

		tasks.push(tokio::spawn(async move {
			service
				.search(SearchRequest {
					query: format!("liability cap {n}"),
					keyword: None,
					top_k: Some(3),
					category: None,
					tenant_id: None,
					caller: None,
					request_id: None,
				})
				.await
		}));
	}

	for task in tasks {
		task.await.expect("Search task panicked.").expect("Search failed.");
	}

	assert_eq!(harness.rerank.loads.load(Ordering::SeqCst), 1);
	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 16);
}
