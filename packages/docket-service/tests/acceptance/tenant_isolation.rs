use std::collections::HashSet;

use uuid::Uuid;

use docket_domain::TenantScope;
use docket_storage::{
	Store,
	search::{FullTextOutcome, SearchFilters},
};
use docket_testkit::{FullTextMode, MemoryStore};

const QUERIES: [&str; 4] = ["termination notice", "liability", "payment terms", "governing law"];

struct Seeded {
	acme: HashSet<Uuid>,
	globex: HashSet<Uuid>,
}

fn seed_two_tenants(store: &MemoryStore) -> Seeded {
	let texts = [
		"Termination requires ninety days written notice.",
		"Liability is capped at fees paid in the prior year.",
		"Payment terms are net thirty from invoice date.",
		"Governing law is the State of New York.",
	];
	let mut acme = HashSet::new();
	let mut globex = HashSet::new();

	for (idx, text) in texts.iter().enumerate() {
		let mut embedding = [0.0; 4];

		embedding[idx] = 1.0;

		acme.insert(super::seed(store, Some("acme"), "contracts", text, embedding));
		globex.insert(super::seed(store, Some("globex"), "contracts", text, embedding));
	}

	Seeded { acme, globex }
}

fn acme_filters() -> SearchFilters {
	SearchFilters { category: None, tenant: TenantScope::tenant("acme") }
}

#[tokio::test]
async fn scoped_sources_and_fused_results_stay_inside_the_tenant() {
	let harness = super::harness();
	let seeded = seed_two_tenants(&harness.store);
	let filters = acme_filters();

	for query in QUERIES {
		let embedding = docket_providers::embedding::offline_embedding(query, 4);
		let vector = harness
			.store
			.vector_search(&embedding, 100, 5, &filters)
			.await
			.expect("Vector search failed.");

		assert!(vector.iter().all(|hit| seeded.acme.contains(&hit.chunk_id)));

		let FullTextOutcome::Ok(text) = harness.store.fulltext_search(query, 100, &filters).await
		else {
			panic!("Full-text search should be indexed.");
		};

		assert!(!text.is_empty());
		assert!(text.iter().all(|hit| seeded.acme.contains(&hit.chunk_id)));

		let passages = harness
			.service
			.retrieve(&embedding, query, None, 10, &filters)
			.await
			.expect("Retrieve failed.");

		assert!(!passages.is_empty());
		assert!(passages.iter().all(|p| seeded.acme.contains(&p.id)));
		assert!(passages.iter().all(|p| !seeded.globex.contains(&p.id)));
	}
}

#[tokio::test]
async fn guard_drops_rows_a_leaky_store_returns() {
	let harness = super::harness();
	let seeded = seed_two_tenants(&harness.store);
	let filters = acme_filters();

	harness.store.set_ignore_tenant_filter(true);

	for mode in [FullTextMode::Indexed, FullTextMode::Unavailable] {
		harness.store.set_fulltext_mode(mode);

		for query in QUERIES {
			let embedding = docket_providers::embedding::offline_embedding(query, 4);
			let leaked = harness
				.store
				.vector_search(&embedding, 100, 5, &filters)
				.await
				.expect("Vector search failed.");

			assert!(leaked.iter().any(|hit| seeded.globex.contains(&hit.chunk_id)));

			let passages = harness
				.service
				.retrieve(&embedding, query, None, 10, &filters)
				.await
				.expect("Retrieve failed.");

			assert!(!passages.is_empty());
			assert!(passages.iter().all(|p| seeded.acme.contains(&p.id)));
		}
	}
}

#[tokio::test]
async fn demo_mode_sees_every_tenant() {
	let harness = super::harness();
	let seeded = seed_two_tenants(&harness.store);
	let embedding = docket_providers::embedding::offline_embedding("liability", 4);
	let passages = harness
		.service
		.retrieve(&embedding, "liability", None, 20, &SearchFilters::default())
		.await
		.expect("Retrieve failed.");

	assert_eq!(passages.len(), seeded.acme.len() + seeded.globex.len());
}
