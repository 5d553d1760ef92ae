use uuid::Uuid;

use docket_domain::TenantScope;
use docket_storage::search::SearchFilters;

use super::StubRerank;

const QUERY: [f32; 4] = [1.0, 0.0, 0.0, 0.0];

struct Seeded {
	/// Contracts row ranked 8th overall by vector distance.
	near: Uuid,
	/// Contracts row ranked 13th overall.
	far: Uuid,
}

/// Twelve "other" rows at growing distance from the query, with two contracts rows among them.
fn seed_ranked(store: &docket_testkit::MemoryStore) -> Seeded {
	for i in 1..=12 {
		super::seed(
			store,
			Some("acme"),
			"other",
			&format!("Other row {i}."),
			[1.0, 0.01 * i as f32, 0.0, 0.0],
		);
	}

	let near =
		super::seed(store, Some("acme"), "contracts", "Contract row A.", [1.0, 0.075, 0.0, 0.0]);
	let far =
		super::seed(store, Some("acme"), "contracts", "Contract row B.", [1.0, 0.115, 0.0, 0.0]);

	Seeded { near, far }
}

fn contracts() -> SearchFilters {
	SearchFilters { category: Some("contracts".to_string()), tenant: TenantScope::tenant("acme") }
}

#[tokio::test]
async fn category_matches_within_the_overfetch_window_are_returned() {
	let harness = super::harness_with(
		|cfg| {
			cfg.retrieval.vector_candidates = 2;
		},
		StubRerank::default(),
	);
	let seeded = seed_ranked(&harness.store);
	let passages = harness
		.service
		.retrieve(&QUERY, "zebra", None, 2, &contracts())
		.await
		.expect("Retrieve failed.");

	// 2 candidates * 5 over-fetch scans the 10 nearest rows: row A is 8th, row B is 13th.
	assert_eq!(passages.iter().map(|p| p.id).collect::<Vec<_>>(), vec![seeded.near]);

	let unfiltered = harness
		.service
		.retrieve(
			&QUERY,
			"zebra",
			None,
			2,
			&SearchFilters { category: None, tenant: TenantScope::tenant("acme") },
		)
		.await
		.expect("Retrieve failed.");

	assert_eq!(unfiltered.len(), 2);
	assert!(unfiltered.iter().all(|p| p.id != seeded.near && p.id != seeded.far));
}

#[tokio::test]
async fn a_wider_overfetch_reaches_deeper_category_matches() {
	let harness = super::harness_with(
		|cfg| {
			cfg.retrieval.vector_candidates = 2;
			cfg.retrieval.category_overfetch = 10;
		},
		StubRerank::default(),
	);
	let seeded = seed_ranked(&harness.store);
	let passages = harness
		.service
		.retrieve(&QUERY, "zebra", None, 2, &contracts())
		.await
		.expect("Retrieve failed.");

	assert_eq!(passages.iter().map(|p| p.id).collect::<Vec<_>>(), vec![seeded.near, seeded.far]);
}
