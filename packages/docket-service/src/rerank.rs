use std::sync::Arc;

use docket_config::RerankProviderConfig;
use docket_domain::{Candidate, fusion};

use crate::{DocketService, RerankProvider};

/// The shared scoring model, resolved once per service.
pub(crate) enum RerankModel {
	/// Disabled by config or failed to load. Every passage scores 0.0.
	Neutral,
	Ready(Arc<dyn RerankProvider>),
}
impl RerankModel {
	fn load(cfg: &RerankProviderConfig, provider: &Arc<dyn RerankProvider>) -> Self {
		if !cfg.enabled {
			tracing::info!("Reranking disabled. Passages keep distance order.");

			return Self::Neutral;
		}

		match provider.load(cfg) {
			Ok(()) => {
				tracing::info!(
					provider_id = %cfg.provider_id,
					model = %cfg.model,
					"Rerank model loaded."
				);

				Self::Ready(provider.clone())
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					provider_id = %cfg.provider_id,
					"Rerank model failed to load. Reranking stays neutral."
				);

				Self::Neutral
			},
		}
	}
}

impl DocketService {
	/// Scores `candidates` against `query` and reorders them by score, then by distance.
	///
	/// A scoring failure gives every candidate of this call the neutral score.
	pub async fn rerank(&self, query: &str, candidates: &mut [Candidate]) {
		if candidates.is_empty() {
			return;
		}

		let scores = match self.rerank_model() {
			RerankModel::Neutral => None,
			RerankModel::Ready(provider) => {
				let docs =
					candidates.iter().map(|candidate| candidate.text.clone()).collect::<Vec<_>>();

				match provider.rerank(&self.cfg.providers.rerank, query, &docs).await {
					Ok(scores) if scores.len() == docs.len() => Some(scores),
					Ok(scores) => {
						tracing::warn!(
							expected = docs.len(),
							actual = scores.len(),
							"Rerank score count mismatch. Using neutral scores."
						);

						None
					},
					Err(err) => {
						tracing::warn!(error = %err, "Rerank failed. Using neutral scores.");

						None
					},
				}
			},
		};

		match scores {
			Some(scores) => {
				for (candidate, score) in candidates.iter_mut().zip(scores) {
					candidate.rerank_score = Some(score);
				}
			},
			None => {
				for candidate in candidates.iter_mut() {
					candidate.rerank_score = Some(0.0);
				}
			},
		}

		fusion::order_by_rerank(candidates);
	}

	pub(crate) fn rerank_model(&self) -> &RerankModel {
		self.reranker
			.get_or_init(|| RerankModel::load(&self.cfg.providers.rerank, &self.providers.rerank))
	}
}
