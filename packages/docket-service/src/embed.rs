use color_eyre::eyre;

use docket_providers::embedding;

use crate::{DocketService, Error, Result};

impl DocketService {
	/// Embeds `texts` in order, falling back to the offline embedding when the provider fails.
	///
	/// Every returned vector has the store's dimension.
	pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let cfg = &self.cfg.providers.embedding;
		let dim = self.store.vector_dim() as usize;

		if texts.is_empty() {
			return Ok(Vec::new());
		}
		if cfg.force_offline {
			return Ok(offline(texts, dim));
		}

		let result = self
			.providers
			.embedding
			.embed(cfg, texts)
			.await
			.and_then(|vectors| check_vectors(vectors, texts.len(), dim));

		match result {
			Ok(vectors) => Ok(vectors),
			Err(err) if cfg.offline_fallback => {
				tracing::warn!(
					error = %err,
					provider_id = %cfg.provider_id,
					"Embedding provider failed. Using offline embeddings."
				);

				Ok(offline(texts, dim))
			},
			Err(err) => Err(Error::CapabilityUnavailable {
				message: format!("Embedding provider failed: {err}"),
			}),
		}
	}
}

fn offline(texts: &[String], dim: usize) -> Vec<Vec<f32>> {
	texts.iter().map(|text| embedding::offline_embedding(text, dim)).collect()
}

fn check_vectors(
	vectors: Vec<Vec<f32>>,
	expected_count: usize,
	dim: usize,
) -> color_eyre::Result<Vec<Vec<f32>>> {
	if vectors.len() != expected_count {
		return Err(eyre::eyre!(
			"Embedding provider returned {} vectors for {expected_count} inputs.",
			vectors.len()
		));
	}
	if let Some(bad) = vectors.iter().find(|vector| vector.len() != dim) {
		return Err(eyre::eyre!(
			"Embedding provider returned {} dimensions, expected {dim}.",
			bad.len()
		));
	}
	if vectors.iter().flatten().any(|value| !value.is_finite()) {
		return Err(eyre::eyre!("Embedding provider returned non-finite values."));
	}

	Ok(vectors)
}
