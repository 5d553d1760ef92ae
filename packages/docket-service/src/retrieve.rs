use std::time::Instant;

use docket_domain::{Candidate, Passage, TextHit, fusion, tenant};
use docket_storage::search::{FullTextOutcome, SearchFilters};

use crate::{DocketService, Error, Result};

pub(crate) struct Retrieved {
	pub(crate) passages: Vec<Passage>,
	pub(crate) search_ms: u64,
	pub(crate) rerank_ms: u64,
}

impl DocketService {
	/// Hybrid retrieval: vector and keyword candidates fused with RRF, then reranked.
	///
	/// `keyword` defaults to `query_text`. When one source fails the other carries the result;
	/// when both fail the vector error is returned.
	pub async fn retrieve(
		&self,
		query_embedding: &[f32],
		query_text: &str,
		keyword: Option<&str>,
		top_k: u32,
		filters: &SearchFilters,
	) -> Result<Vec<Passage>> {
		let retrieved =
			self.retrieve_timed(query_embedding, query_text, keyword, top_k, filters).await?;

		Ok(retrieved.passages)
	}

	pub(crate) async fn retrieve_timed(
		&self,
		query_embedding: &[f32],
		query_text: &str,
		keyword: Option<&str>,
		top_k: u32,
		filters: &SearchFilters,
	) -> Result<Retrieved> {
		self.check_top_k(top_k)?;

		if query_embedding.len() != self.store.vector_dim() as usize {
			return Err(Error::invalid(format!(
				"Query embedding has {} dimensions, expected {}.",
				query_embedding.len(),
				self.store.vector_dim()
			)));
		}

		let retrieval = &self.cfg.retrieval;
		let keyword =
			keyword.map(str::trim).filter(|kw| !kw.is_empty()).unwrap_or(query_text.trim());
		let search_started = Instant::now();
		let (vector, text) = tokio::join!(
			self.store.vector_search(
				query_embedding,
				retrieval.vector_candidates.max(top_k),
				retrieval.category_overfetch,
				filters,
			),
			self.keyword_candidates(keyword, retrieval.fulltext_candidates.max(top_k), filters),
		);
		let (vector, text) = match (vector, text) {
			(Ok(vector), Ok(text)) => (vector, text.unwrap_or_default()),
			(Ok(vector), Err(err)) => {
				tracing::warn!(
					error = %err,
					"Keyword retrieval failed. Using vector candidates only."
				);

				(vector, Vec::new())
			},
			(Err(err), Ok(Some(text))) => {
				tracing::warn!(
					error = %err,
					"Vector retrieval failed. Using keyword candidates only."
				);

				(Vec::new(), text)
			},
			(Err(err), Ok(None)) => return Err(err.into()),
			(Err(vector_err), Err(text_err)) => {
				tracing::error!(
					vector_error = %vector_err,
					keyword_error = %text_err,
					"Both retrieval sources failed."
				);

				return Err(vector_err.into());
			},
		};
		let (vector, dropped_vector) = tenant::retain_in_scope(vector, &filters.tenant);
		let (text, dropped_text) = tenant::retain_in_scope(text, &filters.tenant);

		if dropped_vector + dropped_text > 0 {
			tracing::warn!(
				tenant_id = filters.tenant.as_deref().unwrap_or_default(),
				dropped_vector,
				dropped_text,
				"Dropped retrieval rows outside the tenant scope."
			);
		}

		let mut fused: Vec<Candidate> =
			fusion::reciprocal_rank_fusion(vector, text, retrieval.rrf_k, top_k as usize);
		let search_ms = elapsed_ms(search_started);
		let rerank_started = Instant::now();

		self.rerank(query_text, &mut fused).await;

		let rerank_ms = elapsed_ms(rerank_started);
		let passages = fused.into_iter().map(Candidate::into_passage).collect();

		Ok(Retrieved { passages, search_ms, rerank_ms })
	}

	/// Accepts `1..=retrieval.max_top_k` and returns the value in the width the logs store.
	pub(crate) fn check_top_k(&self, top_k: u32) -> Result<i32> {
		let max_top_k = self.cfg.retrieval.max_top_k;

		if top_k == 0 {
			return Err(Error::invalid("top_k must be greater than zero."));
		}
		if top_k > max_top_k {
			return Err(Error::invalid(format!("top_k must not exceed {max_top_k}.")));
		}

		i32::try_from(top_k).map_err(|_| Error::invalid(format!("top_k {top_k} is out of range.")))
	}

	/// Indexed keyword search, degrading to substring matching when the index cannot answer.
	///
	/// Returns `None` without I/O for a blank keyword.
	async fn keyword_candidates(
		&self,
		keyword: &str,
		limit: u32,
		filters: &SearchFilters,
	) -> docket_storage::Result<Option<Vec<TextHit>>> {
		if keyword.is_empty() {
			return Ok(None);
		}

		match self.store.fulltext_search(keyword, limit, filters).await {
			FullTextOutcome::Ok(hits) => return Ok(Some(hits)),
			FullTextOutcome::Unavailable => {
				tracing::debug!("Full-text index unavailable. Using substring matching.");
			},
			FullTextOutcome::Error(detail) => {
				tracing::warn!(error = %detail, "Full-text query failed. Using substring matching.");
			},
		}

		self.store.substring_search(keyword, limit, filters).await.map(Some)
	}
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
	started.elapsed().as_millis() as u64
}
