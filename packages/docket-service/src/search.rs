use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use docket_domain::Passage;
use docket_storage::{
	models::{AuditLogEntry, EvalLogEntry, LatencyBreakdown},
	search::SearchFilters,
};

use crate::{DocketService, Error, Result, retrieve};

const ROUTE: &str = "search";

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub keyword: Option<String>,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub tenant_id: Option<String>,
	/// Identity the rate limiter counts calls against. Unlimited when absent.
	#[serde(default)]
	pub caller: Option<String>,
	#[serde(default)]
	pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
	pub eval_id: Uuid,
	pub passages: Vec<Passage>,
	pub insufficient: bool,
	pub confidence: f32,
	pub latency: LatencyBreakdown,
}

impl DocketService {
	/// Embeds the query, retrieves and assesses passages, and records the evaluation and audit
	/// entries.
	///
	/// Log writes that fail even after spooling are reported in the log and do not fail the
	/// search.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::invalid("Query must be non-empty."));
		}

		let tenant = self.tenant_scope(req.tenant_id.as_deref())?;

		if let Some(caller) = req.caller.as_deref()
			&& !self.rate_limiter.allow(caller, ROUTE)
		{
			return Err(Error::RateLimited {
				message: format!("Caller {caller} exceeded the {ROUTE} rate limit."),
			});
		}

		let top_k = req.top_k.unwrap_or(self.cfg.retrieval.top_k);
		let logged_top_k = self.check_top_k(top_k)?;
		let category = req
			.category
			.as_deref()
			.map(str::trim)
			.filter(|category| !category.is_empty())
			.map(ToString::to_string);
		let started = Instant::now();
		let embedding = self
			.embed_texts(&[query.to_string()])
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::CapabilityUnavailable {
				message: "Embedding returned no vector for the query.".to_string(),
			})?;
		let embed_ms = retrieve::elapsed_ms(started);
		let filters = SearchFilters { category: category.clone(), tenant: tenant.clone() };
		let retrieved = self
			.retrieve_timed(&embedding, query, req.keyword.as_deref(), top_k, &filters)
			.await?;
		let assess_started = Instant::now();
		let assessment = self.assess(&retrieved.passages);
		let latency = LatencyBreakdown {
			embed_ms,
			search_ms: retrieved.search_ms,
			rerank_ms: retrieved.rerank_ms,
			assess_ms: retrieve::elapsed_ms(assess_started),
		};
		let eval_id = Uuid::now_v7();
		let evidence_ids = retrieved.passages.iter().map(|passage| passage.id).collect::<Vec<_>>();
		let now = OffsetDateTime::now_utc();
		let tenant_id = tenant.as_deref().map(ToString::to_string);
		let eval = EvalLogEntry {
			eval_id,
			tenant_id: tenant_id.clone(),
			route: ROUTE.to_string(),
			query: query.to_string(),
			keyword: req.keyword.clone(),
			top_k: logged_top_k,
			filter_category: category,
			latency_ms: retrieve::elapsed_ms(started) as i64,
			step_ms: latency,
			evidence_ids: evidence_ids.clone(),
			model: Some(self.cfg.providers.embedding.model.clone()),
			confidence: assessment.confidence,
			insufficient: assessment.insufficient,
			rating: None,
			created_at: now,
		};

		if let Err(err) = self.log_eval(eval).await {
			tracing::warn!(eval_id = %eval_id, error = %err, "Failed to record evaluation log.");
		}

		let audit = AuditLogEntry {
			audit_id: Uuid::now_v7(),
			tenant_id,
			actor: req.caller.clone(),
			route: ROUTE.to_string(),
			query: Some(query.to_string()),
			evidence_ids,
			request_id: req.request_id.clone(),
			created_at: now,
		};

		if let Err(err) = self.audit(audit).await {
			tracing::warn!(eval_id = %eval_id, error = %err, "Failed to record audit entry.");
		}

		tracing::info!(
			eval_id = %eval_id,
			passages = retrieved.passages.len(),
			insufficient = assessment.insufficient,
			confidence = assessment.confidence,
			"Search completed."
		);

		Ok(SearchResponse {
			eval_id,
			passages: retrieved.passages,
			insufficient: assessment.insufficient,
			confidence: assessment.confidence,
			latency,
		})
	}
}
