use serde_json::Value;

use docket_config::RerankProviderConfig;

use crate::{Error, Result};

/// Scores every `(query, doc)` pair with a cross-encoder endpoint, aligned to `docs` order.
pub async fn rerank(cfg: &RerankProviderConfig, query: &str, docs: &[String]) -> Result<Vec<f32>> {
	if docs.is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.inspect_err(|err| {
			tracing::warn!(error = %err, model = %cfg.model, "Rerank request failed.");
		})?;
	let status = res.status();

	if !status.is_success() {
		tracing::warn!(
			status = status.as_u16(),
			model = %cfg.model,
			docs = docs.len(),
			"Rerank provider rejected the request."
		);
	}

	let json: Value = res.error_for_status()?.json().await?;
	let scores = parse_rerank_response(json, docs.len())?;

	tracing::debug!(model = %cfg.model, docs = docs.len(), "Rerank request completed.");

	Ok(scores)
}

/// Every document must receive exactly one score.
fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::response("Rerank response is missing results array."))?;
	let mut scores: Vec<Option<f32>> = vec![None; doc_count];

	for item in results {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.ok_or_else(|| Error::response("Rerank result missing index."))? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.ok_or_else(|| Error::response("Rerank result missing score."))? as f32;
		let Some(slot) = scores.get_mut(index) else {
			return Err(Error::response(format!("Rerank index {index} is out of range.")));
		};

		if slot.replace(score).is_some() {
			return Err(Error::response(format!("Rerank index {index} is duplicated.")));
		}
	}

	scores
		.into_iter()
		.enumerate()
		.map(|(index, score)| {
			score.ok_or_else(|| Error::response(format!("Rerank result {index} is missing.")))
		})
		.collect()
}
