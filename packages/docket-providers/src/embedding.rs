use serde_json::Value;

use docket_config::EmbeddingProviderConfig;

use crate::{Error, Result};

pub async fn embed(cfg: &EmbeddingProviderConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
	if texts.is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.inspect_err(|err| {
			tracing::warn!(error = %err, model = %cfg.model, "Embedding request failed.");
		})?;
	let status = res.status();

	if !status.is_success() {
		tracing::warn!(
			status = status.as_u16(),
			model = %cfg.model,
			inputs = texts.len(),
			"Embedding provider rejected the request."
		);
	}

	let json: Value = res.error_for_status()?.json().await?;
	let vectors = parse_embedding_response(json)?;

	if vectors.len() != texts.len() {
		return Err(Error::response(format!(
			"Embedding response has {} vectors for {} inputs.",
			vectors.len(),
			texts.len()
		)));
	}

	tracing::debug!(model = %cfg.model, inputs = texts.len(), "Embedding request completed.");

	Ok(vectors)
}

/// Deterministic stand-in for a provider embedding.
///
/// BLAKE3 extendable output of the text seeds every component, so identical text always maps to
/// the same unit vector while distinct texts are uncorrelated.
pub fn offline_embedding(text: &str, dim: usize) -> Vec<f32> {
	let mut reader = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
	let mut bytes = vec![0_u8; dim * 4];

	reader.fill(&mut bytes);

	let mut vec = bytes
		.chunks_exact(4)
		.map(|word| {
			let raw = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);

			(raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
		})
		.collect::<Vec<_>>();
	let norm = vec.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();

	if norm > 0.0 {
		for value in &mut vec {
			*value = (*value as f64 / norm) as f32;
		}
	}

	vec
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| Error::response("Embedding response is missing data array."))?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item
			.get("embedding")
			.and_then(|v| v.as_array())
			.ok_or_else(|| Error::response("Embedding item missing embedding array."))?;
		let vec = embedding
			.iter()
			.map(|value| {
				value
					.as_f64()
					.map(|number| number as f32)
					.ok_or_else(|| Error::response("Embedding value must be numeric."))
			})
			.collect::<Result<Vec<_>>>()?;

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
