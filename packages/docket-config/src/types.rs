use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub evidence: Evidence,
	#[serde(default)]
	pub spool: Spool,
	#[serde(default)]
	pub compaction: Compaction,
	#[serde(default)]
	pub rate_limit: RateLimit,
	#[serde(default)]
	pub ingest: Ingest,
	#[serde(default)]
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
	/// Dimension of the `doc_chunks.embedding` column. Must equal the embedding provider output.
	pub vector_dim: u32,
	/// Create the generated tsvector column and its GIN index during schema bootstrap.
	#[serde(default = "default_true")]
	pub fulltext_index: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: RerankProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
	/// Fall back to the deterministic local embedding when the provider fails.
	#[serde(default = "default_true")]
	pub offline_fallback: bool,
	/// Never call the provider. Every text gets the deterministic local embedding.
	#[serde(default)]
	pub force_offline: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankProviderConfig {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	/// Largest `top_k` a request may ask for.
	pub max_top_k: u32,
	pub rrf_k: u32,
	pub fulltext_candidates: u32,
	pub vector_candidates: u32,
	/// Vector over-fetch multiplier applied before a category predicate.
	pub category_overfetch: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 10,
			max_top_k: 100,
			rrf_k: 60,
			fulltext_candidates: 100,
			vector_candidates: 100,
			category_overfetch: 5,
		}
	}
}

/// Thresholds for the evidence sufficiency gate and confidence score.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Evidence {
	pub min_chars: u32,
	pub sufficiency_window: u32,
	pub max_mean_distance: f32,
	pub confidence_char_target: u32,
	pub confidence_window: u32,
	pub length_weight: f32,
	pub distance_weight: f32,
}
impl Default for Evidence {
	fn default() -> Self {
		Self {
			min_chars: 250,
			sufficiency_window: 3,
			max_mean_distance: 0.35,
			confidence_char_target: 1_500,
			confidence_window: 5,
			length_weight: 0.6,
			distance_weight: 0.4,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Spool {
	pub enabled: bool,
	pub dir: PathBuf,
	pub drain_interval_secs: u64,
}
impl Default for Spool {
	fn default() -> Self {
		Self { enabled: true, dir: PathBuf::from("spool"), drain_interval_secs: 10 }
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Compaction {
	/// Zero disables the periodic compaction loop.
	pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimit {
	pub max_per_window: u32,
	pub window_secs: u64,
}
impl Default for RateLimit {
	fn default() -> Self {
		Self { max_per_window: 60, window_secs: 60 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Ingest {
	pub chunk_size: u32,
	pub chunk_overlap: u32,
	pub redact_pii: bool,
}
impl Default for Ingest {
	fn default() -> Self {
		Self { chunk_size: 800, chunk_overlap: 80, redact_pii: true }
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Security {
	/// Reject requests without a tenant instead of treating them as demo mode.
	pub require_tenant: bool,
}

fn default_true() -> bool {
	true
}
