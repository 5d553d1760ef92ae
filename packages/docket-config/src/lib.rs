mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Compaction, Config, EmbeddingProviderConfig, Evidence, Ingest, Postgres, Providers, RateLimit,
	RerankProviderConfig, Retrieval, Security, Service, Spool, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

/// Parses, normalizes and validates a config document held in memory.
pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::invalid("storage.postgres.dsn must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::invalid("storage.postgres.pool_max_conns must be greater than zero."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::invalid("providers.embedding.dimensions must be greater than zero."));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.postgres.vector_dim {
		return Err(Error::invalid(
			"providers.embedding.dimensions must match storage.postgres.vector_dim.",
		));
	}
	if !cfg.providers.embedding.force_offline && cfg.providers.embedding.api_key.trim().is_empty()
	{
		return Err(Error::invalid(
			"providers.embedding.api_key must be non-empty unless force_offline is set.",
		));
	}
	if cfg.providers.rerank.enabled && cfg.providers.rerank.api_key.trim().is_empty() {
		return Err(Error::invalid(
			"providers.rerank.api_key must be non-empty when reranking is enabled.",
		));
	}

	for (label, headers) in [
		("providers.embedding.default_headers", &cfg.providers.embedding.default_headers),
		("providers.rerank.default_headers", &cfg.providers.rerank.default_headers),
	] {
		if headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation { message: format!("{label} values must be strings.") });
		}
	}

	validate_retrieval(cfg)?;
	validate_evidence(cfg)?;

	if cfg.spool.enabled {
		if cfg.spool.dir.as_os_str().is_empty() {
			return Err(Error::invalid("spool.dir must be non-empty when the spool is enabled."));
		}
		if cfg.spool.drain_interval_secs == 0 {
			return Err(Error::invalid("spool.drain_interval_secs must be greater than zero."));
		}
	}
	if cfg.rate_limit.max_per_window == 0 {
		return Err(Error::invalid("rate_limit.max_per_window must be greater than zero."));
	}
	if cfg.rate_limit.window_secs == 0 {
		return Err(Error::invalid("rate_limit.window_secs must be greater than zero."));
	}
	if cfg.ingest.chunk_size == 0 {
		return Err(Error::invalid("ingest.chunk_size must be greater than zero."));
	}
	if cfg.ingest.chunk_overlap >= cfg.ingest.chunk_size {
		return Err(Error::invalid("ingest.chunk_overlap must be less than ingest.chunk_size."));
	}

	Ok(())
}

fn validate_retrieval(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("retrieval.top_k", cfg.retrieval.top_k),
		("retrieval.max_top_k", cfg.retrieval.max_top_k),
		("retrieval.rrf_k", cfg.retrieval.rrf_k),
		("retrieval.fulltext_candidates", cfg.retrieval.fulltext_candidates),
		("retrieval.vector_candidates", cfg.retrieval.vector_candidates),
		("retrieval.category_overfetch", cfg.retrieval.category_overfetch),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.retrieval.max_top_k > i32::MAX as u32 {
		return Err(Error::invalid("retrieval.max_top_k must fit in a 32-bit signed integer."));
	}
	if cfg.retrieval.top_k > cfg.retrieval.max_top_k {
		return Err(Error::invalid("retrieval.top_k must not exceed retrieval.max_top_k."));
	}

	Ok(())
}

fn validate_evidence(cfg: &Config) -> Result<()> {
	let evidence = &cfg.evidence;

	if evidence.sufficiency_window == 0 || evidence.confidence_window == 0 {
		return Err(Error::invalid("evidence windows must be greater than zero."));
	}
	if evidence.confidence_char_target == 0 {
		return Err(Error::invalid("evidence.confidence_char_target must be greater than zero."));
	}

	for (label, value) in [
		("evidence.max_mean_distance", evidence.max_mean_distance),
		("evidence.length_weight", evidence.length_weight),
		("evidence.distance_weight", evidence.distance_weight),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be zero or greater."),
			});
		}
	}

	let weight_sum = evidence.length_weight + evidence.distance_weight;

	if weight_sum > 1.0 + f32::EPSILON {
		return Err(Error::invalid(
			"evidence.length_weight and evidence.distance_weight must sum to 1.0 or less.",
		));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim_end_matches('/').to_string();
	cfg.providers.rerank.api_base =
		cfg.providers.rerank.api_base.trim_end_matches('/').to_string();
}
