pub mod compact;
pub mod embed;
pub mod ingest;
pub mod logs;
pub mod rate_limit;
pub mod rerank;
pub mod retrieve;
pub mod search;
pub mod spool;

mod error;

pub use docket_storage::BoxFuture;
pub use error::{Error, Result};
pub use ingest::{IngestRequest, IngestResponse};
pub use search::{SearchRequest, SearchResponse};
pub use spool::{DrainReport, WriteOutcome};

use std::sync::{Arc, OnceLock};

use docket_config::{Config, EmbeddingProviderConfig, RerankProviderConfig};
use docket_domain::{
	EvidenceAssessment, EvidencePolicy, Passage, TenantScope, evidence, redaction::Redactor,
};
use docket_providers::{embedding, rerank as rerank_api};
use docket_storage::{
	Store,
	spool::{DurableQueue, FsQueue},
};

use crate::{rate_limit::RateLimiter, rerank::RerankModel};

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	/// Prepares the scoring model. The service calls this at most once.
	fn load(&self, cfg: &RerankProviderConfig) -> color_eyre::Result<()>;

	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, rerank: Arc<dyn RerankProvider>) -> Self {
		Self { embedding, rerank }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(HttpProviders);

		Self { embedding: provider.clone(), rerank: provider }
	}
}

/// Retrieval, ingestion and logging over one store, with failed writes diverted to the spool.
pub struct DocketService {
	pub cfg: Config,
	pub store: Arc<dyn Store>,
	pub providers: Providers,
	pub spool: Option<Arc<dyn DurableQueue>>,
	pub(crate) evidence: EvidencePolicy,
	pub(crate) rate_limiter: RateLimiter,
	pub(crate) redactor: Redactor,
	pub(crate) reranker: OnceLock<RerankModel>,
}
impl DocketService {
	/// Uses the HTTP providers and, when enabled, the filesystem spool at `spool.dir`.
	pub fn new(cfg: Config, store: Arc<dyn Store>) -> Result<Self> {
		let spool = if cfg.spool.enabled {
			let queue = FsQueue::open(&cfg.spool.dir)?;

			Some(Arc::new(queue) as Arc<dyn DurableQueue>)
		} else {
			None
		};

		Self::with_parts(cfg, store, Providers::default(), spool)
	}

	pub fn with_parts(
		cfg: Config,
		store: Arc<dyn Store>,
		providers: Providers,
		spool: Option<Arc<dyn DurableQueue>>,
	) -> Result<Self> {
		if store.vector_dim() != cfg.providers.embedding.dimensions {
			return Err(Error::invalid(format!(
				"Store vector dimension {} does not match embedding dimensions {}.",
				store.vector_dim(),
				cfg.providers.embedding.dimensions
			)));
		}

		let redactor = Redactor::new()
			.map_err(|err| Error::invalid(format!("Invalid redaction rule: {err}.")))?;

		Ok(Self {
			evidence: EvidencePolicy::from(&cfg.evidence),
			rate_limiter: RateLimiter::from(&cfg.rate_limit),
			redactor,
			reranker: OnceLock::new(),
			cfg,
			store,
			providers,
			spool,
		})
	}

	/// Sufficiency gate and confidence score under the configured policy.
	pub fn assess(&self, passages: &[Passage]) -> EvidenceAssessment {
		evidence::assess(passages, &self.evidence)
	}

	/// Resolves the caller's tenant. A missing tenant is demo mode unless tenants are required.
	pub fn tenant_scope(&self, tenant_id: Option<&str>) -> Result<TenantScope> {
		let scope = TenantScope::new(tenant_id);

		if scope.is_demo() && self.cfg.security.require_tenant {
			return Err(Error::invalid("A tenant is required."));
		}

		Ok(scope)
	}
}

struct HttpProviders;

impl EmbeddingProvider for HttpProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl RerankProvider for HttpProviders {
	fn load(&self, cfg: &RerankProviderConfig) -> color_eyre::Result<()> {
		docket_providers::auth_headers(&cfg.api_key, &cfg.default_headers)?;

		Ok(())
	}

	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async move { Ok(rerank_api::rerank(cfg, query, docs).await?) })
	}
}
