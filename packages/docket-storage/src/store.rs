use std::{future::Future, pin::Pin};

use uuid::Uuid;

use docket_domain::{TenantScope, TextHit, VectorHit};

use crate::{
	Result, compaction,
	db::Db,
	documents, logs,
	models::{AuditLogEntry, EvalLogEntry, IngestPayload},
	search::{self, FullTextOutcome, SearchFilters},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Primary storage as seen by retrieval, ingestion, logging and spool replay.
///
/// Every write is idempotent so that spool replays may deliver a record more than once.
pub trait Store
where
	Self: Send + Sync,
{
	/// Dimension every stored embedding must have.
	fn vector_dim(&self) -> u32;

	fn vector_search<'a>(
		&'a self,
		embedding: &'a [f32],
		limit: u32,
		category_overfetch: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>>;

	fn fulltext_search<'a>(
		&'a self,
		keyword: &'a str,
		limit: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, FullTextOutcome>;

	fn substring_search<'a>(
		&'a self,
		keyword: &'a str,
		limit: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<TextHit>>>;

	fn upsert_ingest<'a>(&'a self, payload: &'a IngestPayload) -> BoxFuture<'a, Result<()>>;

	fn insert_eval_log<'a>(&'a self, entry: &'a EvalLogEntry) -> BoxFuture<'a, Result<()>>;

	fn insert_audit<'a>(&'a self, entry: &'a AuditLogEntry) -> BoxFuture<'a, Result<()>>;

	fn update_eval_rating<'a>(
		&'a self,
		eval_id: Uuid,
		rating: Option<i16>,
		tenant: &'a TenantScope,
	) -> BoxFuture<'a, Result<()>>;

	fn compact_duplicates(&self) -> BoxFuture<'_, Result<u64>>;
}

impl Store for Db {
	fn vector_dim(&self) -> u32 {
		self.vector_dim
	}

	fn vector_search<'a>(
		&'a self,
		embedding: &'a [f32],
		limit: u32,
		category_overfetch: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<VectorHit>>> {
		Box::pin(search::vector_search(&self.pool, embedding, limit, category_overfetch, filters))
	}

	fn fulltext_search<'a>(
		&'a self,
		keyword: &'a str,
		limit: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, FullTextOutcome> {
		Box::pin(search::fulltext_search(&self.pool, keyword, limit, filters))
	}

	fn substring_search<'a>(
		&'a self,
		keyword: &'a str,
		limit: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<TextHit>>> {
		Box::pin(search::substring_search(&self.pool, keyword, limit, filters))
	}

	fn upsert_ingest<'a>(&'a self, payload: &'a IngestPayload) -> BoxFuture<'a, Result<()>> {
		Box::pin(documents::upsert_ingest(self, payload))
	}

	fn insert_eval_log<'a>(&'a self, entry: &'a EvalLogEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(logs::insert_eval_log(&self.pool, entry))
	}

	fn insert_audit<'a>(&'a self, entry: &'a AuditLogEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(logs::insert_audit(&self.pool, entry))
	}

	fn update_eval_rating<'a>(
		&'a self,
		eval_id: Uuid,
		rating: Option<i16>,
		tenant: &'a TenantScope,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(logs::update_eval_rating(&self.pool, eval_id, rating, tenant))
	}

	fn compact_duplicates(&self) -> BoxFuture<'_, Result<u64>> {
		Box::pin(compaction::compact_duplicate_chunks(&self.pool))
	}
}
