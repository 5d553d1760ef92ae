use std::{
	collections::{BTreeMap, HashMap},
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use uuid::Uuid;

use docket_domain::{TenantScope, TextHit, VectorHit, fusion};
use docket_storage::{
	BoxFuture, Error, Result, Store, documents,
	models::{AuditLogEntry, ChunkRecord, DocumentRecord, EvalLogEntry, IngestPayload},
	search::{FullTextOutcome, SearchFilters},
};

/// How the in-memory keyword index behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullTextMode {
	Indexed,
	Unavailable,
	Failing,
}

#[derive(Default)]
struct State {
	documents: HashMap<Uuid, DocumentRecord>,
	chunks: BTreeMap<Uuid, ChunkRecord>,
	ingests: Vec<IngestPayload>,
	eval_logs: Vec<EvalLogEntry>,
	audit_logs: Vec<AuditLogEntry>,
}

/// A [`Store`] over process memory with switches for simulating outages.
pub struct MemoryStore {
	vector_dim: u32,
	state: Mutex<State>,
	fulltext_mode: Mutex<FullTextMode>,
	fail_reads: AtomicBool,
	fail_writes: AtomicBool,
	ignore_tenant_filter: AtomicBool,
	write_calls: AtomicUsize,
}
impl MemoryStore {
	pub fn new(vector_dim: u32) -> Self {
		Self {
			vector_dim,
			state: Mutex::new(State::default()),
			fulltext_mode: Mutex::new(FullTextMode::Indexed),
			fail_reads: AtomicBool::new(false),
			fail_writes: AtomicBool::new(false),
			ignore_tenant_filter: AtomicBool::new(false),
			write_calls: AtomicUsize::new(0),
		}
	}

	pub fn set_fulltext_mode(&self, mode: FullTextMode) {
		*self.fulltext_mode.lock().unwrap_or_else(|err| err.into_inner()) = mode;
	}

	pub fn set_fail_reads(&self, fail: bool) {
		self.fail_reads.store(fail, Ordering::SeqCst);
	}

	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}

	/// Simulates a storage layer that forgets the tenant predicate.
	pub fn set_ignore_tenant_filter(&self, ignore: bool) {
		self.ignore_tenant_filter.store(ignore, Ordering::SeqCst);
	}

	/// Inserts a single chunk and its document directly, bypassing validation.
	pub fn seed_chunk(&self, document: DocumentRecord, chunk: ChunkRecord) {
		let mut state = self.lock();

		state.documents.insert(document.doc_id, document);
		state.chunks.insert(chunk.chunk_id, chunk);
	}

	pub fn chunks(&self) -> Vec<ChunkRecord> {
		self.lock().chunks.values().cloned().collect()
	}

	pub fn ingests(&self) -> Vec<IngestPayload> {
		self.lock().ingests.clone()
	}

	pub fn eval_logs(&self) -> Vec<EvalLogEntry> {
		self.lock().eval_logs.clone()
	}

	pub fn audit_logs(&self) -> Vec<AuditLogEntry> {
		self.lock().audit_logs.clone()
	}

	/// Successful write calls, counting idempotent repeats.
	pub fn write_calls(&self) -> usize {
		self.write_calls.load(Ordering::SeqCst)
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn check_read(&self) -> Result<()> {
		if self.fail_reads.load(Ordering::SeqCst) {
			return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
		}

		Ok(())
	}

	fn check_write(&self) -> Result<()> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(Error::Sqlx(sqlx::Error::PoolTimedOut));
		}

		Ok(())
	}

	fn tenant_admits(&self, filters: &SearchFilters, row_tenant: Option<&str>) -> bool {
		self.ignore_tenant_filter.load(Ordering::SeqCst) || filters.tenant.admits(row_tenant)
	}

	fn category_matches(state: &State, doc_id: Uuid, category: Option<&str>) -> bool {
		let Some(category) = category else {
			return true;
		};

		state
			.documents
			.get(&doc_id)
			.and_then(|doc| doc.meta.get("category"))
			.and_then(|value| value.as_str())
			.map(|value| value == category)
			.unwrap_or(false)
	}

	fn search_vector(
		&self,
		embedding: &[f32],
		limit: u32,
		category_overfetch: u32,
		filters: &SearchFilters,
	) -> Result<Vec<VectorHit>> {
		self.check_read()?;

		let state = self.lock();
		let mut hits = state
			.chunks
			.values()
			.filter(|chunk| self.tenant_admits(filters, chunk.tenant_id.as_deref()))
			.map(|chunk| VectorHit {
				chunk_id: chunk.chunk_id,
				doc_id: chunk.doc_id,
				ord: chunk.ord,
				text: chunk.text.clone(),
				tenant_id: chunk.tenant_id.clone(),
				distance: cosine_distance(embedding, &chunk.embedding),
			})
			.collect::<Vec<_>>();

		hits.sort_by(|a, b| {
			fusion::cmp_distance(Some(a.distance), Some(b.distance))
				.then_with(|| a.chunk_id.cmp(&b.chunk_id))
		});

		if filters.category.is_some() {
			hits.truncate(limit as usize * category_overfetch.max(1) as usize);
			hits.retain(|hit| {
				Self::category_matches(&state, hit.doc_id, filters.category.as_deref())
			});
		}

		hits.truncate(limit as usize);

		Ok(hits)
	}

	fn search_text(
		&self,
		limit: u32,
		filters: &SearchFilters,
		score: impl Fn(&str) -> f32,
	) -> Vec<TextHit> {
		let state = self.lock();
		let mut hits = state
			.chunks
			.values()
			.filter(|chunk| self.tenant_admits(filters, chunk.tenant_id.as_deref()))
			.filter(|chunk| {
				Self::category_matches(&state, chunk.doc_id, filters.category.as_deref())
			})
			.filter_map(|chunk| {
				let relevance = score(&chunk.text);

				(relevance > 0.0).then(|| TextHit {
					chunk_id: chunk.chunk_id,
					doc_id: chunk.doc_id,
					ord: chunk.ord,
					text: chunk.text.clone(),
					tenant_id: chunk.tenant_id.clone(),
					relevance,
				})
			})
			.collect::<Vec<_>>();

		hits.sort_by(|a, b| {
			b.relevance.total_cmp(&a.relevance).then_with(|| a.chunk_id.cmp(&b.chunk_id))
		});
		hits.truncate(limit as usize);

		hits
	}
}

impl Store for MemoryStore {
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
		let result = self.search_vector(embedding, limit, category_overfetch, filters);

		Box::pin(async move { result })
	}

	fn fulltext_search<'a>(
		&'a self,
		keyword: &'a str,
		limit: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, FullTextOutcome> {
		let mode = *self.fulltext_mode.lock().unwrap_or_else(|err| err.into_inner());
		let outcome = if self.fail_reads.load(Ordering::SeqCst) {
			FullTextOutcome::Error("pool timed out".to_string())
		} else {
			match mode {
				FullTextMode::Unavailable => FullTextOutcome::Unavailable,
				FullTextMode::Failing => FullTextOutcome::Error("text search failed".to_string()),
				FullTextMode::Indexed => {
					let terms = keyword
						.split_whitespace()
						.map(str::to_lowercase)
						.collect::<Vec<_>>();

					FullTextOutcome::Ok(self.search_text(limit, filters, |text| {
						let lowered = text.to_lowercase();

						terms.iter().map(|term| lowered.matches(term.as_str()).count()).sum::<usize>()
							as f32
					}))
				},
			}
		};

		Box::pin(async move { outcome })
	}

	fn substring_search<'a>(
		&'a self,
		keyword: &'a str,
		limit: u32,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<TextHit>>> {
		let result = self.check_read().map(|()| {
			let needle = keyword.to_lowercase();

			self.search_text(limit, filters, |text| {
				if needle.is_empty() {
					return 0.0;
				}

				text.to_lowercase().matches(needle.as_str()).count() as f32
			})
		});

		Box::pin(async move { result })
	}

	fn upsert_ingest<'a>(&'a self, payload: &'a IngestPayload) -> BoxFuture<'a, Result<()>> {
		let result = documents::validate_ingest(payload, self.vector_dim)
			.and_then(|()| self.check_write())
			.and_then(|()| {
				let mut state = self.lock();
				let document = &payload.document;

				if let Some(existing) = state.documents.get(&document.doc_id)
					&& existing.tenant_id != document.tenant_id
				{
					return Err(Error::Conflict(format!(
						"Document {} belongs to another tenant.",
						document.doc_id
					)));
				}

				state.documents.insert(document.doc_id, document.clone());
				state.chunks.retain(|_, chunk| {
					chunk.doc_id != document.doc_id || (chunk.ord as usize) < payload.chunks.len()
				});

				for chunk in &payload.chunks {
					state.chunks.insert(chunk.chunk_id, chunk.clone());
				}

				state.ingests.push(payload.clone());

				self.write_calls.fetch_add(1, Ordering::SeqCst);

				Ok(())
			});

		Box::pin(async move { result })
	}

	fn insert_eval_log<'a>(&'a self, entry: &'a EvalLogEntry) -> BoxFuture<'a, Result<()>> {
		let result = self.check_write().map(|()| {
			let mut state = self.lock();

			if !state.eval_logs.iter().any(|row| row.eval_id == entry.eval_id) {
				state.eval_logs.push(entry.clone());
			}

			self.write_calls.fetch_add(1, Ordering::SeqCst);
		});

		Box::pin(async move { result })
	}

	fn insert_audit<'a>(&'a self, entry: &'a AuditLogEntry) -> BoxFuture<'a, Result<()>> {
		let result = self.check_write().map(|()| {
			let mut state = self.lock();

			if !state.audit_logs.iter().any(|row| row.audit_id == entry.audit_id) {
				state.audit_logs.push(entry.clone());
			}

			self.write_calls.fetch_add(1, Ordering::SeqCst);
		});

		Box::pin(async move { result })
	}

	fn update_eval_rating<'a>(
		&'a self,
		eval_id: Uuid,
		rating: Option<i16>,
		tenant: &'a TenantScope,
	) -> BoxFuture<'a, Result<()>> {
		let result = self.check_write().and_then(|()| {
			if let Some(value) = rating
				&& !(1..=5).contains(&value)
			{
				return Err(Error::InvalidArgument(format!(
					"Rating {value} must be between 1 and 5."
				)));
			}

			let mut state = self.lock();
			let Some(row) = state
				.eval_logs
				.iter_mut()
				.find(|row| row.eval_id == eval_id && tenant.admits(row.tenant_id.as_deref()))
			else {
				return Err(Error::NotFound(format!("Evaluation log {eval_id}.")));
			};

			row.rating = rating;

			Ok(())
		});

		Box::pin(async move { result })
	}

	fn compact_duplicates(&self) -> BoxFuture<'_, Result<u64>> {
		let result = self.check_write().map(|()| {
			let mut state = self.lock();
			let mut keep: HashMap<(Option<String>, Uuid, i32, String), Uuid> = HashMap::new();
			let mut doomed = Vec::new();

			// Chunks iterate in ascending id order, so the first seen is the lowest id.
			for chunk in state.chunks.values() {
				let key = (chunk.tenant_id.clone(), chunk.doc_id, chunk.ord, chunk.text.clone());

				if keep.contains_key(&key) {
					doomed.push(chunk.chunk_id);
				} else {
					keep.insert(key, chunk.chunk_id);
				}
			}

			for chunk_id in &doomed {
				state.chunks.remove(chunk_id);
			}

			doomed.len() as u64
		});

		Box::pin(async move { result })
	}
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
	let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);

	for (x, y) in a.iter().zip(b) {
		dot += *x as f64 * *y as f64;
		norm_a += (*x as f64).powi(2);
		norm_b += (*y as f64).powi(2);
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 1.0;
	}

	(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
