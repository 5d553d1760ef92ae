use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use docket_domain::chunking::{self, ChunkingConfig};
use docket_storage::{
	documents,
	models::{AuditLogEntry, ChunkRecord, DocumentRecord, IngestPayload},
	spool::SpoolRecord,
};

use crate::{DocketService, Error, Result};

const ROUTE: &str = "ingest";

#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
	/// Re-ingesting under the same id replaces the document's chunks.
	#[serde(default)]
	pub doc_id: Option<Uuid>,
	pub title: String,
	pub text: String,
	#[serde(default)]
	pub meta: Value,
	#[serde(default)]
	pub tenant_id: Option<String>,
	#[serde(default)]
	pub chunk_size: Option<u32>,
	#[serde(default)]
	pub chunk_overlap: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestResponse {
	pub doc_id: Uuid,
	pub chunk_count: usize,
	pub spooled: bool,
}

impl DocketService {
	pub async fn ingest(&self, req: IngestRequest) -> Result<IngestResponse> {
		let title = req.title.trim();

		if title.is_empty() {
			return Err(Error::invalid("Document title must be non-empty."));
		}

		let tenant = self.tenant_scope(req.tenant_id.as_deref())?;
		let mut chunking = ChunkingConfig::from(&self.cfg.ingest);

		if let Some(chunk_size) = req.chunk_size {
			chunking.chunk_size = chunk_size as usize;
		}
		if let Some(chunk_overlap) = req.chunk_overlap {
			chunking.chunk_overlap = chunk_overlap as usize;
		}

		if chunking.chunk_size == 0 {
			return Err(Error::invalid("chunk_size must be greater than zero."));
		}
		if chunking.chunk_overlap >= chunking.chunk_size {
			return Err(Error::invalid("chunk_overlap must be less than chunk_size."));
		}

		let meta = match req.meta {
			Value::Null => Value::Object(Map::new()),
			meta @ Value::Object(_) => meta,
			_ => return Err(Error::invalid("Document meta must be a JSON object.")),
		};
		let mut text = chunking::normalize_text(&req.text);

		if self.cfg.ingest.redact_pii {
			text = self.redactor.redact(&text);
		}

		let pieces = chunking::split_words(&text, chunking);

		if pieces.is_empty() {
			return Err(Error::invalid("Document text must be non-empty."));
		}

		let embeddings = self.embed_texts(&pieces).await?;
		let doc_id = req.doc_id.unwrap_or_else(Uuid::new_v4);
		let tenant_id = tenant.as_deref().map(ToString::to_string);
		let chunks = pieces
			.into_iter()
			.zip(embeddings)
			.enumerate()
			.map(|(ord, (text, embedding))| ChunkRecord {
				chunk_id: chunk_id(doc_id, ord),
				doc_id,
				ord: ord as i32,
				text,
				embedding,
				tenant_id: tenant_id.clone(),
			})
			.collect::<Vec<_>>();
		let chunk_count = chunks.len();
		let payload = IngestPayload {
			document: DocumentRecord {
				doc_id,
				tenant_id: tenant_id.clone(),
				title: title.to_string(),
				meta,
			},
			chunks,
		};

		documents::validate_ingest(&payload, self.store.vector_dim())?;

		let outcome = self.persist(SpoolRecord::Ingest(payload)).await?;

		tracing::info!(
			doc_id = %doc_id,
			chunk_count,
			spooled = outcome.is_spooled(),
			"Document ingested."
		);

		let audit = AuditLogEntry {
			audit_id: Uuid::now_v7(),
			tenant_id,
			actor: None,
			route: ROUTE.to_string(),
			query: Some(title.to_string()),
			evidence_ids: Vec::new(),
			request_id: None,
			created_at: OffsetDateTime::now_utc(),
		};

		if let Err(err) = self.audit(audit).await {
			tracing::warn!(doc_id = %doc_id, error = %err, "Failed to record audit entry.");
		}

		Ok(IngestResponse { doc_id, chunk_count, spooled: outcome.is_spooled() })
	}
}

/// Stable chunk id so that replays and re-ingests address the same rows.
pub fn chunk_id(doc_id: Uuid, ord: usize) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{doc_id}:{ord}").as_bytes())
}
