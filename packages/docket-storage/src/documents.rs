use sqlx::PgExecutor;

use crate::{
	Error, Result,
	db::Db,
	models::{ChunkRecord, DocumentRecord, IngestPayload},
};

/// Rejects payloads that cannot be stored, before any I/O.
pub fn validate_ingest(payload: &IngestPayload, vector_dim: u32) -> Result<()> {
	let document = &payload.document;

	if document.title.trim().is_empty() {
		return Err(Error::InvalidArgument("Document title must be non-empty.".to_string()));
	}

	for chunk in &payload.chunks {
		if chunk.doc_id != document.doc_id {
			return Err(Error::InvalidArgument(format!(
				"Chunk {} belongs to document {}, not {}.",
				chunk.chunk_id, chunk.doc_id, document.doc_id
			)));
		}
		if chunk.tenant_id != document.tenant_id {
			return Err(Error::InvalidArgument(format!(
				"Chunk {} tenant does not match its document.",
				chunk.chunk_id
			)));
		}
		if chunk.ord < 0 {
			return Err(Error::InvalidArgument(format!(
				"Chunk {} has negative ordinal {}.",
				chunk.chunk_id, chunk.ord
			)));
		}
		if chunk.embedding.len() != vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Chunk {} embedding has {} dimensions, expected {vector_dim}.",
				chunk.chunk_id,
				chunk.embedding.len()
			)));
		}
		if chunk.embedding.iter().any(|value| !value.is_finite()) {
			return Err(Error::InvalidArgument(format!(
				"Chunk {} embedding has non-finite values.",
				chunk.chunk_id
			)));
		}
	}

	Ok(())
}

/// Writes a document and its chunk set atomically. Replaying the same payload is a no-op.
pub async fn upsert_ingest(db: &Db, payload: &IngestPayload) -> Result<()> {
	validate_ingest(payload, db.vector_dim)?;

	let mut tx = db.pool.begin().await?;

	upsert_document(&mut *tx, &payload.document).await?;

	for chunk in &payload.chunks {
		upsert_chunk(&mut *tx, chunk).await?;
	}

	// A re-ingest with fewer chunks must not leave the old tail behind.
	sqlx::query("DELETE FROM doc_chunks WHERE doc_id = $1 AND ord >= $2")
		.bind(payload.document.doc_id)
		.bind(payload.chunks.len() as i32)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(())
}

pub async fn upsert_document<'e, E>(executor: E, document: &DocumentRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
INSERT INTO doc_documents (doc_id, tenant_id, title, meta)
VALUES ($1, $2, $3, $4)
ON CONFLICT (doc_id) DO UPDATE
SET title = EXCLUDED.title, meta = EXCLUDED.meta, updated_at = now()
WHERE doc_documents.tenant_id IS NOT DISTINCT FROM EXCLUDED.tenant_id",
	)
	.bind(document.doc_id)
	.bind(document.tenant_id.as_deref())
	.bind(document.title.as_str())
	.bind(&document.meta)
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::Conflict(format!(
			"Document {} belongs to another tenant.",
			document.doc_id
		)));
	}

	Ok(())
}

pub async fn upsert_chunk<'e, E>(executor: E, chunk: &ChunkRecord) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let vec_text = crate::vector_to_pg(&chunk.embedding);
	let result = sqlx::query(
		"\
INSERT INTO doc_chunks (chunk_id, doc_id, ord, text, embedding, tenant_id)
VALUES ($1, $2, $3, $4, $5::text::vector, $6)
ON CONFLICT (chunk_id) DO UPDATE
SET text = EXCLUDED.text, embedding = EXCLUDED.embedding
WHERE doc_chunks.tenant_id IS NOT DISTINCT FROM EXCLUDED.tenant_id",
	)
	.bind(chunk.chunk_id)
	.bind(chunk.doc_id)
	.bind(chunk.ord)
	.bind(chunk.text.as_str())
	.bind(vec_text.as_str())
	.bind(chunk.tenant_id.as_deref())
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::Conflict(format!("Chunk {} belongs to another tenant.", chunk.chunk_id)));
	}

	Ok(())
}
