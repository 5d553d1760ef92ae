use sqlx::PgExecutor;

use crate::Result;

/// Deletes chunks that repeat `(tenant_id, doc_id, ord, text)`, keeping the lowest chunk id.
///
/// Returns the number of rows removed.
pub async fn compact_duplicate_chunks<'e, E>(executor: E) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query(
		"\
DELETE FROM doc_chunks dup
USING doc_chunks keep
WHERE dup.doc_id = keep.doc_id
	AND dup.ord = keep.ord
	AND dup.text = keep.text
	AND dup.tenant_id IS NOT DISTINCT FROM keep.tenant_id
	AND dup.chunk_id > keep.chunk_id",
	)
	.execute(executor)
	.await?;

	Ok(result.rows_affected())
}
