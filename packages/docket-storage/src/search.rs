use sqlx::PgExecutor;

use docket_domain::{TenantScope, TextHit, VectorHit, fusion};

use crate::{
	Result,
	models::{TextRow, VectorRow},
};

const UNDEFINED_COLUMN: &str = "42703";
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
	/// Matches `doc_documents.meta->>'category'`.
	pub category: Option<String>,
	pub tenant: TenantScope,
}

/// Result of the indexed keyword path.
#[derive(Debug, Clone, PartialEq)]
pub enum FullTextOutcome {
	Ok(Vec<TextHit>),
	/// The text index or its column does not exist.
	Unavailable,
	/// The index exists but the query failed.
	Error(String),
}

/// Nearest chunks by cosine distance.
///
/// With a category filter the inner scan fetches `limit * category_overfetch` rows before the
/// category join trims the result to `limit`.
pub async fn vector_search<'e, E>(
	executor: E,
	embedding: &[f32],
	limit: u32,
	category_overfetch: u32,
	filters: &SearchFilters,
) -> Result<Vec<VectorHit>>
where
	E: PgExecutor<'e>,
{
	let vec_text = crate::vector_to_pg(embedding);
	let rows = match filters.category.as_deref() {
		Some(category) => {
			let inner_limit = i64::from(limit) * i64::from(category_overfetch.max(1));

			sqlx::query_as::<_, VectorRow>(
				"\
WITH knn AS (
	SELECT
		c.chunk_id,
		c.doc_id,
		c.ord,
		c.text,
		c.tenant_id,
		(c.embedding <=> $1::text::vector)::real AS distance
	FROM doc_chunks c
	WHERE ($2::text IS NULL OR c.tenant_id = $2)
	ORDER BY c.embedding <=> $1::text::vector
	LIMIT $3
)
SELECT k.chunk_id, k.doc_id, k.ord, k.text, k.tenant_id, k.distance
FROM knn k
JOIN doc_documents d ON d.doc_id = k.doc_id
WHERE d.meta->>'category' = $4
	AND ($2::text IS NULL OR d.tenant_id = $2)
ORDER BY k.distance ASC
LIMIT $5",
			)
			.bind(vec_text.as_str())
			.bind(filters.tenant.as_deref())
			.bind(inner_limit)
			.bind(category)
			.bind(i64::from(limit))
			.fetch_all(executor)
			.await?
		},
		None =>
			sqlx::query_as::<_, VectorRow>(
				"\
SELECT
	c.chunk_id,
	c.doc_id,
	c.ord,
	c.text,
	c.tenant_id,
	(c.embedding <=> $1::text::vector)::real AS distance
FROM doc_chunks c
WHERE ($2::text IS NULL OR c.tenant_id = $2)
ORDER BY c.embedding <=> $1::text::vector
LIMIT $3",
			)
			.bind(vec_text.as_str())
			.bind(filters.tenant.as_deref())
			.bind(i64::from(limit))
			.fetch_all(executor)
			.await?,
	};
	let mut hits = rows
		.into_iter()
		.map(|row| VectorHit {
			chunk_id: row.chunk_id,
			doc_id: row.doc_id,
			ord: row.ord,
			text: row.text,
			tenant_id: row.tenant_id,
			distance: row.distance,
		})
		.collect::<Vec<_>>();

	// The index scan orders by distance only; ties are settled by chunk id.
	hits.sort_by(|a, b| {
		fusion::cmp_distance(Some(a.distance), Some(b.distance))
			.then_with(|| a.chunk_id.cmp(&b.chunk_id))
	});

	Ok(hits)
}

/// Ranked keyword candidates from the generated `text_tsv` column.
pub async fn fulltext_search<'e, E>(
	executor: E,
	keyword: &str,
	limit: u32,
	filters: &SearchFilters,
) -> FullTextOutcome
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query_as::<_, TextRow>(
		"\
SELECT
	c.chunk_id,
	c.doc_id,
	c.ord,
	c.text,
	c.tenant_id,
	ts_rank_cd(c.text_tsv, plainto_tsquery('english', $1))::real AS relevance
FROM doc_chunks c
JOIN doc_documents d ON d.doc_id = c.doc_id
WHERE c.text_tsv @@ plainto_tsquery('english', $1)
	AND ($2::text IS NULL OR c.tenant_id = $2)
	AND ($3::text IS NULL OR d.meta->>'category' = $3)
ORDER BY relevance DESC, c.chunk_id ASC
LIMIT $4",
	)
	.bind(keyword)
	.bind(filters.tenant.as_deref())
	.bind(filters.category.as_deref())
	.bind(i64::from(limit))
	.fetch_all(executor)
	.await;

	match result {
		Ok(rows) => FullTextOutcome::Ok(rows.into_iter().map(text_hit).collect()),
		Err(err) if is_missing_index(&err) => FullTextOutcome::Unavailable,
		Err(err) => FullTextOutcome::Error(err.to_string()),
	}
}

/// Case-insensitive substring matching used when the text index cannot serve a query.
///
/// Relevance is the keyword occurrence count. It orders rows within this mode only.
pub async fn substring_search<'e, E>(
	executor: E,
	keyword: &str,
	limit: u32,
	filters: &SearchFilters,
) -> Result<Vec<TextHit>>
where
	E: PgExecutor<'e>,
{
	let pattern = format!("%{}%", escape_like(keyword));
	let rows = sqlx::query_as::<_, TextRow>(
		"\
SELECT
	c.chunk_id,
	c.doc_id,
	c.ord,
	c.text,
	c.tenant_id,
	(
		(length(lower(c.text)) - length(replace(lower(c.text), lower($1), '')))::real
			/ NULLIF(length($1), 0)
	)::real AS relevance
FROM doc_chunks c
JOIN doc_documents d ON d.doc_id = c.doc_id
WHERE c.text ILIKE $2 ESCAPE '\\'
	AND ($3::text IS NULL OR c.tenant_id = $3)
	AND ($4::text IS NULL OR d.meta->>'category' = $4)
ORDER BY relevance DESC NULLS LAST, c.chunk_id ASC
LIMIT $5",
	)
	.bind(keyword)
	.bind(pattern)
	.bind(filters.tenant.as_deref())
	.bind(filters.category.as_deref())
	.bind(i64::from(limit))
	.fetch_all(executor)
	.await?;

	Ok(rows.into_iter().map(text_hit).collect())
}

pub(crate) fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}

fn is_missing_index(err: &sqlx::Error) -> bool {
	err.as_database_error()
		.and_then(|db_err| db_err.code())
		.map(|code| code == UNDEFINED_COLUMN || code == UNDEFINED_TABLE)
		.unwrap_or(false)
}

fn text_hit(row: TextRow) -> TextHit {
	TextHit {
		chunk_id: row.chunk_id,
		doc_id: row.doc_id,
		ord: row.ord,
		text: row.text,
		tenant_id: row.tenant_id,
		relevance: row.relevance.unwrap_or(0.0),
	}
}
