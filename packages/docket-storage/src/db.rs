use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Error, Result, schema};

const SCHEMA_LOCK_ID: i64 = 4_211_907;

pub struct Db {
	pub pool: PgPool,
	pub vector_dim: u32,
}
impl Db {
	pub async fn connect(cfg: &docket_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool, vector_dim: cfg.vector_dim })
	}

	/// Creates missing tables and indexes, then checks the stored embedding dimension.
	pub async fn ensure_schema(&self, fulltext_index: bool) -> Result<()> {
		let sql = schema::render_schema(self.vector_dim);
		// The advisory lock is released with the transaction.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)")
			.bind(SCHEMA_LOCK_ID)
			.execute(&mut *tx)
			.await?;

		for statement in schema::statements(&sql) {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		if fulltext_index {
			self.ensure_fulltext_index().await?;
		}

		self.verify_vector_dim().await
	}

	/// Adds the generated tsvector column and its GIN index.
	///
	/// Failure is logged and tolerated; keyword retrieval then runs in substring mode.
	pub async fn ensure_fulltext_index(&self) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		for statement in schema::statements(schema::render_fulltext()) {
			if let Err(err) = sqlx::query(statement).execute(&mut *tx).await {
				tracing::warn!(
					error = %err,
					"Full-text index unavailable. Keyword search degrades to substring matching."
				);

				tx.rollback().await?;

				return Ok(());
			}
		}

		tx.commit().await?;

		Ok(())
	}

	pub async fn embedding_dim(&self) -> Result<Option<i32>> {
		let dim: Option<i32> = sqlx::query_scalar(
			"\
SELECT a.atttypmod
FROM pg_attribute a
WHERE a.attrelid = 'doc_chunks'::regclass
	AND a.attname = 'embedding'
	AND NOT a.attisdropped",
		)
		.fetch_optional(&self.pool)
		.await?;

		Ok(dim)
	}

	async fn verify_vector_dim(&self) -> Result<()> {
		let Some(actual) = self.embedding_dim().await? else {
			return Err(Error::NotFound("doc_chunks.embedding column".to_string()));
		};

		if actual != self.vector_dim as i32 {
			return Err(Error::DimensionMismatch { expected: self.vector_dim, actual });
		}

		Ok(())
	}
}
