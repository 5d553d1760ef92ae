use sqlx::PgExecutor;
use uuid::Uuid;

use docket_domain::TenantScope;

use crate::{
	Error, Result,
	models::{AuditLogEntry, EvalLogEntry},
};

pub async fn insert_eval_log<'e, E>(executor: E, entry: &EvalLogEntry) -> Result<()>
where
	E: PgExecutor<'e>,
{
	let step_ms = serde_json::to_value(entry.step_ms)?;

	sqlx::query(
		"\
INSERT INTO eval_logs (
	eval_id,
	tenant_id,
	route,
	query,
	keyword,
	top_k,
	filter_category,
	latency_ms,
	step_ms,
	evidence_ids,
	model,
	confidence,
	insufficient,
	rating,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
ON CONFLICT (eval_id) DO NOTHING",
	)
	.bind(entry.eval_id)
	.bind(entry.tenant_id.as_deref())
	.bind(entry.route.as_str())
	.bind(entry.query.as_str())
	.bind(entry.keyword.as_deref())
	.bind(entry.top_k)
	.bind(entry.filter_category.as_deref())
	.bind(entry.latency_ms)
	.bind(step_ms)
	.bind(entry.evidence_ids.as_slice())
	.bind(entry.model.as_deref())
	.bind(entry.confidence)
	.bind(entry.insufficient)
	.bind(entry.rating)
	.bind(entry.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_audit<'e, E>(executor: E, entry: &AuditLogEntry) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO audit_logs (
	audit_id,
	tenant_id,
	actor,
	route,
	query,
	evidence_ids,
	request_id,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (audit_id) DO NOTHING",
	)
	.bind(entry.audit_id)
	.bind(entry.tenant_id.as_deref())
	.bind(entry.actor.as_deref())
	.bind(entry.route.as_str())
	.bind(entry.query.as_deref())
	.bind(entry.evidence_ids.as_slice())
	.bind(entry.request_id.as_deref())
	.bind(entry.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Sets or clears the human rating on an evaluation row visible to `tenant`.
pub async fn update_eval_rating<'e, E>(
	executor: E,
	eval_id: Uuid,
	rating: Option<i16>,
	tenant: &TenantScope,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	if let Some(value) = rating
		&& !(1..=5).contains(&value)
	{
		return Err(Error::InvalidArgument(format!("Rating {value} must be between 1 and 5.")));
	}

	let result = sqlx::query(
		"\
UPDATE eval_logs
SET rating = $1
WHERE eval_id = $2
	AND ($3::text IS NULL OR tenant_id = $3)",
	)
	.bind(rating)
	.bind(eval_id)
	.bind(tenant.as_deref())
	.execute(executor)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Evaluation log {eval_id}.")));
	}

	Ok(())
}
