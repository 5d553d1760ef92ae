use uuid::Uuid;

use docket_storage::{
	models::{AuditLogEntry, EvalLogEntry},
	spool::SpoolRecord,
};

use crate::{DocketService, Error, Result, WriteOutcome};

impl DocketService {
	pub async fn log_eval(&self, entry: EvalLogEntry) -> Result<WriteOutcome> {
		self.tenant_scope(entry.tenant_id.as_deref())?;

		if entry.route.trim().is_empty() {
			return Err(Error::invalid("Evaluation log route must be non-empty."));
		}
		if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
			return Err(Error::invalid("Evaluation log confidence must be within 0.0..=1.0."));
		}

		self.persist(SpoolRecord::EvalLog(entry)).await
	}

	pub async fn audit(&self, entry: AuditLogEntry) -> Result<WriteOutcome> {
		self.tenant_scope(entry.tenant_id.as_deref())?;

		if entry.route.trim().is_empty() {
			return Err(Error::invalid("Audit route must be non-empty."));
		}

		self.persist(SpoolRecord::AuditLog(entry)).await
	}

	/// Sets, or clears with `None`, the human rating of an evaluation the tenant can see.
	///
	/// Ratings go straight to storage and are never spooled.
	pub async fn rate_eval(
		&self,
		eval_id: Uuid,
		rating: Option<i16>,
		tenant_id: Option<&str>,
	) -> Result<()> {
		let tenant = self.tenant_scope(tenant_id)?;

		if let Some(value) = rating
			&& !(1..=5).contains(&value)
		{
			return Err(Error::invalid(format!("Rating {value} must be between 1 and 5.")));
		}

		self.store.update_eval_rating(eval_id, rating, &tenant).await?;

		tracing::info!(eval_id = %eval_id, rating = ?rating, "Evaluation rated.");

		Ok(())
	}
}
