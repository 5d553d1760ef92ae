use crate::{DocketService, Result};

impl DocketService {
	/// Deletes duplicate chunks and returns how many were removed.
	pub async fn compact(&self) -> Result<u64> {
		let deleted = self.store.compact_duplicates().await?;

		if deleted > 0 {
			tracing::info!(deleted, "Duplicate chunks compacted.");
		}

		Ok(deleted)
	}
}
