use std::{
	fs::{self, File},
	io::{self, Write},
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
	Result,
	models::{AuditLogEntry, EvalLogEntry, IngestPayload},
};

const RECORD_EXT: &str = "json";
const TEMP_SUFFIX: &str = ".json.tmp";

/// A write deferred after primary storage rejected it, with everything needed to retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SpoolRecord {
	Ingest(IngestPayload),
	EvalLog(EvalLogEntry),
	AuditLog(AuditLogEntry),
}
impl SpoolRecord {
	pub const KINDS: [&'static str; 3] = ["ingest", "eval_log", "audit_log"];

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Ingest(_) => "ingest",
			Self::EvalLog(_) => "eval_log",
			Self::AuditLog(_) => "audit_log",
		}
	}

	pub fn tenant_id(&self) -> Option<&str> {
		match self {
			Self::Ingest(payload) => payload.document.tenant_id.as_deref(),
			Self::EvalLog(entry) => entry.tenant_id.as_deref(),
			Self::AuditLog(entry) => entry.tenant_id.as_deref(),
		}
	}

	pub fn encode(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec(self)?)
	}
}

/// Outcome of decoding one pending payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
	Record(SpoolRecord),
	/// A well-formed record whose type tag is not known to this build.
	UnknownType(String),
	Corrupt(String),
}

pub fn decode(payload: &[u8]) -> Decoded {
	let value: Value = match serde_json::from_slice(payload) {
		Ok(value) => value,
		Err(err) => return Decoded::Corrupt(err.to_string()),
	};
	let Some(kind) = value.get("type").and_then(Value::as_str) else {
		return Decoded::Corrupt("Record has no type tag.".to_string());
	};

	if !SpoolRecord::KINDS.contains(&kind) {
		return Decoded::UnknownType(kind.to_string());
	}

	match serde_json::from_value(value) {
		Ok(record) => Decoded::Record(record),
		Err(err) => Decoded::Corrupt(err.to_string()),
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
	pub id: String,
	pub payload: Vec<u8>,
}

/// Durable FIFO of opaque payloads. A record stays pending until acked.
pub trait DurableQueue
where
	Self: Send + Sync,
{
	/// Persists `payload` atomically and returns its record id.
	fn enqueue(&self, payload: &[u8]) -> Result<String>;

	/// Pending records in enqueue order.
	fn list_pending(&self) -> Result<Vec<PendingRecord>>;

	/// Removes a record. Acking an id that is already gone succeeds.
	fn ack(&self, id: &str) -> Result<()>;
}

/// One JSON file per record. Writes go to a temp file that is synced and then renamed.
#[derive(Debug, Clone)]
pub struct FsQueue {
	dir: PathBuf,
}
impl FsQueue {
	/// Creates `dir` if needed and removes temp files left by writes that never completed.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();

		fs::create_dir_all(&dir)?;

		for entry in fs::read_dir(&dir)? {
			let path = entry?.path();
			let is_temp = path
				.file_name()
				.and_then(|name| name.to_str())
				.is_some_and(|name| name.ends_with(TEMP_SUFFIX));

			if !is_temp {
				continue;
			}
			if let Err(err) = fs::remove_file(&path) {
				tracing::warn!(
					path = %path.display(),
					error = %err,
					"Failed to remove stale spool temp file."
				);
			}
		}

		Ok(Self { dir })
	}

	fn record_path(&self, id: &str) -> PathBuf {
		self.dir.join(format!("{id}.{RECORD_EXT}"))
	}
}
impl DurableQueue for FsQueue {
	fn enqueue(&self, payload: &[u8]) -> Result<String> {
		let id = Uuid::now_v7().simple().to_string();
		let tmp_path = self.dir.join(format!("{id}{TEMP_SUFFIX}"));
		let final_path = self.record_path(&id);
		let written = File::create(&tmp_path).and_then(|mut file| {
			file.write_all(payload)?;
			file.sync_all()
		});

		if let Err(err) = written.and_then(|()| fs::rename(&tmp_path, &final_path)) {
			let _ = fs::remove_file(&tmp_path);

			return Err(err.into());
		}

		sync_dir(&self.dir);

		Ok(id)
	}

	fn list_pending(&self) -> Result<Vec<PendingRecord>> {
		let mut ids = Vec::new();

		for entry in fs::read_dir(&self.dir)? {
			let entry = entry?;
			let name = entry.file_name();
			let Some(name) = name.to_str() else {
				continue;
			};

			if name.ends_with(TEMP_SUFFIX) {
				continue;
			}

			if let Some(id) = name.strip_suffix(&format!(".{RECORD_EXT}")) {
				ids.push(id.to_string());
			}
		}

		ids.sort();

		let mut pending = Vec::with_capacity(ids.len());

		for id in ids {
			match fs::read(self.record_path(&id)) {
				Ok(payload) => pending.push(PendingRecord { id, payload }),
				// Acked concurrently.
				Err(err) if err.kind() == io::ErrorKind::NotFound => {},
				Err(err) => {
					tracing::warn!(record_id = %id, error = %err, "Failed to read spool record.");
				},
			}
		}

		Ok(pending)
	}

	fn ack(&self, id: &str) -> Result<()> {
		match fs::remove_file(self.record_path(id)) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
	if let Err(err) = File::open(dir).and_then(|handle| handle.sync_all()) {
		tracing::debug!(error = %err, "Failed to sync spool directory.");
	}
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
