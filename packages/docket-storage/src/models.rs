use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
	pub doc_id: Uuid,
	pub tenant_id: Option<String>,
	pub title: String,
	pub meta: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
	pub chunk_id: Uuid,
	pub doc_id: Uuid,
	pub ord: i32,
	pub text: String,
	pub embedding: Vec<f32>,
	pub tenant_id: Option<String>,
}

/// One document and its full chunk set, written in a single transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestPayload {
	pub document: DocumentRecord,
	pub chunks: Vec<ChunkRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyBreakdown {
	pub embed_ms: u64,
	pub search_ms: u64,
	pub rerank_ms: u64,
	pub assess_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalLogEntry {
	pub eval_id: Uuid,
	pub tenant_id: Option<String>,
	pub route: String,
	pub query: String,
	pub keyword: Option<String>,
	pub top_k: i32,
	pub filter_category: Option<String>,
	pub latency_ms: i64,
	pub step_ms: LatencyBreakdown,
	pub evidence_ids: Vec<Uuid>,
	pub model: Option<String>,
	pub confidence: f32,
	pub insufficient: bool,
	pub rating: Option<i16>,
	#[serde(with = "rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub audit_id: Uuid,
	pub tenant_id: Option<String>,
	pub actor: Option<String>,
	pub route: String,
	pub query: Option<String>,
	pub evidence_ids: Vec<Uuid>,
	pub request_id: Option<String>,
	#[serde(with = "rfc3339")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VectorRow {
	pub(crate) chunk_id: Uuid,
	pub(crate) doc_id: Uuid,
	pub(crate) ord: i32,
	pub(crate) text: String,
	pub(crate) tenant_id: Option<String>,
	pub(crate) distance: f32,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TextRow {
	pub(crate) chunk_id: Uuid,
	pub(crate) doc_id: Uuid,
	pub(crate) ord: i32,
	pub(crate) text: String,
	pub(crate) tenant_id: Option<String>,
	pub(crate) relevance: Option<f32>,
}

mod rfc3339 {
	use std::borrow::Cow;

	use serde::{Deserialize, Deserializer, Serializer, de, ser};
	use time::{OffsetDateTime, format_description::well_known::Rfc3339};

	pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.format(&Rfc3339).map_err(ser::Error::custom)?)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = Cow::<str>::deserialize(deserializer)?;

		OffsetDateTime::parse(&raw, &Rfc3339).map_err(de::Error::custom)
	}
}
