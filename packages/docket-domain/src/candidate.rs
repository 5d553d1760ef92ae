use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantOwned;

/// A nearest-neighbor row ranked by ascending cosine distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
	pub chunk_id: Uuid,
	pub doc_id: Uuid,
	pub ord: i32,
	pub text: String,
	pub tenant_id: Option<String>,
	pub distance: f32,
}

/// A keyword row ranked by descending relevance.
///
/// Relevance is comparable only within the retrieval mode that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextHit {
	pub chunk_id: Uuid,
	pub doc_id: Uuid,
	pub ord: i32,
	pub text: String,
	pub tenant_id: Option<String>,
	pub relevance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
	pub chunk_id: Uuid,
	pub doc_id: Uuid,
	pub ord: i32,
	pub text: String,
	pub tenant_id: Option<String>,
	/// `None` when only the keyword list produced this row.
	pub distance: Option<f32>,
	pub relevance: Option<f32>,
	pub fused_score: f64,
	pub rerank_score: Option<f32>,
}
impl Candidate {
	pub fn into_passage(self) -> Passage {
		Passage {
			id: self.chunk_id,
			doc_id: self.doc_id,
			ord: self.ord,
			text: self.text,
			distance: self.distance,
			relevance: self.relevance,
			rerank_score: self.rerank_score,
		}
	}
}
impl From<VectorHit> for Candidate {
	fn from(hit: VectorHit) -> Self {
		Self {
			chunk_id: hit.chunk_id,
			doc_id: hit.doc_id,
			ord: hit.ord,
			text: hit.text,
			tenant_id: hit.tenant_id,
			distance: Some(hit.distance),
			relevance: None,
			fused_score: 0.0,
			rerank_score: None,
		}
	}
}
impl From<TextHit> for Candidate {
	fn from(hit: TextHit) -> Self {
		Self {
			chunk_id: hit.chunk_id,
			doc_id: hit.doc_id,
			ord: hit.ord,
			text: hit.text,
			tenant_id: hit.tenant_id,
			distance: None,
			relevance: Some(hit.relevance),
			fused_score: 0.0,
			rerank_score: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
	pub id: Uuid,
	pub doc_id: Uuid,
	pub ord: i32,
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub distance: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub relevance: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rerank_score: Option<f32>,
}

impl TenantOwned for VectorHit {
	fn tenant_id(&self) -> Option<&str> {
		self.tenant_id.as_deref()
	}
}
impl TenantOwned for TextHit {
	fn tenant_id(&self) -> Option<&str> {
		self.tenant_id.as_deref()
	}
}
impl TenantOwned for Candidate {
	fn tenant_id(&self) -> Option<&str> {
		self.tenant_id.as_deref()
	}
}
