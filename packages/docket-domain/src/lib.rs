pub mod candidate;
pub mod chunking;
pub mod evidence;
pub mod fusion;
pub mod redaction;
pub mod tenant;

pub use candidate::{Candidate, Passage, TextHit, VectorHit};
pub use evidence::{EvidenceAssessment, EvidencePolicy};
pub use tenant::{TenantOwned, TenantScope};
