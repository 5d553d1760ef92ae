use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
};

use uuid::Uuid;

use crate::candidate::{Candidate, TextHit, VectorHit};

/// Fuses a vector ranking and a keyword ranking with Reciprocal Rank Fusion.
///
/// Each distinct chunk scores `1/(k + rank)` per list it appears in, with 1-based ranks. A chunk
/// repeated within one list keeps its first rank. Row data comes from the vector list when the
/// chunk is present there.
pub fn reciprocal_rank_fusion(
	vector: Vec<VectorHit>,
	text: Vec<TextHit>,
	k: u32,
	top_k: usize,
) -> Vec<Candidate> {
	if top_k == 0 {
		return Vec::new();
	}

	let mut fused: Vec<Candidate> = Vec::with_capacity(vector.len() + text.len());
	let mut by_chunk: HashMap<Uuid, usize> = HashMap::new();
	let mut seen = HashSet::new();

	for (idx, hit) in vector.into_iter().enumerate() {
		if !seen.insert(hit.chunk_id) {
			continue;
		}

		let mut candidate = Candidate::from(hit);

		candidate.fused_score = rrf_term(k, idx);

		by_chunk.insert(candidate.chunk_id, fused.len());
		fused.push(candidate);
	}

	seen.clear();

	for (idx, hit) in text.into_iter().enumerate() {
		if !seen.insert(hit.chunk_id) {
			continue;
		}

		let term = rrf_term(k, idx);

		match by_chunk.get(&hit.chunk_id) {
			Some(&pos) => {
				let existing = &mut fused[pos];

				existing.fused_score += term;
				existing.relevance = Some(hit.relevance);
			},
			None => {
				let mut candidate = Candidate::from(hit);

				candidate.fused_score = term;

				by_chunk.insert(candidate.chunk_id, fused.len());
				fused.push(candidate);
			},
		}
	}

	fused.sort_by(cmp_fused);
	fused.truncate(top_k);

	fused
}

/// Stable ordering by rerank score, then by original distance.
///
/// A missing rerank score counts as the neutral 0.0, so an all-neutral batch keeps distance order.
pub fn order_by_rerank(candidates: &mut [Candidate]) {
	candidates.sort_by(|a, b| {
		let a_score = a.rerank_score.unwrap_or(0.0);
		let b_score = b.rerank_score.unwrap_or(0.0);

		b_score.total_cmp(&a_score).then_with(|| cmp_distance(a.distance, b.distance))
	});
}

/// Ascending distance with unknown distances after every known one.
pub fn cmp_distance(a: Option<f32>, b: Option<f32>) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => a.total_cmp(&b),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

fn rrf_term(k: u32, idx: usize) -> f64 {
	1.0 / (k as f64 + (idx + 1) as f64)
}

fn cmp_fused(a: &Candidate, b: &Candidate) -> Ordering {
	b.fused_score
		.total_cmp(&a.fused_score)
		.then_with(|| cmp_distance(a.distance, b.distance))
		.then_with(|| a.chunk_id.cmp(&b.chunk_id))
}
