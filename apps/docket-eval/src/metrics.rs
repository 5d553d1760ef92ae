//! Retrieval quality against a set of expected documents. Ranks are 1-based and relevance is
//! binary.

use std::collections::HashSet;

use uuid::Uuid;

/// Keeps the first occurrence of each id, preserving rank order.
pub fn unique_ids<I>(ids: I) -> Vec<Uuid>
where
	I: IntoIterator<Item = Uuid>,
{
	let mut seen = HashSet::new();

	ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Share of the expected documents present in `retrieved`. `None` when nothing is expected.
pub fn recall_at_k(retrieved: &[Uuid], expected: &HashSet<Uuid>) -> Option<f64> {
	if expected.is_empty() {
		return None;
	}

	let hits = retrieved.iter().filter(|id| expected.contains(*id)).count();

	Some(round3(hits as f64 / expected.len() as f64))
}

/// Normalized discounted cumulative gain of `retrieved`. `None` when nothing is expected.
///
/// The ideal ranking places `min(expected, retrieved)` relevant documents first.
pub fn ndcg_at_k(retrieved: &[Uuid], expected: &HashSet<Uuid>) -> Option<f64> {
	if expected.is_empty() {
		return None;
	}

	let dcg = retrieved
		.iter()
		.enumerate()
		.filter(|(_, id)| expected.contains(*id))
		.map(|(idx, _)| discount(idx))
		.sum::<f64>();
	let idcg = (0..expected.len().min(retrieved.len())).map(discount).sum::<f64>();

	if idcg == 0.0 {
		return Some(0.0);
	}

	Some(round3(dcg / idcg))
}

/// Mean of the present values, or `None` if there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
	I: IntoIterator<Item = Option<f64>>,
{
	let (sum, count) = values
		.into_iter()
		.flatten()
		.fold((0.0_f64, 0_usize), |(sum, count), value| (sum + value, count + 1));

	(count > 0).then(|| round3(sum / count as f64))
}

/// Linear interpolation between the closest ranks of sorted `values`.
pub fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let pos = percentile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;
	let weight = pos - lower as f64;

	values[lower] * (1.0 - weight) + values[upper] * weight
}

pub fn round3(value: f64) -> f64 {
	(value * 1_000.0).round() / 1_000.0
}

fn discount(idx: usize) -> f64 {
	1.0 / (idx as f64 + 2.0).log2()
}
