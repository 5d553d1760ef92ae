use serde::{Deserialize, Serialize};

use crate::candidate::Passage;

/// Thresholds for [`assess`]. The defaults are the parity contract.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidencePolicy {
	pub min_chars: usize,
	pub sufficiency_window: usize,
	pub max_mean_distance: f32,
	pub confidence_char_target: usize,
	pub confidence_window: usize,
	pub length_weight: f32,
	pub distance_weight: f32,
}
impl Default for EvidencePolicy {
	fn default() -> Self {
		Self::from(&docket_config::Evidence::default())
	}
}
impl From<&docket_config::Evidence> for EvidencePolicy {
	fn from(cfg: &docket_config::Evidence) -> Self {
		Self {
			min_chars: cfg.min_chars as usize,
			sufficiency_window: cfg.sufficiency_window as usize,
			max_mean_distance: cfg.max_mean_distance,
			confidence_char_target: cfg.confidence_char_target as usize,
			confidence_window: cfg.confidence_window as usize,
			length_weight: cfg.length_weight,
			distance_weight: cfg.distance_weight,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAssessment {
	pub insufficient: bool,
	pub confidence: f32,
}

pub fn assess(passages: &[Passage], policy: &EvidencePolicy) -> EvidenceAssessment {
	EvidenceAssessment {
		insufficient: is_insufficient(passages, policy),
		confidence: confidence(passages, policy),
	}
}

/// True when the passages are empty, too short up front, or too far on average.
///
/// The mean distance only counts passages whose distance is known. Without any known distance
/// the proximity check is skipped.
pub fn is_insufficient(passages: &[Passage], policy: &EvidencePolicy) -> bool {
	if passages.is_empty() {
		return true;
	}
	if leading_chars(passages, policy.sufficiency_window) < policy.min_chars {
		return true;
	}

	let known = passages.iter().filter_map(|passage| passage.distance).collect::<Vec<_>>();

	if known.is_empty() {
		return false;
	}

	let mean = known.iter().map(|d| *d as f64).sum::<f64>() / known.len() as f64;

	mean > policy.max_mean_distance as f64
}

/// Weighted coverage and proximity, rounded to three decimals.
///
/// An unknown distance counts as the maximum of 1.0.
pub fn confidence(passages: &[Passage], policy: &EvidencePolicy) -> f32 {
	if passages.is_empty() {
		return 0.0;
	}

	let chars = leading_chars(passages, policy.confidence_window) as f64;
	let coverage = (chars / policy.confidence_char_target as f64).clamp(0.0, 1.0);
	let mean_distance = passages.iter().map(|p| p.distance.unwrap_or(1.0) as f64).sum::<f64>()
		/ passages.len() as f64;
	let proximity = (1.0 - mean_distance).clamp(0.0, 1.0);
	let raw = policy.length_weight as f64 * coverage + policy.distance_weight as f64 * proximity;

	round3(raw) as f32
}

fn leading_chars(passages: &[Passage], window: usize) -> usize {
	passages.iter().take(window).map(|passage| passage.text.chars().count()).sum()
}

fn round3(value: f64) -> f64 {
	(value * 1_000.0).round() / 1_000.0
}
