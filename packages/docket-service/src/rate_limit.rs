use std::{
	collections::{HashMap, VecDeque},
	sync::Mutex,
	time::{Duration, Instant},
};

/// Sliding-window limiter keyed by caller identity and operation.
#[derive(Debug)]
pub struct RateLimiter {
	max_per_window: usize,
	window: Duration,
	buckets: Mutex<HashMap<(String, String), VecDeque<Instant>>>,
}
impl RateLimiter {
	pub fn new(max_per_window: u32, window: Duration) -> Self {
		Self {
			max_per_window: max_per_window as usize,
			window,
			buckets: Mutex::new(HashMap::new()),
		}
	}

	pub fn allow(&self, caller: &str, operation: &str) -> bool {
		self.allow_at(caller, operation, Instant::now())
	}

	/// Records a call at `now` unless the window is already full.
	///
	/// Calls older than the window are evicted first. A rejected call is not recorded.
	pub fn allow_at(&self, caller: &str, operation: &str, now: Instant) -> bool {
		let mut buckets = self.buckets.lock().unwrap_or_else(|err| err.into_inner());
		let bucket = buckets.entry((caller.to_string(), operation.to_string())).or_default();

		while let Some(oldest) = bucket.front() {
			if now.saturating_duration_since(*oldest) > self.window {
				bucket.pop_front();
			} else {
				break;
			}
		}

		if bucket.len() >= self.max_per_window {
			return false;
		}

		bucket.push_back(now);

		true
	}
}
impl From<&docket_config::RateLimit> for RateLimiter {
	fn from(cfg: &docket_config::RateLimit) -> Self {
		Self::new(cfg.max_per_window, Duration::from_secs(cfg.window_secs))
	}
}
