//! Lifetime policy knobs for an object context.

use std::time::Duration;

/// Autorelease policy for a context.
///
/// The defaults give callers roughly ten seconds to claim a fresh node,
/// checked once a second. Tests shrink both to milliseconds.
#[derive(Debug, Clone)]
pub struct ContextConfig {
	/// How long an unclaimed fresh node is kept alive by the autorelease
	/// queue.
	pub grace_period: Duration,
	/// Cadence of the background sweep.
	pub sweep_interval: Duration,
}

impl Default for ContextConfig {
	fn default() -> Self {
		ContextConfig {
			grace_period: Duration::from_secs(10),
			sweep_interval: Duration::from_secs(1),
		}
	}
}
