//! Cooperative cancellation. The evaluator checks the token at statement
//! and loop-iteration boundaries, never mid-expression; on cancellation the
//! walk unwinds with a distinct outcome instead of a partial result.

use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

/// A shared cancellation flag. Cloning observes the same flag; cancel from
/// any thread, any time.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
	flag: Arc<AtomicBool>,
}

impl CancelToken {
	pub fn new() -> Self { Self::default() }

	pub fn cancel(&self) { self.flag.store(true, Ordering::Relaxed); }

	pub fn is_cancelled(&self) -> bool { self.flag.load(Ordering::Relaxed) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clones_share_the_flag() {
		let token = CancelToken::new();
		let other = token.clone();
		assert!(!other.is_cancelled());
		token.cancel();
		assert!(other.is_cancelled());
	}
}
