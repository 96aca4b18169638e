use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::err::Error;

/// A cooperative cancellation signal shared between a session and its owner.
///
/// Every public session operation polls the signal on entry and returns
/// [`Error::Canceled`] without touching any state once it has been raised.
/// Cloning hands out another handle onto the same signal.
#[derive(Clone, Debug, Default)]
pub struct Canceller {
	cancelled: Arc<AtomicBool>,
}

impl Canceller {
	pub fn new() -> Canceller {
		Canceller {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Raise the signal. Irrevocable.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Relaxed)
	}

	/// Checkpoint called at the top of every public session operation.
	pub(crate) fn check(&self) -> Result<(), Error> {
		match self.is_cancelled() {
			true => Err(Error::Canceled),
			false => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cancel_is_shared_between_clones() {
		let c = Canceller::new();
		let h = c.clone();
		assert!(c.check().is_ok());
		h.cancel();
		assert!(c.is_cancelled());
		assert!(matches!(c.check(), Err(Error::Canceled)));
	}
}
