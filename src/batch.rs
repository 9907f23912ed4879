use std::cell::{Cell, RefCell};

use crate::{AnySubscriber, ReactiveNode};

thread_local! {
	static STARTED: Cell<bool> = const { Cell::new(false) };
	static PENDING: RefCell<Vec<AnySubscriber>> = const { RefCell::new(Vec::new()) };
}

pub fn in_batch() -> bool {
	STARTED.with(Cell::get)
}

/// Runs `func`, deferring due effects until the outermost batch exits.
///
/// Every signal write is wrapped in a batch, so effects never run in the
/// middle of a propagation wave.
pub fn batch<T>(func: impl FnOnce() -> T) -> T {
	let Some(_guard) = BatchGuard::start() else {
		return func();
	};

	let value = func();
	batch_run();
	value
}

/// Queues an effect that left the clean state.
pub(crate) fn schedule(effect: AnySubscriber) {
	tracing::trace!(?effect, "effect scheduled");
	PENDING.with(|pending| pending.borrow_mut().push(effect));
}

// Runs while still inside the batch: writes made by effects queue more
// effects for the next round instead of recursing.
fn batch_run() {
	loop {
		let changed = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));

		if changed.is_empty() {
			break;
		}

		let mut round = Round(changed.into_iter());
		for effect in &mut round.0 {
			effect.update_if_necessary();
		}
	}
}

/// Effects taken for one flush round.
///
/// If an effect panics, the ones not yet run go back to the front of the
/// queue. They are already non-clean and would not be scheduled again.
struct Round(std::vec::IntoIter<AnySubscriber>);

impl Drop for Round {
	fn drop(&mut self) {
		let rest: Vec<_> = self.0.by_ref().collect();
		if rest.is_empty() {
			return;
		}

		tracing::debug!(requeued = rest.len(), "flush interrupted, requeueing effects");
		PENDING.with(|pending| {
			pending.borrow_mut().splice(0..0, rest);
		});
	}
}

struct BatchGuard;

impl BatchGuard {
	fn start() -> Option<BatchGuard> {
		STARTED.with(|started| {
			if started.get() {
				None
			} else {
				started.set(true);
				Some(BatchGuard)
			}
		})
	}
}

impl Drop for BatchGuard {
	fn drop(&mut self) {
		STARTED.with(|started| started.set(false));
	}
}
