use std::cell::RefCell;

use crate::AnySubscriber;

thread_local! {
	static OBSERVER: RefCell<Option<AnySubscriber>> = const { RefCell::new(None) };
}

/// The subscriber currently evaluating on this thread.
///
/// Reads of any source consult it to record a dependency edge.
pub struct Observer;

impl Observer {
	pub fn get() -> Option<AnySubscriber> {
		OBSERVER.with(|observer| observer.borrow().clone())
	}

	pub fn is_tracking() -> bool {
		OBSERVER.with(|observer| observer.borrow().is_some())
	}

	/// Installs `subscriber` until the returned guard is dropped.
	pub fn enter(subscriber: Option<AnySubscriber>) -> ObserverGuard {
		ObserverGuard {
			prev: Observer::replace(subscriber),
		}
	}

	fn replace(subscriber: Option<AnySubscriber>) -> Option<AnySubscriber> {
		OBSERVER.with(|observer| std::mem::replace(&mut *observer.borrow_mut(), subscriber))
	}
}

/// Restores the previous observer on drop, unwinding included.
#[must_use]
pub struct ObserverGuard {
	prev: Option<AnySubscriber>,
}

impl Drop for ObserverGuard {
	fn drop(&mut self) {
		Observer::replace(self.prev.take());
	}
}

/// Runs `func` without an observer, so reads inside it create no edges.
pub fn untrack<T>(func: impl FnOnce() -> T) -> T {
	let _guard = Observer::enter(None);
	func()
}

#[cfg(test)]
mod tests {
	use std::rc::Weak;

	use super::*;
	use crate::effect::EffectNode;
	use crate::NodeId;

	fn subscriber() -> AnySubscriber {
		AnySubscriber::new(NodeId::next(), Weak::<EffectNode>::new())
	}

	#[test]
	fn nested_observers_restore() {
		let outer = subscriber();
		let inner = subscriber();

		assert!(!Observer::is_tracking());

		outer.with_observer(|| {
			assert_eq!(Observer::get(), Some(outer.clone()));
			inner.with_observer(|| {
				assert_eq!(Observer::get(), Some(inner.clone()));
				untrack(|| assert_eq!(Observer::get(), None));
				assert_eq!(Observer::get(), Some(inner.clone()));
			});
			assert_eq!(Observer::get(), Some(outer.clone()));
		});

		assert_eq!(Observer::get(), None);
	}

	#[test]
	fn observer_restored_on_panic() {
		let outer = subscriber();

		let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			outer.with_observer(|| panic!("body failed"))
		}));

		assert!(result.is_err());
		assert_eq!(Observer::get(), None);
	}
}
