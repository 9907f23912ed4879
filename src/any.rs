use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use std::sync::atomic::{self, AtomicU64};

use crate::observer::Observer;
use crate::{ReactiveNode, Source, Subscriber, ToAnySource, ToAnySubscriber};

/// Process-unique identity of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
	pub fn next() -> Self {
		static COUNTER: AtomicU64 = AtomicU64::new(0);
		NodeId(COUNTER.fetch_add(1, atomic::Ordering::Relaxed))
	}
}

/// Weak, type-erased reference to a [`Source`].
///
/// Compared and hashed by [`NodeId`] only. Every operation on an expired
/// handle is a no-op.
#[derive(Clone)]
pub struct AnySource {
	id: NodeId,
	ptr: Weak<dyn Source>,
}

impl AnySource {
	pub fn new(id: NodeId, ptr: Weak<dyn Source>) -> Self {
		AnySource { id, ptr }
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn upgrade(&self) -> Option<Rc<dyn Source>> {
		let source = self.ptr.upgrade();
		if source.is_none() {
			tracing::trace!(source = ?self.id, "source handle expired");
		}
		source
	}

	pub fn is_alive(&self) -> bool {
		self.ptr.strong_count() > 0
	}
}

impl PartialEq for AnySource {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for AnySource {}

impl Hash for AnySource {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state)
	}
}

impl Ord for AnySource {
	fn cmp(&self, other: &Self) -> Ordering {
		self.id.cmp(&other.id)
	}
}

impl PartialOrd for AnySource {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Debug for AnySource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("AnySource").field(&self.id.0).finish()
	}
}

impl ReactiveNode for AnySource {
	fn mark_dirty(&self) {
		if let Some(source) = self.upgrade() {
			source.mark_dirty()
		}
	}

	fn mark_check(&self) {
		if let Some(source) = self.upgrade() {
			source.mark_check()
		}
	}

	fn mark_subscribers_check(&self) {
		if let Some(source) = self.upgrade() {
			source.mark_subscribers_check()
		}
	}

	fn update_if_necessary(&self) -> bool {
		match self.upgrade() {
			Some(source) => source.update_if_necessary(),
			None => false,
		}
	}
}

impl Source for AnySource {
	fn add_subscriber(&self, subscriber: AnySubscriber) {
		if let Some(source) = self.upgrade() {
			source.add_subscriber(subscriber)
		}
	}

	fn remove_subscriber(&self, subscriber: &AnySubscriber) {
		if let Some(source) = self.upgrade() {
			source.remove_subscriber(subscriber)
		}
	}

	fn clear_subscribers(&self) {
		if let Some(source) = self.upgrade() {
			source.clear_subscribers()
		}
	}
}

impl ToAnySource for AnySource {
	fn to_any_source(&self) -> AnySource {
		self.clone()
	}
}

/// Weak, type-erased reference to a [`Subscriber`].
///
/// Same identity rules as [`AnySource`].
#[derive(Clone)]
pub struct AnySubscriber {
	id: NodeId,
	ptr: Weak<dyn Subscriber>,
}

impl AnySubscriber {
	pub fn new(id: NodeId, ptr: Weak<dyn Subscriber>) -> Self {
		AnySubscriber { id, ptr }
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn upgrade(&self) -> Option<Rc<dyn Subscriber>> {
		let subscriber = self.ptr.upgrade();
		if subscriber.is_none() {
			tracing::trace!(subscriber = ?self.id, "subscriber handle expired");
		}
		subscriber
	}

	pub fn is_alive(&self) -> bool {
		self.ptr.strong_count() > 0
	}

	/// Runs `func` with this subscriber installed as the current observer.
	pub fn with_observer<T>(&self, func: impl FnOnce() -> T) -> T {
		let _guard = Observer::enter(Some(self.clone()));
		func()
	}
}

impl PartialEq for AnySubscriber {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for AnySubscriber {}

impl Hash for AnySubscriber {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state)
	}
}

impl Ord for AnySubscriber {
	fn cmp(&self, other: &Self) -> Ordering {
		self.id.cmp(&other.id)
	}
}

impl PartialOrd for AnySubscriber {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Debug for AnySubscriber {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("AnySubscriber").field(&self.id.0).finish()
	}
}

impl ReactiveNode for AnySubscriber {
	fn mark_dirty(&self) {
		if let Some(subscriber) = self.upgrade() {
			subscriber.mark_dirty()
		}
	}

	fn mark_check(&self) {
		if let Some(subscriber) = self.upgrade() {
			subscriber.mark_check()
		}
	}

	fn mark_subscribers_check(&self) {
		if let Some(subscriber) = self.upgrade() {
			subscriber.mark_subscribers_check()
		}
	}

	fn update_if_necessary(&self) -> bool {
		match self.upgrade() {
			Some(subscriber) => subscriber.update_if_necessary(),
			None => false,
		}
	}
}

impl Subscriber for AnySubscriber {
	fn add_source(&self, source: AnySource) {
		if let Some(subscriber) = self.upgrade() {
			subscriber.add_source(source)
		}
	}

	fn clear_sources(&self, subscriber: &AnySubscriber) {
		if let Some(this) = self.upgrade() {
			this.clear_sources(subscriber)
		}
	}
}

impl ToAnySubscriber for AnySubscriber {
	fn to_any_subscriber(&self) -> AnySubscriber {
		self.clone()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use super::*;

	struct Probe {
		updates: Cell<u32>,
	}

	impl ReactiveNode for Probe {
		fn mark_dirty(&self) {}
		fn mark_check(&self) {}
		fn mark_subscribers_check(&self) {}
		fn update_if_necessary(&self) -> bool {
			self.updates.set(self.updates.get() + 1);
			true
		}
	}

	impl Source for Probe {
		fn add_subscriber(&self, _: AnySubscriber) {}
		fn remove_subscriber(&self, _: &AnySubscriber) {}
		fn clear_subscribers(&self) {}
	}

	#[test]
	fn identity_is_by_id() {
		let probe: Rc<dyn Source> = Rc::new(Probe {
			updates: Cell::new(0),
		});
		let id = NodeId::next();
		let a = AnySource::new(id, Rc::downgrade(&probe));
		let b = AnySource::new(id, Weak::<Probe>::new());
		let c = AnySource::new(NodeId::next(), Rc::downgrade(&probe));

		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[test]
	fn expired_handle_is_a_no_op() {
		let probe = Rc::new(Probe {
			updates: Cell::new(0),
		});
		let weak = Rc::downgrade(&probe);
		let handle = AnySource::new(NodeId::next(), weak);

		assert!(handle.update_if_necessary());
		assert_eq!(probe.updates.get(), 1);

		std::mem::drop(probe);

		assert!(!handle.is_alive());
		assert!(!handle.update_if_necessary());
		handle.mark_dirty();
		handle.clear_subscribers();
	}
}
