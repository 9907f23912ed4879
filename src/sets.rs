use smallvec::SmallVec;

use crate::{AnySource, AnySubscriber, Source};

// Fan-in and fan-out are small in practice; a linear scan over an inline
// buffer beats hashing.
const INLINE: usize = 4;

/// Sources read by a subscriber during its most recent evaluation.
///
/// Not deduplicated: a subscriber that reads the same source twice records
/// it twice.
#[derive(Default, Clone, Debug)]
pub struct SourceSet {
	sources: SmallVec<[AnySource; INLINE]>,
}

impl SourceSet {
	pub const fn new() -> Self {
		SourceSet {
			sources: SmallVec::new_const(),
		}
	}

	pub fn insert(&mut self, source: AnySource) {
		self.sources.push(source);
	}

	pub fn remove(&mut self, source: &AnySource) {
		if let Some(pos) = self.sources.iter().position(|s| s == source) {
			self.sources.remove(pos);
		}
	}

	pub fn contains(&self, source: &AnySource) -> bool {
		self.sources.contains(source)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, AnySource> {
		self.sources.iter()
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}

	pub fn take(&mut self) -> SourceSet {
		std::mem::take(self)
	}

	/// Drops `subscriber` from every recorded source and empties the set.
	pub fn clear_sources(&mut self, subscriber: &AnySubscriber) {
		if !self.sources.is_empty() {
			tracing::trace!(?subscriber, sources = self.sources.len(), "clearing sources");
		}

		for source in self.sources.drain(..) {
			source.remove_subscriber(subscriber);
		}
	}
}

impl<'a> IntoIterator for &'a SourceSet {
	type Item = &'a AnySource;
	type IntoIter = std::slice::Iter<'a, AnySource>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Subscribers currently depending on a source. Never holds duplicates.
#[derive(Default, Clone, Debug)]
pub struct SubscriberSet {
	subscribers: SmallVec<[AnySubscriber; INLINE]>,
}

impl SubscriberSet {
	pub const fn new() -> Self {
		SubscriberSet {
			subscribers: SmallVec::new_const(),
		}
	}

	pub fn subscribe(&mut self, subscriber: AnySubscriber) {
		if !self.subscribers.contains(&subscriber) {
			self.subscribers.push(subscriber);
		}
	}

	pub fn unsubscribe(&mut self, subscriber: &AnySubscriber) {
		if let Some(pos) = self.subscribers.iter().position(|s| s == subscriber) {
			self.subscribers.remove(pos);
		}
	}

	pub fn contains(&self, subscriber: &AnySubscriber) -> bool {
		self.subscribers.contains(subscriber)
	}

	pub fn iter(&self) -> std::slice::Iter<'_, AnySubscriber> {
		self.subscribers.iter()
	}

	pub fn len(&self) -> usize {
		self.subscribers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscribers.is_empty()
	}

	pub fn take(&mut self) -> SubscriberSet {
		std::mem::take(self)
	}
}

impl<'a> IntoIterator for &'a SubscriberSet {
	type Item = &'a AnySubscriber;
	type IntoIter = std::slice::Iter<'a, AnySubscriber>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::{Rc, Weak};

	use super::*;
	use crate::{NodeId, ReactiveNode, Subscriber};

	#[derive(Default)]
	struct Node {
		subscribers: RefCell<SubscriberSet>,
	}

	impl ReactiveNode for Node {
		fn mark_dirty(&self) {}
		fn mark_check(&self) {}
		fn mark_subscribers_check(&self) {}
		fn update_if_necessary(&self) -> bool {
			false
		}
	}

	impl Source for Node {
		fn add_subscriber(&self, subscriber: AnySubscriber) {
			self.subscribers.borrow_mut().subscribe(subscriber)
		}

		fn remove_subscriber(&self, subscriber: &AnySubscriber) {
			self.subscribers.borrow_mut().unsubscribe(subscriber)
		}

		fn clear_subscribers(&self) {
			self.subscribers.borrow_mut().take();
		}
	}

	impl Subscriber for Node {
		fn add_source(&self, _: AnySource) {}
		fn clear_sources(&self, _: &AnySubscriber) {}
	}

	fn subscriber() -> AnySubscriber {
		AnySubscriber::new(NodeId::next(), Weak::<Node>::new())
	}

	#[test]
	fn subscribe_is_idempotent() {
		let mut set = SubscriberSet::new();
		let a = subscriber();

		set.subscribe(a.clone());
		set.subscribe(a.clone());
		assert_eq!(set.len(), 1);

		set.unsubscribe(&a);
		set.unsubscribe(&a);
		assert!(set.is_empty());
	}

	#[test]
	fn source_set_keeps_duplicates_in_order() {
		let first = AnySource::new(NodeId::next(), Weak::<Node>::new());
		let second = AnySource::new(NodeId::next(), Weak::<Node>::new());

		let mut set = SourceSet::new();
		set.insert(first.clone());
		set.insert(second.clone());
		set.insert(first.clone());
		assert_eq!(set.len(), 3);

		set.remove(&first);
		let order: Vec<_> = set.iter().cloned().collect();
		assert_eq!(order, vec![second, first]);
	}

	#[test]
	fn clear_sources_detaches_both_sides() {
		let node = Rc::new(Node::default());
		let source = AnySource::new(NodeId::next(), Rc::downgrade(&node) as Weak<dyn Source>);
		let reader = subscriber();

		node.add_subscriber(reader.clone());

		let mut set = SourceSet::new();
		set.insert(source.clone());
		set.insert(source);
		set.clear_sources(&reader);

		assert!(set.is_empty());
		assert!(!node.subscribers.borrow().contains(&reader));
	}

	#[test]
	fn clear_sources_tolerates_expired_sources() {
		let node = Rc::new(Node::default());
		let mut set = SourceSet::new();
		set.insert(AnySource::new(NodeId::next(), Rc::downgrade(&node) as Weak<dyn Source>));
		std::mem::drop(node);

		set.clear_sources(&subscriber());
		assert!(set.is_empty());
	}
}
