use crate::observer::Observer;
use crate::{AnySource, AnySubscriber};

/// A participant in the reactive graph.
pub trait ReactiveNode {
	/// A direct source of this node changed.
	///
	/// Implementations must leave every transitive subscriber at least
	/// [`State::Check`](crate::State::Check).
	fn mark_dirty(&self);

	/// Some transitive source of this node may have changed. Only
	/// overwrites a clean state.
	fn mark_check(&self);

	/// Continues the check wave to this node's subscribers.
	fn mark_subscribers_check(&self);

	/// Brings the node up to date, recomputing only if needed.
	///
	/// Returns `true` if the node's value actually changed.
	fn update_if_necessary(&self) -> bool;
}

/// A node that can be read, and so can have subscribers.
pub trait Source: ReactiveNode {
	fn add_subscriber(&self, subscriber: AnySubscriber);
	fn remove_subscriber(&self, subscriber: &AnySubscriber);
	fn clear_subscribers(&self);
}

/// A node that reads sources and must react to their changes.
pub trait Subscriber: ReactiveNode {
	fn add_source(&self, source: AnySource);

	/// Removes `subscriber` from every source recorded in this node's
	/// source set, then empties it.
	fn clear_sources(&self, subscriber: &AnySubscriber);
}

pub trait ToAnySource {
	fn to_any_source(&self) -> AnySource;
}

pub trait ToAnySubscriber {
	fn to_any_subscriber(&self) -> AnySubscriber;
}

/// Records a read of a source by the current observer, if any.
pub trait Track {
	fn track(&self);
}

impl<T> Track for T
where
	T: Source + ToAnySource + ?Sized,
{
	fn track(&self) {
		if let Some(subscriber) = Observer::get() {
			subscriber.add_source(self.to_any_source());
			self.add_subscriber(subscriber);
		}
	}
}
