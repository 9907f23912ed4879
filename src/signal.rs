use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::batch::batch;
use crate::sets::SubscriberSet;
use crate::{AnySource, AnySubscriber, NodeId, ReactiveNode, Source, ToAnySource, Track};

/// A writable source.
///
/// Every write marks direct subscribers dirty and runs due effects once the
/// surrounding batch exits. Writes are not compared with the previous
/// value; memos downstream provide the equality short-circuit.
pub struct Signal<T> {
	body: Rc<SignalBody<T>>,
}

struct SignalBody<T> {
	id: NodeId,
	value: RefCell<T>,
	subscribers: RefCell<SubscriberSet>,
	this: Weak<SignalBody<T>>,
}

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Signal<T>
where
	T: Default + 'static,
{
	fn default() -> Self {
		Signal::new(Default::default())
	}
}

impl<T> Signal<T>
where
	T: 'static,
{
	pub fn new(value: T) -> Self {
		Signal {
			body: Rc::new_cyclic(|this| SignalBody {
				id: NodeId::next(),
				value: RefCell::new(value),
				subscribers: RefCell::new(SubscriberSet::new()),
				this: this.clone(),
			}),
		}
	}

	pub fn id(&self) -> NodeId {
		self.body.id
	}

	#[inline]
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.with(T::clone)
	}

	#[inline]
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.with_untracked(T::clone)
	}

	pub fn with<U>(&self, func: impl FnOnce(&T) -> U) -> U {
		self.body.track();
		self.with_untracked(func)
	}

	pub fn with_untracked<U>(&self, func: impl FnOnce(&T) -> U) -> U {
		func(&*self.body.value.borrow())
	}

	#[inline]
	pub fn set(&self, value: T) {
		self.update(|current| *current = value)
	}

	pub fn replace(&self, value: T) -> T {
		batch(|| {
			let old = std::mem::replace(&mut *self.body.value.borrow_mut(), value);
			self.body.mark_dirty();
			old
		})
	}

	pub fn update(&self, func: impl FnOnce(&mut T)) {
		batch(|| {
			func(&mut *self.body.value.borrow_mut());
			self.body.mark_dirty();
		})
	}

	/// Snapshot of the subscribers currently depending on this signal.
	pub fn subscribers(&self) -> SubscriberSet {
		self.body.subscribers.borrow().clone()
	}
}

impl<T: 'static> ReactiveNode for SignalBody<T> {
	fn mark_dirty(&self) {
		tracing::trace!(signal = ?self.id, "signal changed");
		let subscribers = self.subscribers.borrow().clone();
		for subscriber in &subscribers {
			subscriber.mark_dirty();
		}
	}

	// A signal has no sources, so nothing upstream can make it stale.
	fn mark_check(&self) {}

	fn mark_subscribers_check(&self) {
		let subscribers = self.subscribers.borrow().clone();
		for subscriber in &subscribers {
			subscriber.mark_check();
		}
	}

	// Changes were already pushed to direct subscribers as `Dirty`.
	fn update_if_necessary(&self) -> bool {
		false
	}
}

impl<T: 'static> Source for SignalBody<T> {
	fn add_subscriber(&self, subscriber: AnySubscriber) {
		self.subscribers.borrow_mut().subscribe(subscriber);
	}

	fn remove_subscriber(&self, subscriber: &AnySubscriber) {
		self.subscribers.borrow_mut().unsubscribe(subscriber);
	}

	fn clear_subscribers(&self) {
		self.subscribers.borrow_mut().take();
	}
}

impl<T: 'static> ToAnySource for SignalBody<T> {
	fn to_any_source(&self) -> AnySource {
		AnySource::new(self.id, self.this.clone())
	}
}

impl<T: 'static> ToAnySource for Signal<T> {
	fn to_any_source(&self) -> AnySource {
		self.body.to_any_source()
	}
}

impl<T> Debug for Signal<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.with_untracked(|value| value.fmt(f))
	}
}
