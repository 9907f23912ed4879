use std::cell::{Cell, Ref, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::sets::{SourceSet, SubscriberSet};
use crate::{
	AnySource, AnySubscriber, NodeId, Owner, ReactiveNode, Source, State, Subscriber, ToAnySource,
	ToAnySubscriber, Track,
};

/// A lazily computed, cached value derived from other sources.
///
/// Recomputes only when pulled while stale, and reports a change to its
/// own subscribers only if the new value differs from the cached one.
pub struct Memo<T>
where
	T: PartialEq + 'static,
{
	body: Rc<MemoBody<T>>,
}

impl<T> Clone for Memo<T>
where
	T: PartialEq + 'static,
{
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

pub(crate) struct MemoBody<T>
where
	T: PartialEq + 'static,
{
	id: NodeId,
	owner: Owner,
	state: Cell<State>,
	value: RefCell<Option<T>>,
	func: Box<dyn Fn(Option<&T>) -> T>,
	sources: RefCell<SourceSet>,
	subscribers: RefCell<SubscriberSet>,
	this: Weak<MemoBody<T>>,
}

impl<T> Drop for MemoBody<T>
where
	T: PartialEq + 'static,
{
	fn drop(&mut self) {
		let this = AnySubscriber::new(self.id, self.this.clone());
		self.sources.get_mut().clear_sources(&this);
		self.owner.cleanup();
		self.owner.detach();
	}
}

impl<T> Memo<T>
where
	T: PartialEq + 'static,
{
	/// `func` receives the previously cached value, if any.
	pub fn new(func: impl Fn(Option<&T>) -> T + 'static) -> Self {
		Memo {
			body: Rc::new_cyclic(|this| MemoBody {
				id: NodeId::next(),
				owner: Owner::new(),
				state: Cell::new(State::Dirty),
				value: RefCell::new(None),
				func: Box::new(func),
				sources: RefCell::new(SourceSet::new()),
				subscribers: RefCell::new(SubscriberSet::new()),
				this: this.clone(),
			}),
		}
	}

	pub fn id(&self) -> NodeId {
		self.body.id
	}

	pub fn state(&self) -> State {
		self.body.state.get()
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
		self.body.update_if_necessary();
		func(&*self.body.current())
	}

	/// Snapshot of the sources read during the latest computation.
	pub fn sources(&self) -> SourceSet {
		self.body.sources.borrow().clone()
	}

	pub fn subscribers(&self) -> SubscriberSet {
		self.body.subscribers.borrow().clone()
	}
}

impl<T> MemoBody<T>
where
	T: PartialEq + 'static,
{
	fn current(&self) -> Ref<'_, T> {
		Ref::map(self.value.borrow(), |value| {
			value
				.as_ref()
				.expect("memo has no value: its first computation is still running or panicked")
		})
	}

	fn recompute(&self) -> bool {
		// Clean before running, so a read of this memo from its own body
		// does not loop.
		self.state.set(State::Clean);

		let this = self.to_any_subscriber();
		self.clear_sources(&this);

		let value = self.owner.with_cleanup(|| {
			this.with_observer(|| {
				let prev = self.value.borrow();
				(self.func)(prev.as_ref())
			})
		});

		let mut current = self.value.borrow_mut();
		let changed = current.as_ref() != Some(&value);
		if changed {
			*current = Some(value);
		}

		tracing::trace!(memo = ?self.id, changed, "memo recomputed");
		changed
	}
}

impl<T> ReactiveNode for MemoBody<T>
where
	T: PartialEq + 'static,
{
	fn mark_dirty(&self) {
		let mut state = self.state.get();
		if state.escalate(State::Dirty) {
			self.state.set(state);
			self.mark_subscribers_check();
		}
	}

	fn mark_check(&self) {
		let mut state = self.state.get();
		if state.escalate(State::Check) {
			self.state.set(state);
			self.mark_subscribers_check();
		}
	}

	fn mark_subscribers_check(&self) {
		let subscribers = self.subscribers.borrow().clone();
		for subscriber in &subscribers {
			subscriber.mark_check();
		}
	}

	fn update_if_necessary(&self) -> bool {
		let needs_update = match self.state.get() {
			State::Clean => false,
			State::Dirty => true,
			State::Check => {
				// Clean while verifying, so a memo listed among its own sources
				// answers `false` instead of recursing.
				self.state.set(State::Clean);
				let sources = self.sources.borrow().clone();
				sources.iter().any(|source| source.update_if_necessary())
			}
		};

		needs_update && self.recompute()
	}
}

impl<T> Source for MemoBody<T>
where
	T: PartialEq + 'static,
{
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

impl<T> Subscriber for MemoBody<T>
where
	T: PartialEq + 'static,
{
	fn add_source(&self, source: AnySource) {
		self.sources.borrow_mut().insert(source);
	}

	fn clear_sources(&self, subscriber: &AnySubscriber) {
		let mut sources = self.sources.borrow_mut().take();
		sources.clear_sources(subscriber);
	}
}

impl<T> ToAnySource for MemoBody<T>
where
	T: PartialEq + 'static,
{
	fn to_any_source(&self) -> AnySource {
		AnySource::new(self.id, self.this.clone())
	}
}

impl<T> ToAnySubscriber for MemoBody<T>
where
	T: PartialEq + 'static,
{
	fn to_any_subscriber(&self) -> AnySubscriber {
		AnySubscriber::new(self.id, self.this.clone())
	}
}

impl<T> ToAnySource for Memo<T>
where
	T: PartialEq + 'static,
{
	fn to_any_source(&self) -> AnySource {
		self.body.to_any_source()
	}
}

impl<T> ToAnySubscriber for Memo<T>
where
	T: PartialEq + 'static,
{
	fn to_any_subscriber(&self) -> AnySubscriber {
		self.body.to_any_subscriber()
	}
}

impl<T> Debug for Memo<T>
where
	T: PartialEq + Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.with_untracked(|value| value.fmt(f))
	}
}
