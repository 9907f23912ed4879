use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::batch::{batch, schedule};
use crate::sets::SourceSet;
use crate::{
	AnySource, AnySubscriber, NodeId, Owner, ReactiveNode, State, Subscriber, ToAnySubscriber,
};

/// A subscriber run for its side effects.
///
/// Runs once on creation, then again each time it becomes due: when a
/// pushed change leaves it non-clean and, at the end of the surrounding
/// batch, pulling its sources shows that something it read actually
/// changed.
///
/// The effect belongs to the owner that was current when it was created and
/// stops when that owner is cleaned up. Without an owner it lives as long as
/// its handle.
#[derive(Clone)]
pub struct Effect {
	body: Rc<EffectNode>,
}

pub(crate) struct EffectNode {
	id: NodeId,
	owner: Owner,
	state: Cell<State>,
	disposed: Cell<bool>,
	func: Box<dyn Fn()>,
	sources: RefCell<SourceSet>,
	this: Weak<EffectNode>,
}

impl Drop for EffectNode {
	fn drop(&mut self) {
		let this = AnySubscriber::new(self.id, self.this.clone());
		self.sources.get_mut().clear_sources(&this);
		self.owner.cleanup();
		self.owner.detach();
	}
}

impl Effect {
	pub fn new(func: impl Fn() + 'static) -> Self {
		let body = Rc::new_cyclic(|this| EffectNode {
			id: NodeId::next(),
			owner: Owner::new(),
			state: Cell::new(State::Dirty),
			disposed: Cell::new(false),
			func: Box::new(func),
			sources: RefCell::new(SourceSet::new()),
			this: this.clone(),
		});

		// The parent owner keeps the effect alive until it is cleaned up or
		// the effect is disposed.
		body.owner.on_parent_cleanup({
			let body = body.clone();
			move || body.dispose()
		});

		batch(|| {
			body.update_if_necessary();
		});

		Effect { body }
	}

	pub fn id(&self) -> NodeId {
		self.body.id
	}

	pub fn state(&self) -> State {
		self.body.state.get()
	}

	pub fn sources(&self) -> SourceSet {
		self.body.sources.borrow().clone()
	}

	pub fn is_disposed(&self) -> bool {
		self.body.disposed.get()
	}

	/// Detaches the effect from its sources and tears down its owner. It
	/// never runs again.
	pub fn dispose(&self) {
		self.body.dispose()
	}
}

impl EffectNode {
	fn dispose(&self) {
		if self.disposed.replace(true) {
			return;
		}

		tracing::trace!(effect = ?self.id, "effect disposed");
		let this = self.to_any_subscriber();
		self.clear_sources(&this);
		self.owner.cleanup();
		self.owner.detach();
	}

	fn mark(&self, to: State) {
		if self.disposed.get() {
			return;
		}

		let mut state = self.state.get();
		let was_clean = state.is_clean();
		if state.escalate(to) {
			self.state.set(state);
			if was_clean {
				schedule(self.to_any_subscriber());
			}
		}
	}

	fn run(&self) {
		self.state.set(State::Clean);

		let this = self.to_any_subscriber();
		self.clear_sources(&this);

		tracing::trace!(effect = ?self.id, "running effect");
		self.owner.with_cleanup(|| this.with_observer(|| (self.func)()));
	}
}

impl ReactiveNode for EffectNode {
	fn mark_dirty(&self) {
		self.mark(State::Dirty)
	}

	fn mark_check(&self) {
		self.mark(State::Check)
	}

	fn mark_subscribers_check(&self) {}

	fn update_if_necessary(&self) -> bool {
		if self.disposed.get() {
			return false;
		}

		let needs_run = match self.state.get() {
			State::Clean => false,
			State::Dirty => true,
			State::Check => {
				let sources = self.sources.borrow().clone();
				sources.iter().any(|source| source.update_if_necessary())
			}
		};

		if needs_run {
			self.run();
		} else {
			self.state.set(State::Clean);
		}
		needs_run
	}
}

impl Subscriber for EffectNode {
	fn add_source(&self, source: AnySource) {
		self.sources.borrow_mut().insert(source);
	}

	fn clear_sources(&self, subscriber: &AnySubscriber) {
		let mut sources = self.sources.borrow_mut().take();
		sources.clear_sources(subscriber);
	}
}

impl ToAnySubscriber for EffectNode {
	fn to_any_subscriber(&self) -> AnySubscriber {
		AnySubscriber::new(self.id, self.this.clone())
	}
}

impl ToAnySubscriber for Effect {
	fn to_any_subscriber(&self) -> AnySubscriber {
		self.body.to_any_subscriber()
	}
}

impl std::fmt::Debug for Effect {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Effect")
			.field("id", &self.body.id)
			.field("state", &self.body.state.get())
			.finish()
	}
}
