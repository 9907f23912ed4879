use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::NodeId;

thread_local! {
	static OWNER: RefCell<Option<Owner>> = const { RefCell::new(None) };
}

/// A node in the lifetime tree.
///
/// Owners hold their children, cleanup callbacks, contexts and registered
/// arena nodes. [`Owner::cleanup`] tears all of it down, children first.
#[derive(Clone)]
pub struct Owner {
	inner: Rc<RefCell<OwnerInner>>,
}

struct OwnerInner {
	id: NodeId,
	parent: Option<Weak<RefCell<OwnerInner>>>,
	children: Vec<Owner>,
	// Callbacks registered on behalf of a child are tagged with its id.
	cleanups: Vec<(Option<NodeId>, Box<dyn FnOnce()>)>,
	contexts: FxHashMap<TypeId, Box<dyn Any>>,
	nodes: Vec<NodeId>,
}

impl OwnerInner {
	fn new(parent: Option<Weak<RefCell<OwnerInner>>>) -> Self {
		OwnerInner {
			id: NodeId::next(),
			parent,
			children: Vec::new(),
			cleanups: Vec::new(),
			contexts: FxHashMap::default(),
			nodes: Vec::new(),
		}
	}
}

impl Owner {
	/// Creates a child of the current owner, or a root if there is none.
	pub fn new() -> Self {
		match Owner::current() {
			Some(parent) => parent.child(),
			None => Owner::new_root(),
		}
	}

	pub fn new_root() -> Self {
		Owner {
			inner: Rc::new(RefCell::new(OwnerInner::new(None))),
		}
	}

	pub fn child(&self) -> Owner {
		let child = Owner {
			inner: Rc::new(RefCell::new(OwnerInner::new(Some(Rc::downgrade(&self.inner))))),
		};
		self.inner.borrow_mut().children.push(child.clone());
		child
	}

	pub fn current() -> Option<Owner> {
		OWNER.with(|owner| owner.borrow().clone())
	}

	pub fn id(&self) -> NodeId {
		self.inner.borrow().id
	}

	pub fn parent(&self) -> Option<Owner> {
		self.inner
			.borrow()
			.parent
			.as_ref()
			.and_then(Weak::upgrade)
			.map(|inner| Owner { inner })
	}

	/// Ids of this owner and its ancestors, nearest first.
	pub fn ancestry(&self) -> Vec<NodeId> {
		let mut ids = vec![self.id()];
		let mut next = self.parent();
		while let Some(owner) = next {
			ids.push(owner.id());
			next = owner.parent();
		}
		ids
	}

	pub fn child_count(&self) -> usize {
		self.inner.borrow().children.len()
	}

	/// Makes this the current owner until the guard is dropped.
	pub fn enter(&self) -> OwnerGuard {
		OwnerGuard {
			prev: Owner::replace(Some(self.clone())),
		}
	}

	fn replace(owner: Option<Owner>) -> Option<Owner> {
		OWNER.with(|current| std::mem::replace(&mut *current.borrow_mut(), owner))
	}

	pub fn with<T>(&self, func: impl FnOnce() -> T) -> T {
		let _guard = self.enter();
		func()
	}

	/// Tears down the previous run, then runs `func` under this owner.
	pub fn with_cleanup<T>(&self, func: impl FnOnce() -> T) -> T {
		self.cleanup();
		self.with(func)
	}

	pub fn on_cleanup(&self, func: impl FnOnce() + 'static) {
		self.inner.borrow_mut().cleanups.push((None, Box::new(func)));
	}

	/// Registers `func` on the parent, tied to this owner: [`Owner::detach`]
	/// drops it unrun. No-op for a root.
	pub(crate) fn on_parent_cleanup(&self, func: impl FnOnce() + 'static) {
		if let Some(parent) = self.parent() {
			let id = self.id();
			parent.inner.borrow_mut().cleanups.push((Some(id), Box::new(func)));
		}
	}

	/// Removes this owner from its parent, along with the parent's callbacks
	/// registered through [`Owner::on_parent_cleanup`].
	pub fn detach(&self) {
		let Some(parent) = self.parent() else {
			return;
		};

		let id = self.id();
		let removed: Vec<_> = {
			let mut inner = parent.inner.borrow_mut();
			inner.children.retain(|child| !Rc::ptr_eq(&child.inner, &self.inner));
			let (removed, kept) = std::mem::take(&mut inner.cleanups)
				.into_iter()
				.partition(|(owner, _)| *owner == Some(id));
			inner.cleanups = kept;
			removed
		};

		tracing::trace!(owner = ?id, parent = ?parent.id(), "owner detached");
		std::mem::drop(removed);
	}

	/// Records an arena node to be released when this owner is cleaned up.
	pub fn register(&self, node: NodeId) {
		self.inner.borrow_mut().nodes.push(node);
	}

	pub fn registered_nodes(&self) -> Vec<NodeId> {
		self.inner.borrow().nodes.clone()
	}

	pub fn provide_context<T: 'static>(&self, value: T) {
		self.inner
			.borrow_mut()
			.contexts
			.insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Looks up a context on this owner, then on its ancestors.
	pub fn use_context<T: Clone + 'static>(&self) -> Option<T> {
		let mut next = Some(self.inner.clone());
		while let Some(inner) = next {
			let inner = inner.borrow();
			let found = inner
				.contexts
				.get(&TypeId::of::<T>())
				.and_then(|value| value.downcast_ref::<T>());
			if let Some(value) = found {
				return Some(value.clone());
			}
			next = inner.parent.as_ref().and_then(Weak::upgrade);
		}
		None
	}

	/// Cleans up every child, then runs this owner's callbacks in
	/// registration order.
	///
	/// Children, callbacks, contexts and registered nodes are drained, so a
	/// second call is a no-op until something new is registered.
	pub fn cleanup(&self) {
		let (id, children, cleanups, nodes) = {
			let mut inner = self.inner.borrow_mut();
			(
				inner.id,
				std::mem::take(&mut inner.children),
				std::mem::take(&mut inner.cleanups),
				std::mem::take(&mut inner.nodes),
			)
		};

		if !children.is_empty() || !cleanups.is_empty() {
			tracing::debug!(
				owner = ?id,
				children = children.len(),
				cleanups = cleanups.len(),
				"cleaning up owner"
			);
		}

		for child in children {
			child.cleanup();
		}

		for (_, cleanup) in cleanups {
			cleanup();
		}

		// TODO: release these from the arena once handles are arena-backed.
		if !nodes.is_empty() {
			tracing::trace!(owner = ?id, ?nodes, "releasing arena nodes");
		}

		let contexts = std::mem::take(&mut self.inner.borrow_mut().contexts);
		std::mem::drop(contexts);
	}
}

impl Default for Owner {
	fn default() -> Self {
		Owner::new()
	}
}

impl PartialEq for Owner {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}

impl Eq for Owner {}

impl Debug for Owner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.inner.borrow();
		f.debug_struct("Owner")
			.field("id", &inner.id)
			.field("children", &inner.children.len())
			.field("cleanups", &inner.cleanups.len())
			.finish()
	}
}

/// Restores the previous owner on drop.
#[must_use]
pub struct OwnerGuard {
	prev: Option<Owner>,
}

impl Drop for OwnerGuard {
	fn drop(&mut self) {
		Owner::replace(self.prev.take());
	}
}

/// Registers `func` on the current owner. Does nothing without one.
pub fn on_cleanup(func: impl FnOnce() + 'static) {
	match Owner::current() {
		Some(owner) => owner.on_cleanup(func),
		None => tracing::trace!("on_cleanup called without an owner"),
	}
}

/// Provides `value` on the current owner. Does nothing without one.
pub fn provide_context<T: 'static>(value: T) {
	match Owner::current() {
		Some(owner) => owner.provide_context(value),
		None => tracing::trace!("provide_context called without an owner"),
	}
}

pub fn use_context<T: Clone + 'static>() -> Option<T> {
	Owner::current().and_then(|owner| owner.use_context())
}
