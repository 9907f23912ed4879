//! A fine-grained reactive dependency graph.
//!
//! Sources ([`Signal`], [`Memo`]) record the subscribers that read them while
//! an [`Observer`] is installed. A write pushes `Dirty`/`Check` states
//! outward; a read pulls freshness inward through
//! [`ReactiveNode::update_if_necessary`], so a subscriber reachable through
//! several paths recomputes once, and not at all if nothing it read actually
//! changed. [`Owner`]s scope the lifetime of computations and their cleanup.

pub mod macros;

mod any;
mod batch;
mod effect;
mod memo;
mod node;
mod observer;
mod owner;
mod sets;
mod signal;
mod state;

pub use any::{AnySource, AnySubscriber, NodeId};
pub use batch::{batch, in_batch};
pub use effect::Effect;
pub use memo::Memo;
pub use node::{ReactiveNode, Source, Subscriber, ToAnySource, ToAnySubscriber, Track};
pub use observer::{untrack, Observer, ObserverGuard};
pub use owner::{on_cleanup, provide_context, use_context, Owner, OwnerGuard};
pub use sets::{SourceSet, SubscriberSet};
pub use signal::Signal;
pub use state::State;
