/// Freshness of a node's cached value.
///
/// Ordered by urgency: `Clean < Check < Dirty`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
pub enum State {
	/// The cached value is up to date.
	#[default]
	Clean,
	/// Some transitive source may have changed. Sources must be pulled
	/// before the cached value can be trusted.
	Check,
	/// A direct source changed. The node must recompute.
	Dirty,
}

impl State {
	/// Raises urgency to `to`, never lowers it.
	///
	/// Returns `true` if the state actually changed.
	pub fn escalate(&mut self, to: State) -> bool {
		if to > *self {
			*self = to;
			true
		} else {
			false
		}
	}

	pub fn is_clean(self) -> bool {
		self == State::Clean
	}
}
