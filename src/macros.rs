pub use enclose::*;

/// Builds a [`Memo`](crate::Memo), cloning the listed handles into the
/// closure. `prev` binds the previously cached value.
///
/// ```
/// use signal_graph::{memo, Signal};
///
/// let count = Signal::new(2);
/// let double = memo!((count) _prev => count.get() * 2);
/// assert_eq!(double.get(), 4);
/// ```
#[macro_export]
macro_rules! memo {
	(( $($d_tt:tt)* ) $prev:tt => $($b:tt)*) => {
		$crate::Memo::new($crate::macros::enclose!(($( $d_tt )*) move |$prev: Option<&_>| { $($b)* }))
	};
	($prev:tt => $($b:tt)*) => {
		$crate::Memo::new(move |$prev: Option<&_>| { $($b)* })
	};
}

/// Builds an [`Effect`](crate::Effect), cloning the listed handles into the
/// closure.
#[macro_export]
macro_rules! effect {
	(( $($d_tt:tt)* ) => $($b:tt)*) => {
		$crate::Effect::new($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
	};
	($($b:tt)*) => {
		$crate::Effect::new(move || { $($b)* })
	};
}
