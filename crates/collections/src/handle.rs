//! Identifier types for nodes and external form references.

use std::fmt;

/// Stable integer identifier for a registered node.
///
/// Handles are assigned lazily, on first external exposure via
/// [`ObjectNode::uid`](crate::node::ObjectNode::uid) — a node that is never
/// shown to a caller never gets one. `0` is the null handle and never refers
/// to a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(u32);

impl Handle {
	/// The "no object" handle.
	pub const NULL: Handle = Handle(0);

	/// Wraps a raw handle value.
	pub const fn from_raw(raw: u32) -> Self {
		Handle(raw)
	}

	/// Returns the raw integer value.
	pub const fn raw(self) -> u32 {
		self.0
	}

	/// Returns true for the null handle.
	pub const fn is_null(self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Opaque reference to a form owned by the host engine.
///
/// The core never resolves these; they are carried through items and form-map
/// keys bit-for-bit for the host binding and serialization layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormId(pub u32);

impl fmt::Display for FormId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{:08x}", self.0)
	}
}
