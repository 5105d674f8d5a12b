//! Tagged values stored inside container nodes.

use crate::handle::{FormId, Handle};
use crate::node::ObjectRef;

/// A single value slot inside a container node.
///
/// The wire ordinal returned by [`Item::which`] is part of the serialized
/// format and must stay stable: 0 empty, 1 none, 2 int, 3 float, 4 form,
/// 5 object, 6 string.
///
/// An [`Item::Object`] holds a strong ownership edge (internal channel) to
/// another node; this is how containers nest and how cycles arise.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Item {
	/// No value was ever stored.
	#[default]
	Empty,
	/// An explicitly stored "none" value, distinct from an absent slot.
	Null,
	/// 32-bit signed integer.
	Int(i32),
	/// Floating-point number.
	Float(f64),
	/// External form reference.
	Form(FormId),
	/// Owning edge to another node.
	Object(ObjectRef),
	/// UTF-8 string.
	Str(String),
}

impl Item {
	/// Returns the wire tag ordinal of this value.
	pub fn which(&self) -> u8 {
		match self {
			Item::Empty => 0,
			Item::Null => 1,
			Item::Int(_) => 2,
			Item::Float(_) => 3,
			Item::Form(_) => 4,
			Item::Object(_) => 5,
			Item::Str(_) => 6,
		}
	}

	/// Returns true if no value was ever stored.
	pub fn is_empty(&self) -> bool {
		matches!(self, Item::Empty)
	}

	/// Reads as an integer; floats truncate, everything else is absent.
	pub fn as_int(&self) -> Option<i32> {
		match self {
			Item::Int(v) => Some(*v),
			Item::Float(v) => Some(*v as i32),
			_ => None,
		}
	}

	/// Reads as a float; integers widen, everything else is absent.
	pub fn as_float(&self) -> Option<f64> {
		match self {
			Item::Float(v) => Some(*v),
			Item::Int(v) => Some(f64::from(*v)),
			_ => None,
		}
	}

	/// Reads as a string slice.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Item::Str(s) => Some(s),
			_ => None,
		}
	}

	/// Reads as a form reference.
	pub fn as_form(&self) -> Option<FormId> {
		match self {
			Item::Form(id) => Some(*id),
			_ => None,
		}
	}

	/// Reads as an object edge without taking ownership.
	pub fn as_object(&self) -> Option<&ObjectRef> {
		match self {
			Item::Object(r) => Some(r),
			_ => None,
		}
	}
}

impl From<i32> for Item {
	fn from(v: i32) -> Self {
		Item::Int(v)
	}
}

impl From<f64> for Item {
	fn from(v: f64) -> Self {
		Item::Float(v)
	}
}

impl From<FormId> for Item {
	fn from(v: FormId) -> Self {
		Item::Form(v)
	}
}

impl From<ObjectRef> for Item {
	fn from(v: ObjectRef) -> Self {
		Item::Object(v)
	}
}

impl From<&str> for Item {
	fn from(v: &str) -> Self {
		Item::Str(v.to_owned())
	}
}

impl From<String> for Item {
	fn from(v: String) -> Self {
		Item::Str(v)
	}
}

/// Typed reads applied by path getters to a resolved slot.
///
/// A read returns `None` for an absent or wrong-kind value; callers
/// substitute their own default, so the getter surface stays total.
pub trait ItemValue: Sized {
	/// Interprets the item as this kind, applying the fixed coercions.
	fn read(item: &Item) -> Option<Self>;
}

impl ItemValue for i32 {
	fn read(item: &Item) -> Option<Self> {
		item.as_int()
	}
}

impl ItemValue for f64 {
	fn read(item: &Item) -> Option<Self> {
		item.as_float()
	}
}

impl ItemValue for String {
	fn read(item: &Item) -> Option<Self> {
		item.as_str().map(str::to_owned)
	}
}

impl ItemValue for FormId {
	fn read(item: &Item) -> Option<Self> {
		item.as_form()
	}
}

impl ItemValue for Handle {
	/// Reading an object slot exposes the node, assigning its handle and
	/// prolonging its lifetime so the caller has time to claim it.
	fn read(item: &Item) -> Option<Self> {
		item.as_object().map(|r| r.node().uid())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn wire_ordinals_are_stable() {
		assert_eq!(Item::Empty.which(), 0);
		assert_eq!(Item::Null.which(), 1);
		assert_eq!(Item::Int(1).which(), 2);
		assert_eq!(Item::Float(1.0).which(), 3);
		assert_eq!(Item::Form(FormId(7)).which(), 4);
		assert_eq!(Item::Str("x".into()).which(), 6);
	}

	#[test]
	fn numeric_kinds_coerce_into_each_other() {
		assert_eq!(Item::Float(2.9).as_int(), Some(2));
		assert_eq!(Item::Int(3).as_float(), Some(3.0));
		assert_eq!(Item::Str("3".into()).as_int(), None);
		assert_eq!(Item::Null.as_float(), None);
	}

	#[test]
	fn wrong_kind_reads_are_absent_not_defaulted() {
		assert_eq!(<String as ItemValue>::read(&Item::Int(5)), None);
		assert_eq!(<i32 as ItemValue>::read(&Item::Str("5".into())), None);
		assert_eq!(<FormId as ItemValue>::read(&Item::Empty), None);
	}
}
