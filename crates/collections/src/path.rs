//! Dotted-path navigation and mutation across nested containers.
//!
//! A path is a sequence of `.key` map segments and `[index]` array or
//! integer-map segments, e.g. `.player.inventory[2].name`. Resolution walks
//! the graph from a root node and hands the final slot to a visitor; every
//! kind of failure — bad syntax, absent key, kind mismatch — surfaces as a
//! visit of `None`, never as an error the caller has to handle.

use smallvec::SmallVec;
use thiserror::Error;

use crate::context::ObjectContext;
use crate::item::Item;
use crate::node::{StackRef, Step};

/// One parsed path element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
	/// Map key (`.name`).
	Key(String),
	/// Array position or integer-map key (`[3]`, `[-1]`).
	Index(i64),
}

/// Why a path failed to parse. Resolution swallows these; the parser is
/// exposed for callers that want to validate paths up front.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
	/// The path has no segments.
	#[error("empty path")]
	Empty,
	/// A segment started with something other than `.` or `[`.
	#[error("expected '.' or '[' at offset {0}")]
	UnexpectedChar(usize),
	/// A `.` was not followed by a key.
	#[error("empty key at offset {0}")]
	EmptyKey(usize),
	/// A `[` was never closed.
	#[error("unterminated index at offset {0}")]
	UnterminatedIndex(usize),
	/// The text between `[` and `]` is not an integer.
	#[error("invalid index at offset {0}")]
	InvalidIndex(usize),
}

type Segments = SmallVec<[PathSegment; 4]>;

/// Parses a textual path into segments.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
	parse(path).map(SmallVec::into_vec)
}

fn parse(path: &str) -> Result<Segments, PathError> {
	let bytes = path.as_bytes();
	if bytes.is_empty() {
		return Err(PathError::Empty);
	}
	let mut segments = Segments::new();
	let mut i = 0;
	while i < bytes.len() {
		match bytes[i] {
			b'.' => {
				i += 1;
				let start = i;
				while i < bytes.len() && bytes[i] != b'.' && bytes[i] != b'[' {
					i += 1;
				}
				if i == start {
					return Err(PathError::EmptyKey(start));
				}
				segments.push(PathSegment::Key(path[start..i].to_owned()));
			}
			b'[' => {
				i += 1;
				let start = i;
				if i < bytes.len() && bytes[i] == b'-' {
					i += 1;
				}
				while i < bytes.len() && bytes[i].is_ascii_digit() {
					i += 1;
				}
				if i >= bytes.len() || bytes[i] != b']' {
					return Err(PathError::UnterminatedIndex(start));
				}
				let index = path[start..i]
					.parse::<i64>()
					.map_err(|_| PathError::InvalidIndex(start))?;
				segments.push(PathSegment::Index(index));
				i += 1;
			}
			_ => return Err(PathError::UnexpectedChar(i)),
		}
	}
	Ok(segments)
}

/// Resolves `path` from `root` in read mode and visits the final slot.
///
/// The visitor receives `None` when resolution fails at any point; an absent
/// value is not the same as a slot holding [`Item::Null`]. The resolver takes
/// no ownership of traversed nodes beyond the current walk step — the root's
/// own transient-scope reference is what keeps the walk grounded.
pub fn resolve(
	ctx: &ObjectContext,
	root: &StackRef,
	path: &str,
	visitor: impl FnOnce(Option<&mut Item>),
) {
	resolve_impl(ctx, root, path, false, visitor);
}

/// Like [`resolve`], but materializes absent intermediate map keys as fresh
/// Map nodes and absent final key slots as empty items, so setters can build
/// structure as they write. Array positions are never materialized.
pub fn resolve_create(
	ctx: &ObjectContext,
	root: &StackRef,
	path: &str,
	visitor: impl FnOnce(Option<&mut Item>),
) {
	resolve_impl(ctx, root, path, true, visitor);
}

fn resolve_impl(
	ctx: &ObjectContext,
	root: &StackRef,
	path: &str,
	create_missing: bool,
	visitor: impl FnOnce(Option<&mut Item>),
) {
	let Ok(segments) = parse(path) else {
		visitor(None);
		return;
	};
	let Some((last, walk)) = segments.split_last() else {
		visitor(None);
		return;
	};
	let mut current = std::sync::Arc::clone(root.node());
	for segment in walk {
		// One node lock at a time: step reads the edge under the current
		// node's lock and returns the next node, which stays alive through
		// the parent edge we just traversed.
		let next = match current.step(segment) {
			Step::Into(next) => next,
			Step::Missing if create_missing => {
				let fresh = ctx.create_map();
				match current.adopt_missing(segment, fresh.node()) {
					Some(next) => next,
					None => {
						visitor(None);
						return;
					}
				}
			}
			Step::Missing | Step::Fail => {
				visitor(None);
				return;
			}
		};
		current = next;
	}
	current.with_slot(last, create_missing, visitor);
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn key(k: &str) -> PathSegment {
		PathSegment::Key(k.to_owned())
	}

	#[test]
	fn parses_keys_and_indices() {
		assert_eq!(
			parse_path(".player.health"),
			Ok(vec![key("player"), key("health")])
		);
		assert_eq!(
			parse_path(".items[2].name"),
			Ok(vec![key("items"), PathSegment::Index(2), key("name")])
		);
		assert_eq!(
			parse_path("[0][-1]"),
			Ok(vec![PathSegment::Index(0), PathSegment::Index(-1)])
		);
	}

	#[test]
	fn rejects_malformed_paths() {
		assert_eq!(parse_path(""), Err(PathError::Empty));
		assert_eq!(parse_path("player"), Err(PathError::UnexpectedChar(0)));
		assert_eq!(parse_path("..x"), Err(PathError::EmptyKey(1)));
		assert_eq!(parse_path(".a["), Err(PathError::UnterminatedIndex(3)));
		assert_eq!(parse_path(".a[12"), Err(PathError::UnterminatedIndex(3)));
		assert_eq!(parse_path(".a[x]"), Err(PathError::UnterminatedIndex(3)));
		assert_eq!(parse_path(".a[-]"), Err(PathError::InvalidIndex(3)));
	}

	#[test]
	fn keys_may_contain_non_ascii() {
		assert_eq!(parse_path(".héro.name"), Ok(vec![key("héro"), key("name")]));
	}
}
