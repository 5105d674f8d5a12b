//! Handle-based surface consumed by a host scripting binding.
//!
//! Everything here is total: bad handles, bad paths, and kind mismatches
//! degrade to a default-valued result instead of failing, so nothing ever
//! propagates across the scripting boundary as an error. The binding layer
//! is expected to hold one [`ObjectContext`] and translate the host calling
//! convention into these functions, keeping each call's transient-scope
//! references alive for exactly one script call.

use coffer_collections::{
	Channel, FormId, Handle, Item, ItemValue, NodeKind, ObjectContext, ObjectRef, resolve,
	resolve_create,
};
use tracing::debug;

/// Name of the database map holding the temp pools.
const TEMP_POOLS_KEY: &str = "__tempPools";

/// Creates a new array and returns its handle.
pub fn create_array(ctx: &ObjectContext) -> Handle {
	ctx.create_array().uid()
}

/// Creates a new string-keyed map and returns its handle.
pub fn create_map(ctx: &ObjectContext) -> Handle {
	ctx.create_map().uid()
}

/// Creates a new form-keyed map and returns its handle.
pub fn create_form_map(ctx: &ObjectContext) -> Handle {
	ctx.create_form_map().uid()
}

/// Creates a new integer-keyed map and returns its handle.
pub fn create_integer_map(ctx: &ObjectContext) -> Handle {
	ctx.create_integer_map().uid()
}

/// Retains the object on the script channel, stamping (or clearing) its
/// grouping tag, and returns the object so the call chains.
///
/// The retainer owns one release. A tagged object can later be released in
/// bulk through [`release_objects_with_tag`] even if its handle was lost.
pub fn retain(ctx: &ObjectContext, handle: Handle, tag: Option<&str>) -> Handle {
	match ctx.find(handle) {
		Some(obj) => {
			obj.retain(Channel::Script);
			obj.set_tag(tag);
			handle
		}
		None => Handle::NULL,
	}
}

/// Releases one script-channel reference and returns the null handle, so a
/// caller can release and clear a variable in one statement.
pub fn release(ctx: &ObjectContext, handle: Handle) -> Handle {
	if let Some(obj) = ctx.find(handle) {
		obj.release(Channel::Script);
	}
	Handle::NULL
}

/// Releases `previous` and retains `next` with `tag`, in one call. A no-op
/// when both are the same object. Returns `next`.
pub fn release_and_retain(
	ctx: &ObjectContext,
	previous: Handle,
	next: Handle,
	tag: Option<&str>,
) -> Handle {
	if previous == next {
		return next;
	}
	release(ctx, previous);
	retain(ctx, next, tag)
}

/// Drives the script channel of every node tagged `tag` to zero, no matter
/// how many retains each one accumulated. Cleanup for mods that lost their
/// handles.
pub fn release_objects_with_tag(ctx: &ObjectContext, tag: &str) {
	if tag.is_empty() {
		return;
	}
	let objects = ctx.filter(|node| node.has_tag(tag));
	debug!(tag, count = objects.len(), "bulk tag release");
	for obj in &objects {
		while obj.channel_count(Channel::Script) > 0 {
			obj.release(Channel::Script);
		}
	}
}

/// Whether the handle refers to a live object.
pub fn is_exists(ctx: &ObjectContext, handle: Handle) -> bool {
	ctx.find(handle).is_some()
}

/// Whether the handle refers to a live array.
pub fn is_array(ctx: &ObjectContext, handle: Handle) -> bool {
	has_kind(ctx, handle, NodeKind::Array)
}

/// Whether the handle refers to a live string-keyed map.
pub fn is_map(ctx: &ObjectContext, handle: Handle) -> bool {
	has_kind(ctx, handle, NodeKind::Map)
}

/// Whether the handle refers to a live form-keyed map.
pub fn is_form_map(ctx: &ObjectContext, handle: Handle) -> bool {
	has_kind(ctx, handle, NodeKind::FormMap)
}

/// Whether the handle refers to a live integer-keyed map.
pub fn is_integer_map(ctx: &ObjectContext, handle: Handle) -> bool {
	has_kind(ctx, handle, NodeKind::IntegerMap)
}

fn has_kind(ctx: &ObjectContext, handle: Handle, kind: NodeKind) -> bool {
	ctx.find(handle).is_some_and(|obj| obj.kind() == kind)
}

/// Number of items in the container, 0 for anything else.
pub fn count(ctx: &ObjectContext, handle: Handle) -> i32 {
	ctx.find(handle).map_or(0, |obj| obj.count())
}

/// Whether the container has no items. True for dead or unknown handles.
pub fn is_empty(ctx: &ObjectContext, handle: Handle) -> bool {
	count(ctx, handle) == 0
}

/// Removes all items from the container.
pub fn clear(ctx: &ObjectContext, handle: Handle) {
	if let Some(obj) = ctx.find(handle) {
		obj.clear();
	}
}

/// Whether the container can resolve the path to any value.
pub fn has_path(ctx: &ObjectContext, handle: Handle, path: &str) -> bool {
	solved_value_type(ctx, handle, path) != 0
}

/// Wire ordinal of the value at the path, 0 when resolution fails.
pub fn solved_value_type(ctx: &ObjectContext, handle: Handle, path: &str) -> i32 {
	let Some(obj) = ctx.find(handle) else {
		return 0;
	};
	let mut out = 0;
	resolve(ctx, &obj, path, |slot| {
		if let Some(item) = slot {
			out = i32::from(item.which());
		}
	});
	out
}

/// Reads the value at the path as `T`, substituting `default` when the path
/// does not resolve or the value is of the wrong kind.
pub fn solve<T: ItemValue>(ctx: &ObjectContext, handle: Handle, path: &str, default: T) -> T {
	let Some(obj) = ctx.find(handle) else {
		return default;
	};
	let mut out = default;
	resolve(ctx, &obj, path, |slot| {
		if let Some(value) = slot.and_then(|item| T::read(item)) {
			out = value;
		}
	});
	out
}

/// Reads the object at the path, exposing its handle.
pub fn solve_obj(ctx: &ObjectContext, handle: Handle, path: &str) -> Handle {
	solve(ctx, handle, path, Handle::NULL)
}

/// Reads the integer at the path.
pub fn solve_int(ctx: &ObjectContext, handle: Handle, path: &str, default: i32) -> i32 {
	solve(ctx, handle, path, default)
}

/// Reads the float at the path.
pub fn solve_flt(ctx: &ObjectContext, handle: Handle, path: &str, default: f64) -> f64 {
	solve(ctx, handle, path, default)
}

/// Reads the string at the path.
pub fn solve_str(ctx: &ObjectContext, handle: Handle, path: &str, default: &str) -> String {
	solve(ctx, handle, path, default.to_owned())
}

/// Reads the form reference at the path.
pub fn solve_form(ctx: &ObjectContext, handle: Handle, path: &str, default: FormId) -> FormId {
	solve(ctx, handle, path, default)
}

/// Writes `value` at the path, optionally materializing missing map keys
/// along the way. Returns whether the write landed.
pub fn solve_setter<T: Into<Item>>(
	ctx: &ObjectContext,
	handle: Handle,
	path: &str,
	value: T,
	create_missing: bool,
) -> bool {
	let Some(obj) = ctx.find(handle) else {
		return false;
	};
	let item = value.into();
	let mut done = false;
	let mut displaced = None;
	let run = |slot: Option<&mut Item>| {
		if let Some(slot) = slot {
			displaced = Some(std::mem::replace(slot, item));
			done = true;
		}
	};
	if create_missing {
		resolve_create(ctx, &obj, path, run);
	} else {
		resolve(ctx, &obj, path, run);
	}
	// The displaced value may own a subtree that loops back through the node
	// just written; it must not be released under that node's lock.
	drop(displaced);
	done
}

/// Writes an explicit none at the path.
pub fn solve_null_setter(
	ctx: &ObjectContext,
	handle: Handle,
	path: &str,
	create_missing: bool,
) -> bool {
	solve_setter(ctx, handle, path, Item::Null, create_missing)
}

/// Stores the object behind `value` at the path. Fails when `value` is not
/// a live object.
pub fn solve_obj_setter(
	ctx: &ObjectContext,
	handle: Handle,
	path: &str,
	value: Handle,
	create_missing: bool,
) -> bool {
	let Some(target) = ctx.find(value) else {
		return false;
	};
	solve_setter(ctx, handle, path, Item::from(target.to_edge()), create_missing)
}

/// Parks the object in the named pool under the context database, giving it
/// an owner until [`clean_pool`] runs. Returns the object so the call
/// chains.
pub fn add_to_pool(ctx: &ObjectContext, handle: Handle, pool: &str) -> Handle {
	let Some(obj) = ctx.find(handle) else {
		return Handle::NULL;
	};
	if pool.is_empty() {
		return handle;
	}
	let path = format!(".{TEMP_POOLS_KEY}.{pool}");
	let db = ctx.database();
	let mut location = None;
	let mut displaced = None;
	resolve_create(ctx, &db, &path, |slot| {
		if let Some(item) = slot {
			match item.as_object() {
				Some(r) if r.node().kind() == NodeKind::Array => {
					location = Some(std::sync::Arc::clone(r.node()));
				}
				_ => {
					let fresh = ctx.create_array();
					displaced = Some(std::mem::replace(item, Item::from(fresh.to_edge())));
					location = Some(std::sync::Arc::clone(fresh.node()));
				}
			}
		}
	});
	drop(displaced);
	match location {
		Some(pool_node) => {
			pool_node.push(Item::from(ObjectRef::new(obj.node())));
			handle
		}
		None => Handle::NULL,
	}
}

/// Empties the named pool, dropping the ownership it held over its members.
pub fn clean_pool(ctx: &ObjectContext, pool: &str) {
	if pool.is_empty() {
		return;
	}
	let db = ctx.database();
	let pools_item = db.get_key(TEMP_POOLS_KEY);
	if let Some(pools) = pools_item.as_ref().and_then(Item::as_object) {
		pools.node().erase_key(pool);
	}
}
