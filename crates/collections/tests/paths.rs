//! Path resolution over nested containers.

use std::time::Duration;

use coffer_collections::{
	ContextConfig, Item, ObjectContext, StackRef, resolve, resolve_create,
};
use pretty_assertions::assert_eq;

fn frozen_ctx() -> ObjectContext {
	ObjectContext::with_config(ContextConfig {
		grace_period: Duration::from_secs(3600),
		sweep_interval: Duration::from_secs(3600),
	})
}

/// `{a: {b: 10}}`
fn sample(ctx: &ObjectContext) -> StackRef {
	let root = ctx.create_map();
	let a = ctx.create_map();
	assert!(a.set_key("b", Item::Int(10)));
	assert!(root.set_key("a", Item::from(a.to_edge())));
	root
}

fn read(ctx: &ObjectContext, root: &StackRef, path: &str) -> Option<Item> {
	let mut out = None;
	resolve(ctx, root, path, |slot| out = slot.map(|item| item.clone()));
	out
}

#[test]
fn reads_nested_map_values() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	assert_eq!(read(&ctx, &root, ".a.b"), Some(Item::Int(10)));
}

#[test]
fn absent_keys_resolve_to_no_slot() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	assert_eq!(read(&ctx, &root, ".a.c"), None);
	assert_eq!(read(&ctx, &root, ".missing.b"), None);
}

#[test]
fn no_slot_is_distinct_from_an_explicit_none() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	assert!(root.set_key("n", Item::Null));
	assert_eq!(read(&ctx, &root, ".n"), Some(Item::Null));
	assert_eq!(read(&ctx, &root, ".m"), None);
}

#[test]
fn create_missing_writes_into_existing_structure() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	resolve_create(&ctx, &root, ".a.c", |slot| {
		*slot.expect("create mode materializes the slot") = Item::Int(5);
	});
	assert_eq!(read(&ctx, &root, ".a.b"), Some(Item::Int(10)));
	assert_eq!(read(&ctx, &root, ".a.c"), Some(Item::Int(5)));
}

#[test]
fn create_missing_builds_intermediate_maps() {
	let ctx = frozen_ctx();
	let root = ctx.create_map();
	resolve_create(&ctx, &root, ".x.y.z", |slot| {
		*slot.expect("intermediates materialized") = Item::from("deep");
	});
	ctx.flush_autorelease();
	// Created intermediates are owned through the graph, not the queue.
	assert_eq!(read(&ctx, &root, ".x.y.z"), Some(Item::from("deep")));
}

#[test]
fn read_mode_never_creates() {
	let ctx = frozen_ctx();
	let root = ctx.create_map();
	assert_eq!(read(&ctx, &root, ".x.y"), None);
	assert_eq!(root.count(), 0);
}

#[test]
fn kind_mismatches_fail_silently() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	// Index syntax against maps, key syntax against arrays.
	assert_eq!(read(&ctx, &root, "[0]"), None);
	assert_eq!(read(&ctx, &root, ".a[0]"), None);
	let arr = ctx.create_array();
	assert!(arr.push(Item::Int(1)));
	assert!(root.set_key("arr", Item::from(arr.to_edge())));
	assert_eq!(read(&ctx, &root, ".arr.k"), None);
	// Scalar in the middle of a path.
	assert_eq!(read(&ctx, &root, ".a.b.c"), None);
}

#[test]
fn indexes_arrays_and_integer_maps() {
	let ctx = frozen_ctx();
	let root = ctx.create_map();
	let arr = ctx.create_array();
	for v in [1, 2, 3] {
		assert!(arr.push(Item::Int(v)));
	}
	let im = ctx.create_integer_map();
	assert!(im.set_at(7, Item::from("seven")));
	assert!(root.set_key("arr", Item::from(arr.to_edge())));
	assert!(root.set_key("im", Item::from(im.to_edge())));

	assert_eq!(read(&ctx, &root, ".arr[1]"), Some(Item::Int(2)));
	assert_eq!(read(&ctx, &root, ".arr[-1]"), Some(Item::Int(3)));
	assert_eq!(read(&ctx, &root, ".arr[5]"), None);
	assert_eq!(read(&ctx, &root, ".im[7]"), Some(Item::from("seven")));
	assert_eq!(read(&ctx, &root, ".im[8]"), None);
}

#[test]
fn array_positions_are_never_materialized() {
	let ctx = frozen_ctx();
	let root = ctx.create_map();
	let arr = ctx.create_array();
	assert!(root.set_key("arr", Item::from(arr.to_edge())));
	let mut visited_slot = false;
	resolve_create(&ctx, &root, ".arr[0].x", |slot| visited_slot = slot.is_some());
	assert!(!visited_slot);
	assert_eq!(arr.count(), 0);
}

#[test]
fn map_keys_resolve_case_insensitively() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	assert_eq!(read(&ctx, &root, ".A.B"), Some(Item::Int(10)));
}

#[test]
fn malformed_paths_resolve_to_no_slot() {
	let ctx = frozen_ctx();
	let root = sample(&ctx);
	for path in ["", "a.b", ".a..b", ".a[", ".a[1x]"] {
		assert_eq!(read(&ctx, &root, path), None, "path {path:?}");
	}
}
