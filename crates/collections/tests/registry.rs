//! Handle assignment, lookup, and tag-filtered snapshots.

use std::time::Duration;

use coffer_collections::{Channel, ContextConfig, Handle, ObjectContext};
use pretty_assertions::assert_eq;

fn frozen_ctx() -> ObjectContext {
	ObjectContext::with_config(ContextConfig {
		grace_period: Duration::from_secs(3600),
		sweep_interval: Duration::from_secs(3600),
	})
}

#[test]
fn null_handle_never_resolves() {
	let ctx = frozen_ctx();
	assert!(ctx.find(Handle::NULL).is_none());
	assert!(ctx.find(Handle::from_raw(12345)).is_none());
}

#[test]
fn handles_are_lazy_unique_and_idempotent() {
	let ctx = frozen_ctx();
	let a = ctx.create_map();
	let b = ctx.create_array();
	// Never exposed, never assigned.
	assert!(a.handle().is_null());

	let ha = a.public_id();
	let hb = b.public_id();
	assert!(!ha.is_null());
	assert_ne!(ha, hb);
	assert_eq!(a.public_id(), ha);
	assert_eq!(a.uid(), ha);
}

#[test]
fn find_returns_the_registered_node() {
	let ctx = frozen_ctx();
	let a = ctx.create_integer_map();
	let ha = a.public_id();
	let found = ctx.find(ha).expect("live node resolves");
	assert!(std::sync::Arc::ptr_eq(found.node(), a.node()));
}

#[test]
fn filter_matches_tags_at_call_time() {
	let ctx = frozen_ctx();
	let a = ctx.create_map();
	let b = ctx.create_map();
	let c = ctx.create_array();
	a.set_tag(Some("ModA"));
	b.set_tag(Some("ModA"));
	c.set_tag(Some("ModB"));

	let snapshot = ctx.filter(|node| node.has_tag("moda"));
	assert_eq!(snapshot.len(), 2);

	// Tag edits after the fact do not retroactively change the snapshot,
	// and the snapshot's own stack references keep its nodes usable.
	a.set_tag(None);
	assert_eq!(snapshot.len(), 2);
	for obj in &snapshot {
		obj.retain(Channel::Script);
		obj.release(Channel::Script);
	}
}

#[test]
fn destroyed_nodes_drop_out_of_lookup_and_filter() {
	let ctx = frozen_ctx();
	let handle = {
		let obj = ctx.create_map();
		obj.set_tag(Some("gone"));
		obj.public_id()
	};
	ctx.flush_autorelease();
	assert!(ctx.find(handle).is_none());
	assert!(ctx.filter(|node| node.has_tag("gone")).is_empty());
	assert_eq!(ctx.live_count(), 0);
}

#[test]
fn database_root_is_created_once_and_owned_by_the_context() {
	let ctx = frozen_ctx();
	let db = ctx.database();
	let handle = db.public_id();
	assert!(std::sync::Arc::ptr_eq(ctx.database().node(), db.node()));
	drop(db);
	ctx.flush_autorelease();
	// No caller holds it; the context itself does.
	assert!(ctx.find(handle).is_some());
}
