//! Lifetime properties: channel-sum destruction, grace window, prolongation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use coffer_collections::{Channel, ContextConfig, ObjectContext, ObjectRef};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Context with millisecond-scale autorelease policy.
fn quick_ctx(grace_ms: u64, sweep_ms: u64) -> ObjectContext {
	ObjectContext::with_config(ContextConfig {
		grace_period: Duration::from_millis(grace_ms),
		sweep_interval: Duration::from_millis(sweep_ms),
	})
}

/// Context whose sweeper effectively never runs; expiry only via
/// `flush_autorelease`, so tests control time.
fn frozen_ctx() -> ObjectContext {
	ObjectContext::with_config(ContextConfig {
		grace_period: Duration::from_secs(3600),
		sweep_interval: Duration::from_secs(3600),
	})
}

#[test]
fn fresh_node_survives_then_expires() {
	let ctx = quick_ctx(50, 10);
	let handle = {
		let obj = ctx.create_map();
		obj.public_id()
	};
	// Unretained, but inside the grace window.
	assert!(ctx.find(handle).is_some());
	thread::sleep(Duration::from_millis(250));
	assert!(ctx.find(handle).is_none());
	assert_eq!(ctx.live_count(), 0);
}

#[test]
fn script_retain_outlives_the_grace_window() {
	let ctx = quick_ctx(30, 10);
	let handle = {
		let obj = ctx.create_map();
		obj.retain(Channel::Script);
		obj.public_id()
	};
	thread::sleep(Duration::from_millis(150));
	let found = ctx.find(handle).expect("script channel keeps the node alive");
	found.release(Channel::Script);
	drop(found);
	assert!(ctx.find(handle).is_none());
}

#[test]
fn uid_reenters_the_autorelease_queue() {
	let ctx = quick_ctx(40, 10);
	let handle = {
		let obj = ctx.create_map();
		obj.retain(Channel::Script);
		obj.uid()
	};
	thread::sleep(Duration::from_millis(150));
	// The original grant expired; the node lives through the script channel
	// and is no longer queued.
	assert_eq!(ctx.autorelease_count(), 0);

	let found = ctx.find(handle).expect("still script-retained");
	assert_eq!(found.uid(), handle);
	assert_eq!(ctx.autorelease_count(), 1);

	// Hand the node entirely to the fresh grant, then let it lapse.
	found.release(Channel::Script);
	drop(found);
	assert!(ctx.find(handle).is_some());
	thread::sleep(Duration::from_millis(150));
	assert!(ctx.find(handle).is_none());
}

#[test]
fn repeated_uid_calls_hold_a_single_queue_grant() {
	let ctx = frozen_ctx();
	let obj = ctx.create_map();
	let handle = obj.uid();
	assert_eq!(obj.uid(), handle);
	assert_eq!(ctx.autorelease_count(), 1);

	ctx.flush_autorelease();
	assert_eq!(ctx.autorelease_count(), 0);
	assert_eq!(obj.uid(), handle);
	assert_eq!(obj.uid(), handle);
	assert_eq!(ctx.autorelease_count(), 1);
}

#[test]
fn flush_autorelease_expires_grants_immediately() {
	let ctx = frozen_ctx();
	let handle = {
		let obj = ctx.create_map();
		obj.public_id()
	};
	assert!(ctx.find(handle).is_some());
	assert_eq!(ctx.flush_autorelease(), 1);
	assert!(ctx.find(handle).is_none());
}

#[test]
fn stack_reference_alone_keeps_the_node_alive() {
	let ctx = frozen_ctx();
	let obj = ctx.create_map();
	let handle = obj.public_id();
	ctx.flush_autorelease();
	// Only the transient-scope reference remains.
	assert_eq!(obj.ref_total(), 1);
	assert!(ctx.find(handle).is_some());
	drop(obj);
	assert!(ctx.find(handle).is_none());
}

#[test]
fn shutdown_force_releases_retained_nodes() {
	let mut ctx = frozen_ctx();
	let obj = ctx.create_map();
	obj.retain(Channel::Script);
	obj.retain(Channel::Script);
	ctx.shutdown();
	assert!(obj.is_dead());
	assert_eq!(ctx.live_count(), 0);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "drained")]
fn releasing_a_drained_channel_asserts_in_debug_builds() {
	let ctx = frozen_ctx();
	let obj = ctx.create_map();
	obj.release(Channel::Script);
}

proptest! {
	/// For any interleaving of channel traffic, the node is resolvable iff
	/// the channel sum is positive, and destruction happens exactly at the
	/// >0 to <=0 transition.
	#[test]
	fn destruction_tracks_the_channel_sum(ops in prop::collection::vec(0u8..5, 1..40)) {
		let ctx = frozen_ctx();
		let (node, handle) = {
			let obj = ctx.create_map();
			(Arc::clone(obj.node()), obj.public_id())
		};
		// Model: stack ref dropped above, so the node starts with just the
		// autorelease grant.
		let mut script = 0i32;
		let mut aqueue = 1i32;
		let mut edges: Vec<ObjectRef> = Vec::new();

		for op in ops {
			if script + aqueue + edges.len() as i32 <= 0 {
				break;
			}
			match op {
				0 => {
					node.retain(Channel::Script);
					script += 1;
				}
				1 => {
					if script > 0 {
						node.release(Channel::Script);
						script -= 1;
					}
				}
				2 => edges.push(ObjectRef::new(&node)),
				3 => drop(edges.pop()),
				_ => {
					ctx.flush_autorelease();
					aqueue = 0;
				}
			}
			let alive = script + aqueue + edges.len() as i32 > 0;
			prop_assert_eq!(ctx.find(handle).is_some(), alive);
			prop_assert_eq!(node.is_dead(), !alive);
		}
	}
}
