//! Process-wide node registry and lifetime orchestration.
//!
//! Every node is created through an [`ObjectContext`], which tracks the live
//! set, assigns handles lazily, runs the autorelease sweeper, and
//! force-releases whatever is still alive when the context goes away.

use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slab::Slab;
use tracing::{trace, warn};

use crate::aqueue::AutoreleaseQueue;
use crate::config::ContextConfig;
use crate::handle::Handle;
use crate::node::{self, NodeKind, ObjectNode, ObjectRef, StackRef};

#[derive(Default)]
struct RegistryTables {
	/// Memory backing for every live node. Not a counted channel — nodes
	/// remove themselves at the dead transition, before their memory can go
	/// away.
	live: Slab<Arc<ObjectNode>>,
	/// Handle table; populated lazily, on first exposure.
	handles: FxHashMap<Handle, Weak<ObjectNode>>,
	next_handle: u32,
}

/// Context internals shared with nodes and the sweeper thread.
pub(crate) struct ContextShared {
	pub(crate) aqueue: AutoreleaseQueue,
	config: ContextConfig,
	registry: Mutex<RegistryTables>,
	database: Mutex<Option<ObjectRef>>,
}

impl ContextShared {
	/// Idempotently assigns the next unused non-zero handle and publishes
	/// the node in the handle table.
	pub(crate) fn assign_handle(&self, node: &Arc<ObjectNode>) -> Handle {
		let existing = node.handle();
		if !existing.is_null() {
			return existing;
		}
		let mut reg = self.registry.lock();
		// Another caller may have won the race before we took the lock.
		let existing = node.handle();
		if !existing.is_null() {
			return existing;
		}
		let handle = loop {
			reg.next_handle = reg.next_handle.wrapping_add(1).max(1);
			let candidate = Handle::from_raw(reg.next_handle);
			if !reg.handles.contains_key(&candidate) {
				break candidate;
			}
		};
		reg.handles.insert(handle, Arc::downgrade(node));
		node.set_handle(handle);
		handle
	}

	/// Removes a dying node from both tables. Called by teardown strictly
	/// after the dead transition, with no node lock held.
	pub(crate) fn unregister(&self, node: &Arc<ObjectNode>) {
		let slot = node.take_registry_slot();
		let handle = node.handle();
		let mut reg = self.registry.lock();
		if let Some(slot) = slot {
			reg.live.try_remove(slot);
		}
		if !handle.is_null() {
			reg.handles.remove(&handle);
		}
	}
}

fn sweeper_loop(shared: Weak<ContextShared>) {
	loop {
		let Some(ctx) = shared.upgrade() else {
			return;
		};
		if !ctx.aqueue.wait_tick(ctx.config.sweep_interval) {
			return;
		}
		ctx.aqueue.sweep(ctx.config.grace_period);
	}
}

/// Owner of the node registry, the autorelease queue, and its sweeper.
///
/// Dropping (or explicitly shutting down) the context force-releases every
/// remaining live node exactly once, regardless of channel state, so nothing
/// outlives it.
pub struct ObjectContext {
	shared: Arc<ContextShared>,
	sweeper: Option<JoinHandle<()>>,
}

impl ObjectContext {
	/// Creates a context with the default lifetime policy.
	pub fn new() -> Self {
		Self::with_config(ContextConfig::default())
	}

	/// Creates a context with an explicit lifetime policy.
	pub fn with_config(config: ContextConfig) -> Self {
		let shared = Arc::new(ContextShared {
			aqueue: AutoreleaseQueue::new(),
			config,
			registry: Mutex::new(RegistryTables::default()),
			database: Mutex::new(None),
		});
		let weak = Arc::downgrade(&shared);
		let sweeper = match thread::Builder::new()
			.name("coffer-aqueue".into())
			.spawn(move || sweeper_loop(weak))
		{
			Ok(handle) => Some(handle),
			Err(error) => {
				warn!(%error, "failed to spawn autorelease sweeper");
				None
			}
		};
		ObjectContext { shared, sweeper }
	}

	/// The context's lifetime policy.
	pub fn config(&self) -> &ContextConfig {
		&self.shared.config
	}

	/// Creates an array node.
	pub fn create_array(&self) -> StackRef {
		self.create(NodeKind::Array)
	}

	/// Creates a string-keyed map node.
	pub fn create_map(&self) -> StackRef {
		self.create(NodeKind::Map)
	}

	/// Creates a form-keyed map node.
	pub fn create_form_map(&self) -> StackRef {
		self.create(NodeKind::FormMap)
	}

	/// Creates an integer-keyed map node.
	pub fn create_integer_map(&self) -> StackRef {
		self.create(NodeKind::IntegerMap)
	}

	/// Creates a node of the given kind: registered, autoreleased, and
	/// handed back behind a transient-scope reference so it survives at
	/// least until the caller returns. No handle is assigned yet.
	pub fn create(&self, kind: NodeKind) -> StackRef {
		let node = ObjectNode::new(kind, Arc::downgrade(&self.shared));
		let guard = StackRef::new(&node);
		{
			let mut reg = self.shared.registry.lock();
			let slot = reg.live.insert(Arc::clone(&node));
			node.set_registry_slot(slot);
		}
		self.shared.aqueue.push(&node);
		trace!(?kind, "node created");
		guard
	}

	/// Looks a node up by handle. `None` for the null handle, unknown
	/// handles, and nodes already destroyed or mid-destruction.
	pub fn find(&self, handle: Handle) -> Option<StackRef> {
		if handle.is_null() {
			return None;
		}
		let node = {
			let reg = self.shared.registry.lock();
			reg.handles.get(&handle)?.upgrade()?
		};
		StackRef::try_new(&node)
	}

	/// Snapshot of the live nodes matching a predicate.
	///
	/// The predicate runs outside the registry lock, against the set of nodes
	/// that were live at call time; concurrent retains, releases, and tag
	/// edits do not retroactively change the returned snapshot.
	pub fn filter(&self, predicate: impl Fn(&ObjectNode) -> bool) -> Vec<StackRef> {
		let snapshot: Vec<Arc<ObjectNode>> = {
			let reg = self.shared.registry.lock();
			reg.live.iter().map(|(_, node)| Arc::clone(node)).collect()
		};
		snapshot
			.into_iter()
			.filter(|node| !node.is_dead() && predicate(node.as_ref()))
			.filter_map(|node| StackRef::try_new(&node))
			.collect()
	}

	/// Number of currently live nodes.
	pub fn live_count(&self) -> usize {
		self.shared.registry.lock().live.len()
	}

	/// Number of nodes currently parked in the autorelease queue.
	pub fn autorelease_count(&self) -> usize {
		self.shared.aqueue.len()
	}

	/// Releases every queued autorelease grant immediately, regardless of
	/// age. Maintenance hook for hosts that want deterministic reclamation
	/// at a quiescent point; the periodic sweep does this on its own.
	pub fn flush_autorelease(&self) -> usize {
		self.shared.aqueue.sweep(std::time::Duration::ZERO)
	}

	/// The context's root map, created on first use and owned by the context
	/// itself. Holds long-lived well-known state such as the temp pools.
	pub fn database(&self) -> StackRef {
		let mut db = self.shared.database.lock();
		match db.as_ref() {
			Some(root) => StackRef::new(root.node()),
			None => {
				let fresh = self.create_map();
				*db = Some(fresh.to_edge());
				fresh
			}
		}
	}

	/// Stops the sweeper and force-releases every remaining live node,
	/// exactly once each, regardless of channel state. Idempotent; also runs
	/// on drop.
	pub fn shutdown(&mut self) {
		let parked = self.shared.aqueue.stop();
		if let Some(handle) = self.sweeper.take() {
			let _ = handle.join();
		}
		let root = self.shared.database.lock().take();
		let nodes: Vec<Arc<ObjectNode>> = {
			let mut reg = self.shared.registry.lock();
			reg.handles.clear();
			reg.live.drain().collect()
		};
		if !nodes.is_empty() {
			warn!(count = nodes.len(), "context shutdown force-releasing live nodes");
		}
		for node in &nodes {
			node::destroy(node);
		}
		// Dead nodes ignore these releases; the drops just settle memory.
		drop(root);
		drop(parked);
	}
}

impl Default for ObjectContext {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for ObjectContext {
	fn drop(&mut self) {
		self.shutdown();
	}
}
