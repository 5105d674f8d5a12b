//! Reference-counted container nodes.
//!
//! Every container is an [`ObjectNode`] with four independent ownership
//! channels. The node is destroyed exactly once, when a release drives the
//! channel sum to zero; teardown detaches the child collection under the node
//! lock and releases the collected edges outside it, through an iterative
//! work-list, so cyclic graphs come down without lock reentrancy.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{error, trace};

use crate::context::ContextShared;
use crate::handle::{FormId, Handle};
use crate::item::Item;
use crate::path::PathSegment;

/// Container variant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
	/// Integer-indexed sequence.
	Array,
	/// String-keyed map; keys compare case-insensitively.
	Map,
	/// Form-keyed map.
	FormMap,
	/// Integer-keyed map.
	IntegerMap,
}

/// One of the four independent ownership counters on a node.
///
/// Channels are released independently by their distinct owners; destruction
/// is decided on the sum, never on a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
	/// Held by internal code owning the node directly, including the object
	/// edges stored inside other containers.
	Internal,
	/// Held by the scripting caller via explicit retain/release.
	Script,
	/// Held for the duration of a single call's stack frame.
	Stack,
	/// Held by the autorelease queue while the node awaits claiming.
	Aqueue,
}

/// Case-insensitive map key, preserving the spelling it was stored with.
#[derive(Debug, Clone, Eq)]
pub(crate) struct MapKey(Box<str>);

impl MapKey {
	pub(crate) fn new(key: &str) -> Self {
		MapKey(key.into())
	}

	pub(crate) fn as_str(&self) -> &str {
		&self.0
	}
}

impl PartialEq for MapKey {
	fn eq(&self, other: &Self) -> bool {
		self.0.eq_ignore_ascii_case(&other.0)
	}
}

impl Hash for MapKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		for b in self.0.bytes() {
			state.write_u8(b.to_ascii_lowercase());
		}
		state.write_u8(0xff);
	}
}

/// Child collection payload, one variant per [`NodeKind`].
pub(crate) enum NodeData {
	Array(Vec<Item>),
	Map(FxHashMap<MapKey, Item>),
	FormMap(FxHashMap<FormId, Item>),
	IntegerMap(FxHashMap<i32, Item>),
}

impl NodeData {
	fn empty(kind: NodeKind) -> Self {
		match kind {
			NodeKind::Array => NodeData::Array(Vec::new()),
			NodeKind::Map => NodeData::Map(FxHashMap::default()),
			NodeKind::FormMap => NodeData::FormMap(FxHashMap::default()),
			NodeKind::IntegerMap => NodeData::IntegerMap(FxHashMap::default()),
		}
	}

	fn len(&self) -> usize {
		match self {
			NodeData::Array(v) => v.len(),
			NodeData::Map(m) => m.len(),
			NodeData::FormMap(m) => m.len(),
			NodeData::IntegerMap(m) => m.len(),
		}
	}

	/// Consumes the collection, extracting every outgoing object edge without
	/// touching its counter. The caller owns the corresponding internal
	/// references and must release them.
	fn drain_edges(self, edges: &mut SmallVec<[Arc<ObjectNode>; 8]>) {
		let mut take = |item: Item| {
			if let Item::Object(r) = item
				&& let Some(node) = r.into_arc()
			{
				edges.push(node);
			}
		};
		match self {
			NodeData::Array(v) => v.into_iter().for_each(&mut take),
			NodeData::Map(m) => m.into_values().for_each(&mut take),
			NodeData::FormMap(m) => m.into_values().for_each(&mut take),
			NodeData::IntegerMap(m) => m.into_values().for_each(&mut take),
		}
	}
}

struct NodeState {
	data: NodeData,
	tag: Option<Box<str>>,
}

/// Key-or-index of a child slot, as seen by [`ObjectNode::visit_children`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKey<'a> {
	/// Map key.
	Key(&'a str),
	/// Array position.
	Index(usize),
	/// Integer-map key.
	Int(i32),
	/// Form-map key.
	Form(FormId),
}

/// Outcome of walking one intermediate path segment.
pub(crate) enum Step {
	/// Segment resolved to a nested container.
	Into(Arc<ObjectNode>),
	/// Slot absent; may be materialized in create-missing mode.
	Missing,
	/// Kind mismatch or non-container value; resolution fails.
	Fail,
}

const UNREGISTERED: usize = usize::MAX;

/// A reference-counted container node.
///
/// Counters are lock-free atomics; the per-node mutex guards only the child
/// collection and tag. The registry lock is never taken while a node lock is
/// held by registry code — teardown takes them strictly in sequence.
pub struct ObjectNode {
	kind: NodeKind,
	me: Weak<ObjectNode>,
	context: Weak<ContextShared>,
	id: AtomicU32,
	slot: AtomicUsize,
	internal_refs: AtomicI32,
	script_refs: AtomicI32,
	stack_refs: AtomicI32,
	aqueue_refs: AtomicI32,
	dead: AtomicBool,
	state: Mutex<NodeState>,
}

impl ObjectNode {
	pub(crate) fn new(kind: NodeKind, context: Weak<ContextShared>) -> Arc<Self> {
		Arc::new_cyclic(|me| ObjectNode {
			kind,
			me: me.clone(),
			context,
			id: AtomicU32::new(0),
			slot: AtomicUsize::new(UNREGISTERED),
			internal_refs: AtomicI32::new(0),
			script_refs: AtomicI32::new(0),
			stack_refs: AtomicI32::new(0),
			aqueue_refs: AtomicI32::new(0),
			dead: AtomicBool::new(false),
			state: Mutex::new(NodeState {
				data: NodeData::empty(kind),
				tag: None,
			}),
		})
	}

	/// Container variant of this node.
	pub fn kind(&self) -> NodeKind {
		self.kind
	}

	/// Currently assigned handle, [`Handle::NULL`] if never exposed.
	pub fn handle(&self) -> Handle {
		Handle::from_raw(self.id.load(Ordering::Relaxed))
	}

	/// Assigns (or returns) the handle and prolongs the node's lifetime by
	/// re-entering the autorelease queue, giving the receiving caller a grace
	/// window to claim ownership.
	pub fn uid(&self) -> Handle {
		let handle = self.ensure_handle();
		self.prolong_lifetime();
		handle
	}

	/// Assigns (or returns) the handle without prolonging the lifetime.
	pub fn public_id(&self) -> Handle {
		self.ensure_handle()
	}

	fn ensure_handle(&self) -> Handle {
		let current = self.handle();
		if !current.is_null() {
			return current;
		}
		match (self.context.upgrade(), self.me.upgrade()) {
			(Some(ctx), Some(me)) => ctx.assign_handle(&me),
			_ => Handle::NULL,
		}
	}

	pub(crate) fn set_handle(&self, handle: Handle) {
		self.id.store(handle.raw(), Ordering::Release);
	}

	pub(crate) fn registry_slot(&self) -> usize {
		self.slot.load(Ordering::Acquire)
	}

	pub(crate) fn set_registry_slot(&self, slot: usize) {
		self.slot.store(slot, Ordering::Release);
	}

	pub(crate) fn take_registry_slot(&self) -> Option<usize> {
		let slot = self.slot.swap(UNREGISTERED, Ordering::AcqRel);
		(slot != UNREGISTERED).then_some(slot)
	}

	fn counter(&self, channel: Channel) -> &AtomicI32 {
		match channel {
			Channel::Internal => &self.internal_refs,
			Channel::Script => &self.script_refs,
			Channel::Stack => &self.stack_refs,
			Channel::Aqueue => &self.aqueue_refs,
		}
	}

	/// Current count of one channel.
	pub fn channel_count(&self, channel: Channel) -> i32 {
		self.counter(channel).load(Ordering::Acquire)
	}

	/// Sum of all four channels.
	pub fn ref_total(&self) -> i32 {
		self.internal_refs.load(Ordering::Acquire)
			+ self.script_refs.load(Ordering::Acquire)
			+ self.stack_refs.load(Ordering::Acquire)
			+ self.aqueue_refs.load(Ordering::Acquire)
	}

	/// True once destruction has started; a dead node never comes back.
	pub fn is_dead(&self) -> bool {
		self.dead.load(Ordering::Acquire)
	}

	/// Increments one ownership channel.
	///
	/// Contract: the node must be live. Only live nodes are ever handed out
	/// by the registry, so this cannot race destruction for well-behaved
	/// callers.
	pub fn retain(&self, channel: Channel) {
		debug_assert!(!self.is_dead(), "retain on a destroyed node");
		self.counter(channel).fetch_add(1, Ordering::AcqRel);
	}

	/// Decrements one ownership channel; the release that drives the channel
	/// sum to zero destroys the node, exactly once.
	///
	/// Releasing a drained channel is a contract violation: asserted in debug
	/// builds, a logged no-op otherwise.
	pub fn release(&self, channel: Channel) {
		if self.is_dead() {
			return;
		}
		let prev = self.counter(channel).fetch_sub(1, Ordering::AcqRel);
		if prev <= 0 {
			debug_assert!(self.is_dead(), "release on a drained {channel:?} channel");
			error!(handle = self.handle().raw(), ?channel, "refcount underflow");
			self.counter(channel).fetch_add(1, Ordering::AcqRel);
			return;
		}
		if self.ref_total() <= 0
			&& let Some(me) = self.me.upgrade()
		{
			destroy(&me);
		}
	}

	/// Re-enters the autorelease queue when not already queued.
	///
	/// The grant is claimed with a compare-exchange on the aqueue counter, so
	/// concurrent callers cannot double-enqueue: whoever moves the counter off
	/// zero owns the single queue entry.
	pub(crate) fn prolong_lifetime(&self) {
		if self.is_dead() {
			return;
		}
		if self
			.aqueue_refs
			.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return;
		}
		match (self.context.upgrade(), self.me.upgrade()) {
			(Some(ctx), Some(me)) => ctx.aqueue.push_granted(&me),
			_ => {
				self.aqueue_refs.fetch_sub(1, Ordering::AcqRel);
			}
		}
	}

	/// Number of children.
	pub fn count(&self) -> i32 {
		self.state.lock().data.len() as i32
	}

	/// Removes all children, releasing their object edges outside the lock.
	pub fn clear(&self) {
		let data = {
			let mut state = self.state.lock();
			mem::replace(&mut state.data, NodeData::empty(self.kind))
		};
		drop(data);
	}

	/// Sets or clears the grouping tag.
	pub fn set_tag(&self, tag: Option<&str>) {
		self.state.lock().tag = tag.map(Into::into);
	}

	/// Returns the grouping tag, if any.
	pub fn tag(&self) -> Option<String> {
		self.state.lock().tag.as_deref().map(str::to_owned)
	}

	/// Case-insensitive tag comparison; untagged nodes match nothing.
	pub fn has_tag(&self, tag: &str) -> bool {
		self.state
			.lock()
			.tag
			.as_deref()
			.is_some_and(|t| t.eq_ignore_ascii_case(tag))
	}

	/// Reads a map entry. `None` for absent keys and non-map nodes.
	pub fn get_key(&self, key: &str) -> Option<Item> {
		match &self.state.lock().data {
			NodeData::Map(m) => m.get(&MapKey::new(key)).cloned(),
			_ => None,
		}
	}

	/// Writes a map entry. `false` on non-map nodes.
	pub fn set_key(&self, key: &str, value: Item) -> bool {
		let (ok, old) = {
			let mut state = self.state.lock();
			match &mut state.data {
				NodeData::Map(m) => (true, m.insert(MapKey::new(key), value)),
				_ => (false, None),
			}
		};
		// The displaced item may hold the last reference to a subtree; its
		// release must not run under this node's lock.
		drop(old);
		ok
	}

	/// Removes a map entry, returning whether it existed.
	pub fn erase_key(&self, key: &str) -> bool {
		let old = {
			let mut state = self.state.lock();
			match &mut state.data {
				NodeData::Map(m) => m.remove(&MapKey::new(key)),
				_ => None,
			}
		};
		let existed = old.is_some();
		drop(old);
		existed
	}

	/// Reads by integer position (arrays, negative counts from the end) or
	/// integer key (integer maps).
	pub fn get_at(&self, index: i64) -> Option<Item> {
		match &self.state.lock().data {
			NodeData::Array(v) => norm_index(index, v.len()).map(|i| v[i].clone()),
			NodeData::IntegerMap(m) => {
				let key = i32::try_from(index).ok()?;
				m.get(&key).cloned()
			}
			_ => None,
		}
	}

	/// Writes by integer position or integer key. Array writes require an
	/// existing slot; integer-map writes insert.
	pub fn set_at(&self, index: i64, value: Item) -> bool {
		let (ok, old) = {
			let mut state = self.state.lock();
			match &mut state.data {
				NodeData::Array(v) => match norm_index(index, v.len()) {
					Some(i) => (true, Some(mem::replace(&mut v[i], value))),
					None => (false, None),
				},
				NodeData::IntegerMap(m) => match i32::try_from(index) {
					Ok(key) => (true, m.insert(key, value)),
					Err(_) => (false, None),
				},
				_ => (false, None),
			}
		};
		drop(old);
		ok
	}

	/// Appends to an array. `false` on other kinds.
	pub fn push(&self, value: Item) -> bool {
		let mut state = self.state.lock();
		match &mut state.data {
			NodeData::Array(v) => {
				v.push(value);
				true
			}
			_ => false,
		}
	}

	/// Reads a form-map entry.
	pub fn get_form(&self, key: FormId) -> Option<Item> {
		match &self.state.lock().data {
			NodeData::FormMap(m) => m.get(&key).cloned(),
			_ => None,
		}
	}

	/// Writes a form-map entry. `false` on other kinds.
	pub fn set_form(&self, key: FormId, value: Item) -> bool {
		let (ok, old) = {
			let mut state = self.state.lock();
			match &mut state.data {
				NodeData::FormMap(m) => (true, m.insert(key, value)),
				_ => (false, None),
			}
		};
		drop(old);
		ok
	}

	/// Removes a form-map entry, returning whether it existed.
	pub fn erase_form(&self, key: FormId) -> bool {
		let old = {
			let mut state = self.state.lock();
			match &mut state.data {
				NodeData::FormMap(m) => m.remove(&key),
				_ => None,
			}
		};
		let existed = old.is_some();
		drop(old);
		existed
	}

	/// Depth-one read of the children as (key-or-index, item) pairs.
	///
	/// The visitor runs under the node lock and must not touch other nodes'
	/// locked state.
	pub fn visit_children(&self, mut visitor: impl FnMut(NodeKey<'_>, &Item)) {
		let state = self.state.lock();
		match &state.data {
			NodeData::Array(v) => {
				for (i, item) in v.iter().enumerate() {
					visitor(NodeKey::Index(i), item);
				}
			}
			NodeData::Map(m) => {
				for (k, item) in m {
					visitor(NodeKey::Key(k.as_str()), item);
				}
			}
			NodeData::FormMap(m) => {
				for (k, item) in m {
					visitor(NodeKey::Form(*k), item);
				}
			}
			NodeData::IntegerMap(m) => {
				for (k, item) in m {
					visitor(NodeKey::Int(*k), item);
				}
			}
		}
	}

	/// Enumerates outgoing object edges without taking ownership.
	///
	/// The visitor runs under the node lock.
	pub fn visit_referenced_objects(&self, mut visitor: impl FnMut(&Arc<ObjectNode>)) {
		self.visit_children(|_, item| {
			if let Item::Object(r) = item {
				visitor(r.node());
			}
		});
	}

	/// Takes the whole child collection, returning the outgoing edges whose
	/// internal references the caller now owns. The collection is cleared
	/// under the lock; nothing is released here.
	pub(crate) fn detach_children(&self) -> SmallVec<[Arc<ObjectNode>; 8]> {
		let data = {
			let mut state = self.state.lock();
			mem::replace(&mut state.data, NodeData::empty(self.kind))
		};
		let mut edges = SmallVec::new();
		data.drain_edges(&mut edges);
		edges
	}

	/// Walks one intermediate path segment.
	pub(crate) fn step(&self, segment: &PathSegment) -> Step {
		let state = self.state.lock();
		let slot = match (&state.data, segment) {
			(NodeData::Map(m), PathSegment::Key(k)) => m.get(&MapKey::new(k)),
			(NodeData::Array(v), PathSegment::Index(i)) => {
				match norm_index(*i, v.len()) {
					Some(ix) => Some(&v[ix]),
					None => return Step::Missing,
				}
			}
			(NodeData::IntegerMap(m), PathSegment::Index(i)) => match i32::try_from(*i) {
				Ok(key) => m.get(&key),
				Err(_) => return Step::Fail,
			},
			_ => return Step::Fail,
		};
		match slot {
			Some(Item::Object(r)) => Step::Into(Arc::clone(r.node())),
			Some(_) => Step::Fail,
			None => Step::Missing,
		}
	}

	/// Links a freshly created container into an absent key slot, rechecking
	/// under the lock. Returns the container now occupying the slot, which
	/// may be another thread's if it raced us there, or `None` when the slot
	/// cannot be materialized.
	pub(crate) fn adopt_missing(
		&self,
		segment: &PathSegment,
		fresh: &Arc<ObjectNode>,
	) -> Option<Arc<ObjectNode>> {
		let mut state = self.state.lock();
		let slot = match (&mut state.data, segment) {
			(NodeData::Map(m), PathSegment::Key(k)) => m.entry(MapKey::new(k)).or_default(),
			(NodeData::IntegerMap(m), PathSegment::Index(i)) => {
				let key = i32::try_from(*i).ok()?;
				m.entry(key).or_default()
			}
			// Array positions are never materialized.
			_ => return None,
		};
		match slot {
			Item::Object(r) => Some(Arc::clone(r.node())),
			Item::Empty => {
				*slot = Item::Object(ObjectRef::new(fresh));
				Some(Arc::clone(fresh))
			}
			_ => None,
		}
	}

	/// Locks the node and hands the slot for the final path segment to the
	/// visitor; absent or mismatched slots surface as `None`.
	pub(crate) fn with_slot<R>(
		&self,
		segment: &PathSegment,
		create_missing: bool,
		visitor: impl FnOnce(Option<&mut Item>) -> R,
	) -> R {
		let mut state = self.state.lock();
		let slot = match (&mut state.data, segment) {
			(NodeData::Map(m), PathSegment::Key(k)) => {
				if create_missing {
					Some(m.entry(MapKey::new(k)).or_default())
				} else {
					m.get_mut(&MapKey::new(k))
				}
			}
			(NodeData::Array(v), PathSegment::Index(i)) => match norm_index(*i, v.len()) {
				Some(ix) => v.get_mut(ix),
				None => None,
			},
			(NodeData::IntegerMap(m), PathSegment::Index(i)) => match i32::try_from(*i) {
				Ok(key) => {
					if create_missing {
						Some(m.entry(key).or_default())
					} else {
						m.get_mut(&key)
					}
				}
				Err(_) => None,
			},
			_ => None,
		};
		visitor(slot)
	}
}

impl fmt::Debug for ObjectNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObjectNode")
			.field("kind", &self.kind)
			.field("handle", &self.handle())
			.field("refs", &self.ref_total())
			.field("dead", &self.is_dead())
			.finish_non_exhaustive()
	}
}

fn norm_index(index: i64, len: usize) -> Option<usize> {
	let len = len as i64;
	let abs = if index < 0 { len + index } else { index };
	(0..len).contains(&abs).then_some(abs as usize)
}

/// Destroys a node whose channel sum reached zero, plus everything it
/// transitively owned that has no owners left.
///
/// Two-phase per node: detach the children under the node lock, then release
/// the collected edges with no lock held. The explicit work-list bounds stack
/// depth on deep or cyclic graphs, and the dead-flag CAS makes the transition
/// fire exactly once even when releases race on different channels.
pub(crate) fn destroy(node: &Arc<ObjectNode>) {
	if node
		.dead
		.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
		.is_err()
	{
		return;
	}
	let mut worklist: SmallVec<[Arc<ObjectNode>; 8]> = SmallVec::new();
	worklist.push(Arc::clone(node));
	while let Some(current) = worklist.pop() {
		let edges = current.detach_children();
		if let Some(ctx) = current.context.upgrade() {
			ctx.unregister(&current);
		}
		trace!(handle = current.handle().raw(), kind = ?current.kind(), "node destroyed");
		for edge in edges {
			if edge.is_dead() {
				continue;
			}
			let prev = edge.internal_refs.fetch_sub(1, Ordering::AcqRel);
			debug_assert!(prev > 0, "internal channel underflow during teardown");
			if edge.ref_total() <= 0
				&& edge
					.dead
					.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
					.is_ok()
			{
				worklist.push(edge);
			}
		}
	}
}

/// Owning internal-channel edge to a node.
///
/// Construction and clone retain the internal channel; drop releases it,
/// which may destroy the target. Stored inside [`Item::Object`] slots.
pub struct ObjectRef {
	node: Option<Arc<ObjectNode>>,
}

impl ObjectRef {
	/// Takes a new internal reference on a live node.
	pub fn new(node: &Arc<ObjectNode>) -> Self {
		node.retain(Channel::Internal);
		ObjectRef {
			node: Some(Arc::clone(node)),
		}
	}

	/// The referenced node.
	pub fn node(&self) -> &Arc<ObjectNode> {
		match &self.node {
			Some(node) => node,
			None => unreachable!("edge emptied only on drop"),
		}
	}

	/// Extracts the node without releasing the internal reference, which the
	/// caller then owns. Used by teardown to decouple counter bookkeeping
	/// from drop order.
	pub(crate) fn into_arc(mut self) -> Option<Arc<ObjectNode>> {
		self.node.take()
	}
}

impl Clone for ObjectRef {
	fn clone(&self) -> Self {
		ObjectRef::new(self.node())
	}
}

impl Drop for ObjectRef {
	fn drop(&mut self) {
		if let Some(node) = self.node.take() {
			node.release(Channel::Internal);
		}
	}
}

impl PartialEq for ObjectRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(self.node(), other.node())
	}
}

impl fmt::Debug for ObjectRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("ObjectRef").field(&self.node().handle()).finish()
	}
}

/// Transient-scope reference, held for the duration of one call frame.
///
/// Released on drop, so the stack channel comes back down on every exit path,
/// including unwinds. This is what the registry hands out.
pub struct StackRef {
	node: Option<Arc<ObjectNode>>,
}

impl StackRef {
	/// Takes a new stack reference on a live node.
	pub fn new(node: &Arc<ObjectNode>) -> Self {
		node.retain(Channel::Stack);
		StackRef {
			node: Some(Arc::clone(node)),
		}
	}

	/// Takes a stack reference unless teardown has already committed.
	///
	/// The increment lands before the dead re-check, so a node observed live
	/// here cannot have been destroyed by a release that ran entirely earlier;
	/// a destruction racing in between is caught by the re-check and the
	/// reference is refused.
	pub(crate) fn try_new(node: &Arc<ObjectNode>) -> Option<Self> {
		node.stack_refs.fetch_add(1, Ordering::AcqRel);
		if node.is_dead() {
			node.stack_refs.fetch_sub(1, Ordering::AcqRel);
			return None;
		}
		Some(StackRef {
			node: Some(Arc::clone(node)),
		})
	}

	/// The referenced node.
	pub fn node(&self) -> &Arc<ObjectNode> {
		match &self.node {
			Some(node) => node,
			None => unreachable!("stack ref emptied only on drop"),
		}
	}

	/// Converts into an owning internal edge, suitable for storing in an
	/// [`Item`].
	pub fn to_edge(&self) -> ObjectRef {
		ObjectRef::new(self.node())
	}
}

impl Clone for StackRef {
	fn clone(&self) -> Self {
		StackRef::new(self.node())
	}
}

impl Drop for StackRef {
	fn drop(&mut self) {
		if let Some(node) = self.node.take() {
			node.release(Channel::Stack);
		}
	}
}

impl Deref for StackRef {
	type Target = ObjectNode;

	fn deref(&self) -> &ObjectNode {
		self.node()
	}
}

impl fmt::Debug for StackRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("StackRef").field(self.node()).finish()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn map_keys_compare_case_insensitively() {
		let mut map: FxHashMap<MapKey, i32> = FxHashMap::default();
		map.insert(MapKey::new("Player"), 1);
		assert_eq!(map.get(&MapKey::new("player")), Some(&1));
		assert_eq!(map.get(&MapKey::new("PLAYER")), Some(&1));
		assert_eq!(map.get(&MapKey::new("players")), None);
		// Spelling of the first insert is preserved.
		assert_eq!(map.keys().next().map(MapKey::as_str), Some("Player"));
	}

	#[test]
	fn dead_nodes_refuse_stack_references() {
		let node = ObjectNode::new(NodeKind::Map, Weak::new());
		let live = StackRef::try_new(&node).expect("fresh node grants a stack reference");
		// Dropping the only reference drives the sum to zero.
		drop(live);
		assert!(node.is_dead());
		assert!(StackRef::try_new(&node).is_none());
	}

	#[test]
	fn negative_indices_count_from_the_end() {
		assert_eq!(norm_index(0, 3), Some(0));
		assert_eq!(norm_index(2, 3), Some(2));
		assert_eq!(norm_index(3, 3), None);
		assert_eq!(norm_index(-1, 3), Some(2));
		assert_eq!(norm_index(-3, 3), Some(0));
		assert_eq!(norm_index(-4, 3), None);
		assert_eq!(norm_index(0, 0), None);
	}
}
