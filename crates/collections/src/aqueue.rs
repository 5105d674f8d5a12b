//! Time-boxed holding area for freshly created, unowned nodes.
//!
//! A node straight out of a factory call has no owner; without a grace
//! window it would be destroyed before the caller could claim it. The queue
//! owns each fresh node through the aqueue channel for one grace period,
//! then lets go — a one-shot grant, not a renewable lease. A caller that
//! retained the node in the meantime keeps it alive through its own channel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::node::{Channel, ObjectNode};

struct QueueEntry {
	node: Arc<ObjectNode>,
	pushed_at: Instant,
}

struct QueueInner {
	entries: VecDeque<QueueEntry>,
	stopped: bool,
}

/// FIFO of (node, enqueue time) pairs swept by the context's sweeper thread.
///
/// The queue lock guards only the entry list; channel traffic on the nodes
/// themselves stays on the per-node atomics, so sweeping never blocks
/// unrelated retains or releases.
pub(crate) struct AutoreleaseQueue {
	inner: Mutex<QueueInner>,
	cond: Condvar,
}

impl AutoreleaseQueue {
	pub(crate) fn new() -> Self {
		AutoreleaseQueue {
			inner: Mutex::new(QueueInner {
				entries: VecDeque::new(),
				stopped: false,
			}),
			cond: Condvar::new(),
		}
	}

	/// Grants the node one aqueue reference and queues it for the grace
	/// window.
	pub(crate) fn push(&self, node: &Arc<ObjectNode>) {
		node.retain(Channel::Aqueue);
		self.push_granted(node);
	}

	/// Queues a node whose aqueue grant the caller already took. After a
	/// stop, the grant is handed straight back.
	pub(crate) fn push_granted(&self, node: &Arc<ObjectNode>) {
		let entry = QueueEntry {
			node: Arc::clone(node),
			pushed_at: Instant::now(),
		};
		{
			let mut inner = self.inner.lock();
			if !inner.stopped {
				inner.entries.push_back(entry);
				trace!(handle = node.handle().raw(), queued = inner.entries.len(), "autoreleased");
				return;
			}
		}
		entry.node.release(Channel::Aqueue);
	}

	/// Releases every entry older than `grace`, in enqueue order. Returns
	/// the number of entries released. Releases run with the queue unlocked.
	pub(crate) fn sweep(&self, grace: Duration) -> usize {
		let now = Instant::now();
		let expired: Vec<Arc<ObjectNode>> = {
			let mut inner = self.inner.lock();
			let mut out = Vec::new();
			while let Some(front) = inner.entries.front() {
				if now.duration_since(front.pushed_at) < grace {
					break;
				}
				if let Some(entry) = inner.entries.pop_front() {
					out.push(entry.node);
				}
			}
			out
		};
		let released = expired.len();
		for node in expired {
			node.release(Channel::Aqueue);
		}
		if released > 0 {
			trace!(released, "autorelease sweep");
		}
		released
	}

	/// Number of queued entries.
	pub(crate) fn len(&self) -> usize {
		self.inner.lock().entries.len()
	}

	/// Blocks the sweeper until the next cadence tick or a stop, whichever
	/// comes first. Returns false once stopped.
	pub(crate) fn wait_tick(&self, interval: Duration) -> bool {
		let mut inner = self.inner.lock();
		if inner.stopped {
			return false;
		}
		let _ = self.cond.wait_for(&mut inner, interval);
		!inner.stopped
	}

	/// Stops accepting entries, wakes the sweeper, and hands the remaining
	/// entries back so the caller can settle them after joining the sweeper.
	pub(crate) fn stop(&self) -> Vec<Arc<ObjectNode>> {
		let drained: Vec<Arc<ObjectNode>> = {
			let mut inner = self.inner.lock();
			inner.stopped = true;
			inner.entries.drain(..).map(|e| e.node).collect()
		};
		self.cond.notify_all();
		drained
	}
}
