//! Reference-counted container graph shared between scripting callers and
//! long-lived internal owners, without a tracing garbage collector.
//!
//! Nodes (arrays, string/form/integer maps) hold heterogeneous [`Item`]
//! values, including edges to other nodes — cycles included. Lifetime is
//! driven by four independent ownership channels summed at every release;
//! fresh nodes get a time-boxed autorelease grace window so callers have
//! time to claim them, and dotted paths navigate or build nested structure
//! without exposing the graph walk.

/// Time-boxed holding area for freshly created nodes.
mod aqueue;
/// Lifetime policy configuration.
pub mod config;
/// Node registry, handle table, and sweeper ownership.
pub mod context;
/// Handle and form identifier types.
pub mod handle;
/// Tagged values stored in containers.
pub mod item;
/// Container nodes, ownership channels, and teardown.
pub mod node;
/// Dotted-path resolution.
pub mod path;

pub use config::ContextConfig;
pub use context::ObjectContext;
pub use handle::{FormId, Handle};
pub use item::{Item, ItemValue};
pub use node::{Channel, NodeKey, NodeKind, ObjectNode, ObjectRef, StackRef};
pub use path::{PathError, PathSegment, parse_path, resolve, resolve_create};
