//! # pipework
//!
//! Node-based workflow engine with a prefix-partitioned resource store.
//!
//! An ordered pipeline of configurable nodes reads and produces
//! addressable resources in a shared store; `{token}` placeholders in
//! configuration strings resolve against local variables and store
//! queries.
//!
//! ## Quick Start
//!
//! ```rust
//! use pipework::{FnNode, Resource, StringInterpolator, Workflow};
//! use serde_json::json;
//!
//! let report = Workflow::new("hello")
//!     .add(FnNode::boxed("produce", |_ctx, store| {
//!         store.register("X", "TextResource")?;
//!         store.add(Resource::new("X", "greeting", json!("World")));
//!         Ok(true)
//!     }))
//!     .add(FnNode::boxed("greet", |_ctx, store| {
//!         let text = StringInterpolator::new().interpolate("Hello {X:greeting}", store);
//!         println!("{text}");
//!         Ok(true)
//!     }))
//!     .run()?;
//!
//! assert!(report.ok);
//! # Ok::<(), pipework::Error>(())
//! ```
//!
//! ## Persisted records
//!
//! Pipelines load from version-gated records through an explicit factory
//! registry — no reflection:
//!
//! ```yaml
//! version: 1
//! name: hello
//! nodes:
//!   - node_class: pipework.nodes.Produce
//!   - node_class: pipework.nodes.Greet
//!     properties:
//!       template: "Hello {X:greeting}"
//! ```

mod branch;
mod context;
mod error;
mod event;
mod executor;
mod interpolate;
mod node;
mod property;
mod registry;
mod resource;
mod store;
mod workflow;

pub use branch::Branch;
pub use context::{BranchHandle, WorkflowContext};
pub use error::{Error, Result};
pub use event::{Subscribers, WorkflowEvent};
pub use executor::{RunReport, RunState, WorkflowExecutor};
pub use interpolate::StringInterpolator;
pub use node::{ContainerHandle, FnNode, Node, NodeBase};
pub use property::{
    wire_class, wire_regex, Configurable, Kind, Property, PropertySet, Slot, WIRE_MARKER,
};
pub use registry::{NodeRecord, NodeRegistry, WorkflowRecord, FORMAT_VERSION};
pub use resource::{Container, Pattern, Resource};
pub use store::{QueryResult, ResourceStore};
pub use workflow::{Workflow, WorkflowBuilder};

/// Re-export common types
pub use serde_json::Value;
