//! Units of work and their wiring.

use crate::context::WorkflowContext;
use crate::error::{Error, Result};
use crate::property::{Configurable, PropertySet};
use crate::resource::{Container, Resource};
use crate::store::ResourceStore;
use std::sync::{Arc, RwLock};

/// A shared handle to a node's output container.
///
/// Output containers are shared, not copied, so explicit wiring done at
/// definition time still observes resources the upstream node produces
/// later. The container itself persists for the node's lifetime and is
/// never auto-cleared between runs.
#[derive(Debug, Clone, Default)]
pub struct ContainerHandle {
    inner: Arc<RwLock<Container>>,
}

impl ContainerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource.
    pub fn add(&self, resource: Resource) {
        self.write().add(resource);
    }

    /// Append a copy of another container's resources.
    pub fn merge(&self, other: &Container) {
        self.write().merge(other);
    }

    /// Matching resources, cloned out of the shared container.
    pub fn find(&self, pattern: &str) -> Vec<Resource> {
        self.read().find(pattern).into_iter().cloned().collect()
    }

    /// A point-in-time copy of the whole container.
    pub fn snapshot(&self) -> Container {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Container> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Container> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// The state every node carries: identity, property schema, one optional
/// upstream link, and the output container.
#[derive(Debug)]
pub struct NodeBase {
    id: String,
    props: PropertySet,
    input: Option<ContainerHandle>,
    output: ContainerHandle,
}

impl NodeBase {
    pub fn new(id: &str, props: PropertySet) -> Self {
        Self {
            id: id.to_string(),
            props,
            input: None,
            output: ContainerHandle::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn props(&self) -> &PropertySet {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertySet {
        &mut self.props
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }
}

/// A configured unit of work in the pipeline.
///
/// Implementations hold a [`NodeBase`] and expose it through
/// [`base`](Self::base)/[`base_mut`](Self::base_mut); the wiring accessors
/// are provided. `run` executes exactly once per workflow execution,
/// synchronously and to completion — a node that deliberately blocks
/// (a delay node sleeping the calling thread) is intended behavior.
/// Nodes implement no retry logic; they complete or they fail.
pub trait Node: Configurable + Send {
    fn base(&self) -> &NodeBase;
    fn base_mut(&mut self) -> &mut NodeBase;

    /// Execute the node against the shared store.
    ///
    /// `Ok(false)` and `Err` both signal failure to the executor. By
    /// contract the executor has already verified that no required
    /// property is still missing, so a failing node cannot have made
    /// partial side effects on that account.
    fn run(&mut self, ctx: &mut WorkflowContext, store: &mut ResourceStore)
        -> anyhow::Result<bool>;

    fn id(&self) -> &str {
        self.base().id()
    }

    /// Wire the upstream link.
    fn set_input(&mut self, input: ContainerHandle) {
        self.base_mut().input = Some(input);
    }

    /// The upstream output container; fails when nothing is wired.
    fn input(&self) -> Result<ContainerHandle> {
        self.base()
            .input
            .clone()
            .ok_or_else(|| Error::InputMissing(self.base().id.clone()))
    }

    /// This node's output container handle.
    fn output(&self) -> ContainerHandle {
        self.base().output.clone()
    }
}

impl std::fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node").field("id", &self.id()).finish()
    }
}

/// A node defined by a closure, for embedders that do not need a full
/// property schema.
pub struct FnNode<F> {
    base: NodeBase,
    body: F,
}

impl<F> FnNode<F>
where
    F: FnMut(&mut WorkflowContext, &mut ResourceStore) -> anyhow::Result<bool> + Send,
{
    pub fn new(id: &str, body: F) -> Self {
        Self {
            base: NodeBase::new(id, PropertySet::new(id)),
            body,
        }
    }
}

impl<F> FnNode<F>
where
    F: FnMut(&mut WorkflowContext, &mut ResourceStore) -> anyhow::Result<bool> + Send + 'static,
{
    pub fn boxed(id: &str, body: F) -> Box<dyn Node> {
        Box::new(Self::new(id, body))
    }
}

impl<F> Configurable for FnNode<F>
where
    F: FnMut(&mut WorkflowContext, &mut ResourceStore) -> anyhow::Result<bool> + Send,
{
    fn properties(&self) -> &PropertySet {
        self.base.props()
    }

    fn properties_mut(&mut self) -> &mut PropertySet {
        self.base.props_mut()
    }
}

impl<F> Node for FnNode<F>
where
    F: FnMut(&mut WorkflowContext, &mut ResourceStore) -> anyhow::Result<bool> + Send,
{
    fn base(&self) -> &NodeBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut NodeBase {
        &mut self.base
    }

    fn run(
        &mut self,
        ctx: &mut WorkflowContext,
        store: &mut ResourceStore,
    ) -> anyhow::Result<bool> {
        (self.body)(ctx, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Passthrough {
        base: NodeBase,
    }

    impl Configurable for Passthrough {
        fn properties(&self) -> &PropertySet {
            self.base.props()
        }
        fn properties_mut(&mut self) -> &mut PropertySet {
            self.base.props_mut()
        }
    }

    impl Node for Passthrough {
        fn base(&self) -> &NodeBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut NodeBase {
            &mut self.base
        }
        fn run(
            &mut self,
            _ctx: &mut WorkflowContext,
            _store: &mut ResourceStore,
        ) -> anyhow::Result<bool> {
            let upstream = self.input()?.snapshot();
            self.output().merge(&upstream);
            Ok(true)
        }
    }

    #[test]
    fn test_input_missing_error() {
        let node = Passthrough {
            base: NodeBase::new("p", PropertySet::new("p")),
        };
        assert!(matches!(node.input(), Err(Error::InputMissing(_))));
    }

    #[test]
    fn test_shared_output_observed_through_early_wiring() {
        let upstream = ContainerHandle::new();
        let mut node = Passthrough {
            base: NodeBase::new("p", PropertySet::new("p")),
        };
        // wired before the upstream produced anything
        node.set_input(upstream.clone());
        upstream.add(Resource::new("X", "late", json!(1)));
        assert_eq!(node.input().unwrap().find("*").len(), 1);
    }

    #[test]
    fn test_output_persists_across_runs() {
        let upstream = ContainerHandle::new();
        upstream.add(Resource::new("X", "one", json!(1)));
        let mut node = Passthrough {
            base: NodeBase::new("p", PropertySet::new("p")),
        };
        node.set_input(upstream.clone());
        let mut ctx = WorkflowContext::new();
        let mut store = ResourceStore::new();
        node.run(&mut ctx, &mut store).unwrap();
        node.run(&mut ctx, &mut store).unwrap();
        // not auto-cleared between runs
        assert_eq!(node.output().len(), 2);
    }
}
