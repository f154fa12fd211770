//! Branches: detached sub-pipelines over a store snapshot.

use crate::context::{BranchHandle, WorkflowContext};
use crate::executor::WorkflowExecutor;
use crate::node::{Node, NodeBase};
use crate::property::{Configurable, PropertySet};
use crate::store::ResourceStore;
use std::thread;

/// A node whose work is an independently-scheduled sub-pipeline.
///
/// At spawn time the branch takes a value copy of the parent store and of
/// the context's variable table; mutations on either side are invisible
/// to the other afterwards. The thread is fire-and-forget by default —
/// the parent never waits for it — but the spawned handle is tracked on
/// the context so [`WorkflowContext::join_branches`] can opt in to
/// joining. Detached branches may interleave external effects (stdout,
/// filesystem) with the parent's later steps; that is documented
/// behavior.
///
/// `run` consumes the sub-pipeline: a branch executes exactly once per
/// workflow execution.
pub struct Branch {
    base: NodeBase,
    nodes: Vec<Box<dyn Node>>,
}

impl Branch {
    pub fn new(id: &str) -> Self {
        Self {
            base: NodeBase::new(id, PropertySet::new(id)),
            nodes: Vec::new(),
        }
    }

    /// Append a node to the sub-pipeline.
    pub fn add(mut self, node: Box<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Configurable for Branch {
    fn properties(&self) -> &PropertySet {
        self.base.props()
    }

    fn properties_mut(&mut self) -> &mut PropertySet {
        self.base.props_mut()
    }
}

impl Node for Branch {
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
        let id = self.id().to_string();
        let nodes = std::mem::take(&mut self.nodes);
        let mut snapshot = store.clone();
        let vars = ctx.vars_snapshot();

        tracing::debug!(branch = %id, nodes = nodes.len(), "spawning branch");

        let thread_id = id.clone();
        let handle = thread::spawn(move || {
            let mut sub_ctx = WorkflowContext::from_vars(vars);
            let mut executor = WorkflowExecutor::new(nodes);
            match executor.run(&mut sub_ctx, &mut snapshot) {
                Ok(ok) => ok,
                Err(error) => {
                    tracing::error!(branch = %thread_id, %error, "branch setup failed");
                    false
                }
            }
        });
        ctx.track_branch(BranchHandle::new(&id, handle));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::mpsc;

    /// Publishes a resource into whatever store it runs against, then
    /// reports the store's contents over a channel.
    struct ProbeNode {
        base: NodeBase,
        publish: (String, String),
        report: mpsc::Sender<Vec<String>>,
    }

    impl Configurable for ProbeNode {
        fn properties(&self) -> &PropertySet {
            self.base.props()
        }
        fn properties_mut(&mut self) -> &mut PropertySet {
            self.base.props_mut()
        }
    }

    impl Node for ProbeNode {
        fn base(&self) -> &NodeBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut NodeBase {
            &mut self.base
        }
        fn run(
            &mut self,
            _ctx: &mut WorkflowContext,
            store: &mut ResourceStore,
        ) -> anyhow::Result<bool> {
            let (prefix, name) = self.publish.clone();
            let value = json!(name.clone());
            store.add(Resource::new(&prefix, &name, value));
            let ids = store
                .query("*")?
                .resources()
                .iter()
                .map(|r| r.id().to_string())
                .collect();
            self.report.send(ids)?;
            Ok(true)
        }
    }

    fn probe(id: &str, prefix: &str, name: &str, tx: &mpsc::Sender<Vec<String>>) -> Box<ProbeNode> {
        Box::new(ProbeNode {
            base: NodeBase::new(id, PropertySet::new(id)),
            publish: (prefix.to_string(), name.to_string()),
            report: tx.clone(),
        })
    }

    #[test]
    fn test_branch_runs_on_an_independent_copy() {
        let (tx, rx) = mpsc::channel();
        let mut store = ResourceStore::new();
        store.add(Resource::new("X", "seed", json!("seed")));

        let branch = Branch::new("side").add(probe("inner", "X", "from-branch", &tx));
        let mut ctx = WorkflowContext::new();
        let mut branch = branch;
        assert!(branch.run(&mut ctx, &mut store).unwrap());

        // parent mutation after spawn, invisible to the branch's snapshot
        store.add(Resource::new("X", "after-spawn", json!("late")));

        let joined = ctx.join_branches();
        assert_eq!(joined, vec![("side".to_string(), true)]);

        let branch_view = rx.recv().unwrap();
        assert!(branch_view.contains(&"seed".to_string()));
        assert!(branch_view.contains(&"from-branch".to_string()));
        assert!(!branch_view.contains(&"after-spawn".to_string()));

        // branch mutation invisible to the parent
        assert!(store.query("X:from-branch").unwrap().is_empty());
        assert_eq!(store.query("X:seed").unwrap().resources().len(), 1);
    }

    #[test]
    fn test_branch_nodes_run_in_declared_order() {
        let (tx, rx) = mpsc::channel();
        let mut store = ResourceStore::new();
        let branch = Branch::new("ordered")
            .add(probe("first", "X", "one", &tx))
            .add(probe("second", "X", "two", &tx));
        let mut ctx = WorkflowContext::new();
        let mut branch = branch;
        branch.run(&mut ctx, &mut store).unwrap();
        ctx.join_branches();

        let first = rx.recv().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(first, vec!["one"]);
        assert_eq!(second, vec!["one", "two"]);
    }

    #[test]
    fn test_branch_sees_variable_snapshot_not_extensions() {
        struct VarProbe {
            base: NodeBase,
            report: mpsc::Sender<(Option<serde_json::Value>, bool)>,
        }
        impl Configurable for VarProbe {
            fn properties(&self) -> &PropertySet {
                self.base.props()
            }
            fn properties_mut(&mut self) -> &mut PropertySet {
                self.base.props_mut()
            }
        }
        impl Node for VarProbe {
            fn base(&self) -> &NodeBase {
                &self.base
            }
            fn base_mut(&mut self) -> &mut NodeBase {
                &mut self.base
            }
            fn run(
                &mut self,
                ctx: &mut WorkflowContext,
                _store: &mut ResourceStore,
            ) -> anyhow::Result<bool> {
                self.report
                    .send((ctx.var("who").cloned(), ctx.has_extension("shell")))?;
                Ok(true)
            }
        }

        let (tx, rx) = mpsc::channel();
        let mut ctx = WorkflowContext::new();
        ctx.set_var("who", json!("parent"));
        ctx.register_extension("shell", HashMap::<String, String>::new());

        let mut store = ResourceStore::new();
        let mut branch = Branch::new("vars").add(Box::new(VarProbe {
            base: NodeBase::new("vp", PropertySet::new("vp")),
            report: tx,
        }));
        branch.run(&mut ctx, &mut store).unwrap();
        ctx.join_branches();

        let (who, has_shell) = rx.recv().unwrap();
        assert_eq!(who, Some(json!("parent")));
        assert!(!has_shell);
    }

    #[test]
    fn test_second_run_is_empty_pipeline() {
        let mut store = ResourceStore::new();
        let mut ctx = WorkflowContext::new();
        let mut branch = Branch::new("once");
        branch.run(&mut ctx, &mut store).unwrap();
        assert!(branch.run(&mut ctx, &mut store).unwrap());
        assert_eq!(ctx.branch_count(), 2);
        for (_, ok) in ctx.join_branches() {
            assert!(ok);
        }
    }
}
