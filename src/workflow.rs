//! Workflow definition and builder.

use crate::context::WorkflowContext;
use crate::error::Result;
use crate::event::WorkflowEvent;
use crate::executor::{RunReport, WorkflowExecutor};
use crate::node::Node;
use crate::store::ResourceStore;

/// A named pipeline of nodes.
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Description of what this workflow does
    pub description: Option<String>,

    nodes: Vec<Box<dyn Node>>,
}

impl Workflow {
    /// Create a new workflow with a name.
    pub fn new(name: &str) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Create an empty workflow.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            nodes: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Turn the workflow into an executor, for callers that want event
    /// subscriptions or an external context and store.
    pub fn into_executor(self) -> WorkflowExecutor {
        WorkflowExecutor::new(self.nodes)
    }

    /// Execute with a fresh context and store.
    ///
    /// Node-level failures do not surface as `Err`; the report carries
    /// the boolean outcome, the error flag and the processed count. `Err`
    /// means a setup-level failure.
    pub fn run(self) -> Result<RunReport> {
        let mut ctx = WorkflowContext::new();
        let mut store = ResourceStore::new();
        self.run_with(&mut ctx, &mut store)
    }

    /// Execute against a caller-provided context and store.
    pub fn run_with(
        self,
        ctx: &mut WorkflowContext,
        store: &mut ResourceStore,
    ) -> Result<RunReport> {
        let name = self.name.clone();
        tracing::info!(workflow = %name, nodes = self.nodes.len(), "running workflow");
        let mut executor = self.into_executor();
        executor.run(ctx, store)?;
        let report = executor
            .report()
            .unwrap_or(RunReport {
                ok: false,
                errors: true,
                processed: 0,
            });
        tracing::info!(workflow = %name, ok = report.ok, processed = report.processed, "workflow finished");
        Ok(report)
    }
}

/// Builder for creating workflows.
pub struct WorkflowBuilder {
    workflow: Workflow,
    subscribers: Vec<Box<dyn FnMut(&WorkflowEvent) + Send>>,
}

impl WorkflowBuilder {
    /// Create a new workflow builder.
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow::empty(name),
            subscribers: Vec::new(),
        }
    }

    /// Set the workflow description.
    pub fn description(mut self, desc: &str) -> Self {
        self.workflow.description = Some(desc.to_string());
        self
    }

    /// Add a node to the workflow.
    pub fn add(mut self, node: Box<dyn Node>) -> Self {
        self.workflow.nodes.push(node);
        self
    }

    /// Subscribe to lifecycle events of the eventual run.
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&WorkflowEvent) + Send + 'static,
    {
        self.subscribers.push(Box::new(listener));
        self
    }

    /// Build the workflow.
    pub fn build(self) -> Workflow {
        self.workflow
    }

    /// Execute with a fresh context and store.
    pub fn run(self) -> Result<RunReport> {
        let mut ctx = WorkflowContext::new();
        let mut store = ResourceStore::new();
        self.run_with(&mut ctx, &mut store)
    }

    /// Execute against a caller-provided context and store.
    pub fn run_with(
        self,
        ctx: &mut WorkflowContext,
        store: &mut ResourceStore,
    ) -> Result<RunReport> {
        let name = self.workflow.name.clone();
        let mut executor = self.workflow.into_executor();
        for listener in self.subscribers {
            executor.subscribe(listener);
        }
        tracing::info!(workflow = %name, "running workflow");
        executor.run(ctx, store)?;
        Ok(executor.report().unwrap_or(RunReport {
            ok: false,
            errors: true,
            processed: 0,
        }))
    }
}

impl From<WorkflowBuilder> for Workflow {
    fn from(builder: WorkflowBuilder) -> Self {
        builder.build()
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
