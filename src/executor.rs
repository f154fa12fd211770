//! Sequential workflow execution.

use crate::context::WorkflowContext;
use crate::error::{Error, Result};
use crate::event::{Subscribers, WorkflowEvent};
use crate::node::Node;
use crate::store::ResourceStore;

/// The executor's state machine: linear, no backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

/// What a finished run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Whether every node completed.
    pub ok: bool,
    /// Whether the run aborted on a failure.
    pub errors: bool,
    /// How many nodes ran, the failing one included.
    pub processed: usize,
}

/// Runs a node list in declaration order.
///
/// Per node: emit [`WorkflowEvent::NodeStarted`], auto-wire the upstream
/// link when none was set explicitly, check required properties, invoke
/// `run`, emit [`WorkflowEvent::NodeFinished`] on success. A node failure
/// stops scheduling — already-published resources and side effects stay
/// as they are, durable once made.
pub struct WorkflowExecutor {
    nodes: Vec<Box<dyn Node>>,
    state: RunState,
    subscribers: Subscribers,
    report: Option<RunReport>,
}

impl WorkflowExecutor {
    pub fn new(nodes: Vec<Box<dyn Node>>) -> Self {
        Self {
            nodes,
            state: RunState::Idle,
            subscribers: Subscribers::new(),
            report: None,
        }
    }

    /// Subscribe to lifecycle events; delivery is in subscription order.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&WorkflowEvent) + Send + 'static,
    {
        self.subscribers.subscribe(listener);
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The report of the last run, once one happened.
    pub fn report(&self) -> Option<RunReport> {
        self.report
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Execute the node list.
    ///
    /// Returns `Ok(true)` when every node completed and `Ok(false)` when
    /// a node failed (the failure itself is logged here, once, and not
    /// rethrown). `Err` is reserved for setup-level problems: running an
    /// executor that is not idle.
    pub fn run(&mut self, ctx: &mut WorkflowContext, store: &mut ResourceStore) -> Result<bool> {
        if self.state != RunState::Idle {
            return Err(Error::InvalidExecutorState { state: self.state });
        }
        self.state = RunState::Running;

        tracing::info!(nodes = self.nodes.len(), "starting workflow run");

        let mut processed = 0usize;
        let mut failed = false;
        let mut previous_output = None;

        for index in 0..self.nodes.len() {
            let id = self.nodes[index].id().to_string();
            self.subscribers.emit(&WorkflowEvent::NodeStarted {
                index,
                node: id.clone(),
            });

            if !self.nodes[index].base().has_input() {
                if let Some(previous) = previous_output.take() {
                    self.nodes[index].set_input(previous);
                }
            }

            tracing::debug!(node = %id, index, "executing node");

            let node = &mut self.nodes[index];
            let outcome = node
                .base()
                .props()
                .ensure_required()
                .map_err(anyhow::Error::from)
                .and_then(|_| node.run(ctx, store));
            processed += 1;

            match outcome {
                Ok(true) => {
                    self.subscribers.emit(&WorkflowEvent::NodeFinished {
                        index,
                        node: id.clone(),
                    });
                }
                Ok(false) => {
                    tracing::error!(node = %id, index, "node reported failure, aborting run");
                    failed = true;
                    break;
                }
                Err(error) => {
                    tracing::error!(node = %id, index, %error, "node raised, aborting run");
                    failed = true;
                    break;
                }
            }

            previous_output = Some(self.nodes[index].output());
        }

        self.state = if failed {
            RunState::Aborted
        } else {
            RunState::Completed
        };
        let report = RunReport {
            ok: !failed,
            errors: failed,
            processed,
        };
        self.report = Some(report);
        self.subscribers.emit(&WorkflowEvent::RunFinished {
            errors: failed,
            processed,
        });

        tracing::info!(
            ok = !failed,
            processed,
            state = ?self.state,
            "workflow run finished"
        );
        Ok(!failed)
    }
}

impl std::fmt::Debug for WorkflowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowExecutor")
            .field("nodes", &self.nodes.len())
            .field("state", &self.state)
            .field("report", &self.report)
            .finish()
    }
}
