//! Per-workflow execution context.

use crate::error::{Error, Result};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::thread::JoinHandle;

/// The handle of a spawned branch thread.
///
/// Dropping the handle detaches the branch (the original fire-and-forget
/// semantics); [`join`](Self::join) is the opt-in alternative.
#[derive(Debug)]
pub struct BranchHandle {
    name: String,
    handle: JoinHandle<bool>,
}

impl BranchHandle {
    pub(crate) fn new(name: &str, handle: JoinHandle<bool>) -> Self {
        Self {
            name: name.to_string(),
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for the branch to finish; `false` when it aborted or its
    /// thread panicked.
    pub fn join(self) -> bool {
        self.handle.join().unwrap_or(false)
    }
}

/// Symbol table and extension registry for one workflow instance.
///
/// Extensions are opaque collaborators (a dialog service, a shell
/// runner) injected by the embedder; a node asking for an absent one is
/// a setup-level failure, not an ordinary node failure.
#[derive(Default)]
pub struct WorkflowContext {
    vars: HashMap<String, Value>,
    extensions: HashMap<String, Box<dyn Any + Send>>,
    branches: Vec<BranchHandle>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context seeded with a variable snapshot and no extensions;
    /// branches start from this.
    pub(crate) fn from_vars(vars: HashMap<String, Value>) -> Self {
        Self {
            vars,
            ..Self::default()
        }
    }

    /// Set a named variable.
    pub fn set_var(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }

    /// Get a named variable.
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn vars(&self) -> &HashMap<String, Value> {
        &self.vars
    }

    /// A value copy of the variable table, for branch contexts.
    pub(crate) fn vars_snapshot(&self) -> HashMap<String, Value> {
        self.vars.clone()
    }

    /// Register an extension under a name.
    pub fn register_extension<T: Any + Send>(&mut self, name: &str, extension: T) {
        self.extensions.insert(name.to_string(), Box::new(extension));
    }

    /// Look up a required extension by name and type.
    pub fn extension<T: Any + Send>(&self, name: &str) -> Result<&T> {
        self.extensions
            .get(name)
            .and_then(|e| e.downcast_ref::<T>())
            .ok_or_else(|| Error::ExtensionMissing(name.to_string()))
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    /// Record a spawned branch. Called by [`Branch`](crate::Branch).
    pub fn track_branch(&mut self, handle: BranchHandle) {
        self.branches.push(handle);
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Join every tracked branch, returning `(name, succeeded)` pairs.
    ///
    /// Never required: unjoined branches simply stay detached.
    pub fn join_branches(&mut self) -> Vec<(String, bool)> {
        self.branches
            .drain(..)
            .map(|b| {
                let name = b.name.clone();
                (name, b.join())
            })
            .collect()
    }
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("vars", &self.vars)
            .field("extensions", &self.extensions.keys().collect::<Vec<_>>())
            .field("branches", &self.branches.len())
            .finish()
    }
}
