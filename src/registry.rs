//! Node factories and the persisted record shape.
//!
//! Class lookup is an explicit registry of constructor closures keyed by
//! class-identifier strings, populated at startup; there is no runtime
//! reflection. The record shape consumed here is the one piece of the
//! file format the engine owns — full workflow-file ownership lies with
//! the embedder.

use crate::error::{Error, Result};
use crate::node::Node;
use crate::property::Configurable;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The newest record format this build understands.
pub const FORMAT_VERSION: u32 = 1;

/// One persisted node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Fully-qualified class identifier, e.g. `pipework.nodes.Echo`.
    pub node_class: String,

    /// Property overrides, merged over the schema defaults at load time.
    /// Regex and class values are wire-encoded tagged arrays (see
    /// [`crate::property::WIRE_MARKER`]).
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// A persisted pipeline: version-gated list of node records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Record format version. Records newer than [`FORMAT_VERSION`] are
    /// rejected; nothing older is migrated.
    pub version: u32,

    #[serde(default)]
    pub name: Option<String>,

    pub nodes: Vec<NodeRecord>,
}

type Factory = Box<dyn Fn() -> Box<dyn Node> + Send + Sync>;

/// Maps class-identifier strings to node constructors.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, Factory>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a class identifier. Replaces any
    /// previous registration.
    pub fn register<F>(&mut self, node_class: &str, factory: F)
    where
        F: Fn() -> Box<dyn Node> + Send + Sync + 'static,
    {
        self.factories.insert(node_class.to_string(), Box::new(factory));
    }

    pub fn contains(&self, node_class: &str) -> bool {
        self.factories.contains_key(node_class)
    }

    /// Construct a bare instance of a registered class.
    pub fn create(&self, node_class: &str) -> Result<Box<dyn Node>> {
        let factory = self
            .factories
            .get(node_class)
            .ok_or_else(|| Error::UnknownNodeClass(node_class.to_string()))?;
        Ok(factory())
    }

    /// Materialize a persisted pipeline: gate the version, construct each
    /// node, merge its persisted properties over the schema defaults.
    ///
    /// Strict-schema violations (unknown keys, wrong kinds) surface here;
    /// missing required values are only tagged, per the two-phase policy.
    pub fn load(&self, record: &WorkflowRecord) -> Result<Vec<Box<dyn Node>>> {
        if record.version > FORMAT_VERSION {
            return Err(Error::UnsupportedVersion {
                found: record.version,
                supported: FORMAT_VERSION,
            });
        }
        let mut nodes = Vec::with_capacity(record.nodes.len());
        for node_record in &record.nodes {
            let mut node = self.create(&node_record.node_class)?;
            node.apply_properties(&node_record.properties)?;
            nodes.push(node);
        }
        tracing::debug!(
            nodes = nodes.len(),
            version = record.version,
            "loaded workflow record"
        );
        Ok(nodes)
    }

    /// Parse a YAML workflow record and materialize it.
    pub fn load_yaml(&self, yaml: &str) -> anyhow::Result<Vec<Box<dyn Node>>> {
        let record: WorkflowRecord =
            serde_yaml::from_str(yaml).context("failed to parse workflow record YAML")?;
        Ok(self.load(&record)?)
    }

    /// Parse a JSON workflow record and materialize it.
    pub fn load_json(&self, json: &str) -> anyhow::Result<Vec<Box<dyn Node>>> {
        let record: WorkflowRecord =
            serde_json::from_str(json).context("failed to parse workflow record JSON")?;
        Ok(self.load(&record)?)
    }

    /// Read and materialize a YAML workflow record from disk.
    pub fn load_file(&self, path: impl AsRef<std::path::Path>) -> anyhow::Result<Vec<Box<dyn Node>>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workflow record: {}", path.display()))?;
        self.load_yaml(&content)
            .with_context(|| format!("failed to load workflow record: {}", path.display()))
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("classes", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
