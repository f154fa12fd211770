//! Error taxonomy for the workflow engine.
//!
//! Configuration and query errors are raised synchronously to the caller
//! that triggered them. Node failures are never surfaced here directly:
//! the executor catches them exactly once at its boundary and converts
//! them into an abort (see [`crate::executor`]).

use crate::executor::RunState;
use crate::property::Kind;
use thiserror::Error;

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors raised by the engine's own API surface.
#[derive(Debug, Error)]
pub enum Error {
    /// An override named a key the schema does not declare.
    #[error("unknown property '{key}' for '{target}'")]
    UnknownProperty { target: String, key: String },

    /// A value's kind is not in the property's allowed set.
    #[error("invalid value for property '{property}': expected one of {expected:?}, got {actual:?}")]
    InvalidValue {
        property: String,
        expected: Vec<Kind>,
        actual: Kind,
    },

    /// A wire-encoded regex payload failed to compile.
    #[error("invalid regex pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A property name is absent from the schema.
    #[error("no property named '{0}'")]
    PropertyNotFound(String),

    /// A query string does not parse as `prefix:key`.
    #[error("malformed resource query '{0}'")]
    MalformedQuery(String),

    /// A prefix is already registered to a different resource kind.
    #[error("prefix '{prefix}' is registered to kind '{existing}', cannot re-register as '{requested}'")]
    PrefixConflict {
        prefix: String,
        existing: String,
        requested: String,
    },

    /// A required property was never supplied; checked when the owning
    /// node executes, not before.
    #[error("required property '{property}' was never supplied")]
    MissingRequired { property: String },

    /// A node has no upstream wired.
    #[error("no upstream node wired for '{0}'")]
    InputMissing(String),

    /// No factory is registered under a node class identifier.
    #[error("unknown node class '{0}'")]
    UnknownNodeClass(String),

    /// A persisted record's format version is newer than this build.
    #[error("workflow record version {found} exceeds supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// A required extension is not registered in the context.
    #[error("required extension '{0}' is not registered")]
    ExtensionMissing(String),

    /// The executor was asked to run while not idle.
    #[error("executor cannot run from state {state:?}")]
    InvalidExecutorState { state: RunState },
}
