use crate::param::{NodeType, ParamId};

/// Errors raised while validating or encoding a configuration.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The parameter table document could not be parsed.
    #[error("failed to load parameter table: {0}")]
    LoadFailed(#[from] serde_json::Error),

    /// The table has no entry for this parameter.
    #[error("no table entry for parameter {0}")]
    UnknownParam(ParamId),

    /// A value failed its per-parameter constraint.
    #[error("invalid value for {param}: {message}")]
    ConstraintViolation { param: ParamId, message: String },

    /// The parameter is not accepted by the configured node type.
    #[error("{param} does not apply to node type {node_type}")]
    NotApplicableForNodeType { param: ParamId, node_type: NodeType },

    /// Two parameters that cannot be configured together are both present.
    #[error("{param} cannot be combined with {other}")]
    MutuallyExclusiveGroup { param: ParamId, other: ParamId },

    /// A parameter requires another that is absent.
    #[error("{param} requires {requires} to be set")]
    MissingDependency { param: ParamId, requires: ParamId },

    /// A wire value could not be decoded for this parameter.
    #[error("cannot decode {param} from {len} wire bytes")]
    BadWireValue { param: ParamId, len: usize },
}

pub type Result<T> = std::result::Result<T, SchemaError>;
