//! Schema-driven configuration engine for SR-series modules.
//!
//! Validate a configuration mapping against a declarative parameter
//! table, expand operation-mode presets into their detailed timing
//! parameters, and encode values into the module's wire representation.
//!
//! The parameter table is data, not code: a new device revision ships a
//! new table document, not a new library.

pub mod encode;
pub mod error;
pub mod modes;
pub mod param;
pub mod rules;
pub mod table;
pub mod value;

pub use encode::{decode_value, encode_value};
pub use error::{Result, SchemaError};
pub use modes::operation_mode_params;
pub use param::{NodeType, OperationMode, ParamId, TxPower};
pub use rules::{node_type_of, validate, ConfigMap};
pub use table::{Applicability, ParamSpec, ParamTable, ValueKind};
pub use value::{ConfigValue, TimeSync};
