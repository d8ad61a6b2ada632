//! # Contract Module
//!
//! Loading and modelling of the API contract (Swagger 2.0 or OpenAPI 3.x).
//!
//! The loader reads a document from disk, performs structural meta-validation
//! and stamps it with its source. [`ContractModel`] is the read-only view the
//! route synthesizer and validator consume: base path, path items, operations,
//! parameters, request bodies and responses.
//!
//! Extension keys (`x-*`) are never treated as paths or methods. Only three of
//! them are interpreted:
//!
//! | Key | Where | Meaning |
//! |-----|-------|---------|
//! | `x-specroute-to` | operation | handler binding (string, map or list) |
//! | `x-specroute-name` | operation | route name, wins over `operationId` |
//! | `x-specroute-placeholder` | path parameter | `standard`, `numeric` or `wildcard` |

mod load;
mod model;

pub use load::*;
pub use model::*;

use std::path::PathBuf;

/// Errors raised while loading or modelling a contract. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("failed to read contract {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unsupported contract source {0}")]
    Source(String),
    #[error("invalid YAML contract: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON contract: {0}")]
    Json(#[from] serde_json::Error),
    #[error("contract failed meta-validation: {0}")]
    MetaInvalid(String),
    #[error("unresolved reference {0}")]
    UnresolvedRef(String),
    #[error("invalid parameter at {location}: {source}")]
    InvalidParameter {
        location: String,
        source: serde_json::Error,
    },
    #[error("invalid routing directive at {location}: expected string, object or list, found {found}")]
    InvalidDirective {
        location: String,
        found: &'static str,
    },
}
