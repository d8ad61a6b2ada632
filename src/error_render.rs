//! # Error Render Module
//!
//! The pre-render stage that turns failed or empty renders on API routes into
//! the uniform error document:
//!
//! ```json
//! {"errors": [{"path": "/", "message": "Not implemented."}], "status": 501}
//! ```
//!
//! The stage runs inside [`Context::render`] before anything is written. It
//! does nothing on routes without an operation, and nothing when the render
//! already carries content under a format the server can write and no
//! exception. A body under any other key (`xml`, say) counts as empty.

use crate::server::{Context, RenderArgs, FORMATS};
use crate::validator::{ValidationError, ValidationOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";
pub const NOT_IMPLEMENTED_MESSAGE: &str = "Not implemented.";

/// Uniform error document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub errors: Vec<ValidationError>,
    pub status: u16,
}

impl ErrorDocument {
    #[must_use]
    pub fn from_outcome(outcome: &ValidationOutcome, status: u16) -> Self {
        Self {
            errors: outcome.errors().to_vec(),
            status,
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self {
            errors: vec![ValidationError::new("/", INTERNAL_ERROR_MESSAGE)],
            status: 500,
        }
    }

    #[must_use]
    pub fn not_implemented() -> Self {
        Self {
            errors: vec![ValidationError::new("/", NOT_IMPLEMENTED_MESSAGE)],
            status: 501,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "errors": self.errors,
            "status": self.status,
        })
    }
}

/// Inject an error document into `args` when the render on an API route would
/// otherwise be empty or an exception.
pub fn before_render(c: &Context, args: &mut RenderArgs) {
    if c.operation().is_none() {
        return;
    }
    if args.exception.is_none() && has_content(args) {
        return;
    }
    let doc = if args.exception.is_some() {
        ErrorDocument::internal()
    } else {
        ErrorDocument::not_implemented()
    };
    args.body.clear();
    args.body.insert(c.format().to_string(), doc.to_value());
    args.status = Some(doc.status);
}

fn has_content(args: &RenderArgs) -> bool {
    args.body.keys().any(|k| FORMATS.contains(&k.as_str()))
}
