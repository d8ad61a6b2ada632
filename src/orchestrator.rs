//! # Orchestrator Module
//!
//! Request validation with parameter binding, and response validation with
//! rendering, wrapped around every matched API request.
//!
//! ## Request flow
//!
//! 1. The operation bound to the matched route is passed to the
//!    [`SchemaValidator`] together with the request inputs.
//! 2. Violations are logged at the configured level with
//!    `direction = "inbound"`. Unless auto-render is disabled, a 400 error
//!    document is rendered and the context halted.
//! 3. On success the validated values are bound onto the context.
//!
//! ## Response flow
//!
//! A payload that passes validation is rendered at the requested status under
//! the negotiated format. A failing payload is logged with
//! `direction = "outbound"` and replaced by a 500 error document, whatever
//! status the handler asked for.

use crate::config::LogLevel;
use crate::error_render::ErrorDocument;
use crate::router::ParamVec;
use crate::server::{Context, RenderArgs};
use crate::validator::{RequestInput, SchemaValidator, ValidationOutcome, ValidatorError};
use serde_json::Value;
use std::sync::Arc;

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Error => tracing::error!($($arg)+),
        }
    };
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("route {0} has no contract operation")]
    NoOperation(String),
    #[error(transparent)]
    Validator(#[from] ValidatorError),
}

/// Per-contract validation entry point, reachable from handlers via
/// [`Context::openapi`].
pub struct ValidationOrchestrator {
    validator: Arc<dyn SchemaValidator>,
    log_level: LogLevel,
}

impl std::fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl ValidationOrchestrator {
    pub fn new(validator: Arc<dyn SchemaValidator>, log_level: LogLevel) -> Self {
        Self {
            validator,
            log_level,
        }
    }

    #[must_use]
    pub fn validator(&self) -> &Arc<dyn SchemaValidator> {
        &self.validator
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Validate the request and bind its values, rendering a 400 on failure.
    pub fn validate_request(&self, c: &mut Context) -> Result<ValidationOutcome, OrchestratorError> {
        self.validate_request_with(c, true)
    }

    /// Validate the request and bind its values. With `auto_render` unset the
    /// caller decides how to answer a failed validation.
    ///
    /// # Errors
    ///
    /// Fails when the matched route has no operation or the validator fails
    /// structurally. Violations are never errors; they are in the outcome.
    pub fn validate_request_with(
        &self,
        c: &mut Context,
        auto_render: bool,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        let operation = c
            .operation()
            .ok_or_else(|| OrchestratorError::NoOperation(c.request.path.clone()))?;

        let result = {
            let empty = ParamVec::new();
            let path_params = c.route_match().map_or(&empty, |m| &m.path_params);
            let input = RequestInput {
                path_params,
                query: &c.request.query,
                headers: &c.request.headers,
                cookies: &c.request.cookies,
                form: &c.request.form,
                body: c.request.body.as_ref(),
            };
            self.validator.validate_request(&operation, &input)?
        };

        if !result.outcome.is_valid() {
            log_at!(
                self.log_level,
                request_id = %c.request_id,
                direction = "inbound",
                operation = %operation.label(),
                errors = ?result.outcome.errors(),
                "Request validation failed"
            );
            if auto_render {
                let doc = ErrorDocument::from_outcome(&result.outcome, 400);
                let format = c.format();
                c.render(RenderArgs::format(format, doc.to_value()).with_status(400));
                c.halt();
            }
            return Ok(result.outcome);
        }

        for (name, value) in result.values {
            c.bind(name, value);
        }
        Ok(result.outcome)
    }

    /// Validate `payload` for `status` and render it, or render a 500 error
    /// document when it does not conform.
    ///
    /// # Errors
    ///
    /// Same conditions as [`validate_request_with`](Self::validate_request_with).
    pub fn render_response(
        &self,
        c: &mut Context,
        status: u16,
        payload: Value,
    ) -> Result<ValidationOutcome, OrchestratorError> {
        let operation = c
            .operation()
            .ok_or_else(|| OrchestratorError::NoOperation(c.request.path.clone()))?;
        let outcome = self.validator.validate_response(&operation, status, &payload)?;
        let format = c.format();

        if outcome.is_valid() {
            c.render(RenderArgs::format(format, payload).with_status(status));
        } else {
            log_at!(
                self.log_level,
                request_id = %c.request_id,
                direction = "outbound",
                operation = %operation.label(),
                status = status,
                errors = ?outcome.errors(),
                "Response validation failed"
            );
            let doc = ErrorDocument::from_outcome(&outcome, 500);
            c.render(RenderArgs::format(format, doc.to_value()).with_status(500));
        }
        Ok(outcome)
    }
}
