//! # Dispatcher Module
//!
//! Handler registry and the dispatch step between routing and rendering.
//!
//! ## Overview
//!
//! Handlers are plain functions over the request [`Context`](crate::server::Context):
//!
//! ```rust
//! use serde_json::json;
//! use specroute::dispatcher::Dispatcher;
//! use specroute::server::RenderArgs;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register("listPets", |c| {
//!     let Some(api) = c.openapi() else {
//!         anyhow::bail!("no contract mounted");
//!     };
//!     if !api.validate_request(c)?.is_valid() {
//!         return Ok(());
//!     }
//!     api.render_response(c, 200, json!([]))?;
//!     Ok(())
//! });
//! assert!(dispatcher.has_handler("listPets"));
//! ```
//!
//! ## Handler Resolution
//!
//! For a matched route, the first registered handler found wins:
//!
//! 1. the `handler` default (`x-specroute-to: list_pets`)
//! 2. `controller#action` from the `controller` and `action` defaults
//! 3. the route name (`x-specroute-name`, then `operationId`)
//! 4. the fallback handler
//!
//! ## Error Handling
//!
//! - A handler returning `Err` or panicking renders with the exception flag
//!   set, which becomes a 500 error document on API routes.
//! - A handler that renders nothing gets an empty render, which becomes a 501
//!   on API routes and a 404 elsewhere.

mod core;

pub use core::{Dispatcher, Handler, FALLBACK_HANDLER, INTROSPECTION_HANDLER};
