//! # Router Module
//!
//! The route tree that contract routes are synthesized into, and the compiled
//! matcher that serves requests from it.
//!
//! ## Overview
//!
//! Routing happens in two phases:
//!
//! 1. **Registration**: a [`RouteTable`] is populated at startup. Routes are
//!    addressed by [`RouteId`], nest under parents, carry a method set, a name,
//!    defaults and typed metadata, and can be re-parented with their subtree.
//!
//! 2. **Matching**: [`Router::new`] freezes the table and compiles every leaf
//!    route into an anchored regex. [`Router::route`] returns the first endpoint
//!    accepting the request method and path, with path captures layered over the
//!    inherited defaults.
//!
//! ## Pattern syntax
//!
//! | Placeholder | Kind | Matches |
//! |-------------|------|---------|
//! | `<name>` | standard | one segment |
//! | `<name:num>` | numeric | digits |
//! | `<*name>` | wildcard | anything, `/` included |
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use specroute::router::{RouteTable, Router};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut table = RouteTable::new();
//! let pets = table.any(table.root(), "/pets/<id:num>")?;
//! table.via(pets, [Method::GET])?;
//!
//! let router = Router::new(table)?;
//! let m = router.route(&Method::GET, "/pets/42").ok_or("no match")?;
//! assert_eq!(m.get_path_param("id"), Some("42"));
//! assert!(router.route(&Method::GET, "/pets/abc").is_none());
//! # Ok(())
//! # }
//! ```

mod core;
mod pattern;
mod table;

pub use core::{Endpoint, ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use pattern::{PatternError, PlaceholderKind, RoutePattern};
pub use table::{Metadata, RouteError, RouteId, RouteTable};
