//! # CLI Module
//!
//! The `specroute` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! specroute serve --spec demos/petstore.yaml --addr 127.0.0.1:8080 --mock
//! ```
//!
//! Options:
//! - `--spec <FILE>` - contract file, wins over the config file
//! - `--addr <ADDR>` - bind address (default `0.0.0.0:8080`)
//! - `--config <FILE>` - service configuration, see [`crate::config`]
//! - `--no-coerce` - validate parameters as raw strings
//! - `--mock` - answer every operation without a handler from its 2xx example
//!
//! Without `--mock`, every API route answers 501 since no handlers are
//! registered; the introspection route always works.
//!
//! ### `routes`
//!
//! ```bash
//! specroute routes --spec demos/petstore.yaml
//! ```
//!
//! Prints the contract base path and the compiled route table.

mod commands;


pub use commands::{mock_handler, run_cli, Cli, Commands};
