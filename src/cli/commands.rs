use crate::config::ServiceConfig;
use crate::contract::OperationSpec;
use crate::dispatcher::Dispatcher;
use crate::logging::{init_logging, LogConfig};
use crate::router::{RouteTable, Router};
use crate::server::{AppService, Context, HttpServer};
use crate::synthesizer::{RouteSynthesizer, Synthesis};
use anyhow::{anyhow, Context as _};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line interface for specroute
#[derive(Parser)]
#[command(name = "specroute")]
#[command(about = "Serve an OpenAPI or Swagger 2.0 contract with validated routes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize routes from a contract and serve them
    Serve {
        /// Contract file (YAML or JSON); overrides the config file
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Address to bind; overrides the config file
        #[arg(short, long)]
        addr: Option<String>,

        /// Service configuration file (YAML)
        #[arg(short, long, env = "SPECROUTE_CONFIG")]
        config: Option<PathBuf>,

        /// Validate inputs as strings, without type coercion
        #[arg(long, default_value_t = false)]
        no_coerce: bool,

        /// Answer unhandled operations with their first 2xx example
        #[arg(long, default_value_t = false)]
        mock: bool,
    },
    /// Print the routes synthesized from a contract
    Routes {
        /// Contract file (YAML or JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
}

/// Parse arguments and run the selected command.
///
/// # Errors
///
/// Any configuration, contract, synthesis or bind failure.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve {
            spec,
            addr,
            config,
            no_coerce,
            mock,
        } => {
            let mut service_config = match &config {
                Some(path) => ServiceConfig::load(path)?,
                None => ServiceConfig::default(),
            };
            if let Some(spec) = spec {
                service_config.openapi.url = Some(path_source(&spec)?);
            }
            if let Some(addr) = addr {
                service_config.addr = addr;
            }
            if no_coerce {
                service_config.openapi.coerce = false;
            }
            serve(service_config, mock)
        }
        Commands::Routes { spec } => {
            init_logging(&LogConfig::from_env())?;
            let mut config = ServiceConfig::default();
            config.openapi.url = Some(path_source(&spec)?);
            let (router, synthesis) = build_router(&config)?;
            println!(
                "[contract] base_path={} operations={}",
                synthesis.contract.base_path,
                synthesis.routes.len()
            );
            router.dump_routes();
            Ok(())
        }
    }
}

fn path_source(path: &std::path::Path) -> anyhow::Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("invalid UTF-8 in contract path {}", path.display()))
}

fn build_router(config: &ServiceConfig) -> anyhow::Result<(Router, Synthesis)> {
    let mut plugin = config.openapi.clone();
    if plugin.url.is_none() {
        plugin.url = config.contract_source().map(str::to_string);
    }
    let mut table = RouteTable::new();
    let synthesis = RouteSynthesizer::new(plugin)
        .register(&mut table)
        .context("contract synthesis failed")?;
    let router = Router::new(table)?;
    Ok((router, synthesis))
}

fn serve(config: ServiceConfig, mock: bool) -> anyhow::Result<()> {
    init_logging(&config.logging.clone().with_env_overrides())?;

    let stack_size = config.stack_size();
    may::config().set_stack_size(stack_size);
    info!(stack_size = stack_size, "Coroutine runtime configured");

    let (router, synthesis) = build_router(&config)?;
    let mut dispatcher = Dispatcher::new();
    if mock {
        dispatcher.set_fallback(mock_handler);
    }
    info!(
        addr = %config.addr,
        base_path = %synthesis.contract.base_path,
        routes_count = synthesis.routes.len(),
        mock = mock,
        "Starting server"
    );

    let service = AppService::new(Arc::new(router), Arc::new(dispatcher));
    let handle = HttpServer(service).start(config.addr.as_str())?;
    handle
        .join()
        .map_err(|e| anyhow!("server coroutine panicked: {e:?}"))?;
    Ok(())
}

/// Fallback handler for `serve --mock`: validate the request, then reply with
/// the first 2xx example of the operation. Operations without one render
/// nothing.
pub fn mock_handler(c: &mut Context) -> anyhow::Result<()> {
    let Some(api) = c.openapi() else {
        return Ok(());
    };
    if c.operation().is_none() {
        return Ok(());
    }
    if !api.validate_request(c)?.is_valid() {
        return Ok(());
    }
    let example = c.operation().and_then(|op| first_success_example(&op));
    if let Some((status, payload)) = example {
        api.render_response(c, status, payload)?;
    }
    Ok(())
}

/// Exact 2xx codes win over the `2XX` class, which answers as 200.
fn first_success_example(operation: &OperationSpec) -> Option<(u16, Value)> {
    let exact = operation.responses.iter().find_map(|(key, response)| {
        let status = key.parse::<u16>().ok().filter(|s| (200..300).contains(s))?;
        response.example.clone().map(|example| (status, example))
    });
    exact.or_else(|| {
        operation
            .responses
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("2XX"))
            .and_then(|(_, response)| response.example.clone())
            .map(|example| (200, example))
    })
}
