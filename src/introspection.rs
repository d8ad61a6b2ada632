//! Contract introspection: the GET route at a contract's mount root serves the
//! loaded document, adjusted to how it is reachable from the requesting client.

use crate::contract::{ContractModel, Dialect, SOURCE_ID_FIELD};
use crate::server::{Context, RenderArgs};
use anyhow::anyhow;
use serde_json::{json, Value};

/// Handler bound to every introspection route.
///
/// # Errors
///
/// Fails when the route is not mounted under a contract scope.
pub fn serve(c: &mut Context) -> anyhow::Result<()> {
    let contract = c
        .contract()
        .ok_or_else(|| anyhow!("no contract mounted above {}", c.request.path))?;
    let scheme = c.request.header("x-forwarded-proto").unwrap_or("http");
    let doc = published_document(&contract, c.request.header("host"), scheme);
    c.render(RenderArgs::json(doc));
    Ok(())
}

/// The contract document as published to a client reaching it through `host`.
///
/// Swagger 2.0 documents get `host` and the mounted `basePath`; OpenAPI 3
/// documents get a single server at the live origin. The loader's source
/// field is removed.
#[must_use]
pub fn published_document(contract: &ContractModel, host: Option<&str>, scheme: &str) -> Value {
    let mut doc = contract.document().clone();
    let Value::Object(obj) = &mut doc else {
        return doc;
    };
    obj.remove(SOURCE_ID_FIELD);

    match contract.dialect {
        Dialect::Swagger2 => {
            if let Some(host) = host {
                obj.insert("host".to_string(), Value::String(host.to_string()));
            }
            obj.insert(
                "basePath".to_string(),
                Value::String(contract.base_path.clone()),
            );
        }
        Dialect::OpenApi30 | Dialect::OpenApi31 => {
            if let Some(host) = host {
                let base = contract.base_path.trim_end_matches('/');
                obj.insert(
                    "servers".to_string(),
                    json!([{ "url": format!("{scheme}://{host}{base}") }]),
                );
            }
        }
    }
    doc
}
