use super::{ContractError, ContractModel};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Field the loader stamps with the contract source; never published to clients.
pub const SOURCE_ID_FIELD: &str = "id";

/// Resolve a contract source (plain path or `file://` URL) to a filesystem path.
pub fn resolve_source(source: &str) -> Result<PathBuf, ContractError> {
    if source.contains("://") {
        let url = url::Url::parse(source)
            .map_err(|e| ContractError::Source(format!("{source}: {e}")))?;
        if url.scheme() != "file" {
            return Err(ContractError::Source(format!(
                "{source}: only file sources are supported"
            )));
        }
        return url
            .to_file_path()
            .map_err(|_| ContractError::Source(format!("{source}: not a local file path")));
    }
    Ok(PathBuf::from(source))
}

/// Parse contract text. YAML is a superset of JSON, so `.json` files are
/// parsed strictly and everything else goes through the YAML parser.
pub fn parse_document(text: &str, path: &Path) -> Result<Value, ContractError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(text)?)
    } else {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Structural meta-validation of a loaded document.
///
/// OpenAPI 3 documents must deserialize as [`oas3::OpenApiV3Spec`]; Swagger 2.0
/// documents need an `info` object and a `paths` object.
pub fn meta_validate(doc: &Value) -> Result<(), ContractError> {
    if doc.get("openapi").is_some() {
        let mut stripped = doc.clone();
        // Extension entries under `paths` are not path items.
        if let Some(Value::Object(paths)) = stripped.get_mut("paths") {
            paths.retain(|k, _| !super::is_extension(k));
        }
        serde_json::from_value::<oas3::OpenApiV3Spec>(stripped)
            .map_err(|e| ContractError::MetaInvalid(e.to_string()))?;
        return Ok(());
    }
    match doc.get("swagger").and_then(Value::as_str) {
        Some("2.0") => {}
        Some(other) => {
            return Err(ContractError::MetaInvalid(format!(
                "unsupported swagger version {other}"
            )))
        }
        None => {
            return Err(ContractError::MetaInvalid(
                "document declares neither `swagger` nor `openapi`".to_string(),
            ))
        }
    }
    if !doc.get("info").is_some_and(Value::is_object) {
        return Err(ContractError::MetaInvalid("missing `info` object".to_string()));
    }
    if !doc.get("paths").is_some_and(Value::is_object) {
        return Err(ContractError::MetaInvalid("missing `paths` object".to_string()));
    }
    Ok(())
}

/// Build a model from an in-memory document, stamping it with `source`.
pub fn load_contract_from_value(mut doc: Value, source: &str) -> Result<ContractModel, ContractError> {
    meta_validate(&doc)?;
    if let Value::Object(obj) = &mut doc {
        obj.insert(SOURCE_ID_FIELD.to_string(), Value::String(source.to_string()));
    }
    let model = ContractModel::from_document(doc)?;
    debug!(
        source = %source,
        base_path = %model.base_path,
        paths = model.paths.len(),
        "Contract model built"
    );
    Ok(model)
}

/// Read, meta-validate and model a contract from a file path or `file://` URL.
pub fn load_contract(source: &str) -> Result<ContractModel, ContractError> {
    let path = resolve_source(source)?;
    let text = std::fs::read_to_string(&path).map_err(|e| ContractError::Io {
        path: path.clone(),
        source: e,
    })?;
    let doc = parse_document(&text, &path)?;
    let model = load_contract_from_value(doc, source)?;
    info!(
        source = %source,
        operations = model.operation_count(),
        "Contract loaded"
    );
    Ok(model)
}
