//! Catalog adapter: flattens the provider's raw tool and resource
//! descriptions into the structures the model backend and the HTTP surface
//! consume.
//!
//! This is the one boundary where loosely-shaped provider data is accepted.
//! Missing or malformed schema fields degrade to defaults instead of failing.

use agentbridge_core::action::{ActionProvider, ParamSpec, RawResource, RawTool, ResourceSpec, ToolSpec};
use agentbridge_core::error::ActionError;
use agentbridge_core::provider::ToolDefinition;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::debug;

const DEFAULT_PARAM_TYPE: &str = "any";
const DEFAULT_MIME_TYPE: &str = "text/plain";

/// The per-request action menu and resource index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub tools: Vec<ToolSpec>,
    pub resources: Vec<ResourceSpec>,
}

impl Catalog {
    /// List tools and resources from the live provider and flatten them.
    ///
    /// Listing failures propagate unchanged.
    pub async fn fetch(provider: &dyn ActionProvider) -> Result<Self, ActionError> {
        let raw_tools = provider.list_tools().await?;
        let raw_resources = provider.list_resources().await?;
        let catalog = build_catalog(&raw_tools, &raw_resources);
        debug!(
            tools = catalog.tools.len(),
            resources = catalog.resources.len(),
            "Catalog built"
        );
        Ok(catalog)
    }

    /// Fetch only the tool half of the catalog.
    pub async fn fetch_tools(provider: &dyn ActionProvider) -> Result<Vec<ToolSpec>, ActionError> {
        let raw_tools = provider.list_tools().await?;
        Ok(raw_tools.iter().map(tool_spec).collect())
    }

    /// Fetch only the resource half of the catalog.
    pub async fn fetch_resources(
        provider: &dyn ActionProvider,
    ) -> Result<Vec<ResourceSpec>, ActionError> {
        let raw_resources = provider.list_resources().await?;
        Ok(raw_resources.iter().map(resource_spec).collect())
    }

    /// Function-calling definitions for the model backend.
    pub fn action_menu(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(to_definition).collect()
    }
}

pub fn build_catalog(raw_tools: &[RawTool], raw_resources: &[RawResource]) -> Catalog {
    Catalog {
        tools: raw_tools.iter().map(tool_spec).collect(),
        resources: raw_resources.iter().map(resource_spec).collect(),
    }
}

pub fn tool_spec(raw: &RawTool) -> ToolSpec {
    ToolSpec {
        name: raw.name.clone(),
        description: raw.description.clone().unwrap_or_default(),
        parameters: raw
            .input_schema
            .as_ref()
            .map(extract_parameters)
            .unwrap_or_default(),
    }
}

pub fn resource_spec(raw: &RawResource) -> ResourceSpec {
    ResourceSpec {
        uri: raw.uri.clone(),
        mime_type: raw
            .mime_type
            .clone()
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
    }
}

fn extract_parameters(schema: &Value) -> Vec<ParamSpec> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| ParamSpec {
            name: name.clone(),
            param_type: property
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_PARAM_TYPE)
                .to_string(),
            description: property
                .get("description")
                .or_else(|| property.get("title"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: required.contains(&name.as_str()),
            default: property.get("default").cloned(),
        })
        .collect()
}

/// Re-shape a flattened tool into a JSON-schema function definition.
fn to_definition(spec: &ToolSpec) -> ToolDefinition {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for param in &spec.parameters {
        let mut property = Map::new();
        // "any" is not a JSON-schema type; leave the type open instead.
        if param.param_type != DEFAULT_PARAM_TYPE {
            property.insert("type".into(), Value::String(param.param_type.clone()));
        }
        if !param.description.is_empty() {
            property.insert("description".into(), Value::String(param.description.clone()));
        }
        if let Some(default) = &param.default {
            property.insert("default".into(), default.clone());
        }
        properties.insert(param.name.clone(), Value::Object(property));
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    ToolDefinition {
        name: spec.name.clone(),
        description: spec.description.clone(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}
