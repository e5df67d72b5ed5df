use crate::error::{AbortTurn, Error, Result};
use crate::traits::{Tool, ToolArgs, ToolSpec};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

type Handler = Box<dyn Fn(&ToolArgs) -> anyhow::Result<String> + Send + Sync>;

/// Adapts a plain closure into a [`Tool`].
pub struct FnTool {
    name: String,
    description: String,
    schema: Value,
    handler: Handler,
}

impl FnTool {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(&ToolArgs) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            handler: Box::new(handler),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: &ToolArgs) -> anyhow::Result<String> {
        (self.handler)(args)
    }
}

/// Catalog of callable tools. Populated at startup, then shared behind an
/// `Arc` and only read.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<()> {
        if self.contains(tool.name()) {
            return Err(Error::DuplicateName(tool.name().to_string()));
        }
        tracing::debug!(tool = tool.name(), "Registered tool");
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    pub fn register_fn<F>(
        &mut self,
        name: &str,
        description: &str,
        schema: Value,
        handler: F,
    ) -> Result<()>
    where
        F: Fn(&ToolArgs) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.register(FnTool::new(name, description, schema, handler))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// Parses and validates `raw_arguments`, then runs the named tool.
    pub async fn invoke(&self, name: &str, raw_arguments: &str) -> Result<String> {
        let tool = self.resolve(name)?;
        let args = parse_arguments(name, raw_arguments)?;
        validate_arguments(name, &tool.parameters_schema(), &args)?;

        tool.execute(&args)
            .await
            .map_err(|source| Error::ToolExecution {
                tool: name.to_string(),
                fatal: source.is::<AbortTurn>(),
                source,
            })
    }
}

fn parse_arguments(tool: &str, raw: &str) -> Result<ToolArgs> {
    if raw.trim().is_empty() {
        return Ok(ToolArgs::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::ArgumentParse {
            tool: tool.to_string(),
            reason: format!("expected a JSON object, got {}", json_type(&other)),
        }),
        Err(e) => Err(Error::ArgumentParse {
            tool: tool.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Checks required properties and declared primitive types. Anything richer
/// in the schema (enums, patterns, nested schemas) is left to the handler.
fn validate_arguments(tool: &str, schema: &Value, args: &ToolArgs) -> Result<()> {
    let invalid = |reason: String| Error::ArgumentParse {
        tool: tool.to_string(),
        reason,
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(key) {
                return Err(invalid(format!("missing required parameter '{}'", key)));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (key, value) in args {
        let Some(expected) = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
        else {
            continue;
        };

        if !type_matches(expected, value) {
            return Err(invalid(format!(
                "parameter '{}' should be {}, got {}",
                key,
                expected,
                json_type(value)
            )));
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
