use crate::agent::ToolRegistry;
use crate::error::Result;
use crate::traits::ToolArgs;

pub mod joke;
pub mod weather;

pub use joke::JokeTool;
pub use weather::WeatherTool;

/// Registry holding every built-in tool.
pub fn default_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(WeatherTool)?;
    registry.register(JokeTool)?;
    Ok(registry)
}

pub fn extract_string_arg(args: &ToolArgs, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn default_registry_catalog() {
        let registry = default_registry().unwrap();
        let names: Vec<_> = registry.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["get_weather", "get_joke"]);
    }

    #[test]
    fn string_args() {
        let a = args(json!({"city": "Lima", "n": 3}));
        assert_eq!(extract_string_arg(&a, "city").unwrap(), "Lima");
        assert!(extract_string_arg(&a, "n").is_err());
        assert!(extract_string_arg(&a, "missing").is_err());
    }
}
