use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolArgs};
use async_trait::async_trait;
use serde_json::json;

pub struct JokeTool;

#[async_trait]
impl Tool for JokeTool {
    fn name(&self) -> &str {
        "get_joke"
    }

    fn description(&self) -> &str {
        "Tell a joke based on the weather."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "weather": {
                    "type": "string",
                    "description": "Weather description"
                }
            },
            "required": ["weather"]
        })
    }

    async fn execute(&self, args: &ToolArgs) -> anyhow::Result<String> {
        let weather = extract_string_arg(args, "weather")?;
        Ok(format!(
            "Why don't {} clouds ever break up? Because they always stick together!",
            weather
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn joke_mentions_weather() {
        let mut args = ToolArgs::new();
        args.insert("weather".into(), json!("sunny"));
        let out = JokeTool.execute(&args).await.unwrap();
        assert!(out.starts_with("Why don't sunny clouds"));
    }
}
