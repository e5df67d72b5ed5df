use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolArgs};
use async_trait::async_trait;
use serde_json::json;

pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "The location to get the weather for"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: &ToolArgs) -> anyhow::Result<String> {
        let location = extract_string_arg(args, "location")?;
        Ok(format!("The weather in {} is sunny.", location))
    }
}
